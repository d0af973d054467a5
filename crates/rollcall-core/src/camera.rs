use serde::{Deserialize, Serialize};

use crate::errors::RollcallError;

/// Which way the active camera is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraDirection {
    Front,
    Back,
    Unknown,
}

/// Snapshot of the local camera hardware as reported by the capture layer.
///
/// Only meaningful for the local participant. Remote participants always
/// carry [`CameraState::UNKNOWN`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CameraState {
    enabled: bool,
    camera_count: u32,
    active_direction: CameraDirection,
}

impl CameraState {
    /// No camera information yet.
    pub const UNKNOWN: CameraState = CameraState {
        enabled: false,
        camera_count: 0,
        active_direction: CameraDirection::Unknown,
    };

    pub const fn new(enabled: bool, camera_count: u32, active_direction: CameraDirection) -> Self {
        Self {
            enabled,
            camera_count,
            active_direction,
        }
    }

    /// Build from a signed device count as handed over by platform code.
    ///
    /// A negative count is a caller bug and is rejected, not clamped.
    pub fn try_new(
        enabled: bool,
        camera_count: i64,
        active_direction: CameraDirection,
    ) -> Result<Self, RollcallError> {
        let count = u32::try_from(camera_count).map_err(|_| {
            tracing::warn!(camera_count, "rejecting camera state with invalid device count");
            RollcallError::InvalidCameraCount(camera_count)
        })?;
        Ok(Self::new(enabled, count, active_direction))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn camera_count(&self) -> u32 {
        self.camera_count
    }

    pub fn active_direction(&self) -> CameraDirection {
        self.active_direction
    }

    /// Whether a local participant with this camera can claim to send video.
    pub fn can_send_video(&self) -> bool {
        self.enabled && self.camera_count > 0
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::UNKNOWN
    }
}
