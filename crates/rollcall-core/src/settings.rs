use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::camera::CameraState;

const SETTINGS_FILE: &str = "settings.json";
const DEFAULT_SPEAKING_WINDOW_MS: u64 = 2_000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_true")]
    pub mic_enabled_on_join: bool,
    #[serde(default)]
    pub camera_enabled_on_join: bool,
    /// How long after the last detected speech a participant still counts
    /// as an active speaker.
    #[serde(default = "default_speaking_window_ms")]
    pub speaking_window_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_speaking_window_ms() -> u64 {
    DEFAULT_SPEAKING_WINDOW_MS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_name: None,
            mic_enabled_on_join: true,
            camera_enabled_on_join: false,
            speaking_window_ms: DEFAULT_SPEAKING_WINDOW_MS,
        }
    }
}

impl Settings {
    /// Camera state to join with, given what the hardware reports.
    pub fn join_camera_state(&self, hardware: CameraState) -> CameraState {
        CameraState::new(
            self.camera_enabled_on_join && hardware.is_enabled(),
            hardware.camera_count(),
            hardware.active_direction(),
        )
    }
}

pub struct SettingsStore {
    settings: Mutex<Settings>,
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join(SETTINGS_FILE);
        let settings = Self::load(&file_path);
        Self {
            settings: Mutex::new(settings),
            file_path,
        }
    }

    pub fn get(&self) -> Settings {
        self.settings.lock().expect("settings lock poisoned").clone()
    }

    pub fn set_display_name(&self, name: Option<String>) {
        self.update(|s| s.display_name = name);
    }

    pub fn set_mic_enabled_on_join(&self, enabled: bool) {
        self.update(|s| s.mic_enabled_on_join = enabled);
    }

    pub fn set_camera_enabled_on_join(&self, enabled: bool) {
        self.update(|s| s.camera_enabled_on_join = enabled);
    }

    pub fn set_speaking_window_ms(&self, window_ms: u64) {
        self.update(|s| s.speaking_window_ms = window_ms);
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let snapshot = {
            let mut settings = self.settings.lock().expect("settings lock poisoned");
            f(&mut settings);
            settings.clone()
        };
        self.save(&snapshot);
    }

    fn save(&self, settings: &Settings) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("failed to create settings dir: {e}");
                return;
            }
        }
        match serde_json::to_string_pretty(settings) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.file_path, json) {
                    tracing::warn!("failed to write settings: {e}");
                }
            }
            Err(e) => tracing::warn!("failed to serialize settings: {e}"),
        }
    }

    fn load(path: &Path) -> Settings {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("corrupt settings file, using defaults: {e}");
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }
}
