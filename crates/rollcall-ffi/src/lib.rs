//! UniFFI bindings for rollcall-core.
//!
//! Provides a RollcallClient object that wraps a CallSession, the settings
//! store and the video renderer registry into a single FFI-safe interface.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use rollcall_core::{
    self, CallParticipant, CallParticipantId, CallSession, RecipientId, SignalingEvent,
    VideoSinkHandle,
};

uniffi::include_scaffolding!("rollcall");

// ── Namespace functions ──────────────────────────────────────────────

/// Initialize tracing/logging. Call once from the host before using RollcallClient.
fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rollcall_core=debug,rollcall_ffi=debug")),
            )
            .with_ansi(false)
            .init();
    });
}

// ── FFI-safe type conversions ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraDirection {
    Front,
    Back,
    Unknown,
}

impl From<rollcall_core::CameraDirection> for CameraDirection {
    fn from(d: rollcall_core::CameraDirection) -> Self {
        match d {
            rollcall_core::CameraDirection::Front => Self::Front,
            rollcall_core::CameraDirection::Back => Self::Back,
            rollcall_core::CameraDirection::Unknown => Self::Unknown,
        }
    }
}

impl From<CameraDirection> for rollcall_core::CameraDirection {
    fn from(d: CameraDirection) -> Self {
        match d {
            CameraDirection::Front => Self::Front,
            CameraDirection::Back => Self::Back,
            CameraDirection::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub enabled: bool,
    pub camera_count: i64,
    pub direction: CameraDirection,
}

impl TryFrom<CameraInfo> for rollcall_core::CameraState {
    type Error = RollcallError;

    fn try_from(c: CameraInfo) -> Result<Self, Self::Error> {
        Ok(rollcall_core::CameraState::try_new(
            c.enabled,
            c.camera_count,
            c.direction.into(),
        )?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantKey {
    pub recipient_id: Option<u64>,
    pub demux_id: Option<u32>,
}

impl From<CallParticipantId> for ParticipantKey {
    fn from(id: CallParticipantId) -> Self {
        Self {
            recipient_id: id.recipient_id.raw(),
            demux_id: id.demux_id,
        }
    }
}

impl From<ParticipantKey> for CallParticipantId {
    fn from(k: ParticipantKey) -> Self {
        let recipient_id = k.recipient_id.map_or(RecipientId::UNKNOWN, RecipientId::new);
        Self {
            recipient_id,
            demux_id: k.demux_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteJoin {
    pub key: ParticipantKey,
    pub display_name: Option<String>,
    pub identity_key: Option<Vec<u8>>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub last_spoke: u64,
    pub media_keys_received: bool,
    pub added_to_call_time: u64,
}

#[derive(Debug, Clone)]
pub struct ParticipantView {
    pub key: ParticipantKey,
    pub display_name: String,
    pub is_self: bool,
    pub is_placeholder: bool,
    pub identity_fingerprint: Option<String>,
    pub video_enabled: bool,
    pub microphone_enabled: bool,
    pub camera_direction: CameraDirection,
    pub more_than_one_camera: bool,
    pub last_spoke: u64,
    pub media_keys_received: bool,
    pub media_trusted: bool,
    pub added_to_call_time: u64,
    pub video_sink_initialized: bool,
}

impl From<&CallParticipant> for ParticipantView {
    fn from(p: &CallParticipant) -> Self {
        Self {
            key: p.id().into(),
            display_name: p.recipient().display_name().to_string(),
            is_self: p.is_self(),
            is_placeholder: p.is_empty(),
            identity_fingerprint: p.identity_key().map(|k| k.fingerprint()),
            video_enabled: p.is_video_enabled(),
            microphone_enabled: p.is_microphone_enabled(),
            camera_direction: p.camera_direction().into(),
            more_than_one_camera: p.is_more_than_one_camera_available(),
            last_spoke: p.last_spoke(),
            media_keys_received: p.is_media_keys_received(),
            media_trusted: p.is_media_trusted(),
            added_to_call_time: p.added_to_call_time(),
            video_sink_initialized: p.video_sink().is_initialized(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub display_name: Option<String>,
    pub mic_enabled_on_join: bool,
    pub camera_enabled_on_join: bool,
    pub speaking_window_ms: u64,
}

impl From<rollcall_core::Settings> for Settings {
    fn from(s: rollcall_core::Settings) -> Self {
        Self {
            display_name: s.display_name,
            mic_enabled_on_join: s.mic_enabled_on_join,
            camera_enabled_on_join: s.camera_enabled_on_join,
            speaking_window_ms: s.speaking_window_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RosterEvent {
    ParticipantJoined { participant: ParticipantView },
    ParticipantUpdated { participant: ParticipantView },
    ParticipantLeft { key: ParticipantKey },
    Cleared,
}

impl From<rollcall_core::RosterEvent> for RosterEvent {
    fn from(e: rollcall_core::RosterEvent) -> Self {
        match e {
            rollcall_core::RosterEvent::ParticipantJoined(p) => {
                Self::ParticipantJoined { participant: (&p).into() }
            }
            rollcall_core::RosterEvent::ParticipantUpdated(p) => {
                Self::ParticipantUpdated { participant: (&p).into() }
            }
            rollcall_core::RosterEvent::ParticipantLeft(id) => {
                Self::ParticipantLeft { key: id.into() }
            }
            rollcall_core::RosterEvent::Cleared => Self::Cleared,
        }
    }
}

// ── Error conversion ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    #[error("Invalid camera count: {msg}")]
    InvalidCameraCount { msg: String },
    #[error("Invalid identity key: {msg}")]
    InvalidIdentityKey { msg: String },
    #[error("Session closed: {msg}")]
    SessionClosed { msg: String },
}

impl From<rollcall_core::RollcallError> for RollcallError {
    fn from(e: rollcall_core::RollcallError) -> Self {
        tracing::error!("RollcallError: {e}");
        match e {
            rollcall_core::RollcallError::InvalidCameraCount(count) => {
                Self::InvalidCameraCount { msg: count.to_string() }
            }
            rollcall_core::RollcallError::InvalidIdentityKey(msg) => {
                Self::InvalidIdentityKey { msg }
            }
            rollcall_core::RollcallError::SessionClosed => {
                Self::SessionClosed { msg: "call session closed".to_string() }
            }
        }
    }
}

// ── Callback interfaces ───────────────────────────────────────────────

pub trait RosterListener: Send + Sync {
    fn on_event(&self, event: RosterEvent);
}

pub trait VideoRenderer: Send + Sync {
    fn is_initialized(&self) -> bool;
}

// ── Bridges: FFI callbacks → core traits ─────────────────────────────

struct BridgeListener {
    ffi_listener: Arc<dyn RosterListener>,
}

impl rollcall_core::RosterListener for BridgeListener {
    fn on_event(&self, event: rollcall_core::RosterEvent) {
        self.ffi_listener.on_event(event.into());
    }
}

struct BridgeRenderer {
    renderer: Box<dyn VideoRenderer>,
}

impl rollcall_core::VideoSink for BridgeRenderer {
    fn is_initialized(&self) -> bool {
        self.renderer.is_initialized()
    }
}

// ── RollcallClient: main FFI object ───────────────────────────────────

/// The core only keeps weak handles to renderers; the client holds the
/// strong references for the platform until the participant leaves.
pub struct RollcallClient {
    self_recipient_id: RecipientId,
    session: StdMutex<Option<Arc<CallSession>>>,
    listeners: StdMutex<Vec<Arc<dyn rollcall_core::RosterListener>>>,
    renderers: StdMutex<HashMap<CallParticipantId, Arc<dyn rollcall_core::VideoSink>>>,
    settings: rollcall_core::SettingsStore,
    rt: tokio::runtime::Runtime,
}

impl RollcallClient {
    pub fn new(data_dir: String, self_recipient_id: u64) -> Self {
        let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
        tracing::info!("RollcallClient created");
        Self {
            self_recipient_id: RecipientId::new(self_recipient_id),
            session: StdMutex::new(None),
            listeners: StdMutex::new(Vec::new()),
            renderers: StdMutex::new(HashMap::new()),
            settings: rollcall_core::SettingsStore::new(&data_dir),
            rt,
        }
    }

    pub fn start_call(&self) -> Result<(), RollcallError> {
        // Listeners may read the client while the previous call drains, so
        // the session lock must not be held across `end()`.
        let previous = self.session.lock().expect("session lock poisoned").take();
        if let Some(previous) = previous {
            tracing::warn!("start_call while a call is active, ending previous call");
            self.rt.block_on(previous.end());
            self.renderers.lock().expect("renderer lock poisoned").clear();
        }

        let session = {
            let _guard = self.rt.enter();
            CallSession::start(&self.settings.get())
        };
        for listener in self.listeners.lock().expect("listener lock poisoned").iter() {
            session.add_listener(listener.clone());
        }
        let replaced = self
            .session
            .lock()
            .expect("session lock poisoned")
            .replace(Arc::new(session));
        if let Some(replaced) = replaced {
            tracing::warn!("concurrent start_call, ending the other call");
            self.rt.block_on(replaced.end());
        }
        Ok(())
    }

    pub fn end_call(&self) {
        let session = self.session.lock().expect("session lock poisoned").take();
        if let Some(session) = session {
            self.rt.block_on(session.end());
        }
        self.renderers.lock().expect("renderer lock poisoned").clear();
    }

    pub fn is_in_call(&self) -> bool {
        self.session.lock().expect("session lock poisoned").is_some()
    }

    pub fn join_local(
        &self,
        camera: CameraInfo,
        renderer: Box<dyn VideoRenderer>,
    ) -> Result<(), RollcallError> {
        let settings = self.settings.get();
        let hardware = rollcall_core::CameraState::try_from(camera)?;
        let recipient = Arc::new(rollcall_core::Recipient::local(
            self.self_recipient_id,
            settings.display_name.clone(),
        ));
        let id = CallParticipantId::new(self.self_recipient_id);
        let video_sink = self.register_renderer(id, renderer);

        let result = self.send(SignalingEvent::LocalJoined {
            recipient,
            camera_state: settings.join_camera_state(hardware),
            video_sink,
            microphone_enabled: settings.mic_enabled_on_join,
        });
        self.release_renderer_on_error(id, result)
    }

    pub fn remote_joined(
        &self,
        join: RemoteJoin,
        renderer: Box<dyn VideoRenderer>,
    ) -> Result<(), RollcallError> {
        let identity_key = join
            .identity_key
            .as_deref()
            .map(rollcall_core::IdentityKey::decode)
            .transpose()?;
        let id = CallParticipantId::from(join.key);
        let recipient = Arc::new(rollcall_core::Recipient::remote(
            id.recipient_id,
            join.display_name,
        ));
        let video_sink = self.register_renderer(id, renderer);

        let result = self.send(SignalingEvent::RemoteJoined {
            id,
            recipient,
            identity_key,
            video_sink,
            audio_enabled: join.audio_enabled,
            video_enabled: join.video_enabled,
            last_spoke: join.last_spoke,
            media_keys_received: join.media_keys_received,
            added_to_call_time: join.added_to_call_time,
        });
        self.release_renderer_on_error(id, result)
    }

    pub fn participant_left(&self, key: ParticipantKey) -> Result<(), RollcallError> {
        let id = CallParticipantId::from(key);
        let result = self.send(SignalingEvent::Left(id));
        self.renderers.lock().expect("renderer lock poisoned").remove(&id);
        result
    }

    pub fn set_audio_enabled(&self, key: ParticipantKey, enabled: bool) -> Result<(), RollcallError> {
        self.send(SignalingEvent::AudioToggled { id: key.into(), enabled })
    }

    pub fn set_video_enabled(&self, key: ParticipantKey, enabled: bool) -> Result<(), RollcallError> {
        self.send(SignalingEvent::VideoToggled { id: key.into(), enabled })
    }

    pub fn speech_detected(&self, key: ParticipantKey) -> Result<(), RollcallError> {
        self.send(SignalingEvent::SpeechDetected {
            id: key.into(),
            at: rollcall_core::now_millis(),
        })
    }

    pub fn media_keys_received(&self, key: ParticipantKey) -> Result<(), RollcallError> {
        self.send(SignalingEvent::MediaKeysReceived(key.into()))
    }

    pub fn identity_verified(
        &self,
        key: ParticipantKey,
        identity_key: Vec<u8>,
    ) -> Result<(), RollcallError> {
        let identity_key = rollcall_core::IdentityKey::decode(&identity_key)?;
        self.send(SignalingEvent::IdentityVerified { id: key.into(), identity_key })
    }

    pub fn local_camera_changed(&self, camera: CameraInfo) -> Result<(), RollcallError> {
        let camera_state = rollcall_core::CameraState::try_from(camera)?;
        self.send(SignalingEvent::LocalCameraChanged(camera_state))
    }

    pub fn participants(&self) -> Vec<ParticipantView> {
        match self.current_session() {
            Some(session) => session.participants().iter().map(ParticipantView::from).collect(),
            None => Vec::new(),
        }
    }

    pub fn participant(&self, key: ParticipantKey) -> ParticipantView {
        match self.current_session() {
            Some(session) => (&session.participant(&key.into())).into(),
            None => CallParticipant::empty().into(),
        }
    }

    pub fn local_participant(&self) -> ParticipantView {
        match self.current_session() {
            Some(session) => session.roster().local().into(),
            None => CallParticipant::empty().into(),
        }
    }

    pub fn active_speakers(&self) -> Vec<ParticipantView> {
        match self.current_session() {
            Some(session) => session.active_speakers().iter().map(ParticipantView::from).collect(),
            None => Vec::new(),
        }
    }

    pub fn add_listener(&self, listener: Box<dyn RosterListener>) {
        let bridge: Arc<dyn rollcall_core::RosterListener> = Arc::new(BridgeListener {
            ffi_listener: Arc::from(listener),
        });
        if let Some(session) = self.current_session() {
            session.add_listener(bridge.clone());
        }
        self.listeners.lock().expect("listener lock poisoned").push(bridge);
    }

    pub fn get_settings(&self) -> Settings {
        self.settings.get().into()
    }

    pub fn set_display_name(&self, name: Option<String>) {
        self.settings.set_display_name(name);
    }

    pub fn set_mic_enabled_on_join(&self, enabled: bool) {
        self.settings.set_mic_enabled_on_join(enabled);
    }

    pub fn set_camera_enabled_on_join(&self, enabled: bool) {
        self.settings.set_camera_enabled_on_join(enabled);
    }

    pub fn set_speaking_window_ms(&self, window_ms: u64) {
        self.settings.set_speaking_window_ms(window_ms);
    }

    fn current_session(&self) -> Option<Arc<CallSession>> {
        self.session.lock().expect("session lock poisoned").clone()
    }

    fn send(&self, event: SignalingEvent) -> Result<(), RollcallError> {
        let session = self.current_session().ok_or_else(|| RollcallError::SessionClosed {
            msg: "no active call".to_string(),
        })?;
        Ok(session.send(event)?)
    }

    fn register_renderer(
        &self,
        id: CallParticipantId,
        renderer: Box<dyn VideoRenderer>,
    ) -> VideoSinkHandle {
        let sink: Arc<dyn rollcall_core::VideoSink> = Arc::new(BridgeRenderer { renderer });
        let handle = VideoSinkHandle::new(&sink);
        self.renderers
            .lock()
            .expect("renderer lock poisoned")
            .insert(id, sink);
        handle
    }

    /// Drop the renderer registered for `id` if its join never reached the
    /// session.
    fn release_renderer_on_error(
        &self,
        id: CallParticipantId,
        result: Result<(), RollcallError>,
    ) -> Result<(), RollcallError> {
        if result.is_err() {
            self.renderers.lock().expect("renderer lock poisoned").remove(&id);
        }
        result
    }
}
