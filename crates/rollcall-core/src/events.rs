use std::sync::{Arc, RwLock};

use crate::camera::CameraState;
use crate::identity::IdentityKey;
use crate::participant::CallParticipant;
use crate::participant_id::CallParticipantId;
use crate::recipient::Recipient;
use crate::sink::VideoSinkHandle;

/// Inputs from the signaling and identity layers, applied to the roster in
/// the order they were received.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    LocalJoined {
        recipient: Arc<Recipient>,
        camera_state: CameraState,
        video_sink: VideoSinkHandle,
        microphone_enabled: bool,
    },
    RemoteJoined {
        id: CallParticipantId,
        recipient: Arc<Recipient>,
        identity_key: Option<IdentityKey>,
        video_sink: VideoSinkHandle,
        audio_enabled: bool,
        video_enabled: bool,
        last_spoke: u64,
        media_keys_received: bool,
        added_to_call_time: u64,
    },
    Left(CallParticipantId),
    AudioToggled { id: CallParticipantId, enabled: bool },
    VideoToggled { id: CallParticipantId, enabled: bool },
    SpeechDetected { id: CallParticipantId, at: u64 },
    MediaKeysReceived(CallParticipantId),
    IdentityVerified { id: CallParticipantId, identity_key: IdentityKey },
    LocalCameraChanged(CameraState),
    Ended,
}

/// Observable roster changes, emitted to UI listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum RosterEvent {
    ParticipantJoined(CallParticipant),
    ParticipantUpdated(CallParticipant),
    ParticipantLeft(CallParticipantId),
    Cleared,
}

/// Trait for receiving roster changes.
/// Implementations must be Send + Sync (called from the session task).
pub trait RosterListener: Send + Sync {
    fn on_event(&self, event: RosterEvent);
}

/// Dispatches roster events to registered listeners.
#[derive(Clone, Default)]
pub struct EventEmitter {
    listeners: Arc<RwLock<Vec<Arc<dyn RosterListener>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn RosterListener>) {
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push(listener);
    }

    pub fn emit(&self, event: RosterEvent) {
        let listeners = self.listeners.read().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipient::RecipientId;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener {
        count: Arc<AtomicUsize>,
    }

    impl RosterListener for CountingListener {
        fn on_event(&self, _event: RosterEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn emitter_dispatches_to_multiple_listeners() {
        let emitter = EventEmitter::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        emitter.add_listener(Arc::new(CountingListener { count: count1.clone() }));
        emitter.add_listener(Arc::new(CountingListener { count: count2.clone() }));

        emitter.emit(RosterEvent::Cleared);

        assert_eq!(count1.load(Ordering::SeqCst), 1);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    struct EventCapture {
        events: Arc<Mutex<Vec<RosterEvent>>>,
    }

    impl RosterListener for EventCapture {
        fn on_event(&self, event: RosterEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn emitter_delivers_correct_events() {
        let emitter = EventEmitter::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        emitter.add_listener(Arc::new(EventCapture { events: events.clone() }));

        let id = CallParticipantId::new(RecipientId::new(4));
        emitter.emit(RosterEvent::ParticipantLeft(id));

        let captured = events.lock().unwrap();
        assert_eq!(captured.as_slice(), &[RosterEvent::ParticipantLeft(id)]);
    }
}
