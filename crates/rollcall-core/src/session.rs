use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::errors::RollcallError;
use crate::events::{EventEmitter, RosterListener, SignalingEvent};
use crate::participant::CallParticipant;
use crate::participant_id::CallParticipantId;
use crate::roster::Roster;
use crate::settings::Settings;

/// Current wall-clock time in epoch milliseconds, as used for speech and
/// join timestamps.
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Owns the roster of one call.
///
/// Signaling and identity events are queued from any thread and applied one
/// at a time by a single task, so events for a participant keep their
/// order. Every resulting snapshot is published on a watch channel: readers
/// grab the latest roster without ever waiting on the writer.
pub struct CallSession {
    events: mpsc::UnboundedSender<SignalingEvent>,
    snapshots: watch::Receiver<Roster>,
    emitter: EventEmitter,
    speaking_window: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CallSession {
    /// Start the session's event loop on the current tokio runtime.
    pub fn start(settings: &Settings) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(Roster::new());
        let emitter = EventEmitter::new();

        let handle = tokio::spawn(Self::event_loop(events_rx, snapshots_tx, emitter.clone()));
        tracing::info!("call session started");

        Self {
            events: events_tx,
            snapshots: snapshots_rx,
            emitter,
            speaking_window: Duration::from_millis(settings.speaking_window_ms),
            task: Mutex::new(Some(handle)),
        }
    }

    /// Register a listener for roster changes.
    pub fn add_listener(&self, listener: Arc<dyn RosterListener>) {
        self.emitter.add_listener(listener);
    }

    /// Queue an event. Fails once the session has ended.
    pub fn send(&self, event: SignalingEvent) -> Result<(), RollcallError> {
        self.events
            .send(event)
            .map_err(|_| RollcallError::SessionClosed)
    }

    /// Latest published snapshot.
    pub fn roster(&self) -> Roster {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified on every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Roster> {
        self.snapshots.clone()
    }

    /// Participant by id, or the placeholder if nobody has that id.
    pub fn participant(&self, id: &CallParticipantId) -> CallParticipant {
        self.snapshots.borrow().get(id).clone()
    }

    pub fn participants(&self) -> Vec<CallParticipant> {
        self.snapshots.borrow().participants()
    }

    pub fn active_speakers(&self) -> Vec<CallParticipant> {
        self.snapshots
            .borrow()
            .active_speakers(now_millis(), self.speaking_window)
    }

    /// End the call: clear the roster and wait for the event loop to drain.
    pub async fn end(&self) {
        if self.send(SignalingEvent::Ended).is_err() {
            tracing::debug!("end called on a closed session");
        }
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("call session task failed: {e}");
            }
        }
    }

    async fn event_loop(
        mut events: mpsc::UnboundedReceiver<SignalingEvent>,
        snapshots: watch::Sender<Roster>,
        emitter: EventEmitter,
    ) {
        while let Some(event) = events.recv().await {
            let ended = matches!(event, SignalingEvent::Ended);
            if ended {
                // Senders must see the session as closed before the cleared
                // roster is observable.
                events.close();
            }
            let current = snapshots.borrow().clone();
            let (next, change) = current.apply(event);

            if let Some(change) = change {
                snapshots.send_replace(next);
                emitter.emit(change);
            }

            if ended {
                tracing::info!("call ended");
                break;
            }
        }

        tracing::info!("call session event loop ended");
    }
}
