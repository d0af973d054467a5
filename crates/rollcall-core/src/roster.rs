use std::time::Duration;

use im::hashmap::HashMap;

use crate::events::{RosterEvent, SignalingEvent};
use crate::participant::CallParticipant;
use crate::participant_id::CallParticipantId;

/// Snapshot of everyone currently in the call, keyed by participant id.
///
/// Snapshots are persistent: `upsert`, `remove` and `apply` return a new
/// roster and leave the receiver untouched, so a reader holding an older
/// snapshot never observes a partial update. The map is a persistent hash
/// trie: an update copies only the path to the changed entry and shares
/// every other node with the previous snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    participants: HashMap<CallParticipantId, CallParticipant>,
    local_id: Option<CallParticipantId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `participant.id()`.
    ///
    /// A local participant under a new id replaces the previous local entry;
    /// the roster never holds two of them.
    pub fn upsert(&self, participant: CallParticipant) -> Self {
        let mut next = self.clone();
        if participant.is_self() {
            let id = participant.id();
            if let Some(previous) = next.local_id.replace(id) {
                if previous != id {
                    tracing::info!(previous = %previous, current = %id, "local participant id changed");
                    next.participants.remove(&previous);
                }
            }
        }
        next.participants.insert(participant.id(), participant);
        next
    }

    pub fn remove(&self, id: &CallParticipantId) -> Self {
        if !self.participants.contains_key(id) {
            return self.clone();
        }
        let mut next = self.clone();
        next.participants.remove(id);
        if next.local_id.as_ref() == Some(id) {
            next.local_id = None;
        }
        next
    }

    /// Look up a participant, falling back to [`CallParticipant::empty`].
    pub fn get(&self, id: &CallParticipantId) -> &CallParticipant {
        self.participants
            .get(id)
            .unwrap_or_else(|| CallParticipant::empty())
    }

    pub fn contains(&self, id: &CallParticipantId) -> bool {
        self.participants.contains_key(id)
    }

    /// The local participant, or the placeholder before the local user joined.
    pub fn local(&self) -> &CallParticipant {
        match &self.local_id {
            Some(id) => self.get(id),
            None => CallParticipant::empty(),
        }
    }

    /// All participants, oldest first. Ties are broken by id so the order is
    /// stable across snapshots.
    pub fn participants(&self) -> Vec<CallParticipant> {
        let mut all: Vec<CallParticipant> = self.participants.values().cloned().collect();
        all.sort_by_key(|p| (p.added_to_call_time(), p.id()));
        all
    }

    /// Remote participants only, in the same order as [`Roster::participants`].
    pub fn remote_participants(&self) -> Vec<CallParticipant> {
        let mut remote = self.participants();
        remote.retain(|p| !p.is_self());
        remote
    }

    /// Participants heard within `window` of `now`, most recent first.
    pub fn active_speakers(&self, now: u64, window: Duration) -> Vec<CallParticipant> {
        let mut speakers: Vec<CallParticipant> = self
            .participants
            .values()
            .filter(|p| p.is_speaking(now, window))
            .cloned()
            .collect();
        speakers.sort_by(|a, b| {
            b.last_spoke()
                .cmp(&a.last_spoke())
                .then_with(|| a.id().cmp(&b.id()))
        });
        speakers
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Apply one signaling event and return the resulting snapshot, plus the
    /// change to report if the roster actually changed.
    ///
    /// Updates for ids not in the roster are dropped: a late event for a
    /// participant that already left must not resurrect it.
    pub fn apply(&self, event: SignalingEvent) -> (Self, Option<RosterEvent>) {
        match event {
            SignalingEvent::LocalJoined {
                recipient,
                camera_state,
                video_sink,
                microphone_enabled,
            } => {
                let local = CallParticipant::create_local(
                    recipient,
                    camera_state,
                    video_sink,
                    microphone_enabled,
                );
                self.replace(local)
            }

            SignalingEvent::RemoteJoined {
                id,
                recipient,
                identity_key,
                video_sink,
                audio_enabled,
                video_enabled,
                last_spoke,
                media_keys_received,
                added_to_call_time,
            } => {
                let remote = CallParticipant::create_remote(
                    id,
                    recipient,
                    identity_key,
                    video_sink,
                    audio_enabled,
                    video_enabled,
                    last_spoke,
                    media_keys_received,
                    added_to_call_time,
                );
                self.replace(remote)
            }

            SignalingEvent::Left(id) => {
                if !self.contains(&id) {
                    tracing::debug!(participant = %id, "leave for unknown participant ignored");
                    return (self.clone(), None);
                }
                (self.remove(&id), Some(RosterEvent::ParticipantLeft(id)))
            }

            SignalingEvent::AudioToggled { id, enabled } => {
                self.update(&id, |p| p.with_microphone_enabled(enabled))
            }

            SignalingEvent::VideoToggled { id, enabled } => {
                self.update(&id, |p| p.with_video_enabled(enabled))
            }

            SignalingEvent::SpeechDetected { id, at } => {
                self.update(&id, |p| p.with_last_spoke(at))
            }

            SignalingEvent::MediaKeysReceived(id) => {
                self.update(&id, |p| p.with_media_keys_received(true))
            }

            SignalingEvent::IdentityVerified { id, identity_key } => {
                tracing::info!(
                    participant = %id,
                    fingerprint = %identity_key.fingerprint(),
                    "identity verified"
                );
                self.update(&id, |p| p.with_identity_key(identity_key))
            }

            SignalingEvent::LocalCameraChanged(camera_state) => match self.local_id {
                Some(id) => self.update(&id, |p| p.with_camera_state(camera_state)),
                None => {
                    tracing::debug!("camera change before local join ignored");
                    (self.clone(), None)
                }
            },

            SignalingEvent::Ended => {
                if self.is_empty() {
                    return (self.clone(), None);
                }
                (Self::new(), Some(RosterEvent::Cleared))
            }
        }
    }

    fn replace(&self, participant: CallParticipant) -> (Self, Option<RosterEvent>) {
        let id = participant.id();
        match self.participants.get(&id) {
            Some(existing) if existing == &participant => (self.clone(), None),
            Some(_) => (
                self.upsert(participant.clone()),
                Some(RosterEvent::ParticipantUpdated(participant)),
            ),
            None => {
                tracing::info!(participant = %id, "participant joined");
                (
                    self.upsert(participant.clone()),
                    Some(RosterEvent::ParticipantJoined(participant)),
                )
            }
        }
    }

    fn update(
        &self,
        id: &CallParticipantId,
        f: impl FnOnce(&CallParticipant) -> CallParticipant,
    ) -> (Self, Option<RosterEvent>) {
        let Some(existing) = self.participants.get(id) else {
            tracing::debug!(participant = %id, "update for unknown participant ignored");
            return (self.clone(), None);
        };
        let updated = f(existing);
        if &updated == existing {
            return (self.clone(), None);
        }
        (
            self.upsert(updated.clone()),
            Some(RosterEvent::ParticipantUpdated(updated)),
        )
    }
}
