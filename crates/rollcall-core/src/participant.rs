use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::camera::{CameraDirection, CameraState};
use crate::identity::IdentityKey;
use crate::participant_id::CallParticipantId;
use crate::recipient::Recipient;
use crate::sink::VideoSinkHandle;

static EMPTY: LazyLock<CallParticipant> = LazyLock::new(|| {
    CallParticipant::create_remote(
        CallParticipantId::EMPTY,
        Arc::new(Recipient::UNKNOWN),
        None,
        VideoSinkHandle::detached(),
        false,
        false,
        0,
        true,
        0,
    )
});

/// One party's presence in a call, as last reported by signaling.
///
/// Values are immutable: every state change goes through one of the
/// `with_*` methods, which return a new participant and leave `self`
/// untouched. The recipient and identity key sit behind `Arc`s so those
/// updates stay cheap on high-frequency paths like speech detection.
///
/// Equality and hashing cover every field, so a roster can compare the old
/// and new value of an entry to decide whether anything needs re-rendering.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallParticipant {
    id: CallParticipantId,
    recipient: Arc<Recipient>,
    identity_key: Option<Arc<IdentityKey>>,
    video_sink: VideoSinkHandle,
    camera_state: CameraState,
    video_enabled: bool,
    microphone_enabled: bool,
    last_spoke: u64,
    media_keys_received: bool,
    added_to_call_time: u64,
}

impl CallParticipant {
    /// Placeholder returned by lookups that find nothing.
    pub fn empty() -> &'static CallParticipant {
        &EMPTY
    }

    /// The local user's own participant.
    ///
    /// Video only counts as enabled if the camera is on *and* at least one
    /// camera exists. Local media needs no key exchange and no identity
    /// verification against itself.
    pub fn create_local(
        self_recipient: Arc<Recipient>,
        camera_state: CameraState,
        video_sink: VideoSinkHandle,
        microphone_enabled: bool,
    ) -> Self {
        Self {
            id: CallParticipantId::new(self_recipient.id),
            recipient: self_recipient,
            identity_key: None,
            video_sink,
            camera_state,
            video_enabled: camera_state.can_send_video(),
            microphone_enabled,
            last_spoke: 0,
            media_keys_received: true,
            added_to_call_time: 0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_remote(
        id: CallParticipantId,
        recipient: Arc<Recipient>,
        identity_key: Option<IdentityKey>,
        video_sink: VideoSinkHandle,
        audio_enabled: bool,
        video_enabled: bool,
        last_spoke: u64,
        media_keys_received: bool,
        added_to_call_time: u64,
    ) -> Self {
        Self {
            id,
            recipient,
            identity_key: identity_key.map(Arc::new),
            video_sink,
            camera_state: CameraState::UNKNOWN,
            video_enabled,
            microphone_enabled: audio_enabled,
            last_spoke,
            media_keys_received,
            added_to_call_time,
        }
    }

    /// Record a completed identity verification.
    pub fn with_identity_key(&self, identity_key: IdentityKey) -> Self {
        Self {
            identity_key: Some(Arc::new(identity_key)),
            ..self.clone()
        }
    }

    pub fn with_video_enabled(&self, video_enabled: bool) -> Self {
        Self {
            video_enabled,
            ..self.clone()
        }
    }

    pub fn with_microphone_enabled(&self, microphone_enabled: bool) -> Self {
        Self {
            microphone_enabled,
            ..self.clone()
        }
    }

    /// Record speech activity. Timestamps older than the current one are
    /// ignored.
    pub fn with_last_spoke(&self, last_spoke: u64) -> Self {
        Self {
            last_spoke: last_spoke.max(self.last_spoke),
            ..self.clone()
        }
    }

    pub fn with_media_keys_received(&self, media_keys_received: bool) -> Self {
        Self {
            media_keys_received,
            ..self.clone()
        }
    }

    /// Apply new camera hardware info to the local participant.
    ///
    /// Remote camera hardware is not observable, so remote participants are
    /// returned unchanged.
    pub fn with_camera_state(&self, camera_state: CameraState) -> Self {
        if !self.is_self() {
            tracing::warn!(participant = %self.id, "ignoring camera state for remote participant");
            return self.clone();
        }
        Self {
            camera_state,
            video_enabled: camera_state.can_send_video(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> CallParticipantId {
        self.id
    }

    pub fn recipient(&self) -> &Arc<Recipient> {
        &self.recipient
    }

    pub fn identity_key(&self) -> Option<&IdentityKey> {
        self.identity_key.as_deref()
    }

    pub fn video_sink(&self) -> &VideoSinkHandle {
        &self.video_sink
    }

    pub fn camera_state(&self) -> CameraState {
        self.camera_state
    }

    pub fn is_video_enabled(&self) -> bool {
        self.video_enabled
    }

    pub fn is_microphone_enabled(&self) -> bool {
        self.microphone_enabled
    }

    pub fn last_spoke(&self) -> u64 {
        self.last_spoke
    }

    pub fn is_media_keys_received(&self) -> bool {
        self.media_keys_received
    }

    pub fn added_to_call_time(&self) -> u64 {
        self.added_to_call_time
    }

    /// Always a definite direction so the UI can pick an icon.
    pub fn camera_direction(&self) -> CameraDirection {
        match self.camera_state.active_direction() {
            CameraDirection::Back => CameraDirection::Back,
            _ => CameraDirection::Front,
        }
    }

    pub fn is_more_than_one_camera_available(&self) -> bool {
        self.camera_state.camera_count() > 1
    }

    pub fn is_empty(&self) -> bool {
        self.id == CallParticipantId::EMPTY
    }

    pub fn is_self(&self) -> bool {
        self.recipient.is_self
    }

    pub fn is_identity_verified(&self) -> bool {
        self.identity_key.is_some()
    }

    /// Whether this participant's media may be shown.
    ///
    /// Remote media is only trusted once the identity is verified and the
    /// decryption keys have arrived.
    pub fn is_media_trusted(&self) -> bool {
        if self.is_self() {
            return true;
        }
        self.is_identity_verified() && self.media_keys_received
    }

    /// Spoke within `window` of `now` (both in epoch milliseconds).
    pub fn is_speaking(&self, now: u64, window: Duration) -> bool {
        if self.last_spoke == 0 {
            return false;
        }
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        now.saturating_sub(self.last_spoke) <= window_ms
    }
}

impl fmt::Debug for CallParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallParticipant")
            .field("id", &self.id)
            .field("camera_state", &self.camera_state)
            .field("recipient", &self.recipient.id)
            .field(
                "identity_key",
                &if self.identity_key.is_some() { "present" } else { "absent" },
            )
            .field("video_sink", &self.video_sink)
            .field("video_enabled", &self.video_enabled)
            .field("microphone_enabled", &self.microphone_enabled)
            .field("last_spoke", &self.last_spoke)
            .field("media_keys_received", &self.media_keys_received)
            .field("added_to_call_time", &self.added_to_call_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipient::RecipientId;
    use crate::sink::tests::test_sink;
    use std::collections::HashSet;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn me() -> Arc<Recipient> {
        Arc::new(Recipient::local(RecipientId::new(1), Some("Me".to_string())))
    }

    fn alice() -> Arc<Recipient> {
        Arc::new(Recipient::remote(RecipientId::new(2), Some("Alice".to_string())))
    }

    fn key(byte: u8) -> IdentityKey {
        IdentityKey::new([byte; 32])
    }

    fn remote(sink: &VideoSinkHandle) -> CallParticipant {
        CallParticipant::create_remote(
            CallParticipantId::with_demux(RecipientId::new(2), 7),
            alice(),
            None,
            sink.clone(),
            false,
            true,
            0,
            false,
            1_000,
        )
    }

    #[test]
    fn camera_direction_is_back_only_for_back() {
        let sink = VideoSinkHandle::detached();
        for (direction, expected) in [
            (CameraDirection::Back, CameraDirection::Back),
            (CameraDirection::Front, CameraDirection::Front),
            (CameraDirection::Unknown, CameraDirection::Front),
        ] {
            let camera = CameraState::new(true, 1, direction);
            let local = CallParticipant::create_local(me(), camera, sink.clone(), true);
            assert_eq!(local.camera_direction(), expected);
        }
        assert_eq!(remote(&sink).camera_direction(), CameraDirection::Front);
    }

    #[test]
    fn local_without_camera_has_no_video() {
        let camera = CameraState::new(true, 0, CameraDirection::Front);
        let local = CallParticipant::create_local(me(), camera, VideoSinkHandle::detached(), true);
        assert!(!local.is_video_enabled());
    }

    #[test]
    fn local_with_two_front_cameras() {
        let camera = CameraState::new(true, 2, CameraDirection::Front);
        let sink = test_sink();
        let local = CallParticipant::create_local(me(), camera, VideoSinkHandle::new(&sink), true);
        assert!(local.is_video_enabled());
        assert!(local.is_microphone_enabled());
        assert!(local.is_more_than_one_camera_available());
        assert_eq!(local.camera_direction(), CameraDirection::Front);
        assert!(local.identity_key().is_none());
        assert!(local.is_media_keys_received());
        assert_eq!(local.added_to_call_time(), 0);
        assert_eq!(local.id(), CallParticipantId::new(RecipientId::new(1)));
        assert!(local.is_media_trusted());
    }

    #[test]
    fn remote_identity_update_keeps_other_fields() {
        let sink = VideoSinkHandle::detached();
        let before = remote(&sink);
        assert_eq!(before.camera_state(), CameraState::UNKNOWN);
        let after = before.with_identity_key(key(9));

        assert_eq!(after.identity_key(), Some(&key(9)));
        assert!(!after.is_media_keys_received());
        assert!(after.is_video_enabled());
        assert!(!after.is_microphone_enabled());
        assert_eq!(after.id(), before.id());
        assert_eq!(after.video_sink(), before.video_sink());
        assert_eq!(after.added_to_call_time(), before.added_to_call_time());
        assert!(before.identity_key().is_none());
        assert!(!after.is_media_trusted());
        assert!(after.with_media_keys_received(true).is_media_trusted());
    }

    #[test]
    fn video_update_only_touches_video() {
        let before = remote(&VideoSinkHandle::detached()).with_identity_key(key(1));
        let after = before.with_video_enabled(false);
        assert!(!after.is_video_enabled());
        assert_eq!(after.with_video_enabled(true), before);
    }

    #[test]
    fn identity_key_is_never_cleared_by_updates() {
        let verified = remote(&VideoSinkHandle::detached()).with_identity_key(key(3));
        let updated = verified
            .with_video_enabled(false)
            .with_microphone_enabled(true)
            .with_last_spoke(5_000)
            .with_media_keys_received(true);
        assert_eq!(updated.identity_key(), Some(&key(3)));
    }

    #[test]
    fn equality_is_sensitive_to_every_field() {
        let sink = VideoSinkHandle::detached();
        let base = remote(&sink);
        let other_sink = VideoSinkHandle::new(&test_sink());

        let variants = vec![
            base.with_identity_key(key(1)),
            base.with_video_enabled(false),
            base.with_microphone_enabled(true),
            base.with_last_spoke(1),
            base.with_media_keys_received(true),
            CallParticipant::create_remote(
                CallParticipantId::with_demux(RecipientId::new(2), 8),
                alice(),
                None,
                sink.clone(),
                false,
                true,
                0,
                false,
                1_000,
            ),
            CallParticipant::create_remote(
                base.id(),
                Arc::new(Recipient::remote(RecipientId::new(2), Some("Alicia".to_string()))),
                None,
                sink.clone(),
                false,
                true,
                0,
                false,
                1_000,
            ),
            CallParticipant::create_remote(
                base.id(),
                alice(),
                None,
                other_sink,
                false,
                true,
                0,
                false,
                1_000,
            ),
            CallParticipant::create_remote(
                base.id(),
                alice(),
                None,
                sink.clone(),
                false,
                true,
                0,
                false,
                2_000,
            ),
        ];
        for variant in &variants {
            assert_ne!(&base, variant);
        }

        let local = CallParticipant::create_local(
            me(),
            CameraState::new(true, 1, CameraDirection::Front),
            sink.clone(),
            true,
        );
        assert_ne!(
            local,
            local.with_camera_state(CameraState::new(true, 1, CameraDirection::Back))
        );
    }

    #[test]
    fn equality_is_an_equivalence() {
        let sink = VideoSinkHandle::detached();
        let a = remote(&sink);
        let b = remote(&sink);
        let c = b.clone();
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_eq!(b, c);
        assert_eq!(a, c);
    }

    #[test]
    fn empty_never_equals_a_real_participant() {
        let empty = CallParticipant::empty();
        assert!(empty.is_empty());
        assert!(empty.is_media_keys_received());
        assert!(!empty.video_sink().is_initialized());

        let local = CallParticipant::create_local(
            me(),
            CameraState::UNKNOWN,
            VideoSinkHandle::detached(),
            false,
        );
        assert_ne!(empty, &local);
        assert_ne!(empty, &remote(&VideoSinkHandle::detached()));
        assert!(!local.is_empty());
    }

    #[test]
    fn last_spoke_never_moves_backwards() {
        let p = remote(&VideoSinkHandle::detached()).with_last_spoke(5_000);
        assert_eq!(p.with_last_spoke(4_000).last_spoke(), 5_000);
        assert_eq!(p.with_last_spoke(6_000).last_spoke(), 6_000);
    }

    #[test]
    fn speaking_window() {
        let window = Duration::from_millis(2_000);
        let p = remote(&VideoSinkHandle::detached());
        assert!(!p.is_speaking(10_000, window));
        let p = p.with_last_spoke(9_000);
        assert!(p.is_speaking(10_000, window));
        assert!(p.is_speaking(11_000, window));
        assert!(!p.is_speaking(11_001, window));
    }

    #[test]
    fn huge_window_does_not_wrap() {
        let p = remote(&VideoSinkHandle::detached()).with_last_spoke(1);
        assert!(p.is_speaking(u64::MAX, Duration::MAX));
        assert!(p.is_speaking(u64::MAX, Duration::from_millis(u64::MAX)));
    }

    #[test]
    fn equal_participants_hash_equally() {
        fn hash_of(p: &CallParticipant) -> u64 {
            let mut hasher = DefaultHasher::new();
            p.hash(&mut hasher);
            hasher.finish()
        }

        let sink = VideoSinkHandle::new(&test_sink());
        let a = remote(&sink).with_identity_key(key(4)).with_last_spoke(50);
        let b = remote(&sink).with_identity_key(key(4)).with_last_spoke(50);
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(a.recipient(), b.recipient()));
        assert_eq!(hash_of(&a), hash_of(&b));

        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(b);
        set.insert(a.with_video_enabled(false));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
    }

    #[test]
    fn camera_state_only_applies_to_local() {
        let local = CallParticipant::create_local(
            me(),
            CameraState::new(false, 2, CameraDirection::Front),
            VideoSinkHandle::detached(),
            true,
        );
        assert!(!local.is_video_enabled());
        let on = local.with_camera_state(CameraState::new(true, 2, CameraDirection::Back));
        assert!(on.is_video_enabled());
        assert_eq!(on.camera_direction(), CameraDirection::Back);

        let r = remote(&VideoSinkHandle::detached());
        assert_eq!(
            r.with_camera_state(CameraState::new(true, 2, CameraDirection::Back)),
            r
        );
    }

    #[test]
    fn debug_redacts_identity_key() {
        let p = remote(&VideoSinkHandle::detached()).with_identity_key(key(0xaa));
        let out = format!("{p:?}");
        assert!(out.contains("identity_key: \"present\""));
        assert!(!out.contains("aaaa"));
        assert!(out.contains("not initialized"));
    }
}
