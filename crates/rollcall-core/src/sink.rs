use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use uuid::Uuid;

/// Rendering target for a participant's decoded video.
///
/// Implemented by the platform renderer, which owns the allocation and
/// teardown of the underlying surface. Implementations must be Send + Sync
/// (frames are written from the media pipeline's threads).
pub trait VideoSink: Send + Sync {
    /// Whether the renderer has a live surface/GL context behind it.
    fn is_initialized(&self) -> bool {
        true
    }
}

/// Non-owning association between a participant and its [`VideoSink`].
///
/// Holds only a weak reference, so dropping a participant (or the whole
/// roster) never keeps a renderer alive. Equality and hashing use the
/// handle's id, assigned when the renderer registers the sink.
#[derive(Clone)]
pub struct VideoSinkHandle {
    id: Uuid,
    target: Option<Weak<dyn VideoSink>>,
}

impl VideoSinkHandle {
    pub fn new(sink: &Arc<dyn VideoSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: Some(Arc::downgrade(sink)),
        }
    }

    /// A handle that points at nothing. Used by placeholder participants.
    pub fn detached() -> Self {
        Self {
            id: Uuid::nil(),
            target: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Upgrade to the live renderer, if it still exists.
    pub fn sink(&self) -> Option<Arc<dyn VideoSink>> {
        self.target.as_ref()?.upgrade()
    }

    pub fn is_initialized(&self) -> bool {
        self.sink().is_some_and(|sink| sink.is_initialized())
    }
}

impl PartialEq for VideoSinkHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VideoSinkHandle {}

impl Hash for VideoSinkHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for VideoSinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_initialized() {
            "initialized"
        } else {
            "not initialized"
        };
        write!(f, "VideoSinkHandle({status})")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    pub(crate) struct TestSink {
        pub(crate) ready: AtomicBool,
    }

    impl VideoSink for TestSink {
        fn is_initialized(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }
    }

    pub(crate) fn test_sink() -> Arc<dyn VideoSink> {
        Arc::new(TestSink {
            ready: AtomicBool::new(true),
        })
    }

    #[test]
    fn handle_does_not_keep_sink_alive() {
        let sink = test_sink();
        let handle = VideoSinkHandle::new(&sink);
        assert!(handle.is_initialized());
        drop(sink);
        assert!(handle.sink().is_none());
        assert!(!handle.is_initialized());
    }

    #[test]
    fn clones_compare_equal_distinct_handles_do_not() {
        let sink = test_sink();
        let a = VideoSinkHandle::new(&sink);
        let b = VideoSinkHandle::new(&sink);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn detached_handle_reports_not_initialized() {
        let handle = VideoSinkHandle::detached();
        assert!(handle.sink().is_none());
        assert_eq!(format!("{handle:?}"), "VideoSinkHandle(not initialized)");
        assert_eq!(handle, VideoSinkHandle::detached());
    }
}
