use std::fmt;

use serde::{Deserialize, Serialize};

use crate::recipient::RecipientId;

/// Key of a participant within one call.
///
/// The same recipient may join from several devices; the demux id told to
/// us by the calling service keeps those sessions apart. One-to-one calls
/// and the local participant carry no demux id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallParticipantId {
    pub recipient_id: RecipientId,
    pub demux_id: Option<u32>,
}

impl CallParticipantId {
    /// Reserved id of the placeholder participant.
    pub const EMPTY: CallParticipantId = CallParticipantId {
        recipient_id: RecipientId::UNKNOWN,
        demux_id: None,
    };

    pub fn new(recipient_id: RecipientId) -> Self {
        Self {
            recipient_id,
            demux_id: None,
        }
    }

    pub fn with_demux(recipient_id: RecipientId, demux_id: u32) -> Self {
        Self {
            recipient_id,
            demux_id: Some(demux_id),
        }
    }
}

impl fmt::Display for CallParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.demux_id {
            Some(demux) => write!(f, "{}#{demux}", self.recipient_id),
            None => write!(f, "{}", self.recipient_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_needs_both_fields() {
        let alice = RecipientId::new(1);
        assert_eq!(CallParticipantId::new(alice), CallParticipantId::new(alice));
        assert_ne!(
            CallParticipantId::with_demux(alice, 1),
            CallParticipantId::with_demux(alice, 2)
        );
        assert_ne!(CallParticipantId::new(alice), CallParticipantId::with_demux(alice, 1));
        assert_ne!(
            CallParticipantId::with_demux(alice, 1),
            CallParticipantId::with_demux(RecipientId::new(2), 1)
        );
    }

    #[test]
    fn same_person_two_devices_are_two_keys() {
        let alice = RecipientId::new(1);
        let mut keys = HashSet::new();
        keys.insert(CallParticipantId::with_demux(alice, 10));
        keys.insert(CallParticipantId::with_demux(alice, 11));
        keys.insert(CallParticipantId::with_demux(alice, 10));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn empty_id_is_reserved() {
        assert_ne!(CallParticipantId::EMPTY, CallParticipantId::new(RecipientId::new(0)));
        assert_eq!(CallParticipantId::EMPTY.to_string(), "unknown");
    }

    #[test]
    fn display_includes_demux() {
        let id = CallParticipantId::with_demux(RecipientId::new(5), 3);
        assert_eq!(id.to_string(), "5#3");
    }
}
