use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to a person known to the messaging layer.
///
/// The reserved [`RecipientId::UNKNOWN`] value is a distinct variant, so no
/// id built from a real numeric id can ever compare equal to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
enum Repr {
    Known(u64),
    Unknown,
}

impl RecipientId {
    pub const UNKNOWN: RecipientId = RecipientId(Repr::Unknown);

    pub const fn new(raw: u64) -> Self {
        Self(Repr::Known(raw))
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Repr::Unknown
    }

    pub fn raw(&self) -> Option<u64> {
        match self.0 {
            Repr::Known(raw) => Some(raw),
            Repr::Unknown => None,
        }
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Repr::Known(raw) => write!(f, "{raw}"),
            Repr::Unknown => f.write_str("unknown"),
        }
    }
}

/// The resolved identity behind a call participant.
///
/// Resolution (contact lookup, profile fetch) happens before a participant
/// is built; this is the already-resolved result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: Option<String>,
    pub is_self: bool,
}

impl Recipient {
    pub const UNKNOWN: Recipient = Recipient {
        id: RecipientId::UNKNOWN,
        name: None,
        is_self: false,
    };

    pub fn remote(id: RecipientId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            is_self: false,
        }
    }

    pub fn local(id: RecipientId, name: Option<String>) -> Self {
        Self {
            id,
            name,
            is_self: true,
        }
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "Unknown",
        }
    }
}
