//! Rollcall core: participant state for live audio/video calls.
//!
//! Pure Rust crate with no platform dependencies. Models who is in a call,
//! what media they send and whether their identity and media keys have been
//! established. Consumed by native UI shells via the rollcall-ffi bindings.

pub mod camera;
pub mod errors;
pub mod events;
pub mod identity;
pub mod participant;
pub mod participant_id;
pub mod recipient;
pub mod roster;
pub mod session;
pub mod settings;
pub mod sink;

pub use camera::{CameraDirection, CameraState};
pub use errors::RollcallError;
pub use events::{EventEmitter, RosterEvent, RosterListener, SignalingEvent};
pub use identity::IdentityKey;
pub use participant::CallParticipant;
pub use participant_id::CallParticipantId;
pub use recipient::{Recipient, RecipientId};
pub use roster::Roster;
pub use session::{CallSession, now_millis};
pub use settings::{Settings, SettingsStore};
pub use sink::{VideoSink, VideoSinkHandle};
