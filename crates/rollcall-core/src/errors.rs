use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RollcallError {
    #[error("invalid camera count: {0}")]
    InvalidCameraCount(i64),
    #[error("invalid identity key: {0}")]
    InvalidIdentityKey(String),
    #[error("call session closed")]
    SessionClosed,
}
