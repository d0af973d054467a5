use std::fmt;

use crate::errors::RollcallError;

/// Type byte prefixed to serialized Curve25519 public keys.
const DJB_TYPE: u8 = 0x05;
const KEY_LEN: usize = 32;
const ENCODED_LEN: usize = KEY_LEN + 1;

/// A verified identity public key, as produced by the identity/key-exchange
/// layer once safety-number verification has completed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    public_key: [u8; KEY_LEN],
}

impl IdentityKey {
    pub fn new(public_key: [u8; KEY_LEN]) -> Self {
        Self { public_key }
    }

    /// Decode the serialized form: one type byte followed by 32 key bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, RollcallError> {
        if bytes.len() != ENCODED_LEN {
            return Err(RollcallError::InvalidIdentityKey(format!(
                "expected {ENCODED_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        if bytes[0] != DJB_TYPE {
            return Err(RollcallError::InvalidIdentityKey(format!(
                "unsupported key type 0x{:02x}",
                bytes[0]
            )));
        }
        let mut public_key = [0u8; KEY_LEN];
        public_key.copy_from_slice(&bytes[1..]);
        Ok(Self { public_key })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENCODED_LEN);
        out.push(DJB_TYPE);
        out.extend_from_slice(&self.public_key);
        out
    }

    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public_key
    }

    /// Short hex prefix, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        self.public_key[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({}..)", self.fingerprint())
    }
}
