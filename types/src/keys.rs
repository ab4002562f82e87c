//! Voter and candidate public keys.
//!
//! Keys are 32-byte x-only public keys as used by the relay protocol, always
//! rendered as 64 lowercase hex characters on the wire and in the directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// A 32-byte public key identifying a voter, candidate or administrator.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a key from its 64-character hex form.
    pub fn from_hex(s: &str) -> Result<Self, TypesError> {
        decode_hex32(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for PublicKey {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

/// Decode exactly 32 bytes from a hex string.
pub(crate) fn decode_hex32(s: &str) -> Result<[u8; 32], TypesError> {
    if s.len() != 64 {
        return Err(TypesError::InvalidLength(s.len()));
    }
    let mut out = [0u8; 32];
    hex::decode_to_slice(s, &mut out).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip_is_lowercase() {
        let key = PublicKey::new([0xAB; 32]);
        let hex = key.to_hex();
        assert_eq!(hex, "ab".repeat(32));
        assert_eq!(PublicKey::from_hex(&hex).unwrap(), key);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let key = PublicKey::from_hex(&"CD".repeat(32)).unwrap();
        assert_eq!(key, PublicKey::new([0xCD; 32]));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(
            PublicKey::from_hex("abcd"),
            Err(TypesError::InvalidLength(4))
        );
    }

    #[test]
    fn non_hex_is_rejected() {
        let err = PublicKey::from_hex(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, TypesError::InvalidHex(_)));
    }

    #[test]
    fn serializes_as_hex_string() {
        let key = PublicKey::new([1; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
