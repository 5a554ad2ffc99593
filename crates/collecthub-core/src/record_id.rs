//! Twelve-byte document identifiers.
//!
//! Layout: 4-byte big-endian unix seconds, 5 bytes of per-process randomness,
//! 3-byte counter. The canonical text form is 24 lowercase hex characters.

use crate::{CollectHubError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

const ID_LEN: usize = 12;
const COUNTER_MASK: u32 = 0x00ff_ffff;

static PROCESS_UNIQUE: Lazy<[u8; 5]> = Lazy::new(|| rand::random());
static COUNTER: Lazy<AtomicU32> =
    Lazy::new(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK));

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; ID_LEN]);

/// Users are addressed with the same identifier scheme as every other record.
pub type UserId = RecordId;

impl RecordId {
    pub fn new() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&*PROCESS_UNIQUE);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Parse the 24-character hex form. Either case is accepted.
    pub fn parse_str(input: &str) -> Result<Self> {
        if input.len() != ID_LEN * 2 {
            return Err(CollectHubError::InvalidId(format!(
                "expected {} hex characters, got {}",
                ID_LEN * 2,
                input.len()
            )));
        }

        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(input, &mut bytes).map_err(|e| {
            CollectHubError::InvalidId(format!("'{}' is not a hex string: {}", input, e))
        })?;
        Ok(Self(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RecordId {
    type Err = CollectHubError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.to_hex())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse_str(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let id = RecordId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 24);
        assert_eq!(RecordId::parse_str(&hex).unwrap(), id);
    }

    #[test]
    fn test_parse_accepts_uppercase() {
        let id = RecordId::parse_str("507F1F77BCF86CD799439011").unwrap();
        assert_eq!(id.to_hex(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RecordId::parse_str("not-a-valid-id").is_err());
        assert!(RecordId::parse_str("").is_err());
        assert!(RecordId::parse_str("507f1f77bcf86cd79943901z").is_err());
        assert!(RecordId::parse_str("507f1f77bcf86cd7994390111").is_err());
        assert!(matches!(
            RecordId::parse_str("zz7f1f77bcf86cd799439011"),
            Err(CollectHubError::InvalidId(_))
        ));
    }

    #[test]
    fn test_ids_are_unique_and_time_prefixed() {
        let a = RecordId::new();
        let b = RecordId::new();
        assert_ne!(a, b);
        let now = chrono::Utc::now().timestamp() as u32;
        assert!(now.saturating_sub(a.timestamp()) < 5);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let id = RecordId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"507f1f77bcf86cd799439011\"");
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"xyz\"").is_err());
    }
}
