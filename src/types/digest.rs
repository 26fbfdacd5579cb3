//! Digest - content fingerprint shared by files and directories

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 32-byte BLAKE3 fingerprint of a node's content
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 32]);

impl Digest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Parse a 64-character hex string
    pub fn from_hex(hex: &str) -> Option<Self> {
        blake3::Hash::from_hex(hex)
            .ok()
            .map(|hash| Self(*hash.as_bytes()))
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps tree dumps readable
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Digest::from_hex(&hex)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid digest hex: {hex}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let digest = Digest::from(blake3::hash(b"payload"));
        let hex = digest.to_hex();

        assert_eq!(hex.len(), 64);
        assert_eq!(Digest::from_hex(&hex), Some(digest));
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert_eq!(Digest::from_hex("not-hex"), None);
        assert_eq!(Digest::from_hex("abcd"), None);
    }

    #[test]
    fn test_serializes_as_hex_string() {
        let digest = Digest::from(blake3::hash(b"x"));
        let json = serde_json::to_string(&digest).expect("serialize digest");

        assert_eq!(json, format!("\"{}\"", digest.to_hex()));
        let back: Digest = serde_json::from_str(&json).expect("deserialize digest");
        assert_eq!(back, digest);
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let digest = Digest::from_bytes([0xab; 32]);
        assert_eq!(format!("{:?}", digest), "Digest(abababababab)");
    }
}
