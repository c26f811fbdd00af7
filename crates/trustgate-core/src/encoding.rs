// crates/trustgate-core/src/encoding.rs
//
// Serde helpers for fixed-size byte arrays. Every hash and key that crosses
// a wire or storage boundary is encoded as lowercase hex.

use crate::error::TrustgateError;

/// Decode a hex string (with or without a `0x` prefix) into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], TrustgateError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)
        .map_err(|e| TrustgateError::InvalidRequest(format!("Invalid hex: {}", e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        TrustgateError::InvalidRequest(format!("Expected {} bytes, got {}", N, b.len()))
    })
}

/// `#[serde(with = "hex32")]` for `[u8; 32]` fields.
pub mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed::<32>(&s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "hex64")]` for ed25519 signature bytes.
pub mod hex64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(d)?;
        super::decode_fixed::<64>(&s).map_err(serde::de::Error::custom)
    }
}
