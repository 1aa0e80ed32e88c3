//! Hex serde helpers for byte fields in engine-written JSON.
//!
//! Every byte field is written as a `0x`-prefixed lowercase hex string.
//! Readers accept the prefix or its absence, since engines differ.

use serde::{Deserialize, Deserializer, Serializer};

/// Encode bytes as `0x`-prefixed lowercase hex.
#[must_use]
pub fn encode_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with an optional `0x` prefix.
///
/// # Errors
///
/// Returns [`hex::FromHexError`] on odd length or a non-hex character.
pub fn decode_prefixed(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
}

/// `#[serde(with = "hexser::bytes")]` for `Vec<u8>`.
pub mod bytes {
    use super::{decode_prefixed, encode_prefixed, Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_prefixed(value))
    }

    /// # Errors
    ///
    /// Fails on a non-string value or invalid hex.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_prefixed(&s).map_err(serde::de::Error::custom)
    }
}

/// `#[serde(with = "hexser::opt_bytes")]` for `Option<Vec<u8>>`.
///
/// Pair with `default` and `skip_serializing_if = "Option::is_none"` so an
/// absent field stays distinguishable from an empty one.
pub mod opt_bytes {
    use super::{decode_prefixed, encode_prefixed, Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(
        value: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(bytes) => serializer.serialize_str(&encode_prefixed(bytes)),
            None => serializer.serialize_none(),
        }
    }

    /// # Errors
    ///
    /// Fails on a value that is neither null nor a hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => decode_prefixed(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// `#[serde(with = "hexser::fixed32")]` for `[u8; 32]`.
pub mod fixed32 {
    use super::{decode_prefixed, encode_prefixed, Deserialize, Deserializer, Serializer};

    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_prefixed(value))
    }

    /// # Errors
    ///
    /// Fails on invalid hex or a decoded length other than 32.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let raw = decode_prefixed(&s).map_err(serde::de::Error::custom)?;
        <[u8; 32]>::try_from(raw.as_slice()).map_err(|_| {
            serde::de::Error::custom(format!("expected 32 bytes, got {}", raw.len()))
        })
    }
}
