//! Fixed-width username encoding
//!
//! Usernames are stored in a 32-byte zero-padded buffer. The encoding is
//! lossy: decoding stops at the first zero byte, so an input containing a
//! NUL character comes back truncated at that point.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Capacity of the encoded form in bytes.
pub const FIXED_TEXT_CAPACITY: usize = 32;
/// Shortest accepted username, in bytes.
pub const MIN_USERNAME_BYTES: usize = 3;
/// Longest accepted username, in bytes.
pub const MAX_USERNAME_BYTES: usize = FIXED_TEXT_CAPACITY;

/// Username rejected by [`FixedText::encode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("username must be {min}..={max} bytes, got {length}")]
pub struct InvalidUsername {
    pub length: usize,
    pub min: usize,
    pub max: usize,
}

/// Zero-padded 32-byte text buffer.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FixedText([u8; FIXED_TEXT_CAPACITY]);

impl FixedText {
    /// The never-set value; decodes to `""`.
    pub const EMPTY: FixedText = FixedText([0u8; FIXED_TEXT_CAPACITY]);

    /// Pack a username, rejecting inputs outside 3..=32 bytes.
    pub fn encode(input: &str) -> Result<Self, InvalidUsername> {
        let bytes = input.as_bytes();
        if !(MIN_USERNAME_BYTES..=MAX_USERNAME_BYTES).contains(&bytes.len()) {
            return Err(InvalidUsername {
                length: bytes.len(),
                min: MIN_USERNAME_BYTES,
                max: MAX_USERNAME_BYTES,
            });
        }
        Ok(Self::from_bytes_truncating(bytes))
    }

    /// Pack raw bytes without validation, keeping at most 32 of them.
    pub fn from_bytes_truncating(bytes: &[u8]) -> Self {
        let mut buf = [0u8; FIXED_TEXT_CAPACITY];
        let len = bytes.len().min(FIXED_TEXT_CAPACITY);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self(buf)
    }

    pub fn from_raw(bytes: [u8; FIXED_TEXT_CAPACITY]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FIXED_TEXT_CAPACITY] {
        &self.0
    }

    /// Bytes up to (not including) the first zero byte.
    pub fn prefix(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(FIXED_TEXT_CAPACITY);
        &self.0[..end]
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Decode the prefix. Invalid UTF-8 (only reachable through
    /// [`FixedText::from_raw`] or a truncated multi-byte char) is replaced.
    pub fn decode(&self) -> String {
        String::from_utf8_lossy(self.prefix()).into_owned()
    }
}

impl fmt::Display for FixedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}

impl fmt::Debug for FixedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedText({:?})", self.decode())
    }
}

impl Serialize for FixedText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.decode())
    }
}

impl<'de> Deserialize<'de> for FixedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(FixedText::EMPTY);
        }
        FixedText::encode(&s).map_err(serde::de::Error::custom)
    }
}
