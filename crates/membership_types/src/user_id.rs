use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a user identity string.
#[derive(Debug, thiserror::Error)]
pub enum UserIdError {
    #[error("user id must start with '0x'")]
    InvalidPrefix,
    #[error("user id must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("user id payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes in a user identity.
pub const USER_ID_BYTES: usize = 20;
/// Expected string length of an encoded identity (`0x` + 40 hex chars).
pub const USER_ID_STRING_LENGTH: usize = 2 + USER_ID_BYTES * 2;

/// Address-like principal identity.
///
/// The all-zero value marks an empty slot and is never assigned to a real
/// member; see [`UserId::ZERO`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(pub [u8; USER_ID_BYTES]);

impl UserId {
    /// The empty-slot identity.
    pub const ZERO: UserId = UserId([0u8; USER_ID_BYTES]);

    pub const fn new(bytes: [u8; USER_ID_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; USER_ID_BYTES] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

/// Encode an identity as `0x` followed by lowercase hex.
pub fn encode_user_id(bytes: &[u8; USER_ID_BYTES]) -> String {
    let mut encoded = String::with_capacity(USER_ID_STRING_LENGTH);
    encoded.push_str("0x");
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Decode a `0x`-prefixed identity string into raw bytes.
pub fn decode_user_id(value: &str) -> Result<[u8; USER_ID_BYTES], UserIdError> {
    let Some(payload) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    else {
        return Err(UserIdError::InvalidPrefix);
    };

    if value.len() != USER_ID_STRING_LENGTH {
        return Err(UserIdError::InvalidLength {
            expected: USER_ID_STRING_LENGTH,
            actual: value.len(),
        });
    }

    let mut bytes = [0u8; USER_ID_BYTES];
    hex::decode_to_slice(payload, &mut bytes)?;
    Ok(bytes)
}

impl From<[u8; USER_ID_BYTES]> for UserId {
    fn from(value: [u8; USER_ID_BYTES]) -> Self {
        UserId(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        encode_user_id(&value.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_user_id(s).map(UserId)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_user_id(&self.0))
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({self})")
    }
}
