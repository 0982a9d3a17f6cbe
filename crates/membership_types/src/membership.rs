//! Membership records

use crate::text::FixedText;
use crate::user_id::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validity window of a membership, in seconds (30 days).
pub const EXPIRATION_WINDOW: u64 = 2_592_000;

/// Creation time too close to `u64::MAX` to carry a full expiration window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("creation timestamp {creation_timestamp} leaves no room for a {window}s expiration window")]
pub struct TimestampOverflow {
    pub creation_timestamp: u64,
    pub window: u64,
}

/// Derived expiration for a given creation time.
pub fn expiration_for(creation_timestamp: u64) -> Result<u64, TimestampOverflow> {
    creation_timestamp
        .checked_add(EXPIRATION_WINDOW)
        .ok_or(TimestampOverflow {
            creation_timestamp,
            window: EXPIRATION_WINDOW,
        })
}

/// Opaque membership identifier. Assigned ids start at 1; 0 means "none".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MembershipId(pub u64);

impl MembershipId {
    /// Sentinel returned for lookups that find nothing.
    pub const NONE: MembershipId = MembershipId(0);
    /// First id handed out by a fresh store.
    pub const FIRST: MembershipId = MembershipId(1);

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Following id, or `None` once `u64::MAX` is reached.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(MembershipId)
    }
}

impl From<u64> for MembershipId {
    fn from(value: u64) -> Self {
        MembershipId(value)
    }
}

impl fmt::Display for MembershipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored membership record.
///
/// The all-zero value (`Membership::default()`) stands for an empty slot.
/// `expiration_timestamp` is only ever set through [`Membership::new`] or
/// [`Membership::set_creation`], which keep it at creation + window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub user: UserId,
    pub username: FixedText,
    creation_timestamp: u64,
    expiration_timestamp: u64,
}

impl Membership {
    pub fn new(
        user: UserId,
        username: FixedText,
        creation_timestamp: u64,
    ) -> Result<Self, TimestampOverflow> {
        Ok(Self {
            user,
            username,
            creation_timestamp,
            expiration_timestamp: expiration_for(creation_timestamp)?,
        })
    }

    pub fn creation_timestamp(&self) -> u64 {
        self.creation_timestamp
    }

    pub fn expiration_timestamp(&self) -> u64 {
        self.expiration_timestamp
    }

    /// Move the creation time; leaves the record untouched on overflow.
    pub fn set_creation(&mut self, creation_timestamp: u64) -> Result<(), TimestampOverflow> {
        self.expiration_timestamp = expiration_for(creation_timestamp)?;
        self.creation_timestamp = creation_timestamp;
        Ok(())
    }

    /// True when the slot holds no member.
    pub fn is_empty(&self) -> bool {
        self.user.is_zero()
    }

    /// Expired once `now` reaches the expiration timestamp.
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiration_timestamp <= now
    }

    pub fn view(&self) -> MembershipView {
        MembershipView {
            user: self.user,
            username: self.username.decode(),
            creation_timestamp: self.creation_timestamp,
            expiration_timestamp: self.expiration_timestamp,
        }
    }
}

/// Decoded read model returned by `get`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipView {
    pub user: UserId,
    pub username: String,
    pub creation_timestamp: u64,
    pub expiration_timestamp: u64,
}

impl MembershipView {
    pub fn is_empty(&self) -> bool {
        self.user.is_zero()
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expiration_timestamp <= now
    }
}
