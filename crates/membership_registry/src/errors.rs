//! Error types for the membership registry

use membership_types::{InvalidUsername, MembershipId, TimestampOverflow, UserId};
use serde::Serialize;
use thiserror::Error;

/// Broad category of a [`RegistryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller lacks the required role.
    Authorization,
    /// Malformed input shape or content.
    Validation,
    /// Uniqueness would be violated.
    Conflict,
    /// Target missing, not owned by the caller, or expired.
    State,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("caller {caller} does not hold the admin role")]
    NoAdmin { caller: UserId },

    #[error("caller {caller} does not hold the author role")]
    NoAuthor { caller: UserId },

    #[error("batch inputs differ in length: {lengths:?}")]
    DataMismatched { lengths: Vec<usize> },

    #[error("user identity must be non-zero")]
    InvalidUser,

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] InvalidUsername),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] TimestampOverflow),

    #[error("user {user} already holds membership {existing}")]
    DuplicatedMember { user: UserId, existing: MembershipId },

    #[error("membership {id} does not exist")]
    Unavailable { id: MembershipId },

    #[error("no indexed membership for id {id}")]
    NoMembership { id: MembershipId },

    #[error("caller {caller} does not own membership {id}")]
    MemberMismatched { id: MembershipId, caller: UserId },

    #[error("membership {id} expired at {expired_at}")]
    MembershipExpired { id: MembershipId, expired_at: u64 },

    #[error("membership id space exhausted")]
    IdsExhausted,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NoAdmin { .. } | RegistryError::NoAuthor { .. } => {
                ErrorKind::Authorization
            }
            RegistryError::DataMismatched { .. }
            | RegistryError::InvalidUser
            | RegistryError::InvalidUsername(_)
            | RegistryError::InvalidTimestamp(_) => ErrorKind::Validation,
            RegistryError::DuplicatedMember { .. } => ErrorKind::Conflict,
            RegistryError::Unavailable { .. }
            | RegistryError::NoMembership { .. }
            | RegistryError::MemberMismatched { .. }
            | RegistryError::MembershipExpired { .. }
            | RegistryError::IdsExhausted => ErrorKind::State,
        }
    }

    /// Short stable name, used in logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::NoAdmin { .. } => "NoAdmin",
            RegistryError::NoAuthor { .. } => "NoAuthor",
            RegistryError::DataMismatched { .. } => "DataMismatched",
            RegistryError::InvalidUser => "InvalidUser",
            RegistryError::InvalidUsername(_) => "InvalidUsername",
            RegistryError::InvalidTimestamp(_) => "InvalidTimestamp",
            RegistryError::DuplicatedMember { .. } => "DuplicatedMember",
            RegistryError::Unavailable { .. } => "Unavailable",
            RegistryError::NoMembership { .. } => "NoMembership",
            RegistryError::MemberMismatched { .. } => "MemberMismatched",
            RegistryError::MembershipExpired { .. } => "MembershipExpired",
            RegistryError::IdsExhausted => "IdsExhausted",
        }
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
