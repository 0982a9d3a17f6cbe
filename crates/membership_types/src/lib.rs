//! Membership Registry Types
//!
//! Shared data model for the membership registry:
//! - `UserId` 20-byte principal identities (`0x…` on the wire)
//! - `FixedText` 32-byte zero-padded usernames
//! - `Membership` records and their derived expiration window

pub mod membership;
pub mod text;
pub mod user_id;

pub use membership::*;
pub use text::*;
pub use user_id::*;

/// Types crate version (for API introspection)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
