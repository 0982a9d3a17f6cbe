//! Membership Registry
//!
//! Access-controlled store of membership records. Authors create, update and
//! remove memberships in ordered batches; members may rename themselves until
//! their membership expires. Role checks go through an injected [`RoleStore`]
//! and time through an injected [`Clock`].

pub mod clock;
pub mod errors;
pub mod registry;
pub mod roles;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::*;
pub use registry::RegistryService;
pub use roles::{InMemoryRoleStore, Role, RoleStore};
pub use store::{IndexDesync, MembershipStore};

pub use membership_types::{
    FixedText, Membership, MembershipId, MembershipView, UserId, EXPIRATION_WINDOW,
};
