//! Role capability consumed by the registry
//!
//! The registry only asks [`RoleStore::has_role`]. [`InMemoryRoleStore`] adds
//! the management surface: ADMIN administers both roles, so only admins may
//! grant or revoke, and any holder may renounce their own role.

use crate::errors::{RegistryError, Result};
use membership_types::UserId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Author,
}

impl Role {
    /// Role whose holders may grant and revoke `self`.
    pub fn admin_role(self) -> Role {
        match self {
            Role::Admin | Role::Author => Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Author => f.write_str("author"),
        }
    }
}

/// Answers role membership questions for the registry.
pub trait RoleStore: Send + Sync {
    fn has_role(&self, role: Role, principal: &UserId) -> bool;
}

/// Role table held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    members: RwLock<HashMap<Role, BTreeSet<UserId>>>,
}

impl InMemoryRoleStore {
    /// Create a store whose only member is `admin`, holding ADMIN.
    pub fn new(admin: UserId) -> Self {
        let store = Self::default();
        store.members.write().entry(Role::Admin).or_default().insert(admin);
        info!(%admin, "role store bootstrapped");
        store
    }

    /// Grant `role` to `account`. Returns whether the account was newly added.
    pub fn grant_role(&self, caller: &UserId, role: Role, account: UserId) -> Result<bool> {
        self.check_role_admin(caller, role)?;
        let added = self.members.write().entry(role).or_default().insert(account);
        if added {
            info!(%caller, %role, %account, "role granted");
        }
        Ok(added)
    }

    /// Revoke `role` from `account`. Returns whether the account held it.
    pub fn revoke_role(&self, caller: &UserId, role: Role, account: &UserId) -> Result<bool> {
        self.check_role_admin(caller, role)?;
        let removed = self.remove_member(role, account);
        if removed {
            info!(%caller, %role, %account, "role revoked");
        }
        Ok(removed)
    }

    /// Drop `role` from the caller. Needs no admin rights.
    pub fn renounce_role(&self, caller: &UserId, role: Role) -> bool {
        let removed = self.remove_member(role, caller);
        if removed {
            info!(%caller, %role, "role renounced");
        }
        removed
    }

    /// Holders of `role`, in identity order.
    pub fn members(&self, role: Role) -> Vec<UserId> {
        self.members
            .read()
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    fn check_role_admin(&self, caller: &UserId, role: Role) -> Result<()> {
        if self.has_role(role.admin_role(), caller) {
            Ok(())
        } else {
            Err(RegistryError::NoAdmin { caller: *caller })
        }
    }

    fn remove_member(&self, role: Role, account: &UserId) -> bool {
        self.members
            .write()
            .get_mut(&role)
            .map(|set| set.remove(account))
            .unwrap_or(false)
    }
}

impl RoleStore for InMemoryRoleStore {
    fn has_role(&self, role: Role, principal: &UserId) -> bool {
        self.members
            .read()
            .get(&role)
            .is_some_and(|set| set.contains(principal))
    }
}
