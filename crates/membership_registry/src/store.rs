//! Primary membership table and user index
//!
//! `by_id` holds records, `id_by_user` maps each member to its id. Missing
//! entries read as the zero record and id 0. The store does no role checks;
//! callers gate access before reaching it.

use crate::errors::{RegistryError, Result};
use membership_types::{FixedText, Membership, MembershipId, UserId};
use std::collections::{BTreeMap, HashMap};

/// Index state left behind by [`MembershipStore::overwrite`].
///
/// Overwriting never repoints `id_by_user`. When the stored user changes the
/// previous user stays indexed to `id` and the new user is not indexed to it.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDesync {
    pub id: MembershipId,
    pub previous_user: UserId,
    pub current_user: UserId,
    /// What the index holds for `current_user` after the overwrite.
    pub current_user_indexed_to: MembershipId,
}

impl IndexDesync {
    /// True when the index no longer agrees with the record at `id`.
    pub fn is_desynced(&self) -> bool {
        self.current_user_indexed_to != self.id
    }
}

#[derive(Debug)]
pub struct MembershipStore {
    by_id: BTreeMap<MembershipId, Membership>,
    id_by_user: HashMap<UserId, MembershipId>,
    next_id: MembershipId,
}

impl MembershipStore {
    pub fn new() -> Self {
        Self {
            by_id: BTreeMap::new(),
            id_by_user: HashMap::new(),
            next_id: MembershipId::FIRST,
        }
    }

    /// Add a membership for `user`, allocating the next id.
    pub fn insert(&mut self, user: UserId, username: FixedText, now: u64) -> Result<MembershipId> {
        if user.is_zero() {
            return Err(RegistryError::InvalidUser);
        }
        let existing = self.lookup_id_by_user(&user);
        if !existing.is_none() {
            return Err(RegistryError::DuplicatedMember { user, existing });
        }

        let id = self.next_id;
        let next_id = id.next().ok_or(RegistryError::IdsExhausted)?;
        let membership = Membership::new(user, username, now)?;

        self.next_id = next_id;
        self.by_id.insert(id, membership);
        self.id_by_user.insert(user, id);
        Ok(id)
    }

    /// Replace every field of the record at `id`. The user index is left
    /// untouched; inspect the returned [`IndexDesync`].
    pub fn overwrite(
        &mut self,
        id: MembershipId,
        user: UserId,
        username: FixedText,
        creation_timestamp: u64,
    ) -> Result<IndexDesync> {
        let Some(slot) = self.by_id.get_mut(&id) else {
            return Err(RegistryError::Unavailable { id });
        };
        if user.is_zero() {
            return Err(RegistryError::InvalidUser);
        }
        let replacement = Membership::new(user, username, creation_timestamp)?;

        let previous_user = slot.user;
        *slot = replacement;

        Ok(IndexDesync {
            id,
            previous_user,
            current_user: user,
            current_user_indexed_to: self.lookup_id_by_user(&user),
        })
    }

    /// Stored record, or the zero record when the slot is empty.
    pub fn fetch(&self, id: MembershipId) -> Membership {
        self.by_id.get(&id).copied().unwrap_or_default()
    }

    /// Delete the record at `id` together with the index entry of the user
    /// currently stored there.
    pub fn remove(&mut self, id: MembershipId) -> Result<Membership> {
        let user = self.fetch(id).user;
        if self.lookup_id_by_user(&user).is_none() {
            return Err(RegistryError::NoMembership { id });
        }
        self.id_by_user.remove(&user);
        Ok(self.by_id.remove(&id).unwrap_or_default())
    }

    pub fn lookup_id_by_user(&self, user: &UserId) -> MembershipId {
        self.id_by_user.get(user).copied().unwrap_or(MembershipId::NONE)
    }

    /// Replace only the username, on behalf of the record's own user while
    /// the membership is still valid at `now`.
    pub fn rename_owned(
        &mut self,
        id: MembershipId,
        username: FixedText,
        caller: &UserId,
        now: u64,
    ) -> Result<()> {
        let current = self.fetch(id);
        if current.user != *caller {
            return Err(RegistryError::MemberMismatched { id, caller: *caller });
        }
        if current.is_expired_at(now) {
            return Err(RegistryError::MembershipExpired {
                id,
                expired_at: current.expiration_timestamp(),
            });
        }

        if let Some(slot) = self.by_id.get_mut(&id) {
            slot.username = username;
        }
        Ok(())
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = (MembershipId, &Membership)> {
        self.by_id.iter().map(|(id, m)| (*id, m))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Id the next successful insert will receive.
    pub fn next_id(&self) -> MembershipId {
        self.next_id
    }

    #[cfg(test)]
    fn starting_at(next_id: MembershipId) -> Self {
        Self {
            next_id,
            ..Self::new()
        }
    }
}

impl Default for MembershipStore {
    fn default() -> Self {
        Self::new()
    }
}
