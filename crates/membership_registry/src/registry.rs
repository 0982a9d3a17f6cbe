//! Role-gated registry service
//!
//! Batch operations walk their inputs in order and commit each element as
//! soon as it succeeds. The first failing element aborts the call; elements
//! before it stay applied, and later elements of the same batch see them.

use crate::clock::{Clock, SystemClock};
use crate::errors::{RegistryError, Result};
use crate::roles::{Role, RoleStore};
use crate::store::MembershipStore;
use membership_types::{FixedText, MembershipId, MembershipView, UserId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Membership registry
///
/// All registry state lives in one [`MembershipStore`] behind a single mutex.
/// The lock is held for one batch element at a time.
pub struct RegistryService {
    store: Mutex<MembershipStore>,
    roles: Arc<dyn RoleStore>,
    clock: Arc<dyn Clock>,
}

impl RegistryService {
    /// Create a registry using the system clock.
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self::with_clock(roles, Arc::new(SystemClock))
    }

    pub fn with_clock(roles: Arc<dyn RoleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(MembershipStore::new()),
            roles,
            clock,
        }
    }

    /// Create one membership per `(user, username)` pair. All entries share
    /// the same creation timestamp. Returns the allocated ids.
    pub fn create<S: AsRef<str>>(
        &self,
        caller: &UserId,
        users: &[UserId],
        usernames: &[S],
    ) -> Result<Vec<MembershipId>> {
        self.require_author(caller)?;
        check_lengths(&[users.len(), usernames.len()])?;

        let now = self.clock.now_secs();
        let mut ids = Vec::with_capacity(users.len());
        for (user, username) in users.iter().zip(usernames) {
            let encoded = FixedText::encode(username.as_ref())?;
            let id = self.store.lock().insert(*user, encoded, now)?;
            info!(%caller, %id, %user, "membership created");
            ids.push(id);
        }
        Ok(ids)
    }

    /// Overwrite the records at `ids` field by field. Does not repoint the
    /// user index when a record's user changes.
    pub fn update<S: AsRef<str>>(
        &self,
        caller: &UserId,
        ids: &[MembershipId],
        users: &[UserId],
        usernames: &[S],
        creation_timestamps: &[u64],
    ) -> Result<()> {
        self.require_author(caller)?;
        check_lengths(&[
            ids.len(),
            users.len(),
            usernames.len(),
            creation_timestamps.len(),
        ])?;

        for (((id, user), username), creation) in ids
            .iter()
            .zip(users)
            .zip(usernames)
            .zip(creation_timestamps)
        {
            let encoded = FixedText::encode(username.as_ref())?;
            let report = self.store.lock().overwrite(*id, *user, encoded, *creation)?;
            info!(%caller, %id, %user, creation, "membership updated");
            if report.is_desynced() {
                warn!(
                    %id,
                    previous_user = %report.previous_user,
                    current_user = %report.current_user,
                    indexed_to = %report.current_user_indexed_to,
                    "user index not repointed after update"
                );
            }
        }
        Ok(())
    }

    /// Decoded record at `id`; the empty view when nothing is stored there.
    pub fn get(&self, id: MembershipId) -> MembershipView {
        self.store.lock().fetch(id).view()
    }

    /// Remove the memberships at `ids`, in order.
    pub fn remove(&self, caller: &UserId, ids: &[MembershipId]) -> Result<()> {
        self.require_author(caller)?;

        for id in ids {
            let removed = self.store.lock().remove(*id)?;
            info!(%caller, %id, user = %removed.user, "membership removed");
        }
        Ok(())
    }

    /// Rename the caller's own membership while it is still valid.
    pub fn change(&self, caller: &UserId, id: MembershipId, username: &str) -> Result<()> {
        let encoded = FixedText::encode(username)?;
        let now = self.clock.now_secs();
        self.store.lock().rename_owned(id, encoded, caller, now)?;
        info!(%caller, %id, "membership username changed");
        Ok(())
    }

    /// Id indexed for `user`, or [`MembershipId::NONE`].
    pub fn lookup_by_user(&self, user: &UserId) -> MembershipId {
        self.store.lock().lookup_id_by_user(user)
    }

    /// Whether the membership at `id` is past its window right now. Empty
    /// slots count as expired.
    pub fn is_expired(&self, id: MembershipId) -> bool {
        let now = self.clock.now_secs();
        self.store.lock().fetch(id).is_expired_at(now)
    }

    /// Every stored record in id order.
    pub fn snapshot(&self) -> Vec<(MembershipId, MembershipView)> {
        let store = self.store.lock();
        store.iter().map(|(id, m)| (id, m.view())).collect()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn now(&self) -> u64 {
        self.clock.now_secs()
    }

    fn require_author(&self, caller: &UserId) -> Result<()> {
        if self.roles.has_role(Role::Author, caller) {
            Ok(())
        } else {
            debug!(%caller, "author role missing");
            Err(RegistryError::NoAuthor { caller: *caller })
        }
    }
}

fn check_lengths(lengths: &[usize]) -> Result<()> {
    match lengths.split_first() {
        Some((first, rest)) if rest.iter().any(|len| len != first) => {
            Err(RegistryError::DataMismatched {
                lengths: lengths.to_vec(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::roles::InMemoryRoleStore;
    use membership_types::EXPIRATION_WINDOW;

    const T0: u64 = 1_700_000_000;

    fn id(byte: u8) -> UserId {
        UserId::new([byte; 20])
    }

    fn admin() -> UserId {
        id(0xA0)
    }

    fn author() -> UserId {
        id(0xA1)
    }

    fn setup() -> (RegistryService, Arc<InMemoryRoleStore>, Arc<ManualClock>) {
        let roles = Arc::new(InMemoryRoleStore::new(admin()));
        roles.grant_role(&admin(), Role::Author, author()).unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let service = RegistryService::with_clock(roles.clone(), clock.clone());
        (service, roles, clock)
    }

    #[test]
    fn create_shares_timestamp_and_indexes_users() {
        let (service, _, _) = setup();
        let ids = service
            .create(&author(), &[id(1), id(2)], &["alice", "bob"])
            .unwrap();
        assert_eq!(ids, vec![MembershipId(1), MembershipId(2)]);

        for (i, user) in [id(1), id(2)].iter().enumerate() {
            let view = service.get(ids[i]);
            assert_eq!(view.user, *user);
            assert_eq!(view.creation_timestamp, T0);
            assert_eq!(view.expiration_timestamp, T0 + EXPIRATION_WINDOW);
            assert_eq!(service.lookup_by_user(user), ids[i]);
        }
    }

    #[test]
    fn create_requires_author() {
        let (service, _, _) = setup();
        let err = service.create(&admin(), &[id(1)], &["alice"]).unwrap_err();
        assert_eq!(err, RegistryError::NoAuthor { caller: admin() });
        assert!(service.is_empty());
    }

    #[test]
    fn role_check_precedes_length_check() {
        let (service, _, _) = setup();
        let err = service.create(&id(9), &[id(1)], &[] as &[&str]).unwrap_err();
        assert!(matches!(err, RegistryError::NoAuthor { .. }));
    }

    #[test]
    fn create_length_mismatch() {
        let (service, _, _) = setup();
        let err = service
            .create(&author(), &[id(1), id(2)], &["alice"])
            .unwrap_err();
        assert_eq!(err, RegistryError::DataMismatched { lengths: vec![2, 1] });
        assert!(service.is_empty());
    }

    #[test]
    fn create_partial_commit_on_duplicate() {
        let (service, _, _) = setup();
        let err = service
            .create(&author(), &[id(1), id(2), id(1), id(3)], &["aaa", "bbb", "ccc", "ddd"])
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicatedMember { user: id(1), existing: MembershipId(1) }
        );
        assert_eq!(service.len(), 2);
        assert_eq!(service.get(MembershipId(1)).username, "aaa");
        assert_eq!(service.lookup_by_user(&id(3)), MembershipId::NONE);
    }

    #[test]
    fn create_partial_commit_on_bad_username() {
        let (service, _, _) = setup();
        let err = service
            .create(&author(), &[id(1), id(2)], &["alice", "b"])
            .unwrap_err();
        assert_eq!(err.code(), "InvalidUsername");
        assert_eq!(service.lookup_by_user(&id(1)), MembershipId(1));
        assert_eq!(service.lookup_by_user(&id(2)), MembershipId::NONE);
    }

    #[test]
    fn update_rewrites_record() {
        let (service, _, clock) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        clock.advance(10);

        service
            .update(&author(), &ids, &[id(1)], &["alicia"], &[T0 + 500])
            .unwrap();
        let view = service.get(ids[0]);
        assert_eq!(view.username, "alicia");
        assert_eq!(view.creation_timestamp, T0 + 500);
        assert_eq!(view.expiration_timestamp, T0 + 500 + EXPIRATION_WINDOW);
    }

    #[test]
    fn update_missing_and_mismatched() {
        let (service, _, _) = setup();
        let err = service
            .update(&author(), &[MembershipId(7)], &[id(1)], &["alice"], &[0])
            .unwrap_err();
        assert_eq!(err, RegistryError::Unavailable { id: MembershipId(7) });

        let err = service
            .update(&author(), &[MembershipId(1)], &[id(1)], &["alice"], &[])
            .unwrap_err();
        assert_eq!(err, RegistryError::DataMismatched { lengths: vec![1, 1, 1, 0] });
    }

    #[test]
    fn update_with_mismatched_lengths_changes_nothing() {
        let (service, _, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        let before = service.get(ids[0]);

        let err = service
            .update(
                &author(),
                &[ids[0], MembershipId(2), MembershipId(3), MembershipId(4)],
                &[id(9), id(2), id(3), id(4)],
                &["mallory", "b_b", "c_c", "d_d"],
                &[1, 2, 3],
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::DataMismatched { lengths: vec![4, 4, 4, 3] });
        assert_eq!(service.get(ids[0]), before);
        assert_eq!(service.lookup_by_user(&id(1)), ids[0]);
        assert_eq!(service.lookup_by_user(&id(9)), MembershipId::NONE);
    }

    #[test]
    fn update_rejects_creation_past_window_limit() {
        let (service, _, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        let before = service.get(ids[0]);

        let err = service
            .update(&author(), &ids, &[id(1)], &["alice"], &[u64::MAX - 10])
            .unwrap_err();
        assert_eq!(err.code(), "InvalidTimestamp");
        assert_eq!(service.get(ids[0]), before);
        assert_eq!(before.expiration_timestamp - before.creation_timestamp, EXPIRATION_WINDOW);
    }

    #[test]
    fn update_partial_commit() {
        let (service, _, _) = setup();
        service.create(&author(), &[id(1)], &["alice"]).unwrap();
        let err = service
            .update(
                &author(),
                &[MembershipId(1), MembershipId(2)],
                &[id(1), id(2)],
                &["first", "second"],
                &[1, 2],
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::Unavailable { id: MembershipId(2) });
        assert_eq!(service.get(MembershipId(1)).username, "first");
        assert_eq!(service.get(MembershipId(1)).creation_timestamp, 1);
    }

    #[test]
    fn update_to_new_user_keeps_old_index() {
        let (service, _, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        service
            .update(&author(), &ids, &[id(2)], &["bob"], &[T0])
            .unwrap();

        assert_eq!(service.get(ids[0]).user, id(2));
        assert_eq!(service.lookup_by_user(&id(1)), ids[0]);
        assert_eq!(service.lookup_by_user(&id(2)), MembershipId::NONE);
        // The stale index still blocks a fresh membership for the old user
        let err = service.create(&author(), &[id(1)], &["alice"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatedMember { .. }));
    }

    #[test]
    fn remove_twice_fails_second_time() {
        let (service, _, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        service.remove(&author(), &ids).unwrap();
        assert_eq!(service.get(ids[0]), MembershipView::default());
        assert_eq!(
            service.remove(&author(), &ids).unwrap_err(),
            RegistryError::NoMembership { id: ids[0] }
        );
    }

    #[test]
    fn remove_requires_author() {
        let (service, roles, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        roles.revoke_role(&admin(), Role::Author, &author()).unwrap();
        assert!(matches!(
            service.remove(&author(), &ids).unwrap_err(),
            RegistryError::NoAuthor { .. }
        ));
        assert_eq!(service.len(), 1);
    }

    #[test]
    fn remove_partial_commit() {
        let (service, _, _) = setup();
        service.create(&author(), &[id(1), id(2)], &["aaa", "bbb"]).unwrap();
        let err = service
            .remove(&author(), &[MembershipId(1), MembershipId(9), MembershipId(2)])
            .unwrap_err();
        assert_eq!(err, RegistryError::NoMembership { id: MembershipId(9) });
        assert!(service.get(MembershipId(1)).is_empty());
        assert_eq!(service.get(MembershipId(2)).username, "bbb");
    }

    #[test]
    fn change_until_expiry() {
        let (service, _, clock) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();

        service.change(&id(1), ids[0], "alicia").unwrap();
        assert_eq!(service.get(ids[0]).username, "alicia");
        assert!(!service.is_expired(ids[0]));

        clock.set(T0 + EXPIRATION_WINDOW);
        assert!(service.is_expired(ids[0]));
        assert_eq!(
            service.change(&id(1), ids[0], "too late").unwrap_err(),
            RegistryError::MembershipExpired {
                id: ids[0],
                expired_at: T0 + EXPIRATION_WINDOW
            }
        );
        // Expired records stay readable and indexed
        assert_eq!(service.get(ids[0]).username, "alicia");
        assert_eq!(service.lookup_by_user(&id(1)), ids[0]);
    }

    #[test]
    fn change_by_other_user_rejected() {
        let (service, _, _) = setup();
        let ids = service.create(&author(), &[id(1)], &["alice"]).unwrap();
        let err = service.change(&author(), ids[0], "hijack").unwrap_err();
        assert_eq!(err, RegistryError::MemberMismatched { id: ids[0], caller: author() });
    }

    #[test]
    fn change_validates_username_first() {
        let (service, _, _) = setup();
        let err = service.change(&id(1), MembershipId(99), "x").unwrap_err();
        assert_eq!(err.code(), "InvalidUsername");
    }

    #[test]
    fn snapshot_lists_live_records() {
        let (service, _, _) = setup();
        service
            .create(&author(), &[id(1), id(2), id(3)], &["aaa", "bbb", "ccc"])
            .unwrap();
        service.remove(&author(), &[MembershipId(2)]).unwrap();
        let snapshot = service.snapshot();
        let ids: Vec<_> = snapshot.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![MembershipId(1), MembershipId(3)]);
        assert_eq!(snapshot[1].1.username, "ccc");
    }
}
