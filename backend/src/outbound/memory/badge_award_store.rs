//! In-process badge award store.
//!
//! `insert_once` is the at-most-once guard for badges: the contains-check
//! and the insert share one mutex acquisition, so concurrent evaluator
//! invocations for the same (user, badge) produce exactly one award.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::badge::BadgeAward;
use crate::domain::ids::{BadgeId, UserId};
use crate::domain::ports::{BadgeAwardStore, BadgeAwardStoreError};

type Key = (UserId, BadgeId);

/// Mutex-serialised badge award store.
#[derive(Debug, Default)]
pub struct InMemoryBadgeAwardStore {
    awards: Mutex<HashMap<Key, BadgeAward>>,
}

impl InMemoryBadgeAwardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Key, BadgeAward>>, BadgeAwardStoreError> {
        self.awards
            .lock()
            .map_err(|_| BadgeAwardStoreError::query("badge award store lock poisoned"))
    }
}

#[async_trait]
impl BadgeAwardStore for InMemoryBadgeAwardStore {
    async fn insert_once(&self, award: &BadgeAward) -> Result<bool, BadgeAwardStoreError> {
        let mut awards = self.lock()?;
        let key = (award.user_id, award.badge_id.clone());
        if awards.contains_key(&key) {
            return Ok(false);
        }
        awards.insert(key, award.clone());
        Ok(true)
    }

    async fn awards_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BadgeAward>, BadgeAwardStoreError> {
        let awards = self.lock()?;
        let mut held: Vec<_> = awards
            .values()
            .filter(|award| award.user_id == user_id)
            .cloned()
            .collect();
        held.sort_by(|a, b| a.awarded_at.cmp(&b.awarded_at).then(a.badge_id.cmp(&b.badge_id)));
        Ok(held)
    }
}
