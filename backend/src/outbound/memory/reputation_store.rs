//! In-process reputation store.
//!
//! The uniqueness key is the source action id; `insert_once` checks and
//! inserts under one mutex acquisition.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ids::{ActionId, UserId};
use crate::domain::ports::{ReputationStore, ReputationStoreError};
use crate::domain::reputation::{ReputationEntry, ReputationSummary};

/// Mutex-serialised reputation store.
#[derive(Debug, Default)]
pub struct InMemoryReputationStore {
    entries: Mutex<HashMap<ActionId, ReputationEntry>>,
}

impl InMemoryReputationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<ActionId, ReputationEntry>>, ReputationStoreError>
    {
        self.entries
            .lock()
            .map_err(|_| ReputationStoreError::query("reputation store lock poisoned"))
    }
}

#[async_trait]
impl ReputationStore for InMemoryReputationStore {
    async fn insert_once(&self, entry: &ReputationEntry) -> Result<bool, ReputationStoreError> {
        let mut entries = self.lock()?;
        if entries.contains_key(&entry.source_action_id) {
            return Ok(false);
        }
        entries.insert(entry.source_action_id, entry.clone());
        Ok(true)
    }

    async fn summary_for_user(
        &self,
        user_id: UserId,
    ) -> Result<ReputationSummary, ReputationStoreError> {
        let entries = self.lock()?;
        let mut total_points = 0u64;
        let mut actions_completed = 0u64;
        let mut last_activity = None;
        for entry in entries.values().filter(|e| e.user_id == user_id) {
            total_points += u64::from(entry.points);
            actions_completed += 1;
            last_activity = match last_activity {
                Some(at) if at >= entry.awarded_at => Some(at),
                _ => Some(entry.awarded_at),
            };
        }
        Ok(ReputationSummary {
            user_id,
            total_points,
            actions_completed,
            last_activity,
        })
    }
}
