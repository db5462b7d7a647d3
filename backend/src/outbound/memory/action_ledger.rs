//! In-process append-only action ledger.
//!
//! The dedupe check and the append happen under one mutex acquisition, so
//! concurrent appends of the same key leave exactly one record.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::action::{ActionRecord, DedupeKey, NewActionRecord};
use crate::domain::ids::{ActionId, CommunityId, UserId};
use crate::domain::ports::{ActionLedger, ActionLedgerError, AppendOutcome};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<ActionRecord>,
    by_key: HashMap<DedupeKey, usize>,
}

/// Mutex-serialised action ledger.
#[derive(Debug, Default)]
pub struct InMemoryActionLedger {
    inner: Mutex<Inner>,
}

impl InMemoryActionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, ActionLedgerError> {
        self.inner
            .lock()
            .map_err(|_| ActionLedgerError::query("action ledger lock poisoned"))
    }
}

#[async_trait]
impl ActionLedger for InMemoryActionLedger {
    async fn append(&self, new: NewActionRecord) -> Result<AppendOutcome, ActionLedgerError> {
        let mut inner = self.lock()?;
        if let Some(&index) = inner.by_key.get(&new.dedupe_key) {
            return Ok(AppendOutcome::Duplicate(inner.records[index].clone()));
        }
        let record = ActionRecord::from_new(new, ActionId::random(), Utc::now());
        let index = inner.records.len();
        inner.by_key.insert(record.dedupe_key.clone(), index);
        inner.records.push(record.clone());
        Ok(AppendOutcome::Inserted(record))
    }

    async fn find(&self, id: ActionId) -> Result<Option<ActionRecord>, ActionLedgerError> {
        let inner = self.lock()?;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn records_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        let inner = self.lock()?;
        let mut records: Vec<_> = inner
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.occurred_at);
        Ok(records)
    }

    async fn records_for_community(
        &self,
        community_id: CommunityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        let inner = self.lock()?;
        let mut records: Vec<_> = inner
            .records
            .iter()
            .filter(|r| r.community_id == community_id)
            .filter(|r| r.occurred_at > start && r.occurred_at <= end)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.occurred_at);
        Ok(records)
    }

    async fn communities(&self) -> Result<Vec<CommunityId>, ActionLedgerError> {
        let inner = self.lock()?;
        let mut communities: Vec<_> = inner.records.iter().map(|r| r.community_id).collect();
        communities.sort_unstable();
        communities.dedup();
        Ok(communities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionKind, RawMetrics};

    fn new_record(user: UserId, community: CommunityId, key: &str) -> NewActionRecord {
        NewActionRecord {
            dedupe_key: DedupeKey::new(key).expect("valid key"),
            user_id: user,
            community_id: community,
            kind: ActionKind::Recycling,
            raw_metrics: RawMetrics::default(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn second_append_with_same_key_is_a_no_op() {
        let ledger = InMemoryActionLedger::new();
        let user = UserId::random();
        let community = CommunityId::random();

        let first = ledger
            .append(new_record(user, community, "u1-recycling-2024-01-01"))
            .await
            .expect("append");
        assert!(first.inserted());

        let second = ledger
            .append(new_record(user, community, "u1-recycling-2024-01-01"))
            .await
            .expect("append");
        assert!(!second.inserted());
        assert_eq!(second.record().id, first.record().id);
        assert_eq!(
            ledger.records_for_user(user).await.expect("records").len(),
            1
        );
    }

    #[tokio::test]
    async fn community_queries_respect_the_window_bounds() {
        let ledger = InMemoryActionLedger::new();
        let community = CommunityId::random();
        let user = UserId::random();
        let mut record = new_record(user, community, "old");
        record.occurred_at = Utc::now() - chrono::Duration::days(100);
        ledger.append(record).await.expect("append old");
        ledger
            .append(new_record(user, community, "recent"))
            .await
            .expect("append recent");

        let start = Utc::now() - chrono::Duration::days(90);
        let records = ledger
            .records_for_community(community, start, Utc::now())
            .await
            .expect("windowed records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dedupe_key.as_str(), "recent");
    }

    #[tokio::test]
    async fn communities_lists_each_once() {
        let ledger = InMemoryActionLedger::new();
        let community = CommunityId::random();
        ledger
            .append(new_record(UserId::random(), community, "a"))
            .await
            .expect("append");
        ledger
            .append(new_record(UserId::random(), community, "b"))
            .await
            .expect("append");

        assert_eq!(ledger.communities().await.expect("communities"), vec![community]);
    }
}
