//! In-process snapshot store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ids::CommunityId;
use crate::domain::ports::{SnapshotStore, SnapshotStoreError};
use crate::domain::scoring::{CommunityScoreSnapshot, WindowKind};

type Key = (CommunityId, WindowKind, DateTime<Utc>);

/// Mutex-serialised snapshot store keyed by (community, window, end).
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<HashMap<Key, CommunityScoreSnapshot>>,
}

impl InMemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Key, CommunityScoreSnapshot>>, SnapshotStoreError>
    {
        self.snapshots
            .lock()
            .map_err(|_| SnapshotStoreError::query("snapshot store lock poisoned"))
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn upsert(&self, snapshot: &CommunityScoreSnapshot) -> Result<(), SnapshotStoreError> {
        let mut snapshots = self.lock()?;
        let key = (snapshot.community_id, snapshot.window, snapshot.window_end);
        snapshots.insert(key, snapshot.clone());
        Ok(())
    }

    async fn find(
        &self,
        community_id: CommunityId,
        window: WindowKind,
        window_end: DateTime<Utc>,
    ) -> Result<Option<CommunityScoreSnapshot>, SnapshotStoreError> {
        let snapshots = self.lock()?;
        Ok(snapshots.get(&(community_id, window, window_end)).cloned())
    }

    async fn latest_for_window(
        &self,
        window: WindowKind,
    ) -> Result<Vec<CommunityScoreSnapshot>, SnapshotStoreError> {
        let snapshots = self.lock()?;
        let mut latest: HashMap<CommunityId, &CommunityScoreSnapshot> = HashMap::new();
        for snapshot in snapshots.values().filter(|s| s.window == window) {
            match latest.get(&snapshot.community_id) {
                Some(current) if current.window_end >= snapshot.window_end => {}
                _ => {
                    latest.insert(snapshot.community_id, snapshot);
                }
            }
        }
        Ok(latest.into_values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(
        community: CommunityId,
        window: WindowKind,
        window_end: DateTime<Utc>,
        score: f64,
    ) -> CommunityScoreSnapshot {
        CommunityScoreSnapshot {
            community_id: community,
            window,
            window_end,
            event_count: 1,
            participant_count: 1,
            weighted_impact: score,
            score,
            unweighted_records: 0,
            last_activity: None,
        }
    }

    #[tokio::test]
    async fn upsert_overwrites_the_same_key_wholesale() {
        let store = InMemorySnapshotStore::new();
        let community = CommunityId::random();
        let end = Utc::now();

        store
            .upsert(&snapshot(community, WindowKind::Weekly, end, 10.0))
            .await
            .expect("first write");
        store
            .upsert(&snapshot(community, WindowKind::Weekly, end, 20.0))
            .await
            .expect("rerun overwrites");

        let found = store
            .find(community, WindowKind::Weekly, end)
            .await
            .expect("find")
            .expect("snapshot exists");
        assert!((found.score - 20.0).abs() < f64::EPSILON);
        assert_eq!(
            store
                .latest_for_window(WindowKind::Weekly)
                .await
                .expect("latest")
                .len(),
            1,
            "never two divergent snapshots for one key"
        );
    }

    #[tokio::test]
    async fn latest_per_community_wins_and_windows_stay_separate() {
        let store = InMemorySnapshotStore::new();
        let community = CommunityId::random();
        let now = Utc::now();

        store
            .upsert(&snapshot(community, WindowKind::Weekly, now - Duration::days(1), 5.0))
            .await
            .expect("older");
        store
            .upsert(&snapshot(community, WindowKind::Weekly, now, 9.0))
            .await
            .expect("newer");
        store
            .upsert(&snapshot(community, WindowKind::Monthly, now, 99.0))
            .await
            .expect("different window");

        let weekly = store
            .latest_for_window(WindowKind::Weekly)
            .await
            .expect("latest weekly");
        assert_eq!(weekly.len(), 1);
        assert!((weekly[0].score - 9.0).abs() < f64::EPSILON);
    }
}
