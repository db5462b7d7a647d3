//! Ranking engine over persisted score snapshots.
//!
//! Orderings are computed once per rebuild and published wholesale into a
//! versioned copy-on-write cache: readers bind to an `Arc` of one
//! generation, so `top_n` and `rank_of` answered from the same generation
//! can never disagree, and no reader observes a partially updated ranking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::domain::error::Error;
use crate::domain::ids::CommunityId;
use crate::domain::ports::{SnapshotStore, SnapshotStoreError};
use crate::domain::scoring::{CommunityScoreSnapshot, WindowKind};

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankEntry {
    /// 1-based rank within the window.
    pub rank: u32,
    pub community_id: CommunityId,
    pub score: f64,
    pub weighted_impact: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// An immutable, versioned leaderboard ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub window: WindowKind,
    /// Monotonic cache generation for staleness detection.
    pub generation: u64,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<RankEntry>,
}

impl LeaderboardSnapshot {
    /// Rank entry for a single community within this generation.
    #[must_use]
    pub fn rank_of(&self, community_id: CommunityId) -> Option<&RankEntry> {
        self.entries
            .iter()
            .find(|entry| entry.community_id == community_id)
    }
}

/// Deterministic ordering: score descending, then most recent activity,
/// then community id as the final total-order tiebreaker.
fn compare_snapshots(a: &CommunityScoreSnapshot, b: &CommunityScoreSnapshot) -> std::cmp::Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.last_activity.cmp(&a.last_activity))
        .then_with(|| a.community_id.cmp(&b.community_id))
}

/// Default cap on leaderboard page size.
pub const DEFAULT_MAX_LIMIT: usize = 10;

/// Ranking engine with a versioned snapshot cache.
pub struct LeaderboardService<S: ?Sized> {
    snapshots: Arc<S>,
    cache: RwLock<HashMap<WindowKind, Arc<LeaderboardSnapshot>>>,
    generation: AtomicU64,
    max_limit: usize,
}

impl<S: ?Sized> LeaderboardService<S> {
    /// Create a service with the default page-size cap.
    pub fn new(snapshots: Arc<S>) -> Self {
        Self::with_max_limit(snapshots, DEFAULT_MAX_LIMIT)
    }

    /// Create a service with an explicit page-size cap.
    pub fn with_max_limit(snapshots: Arc<S>, max_limit: usize) -> Self {
        Self {
            snapshots,
            cache: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            max_limit,
        }
    }

    fn cached(&self, window: WindowKind) -> Option<Arc<LeaderboardSnapshot>> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&window).cloned())
    }

    fn publish(&self, snapshot: LeaderboardSnapshot) -> Arc<LeaderboardSnapshot> {
        let window = snapshot.window;
        let published = Arc::new(snapshot);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(window, Arc::clone(&published));
        }
        published
    }
}

fn map_snapshot_error(error: SnapshotStoreError) -> Error {
    match error {
        SnapshotStoreError::Connection { message } => {
            Error::service_unavailable(format!("snapshot store unavailable: {message}"))
        }
        SnapshotStoreError::Query { message } => {
            Error::internal(format!("snapshot store error: {message}"))
        }
    }
}

impl<S> LeaderboardService<S>
where
    S: SnapshotStore + ?Sized,
{
    /// Rebuild the ordering for one window and publish a new generation.
    pub async fn rebuild(&self, window: WindowKind) -> Result<Arc<LeaderboardSnapshot>, Error> {
        let mut rows = self
            .snapshots
            .latest_for_window(window)
            .await
            .map_err(map_snapshot_error)?;
        rows.sort_by(compare_snapshots);

        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(index, snapshot)| RankEntry {
                rank: index as u32 + 1,
                community_id: snapshot.community_id,
                score: snapshot.score,
                weighted_impact: snapshot.weighted_impact,
                last_activity: snapshot.last_activity,
            })
            .collect();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let published = self.publish(LeaderboardSnapshot {
            window,
            generation,
            generated_at: Utc::now(),
            entries,
        });
        info!(%window, generation, entries = published.entries.len(), "leaderboard rebuilt");
        Ok(published)
    }

    /// Rebuild every window kind.
    pub async fn rebuild_all(&self) -> Result<(), Error> {
        for window in WindowKind::ALL {
            self.rebuild(window).await?;
        }
        Ok(())
    }

    /// Current generation for a window, rebuilding lazily on first use.
    pub async fn current(&self, window: WindowKind) -> Result<Arc<LeaderboardSnapshot>, Error> {
        if let Some(snapshot) = self.cached(window) {
            return Ok(snapshot);
        }
        self.rebuild(window).await
    }

    /// Top `limit` entries; `limit` is capped at the configured maximum.
    /// A limit of zero yields an empty page, never a single entry.
    pub async fn top_n(
        &self,
        window: WindowKind,
        limit: usize,
    ) -> Result<(Vec<RankEntry>, Arc<LeaderboardSnapshot>), Error> {
        let snapshot = self.current(window).await?;
        let limit = limit.min(self.max_limit);
        let entries = snapshot.entries.iter().take(limit).cloned().collect();
        Ok((entries, snapshot))
    }

    /// A single community's rank, derived from the same cached ordering as
    /// [`Self::top_n`].
    pub async fn rank_of(
        &self,
        community_id: CommunityId,
        window: WindowKind,
    ) -> Result<Option<RankEntry>, Error> {
        let snapshot = self.current(window).await?;
        Ok(snapshot.rank_of(community_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockSnapshotStore;
    use chrono::Duration;

    fn snapshot(
        community: CommunityId,
        score: f64,
        last_activity: Option<DateTime<Utc>>,
    ) -> CommunityScoreSnapshot {
        CommunityScoreSnapshot {
            community_id: community,
            window: WindowKind::AllTime,
            window_end: Utc::now(),
            event_count: 1,
            participant_count: 1,
            weighted_impact: score,
            score,
            unweighted_records: 0,
            last_activity,
        }
    }

    #[tokio::test]
    async fn ordering_is_score_descending() {
        let low = CommunityId::random();
        let high = CommunityId::random();
        let rows = vec![snapshot(low, 10.0, None), snapshot(high, 50.0, None)];

        let mut store = MockSnapshotStore::new();
        store
            .expect_latest_for_window()
            .times(1)
            .return_once(move |_| Ok(rows));

        let service = LeaderboardService::new(Arc::new(store));
        let (entries, _) = service.top_n(WindowKind::AllTime, 10).await.expect("top n");
        assert_eq!(entries[0].community_id, high);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[1].community_id, low);
        assert_eq!(entries[1].rank, 2);
    }

    #[tokio::test]
    async fn equal_scores_break_ties_by_recency() {
        let now = Utc::now();
        let stale = CommunityId::random();
        let fresh = CommunityId::random();
        let rows = vec![
            snapshot(stale, 50.0, Some(now - Duration::days(5))),
            snapshot(fresh, 50.0, Some(now)),
        ];

        let mut store = MockSnapshotStore::new();
        store
            .expect_latest_for_window()
            .times(1)
            .return_once(move |_| Ok(rows));

        let service = LeaderboardService::new(Arc::new(store));
        let (entries, _) = service.top_n(WindowKind::AllTime, 10).await.expect("top n");
        assert_eq!(entries[0].community_id, fresh, "recent activity ranks higher");
        assert_eq!(entries[1].community_id, stale);
    }

    #[tokio::test]
    async fn limits_are_clamped_to_the_cap() {
        let rows: Vec<_> = (0..20)
            .map(|i| snapshot(CommunityId::random(), f64::from(i), None))
            .collect();

        let mut store = MockSnapshotStore::new();
        store
            .expect_latest_for_window()
            .times(1)
            .return_once(move |_| Ok(rows));

        let service = LeaderboardService::new(Arc::new(store));
        let (entries, _) = service
            .top_n(WindowKind::AllTime, 1000)
            .await
            .expect("top n");
        assert_eq!(entries.len(), DEFAULT_MAX_LIMIT);
    }

    #[tokio::test]
    async fn zero_limit_yields_an_empty_page() {
        let rows = vec![snapshot(CommunityId::random(), 7.0, None)];

        let mut store = MockSnapshotStore::new();
        store
            .expect_latest_for_window()
            .times(1)
            .return_once(move |_| Ok(rows));

        let service = LeaderboardService::new(Arc::new(store));
        let (entries, snapshot) = service
            .top_n(WindowKind::AllTime, 0)
            .await
            .expect("top n");
        assert!(entries.is_empty(), "a zero limit must not return entries");
        assert_eq!(snapshot.entries.len(), 1, "the cached ordering is unaffected");
    }

    #[tokio::test]
    async fn rank_of_and_top_n_share_one_generation() {
        let community = CommunityId::random();
        let rows = vec![snapshot(community, 42.0, None)];

        let mut store = MockSnapshotStore::new();
        // A single rebuild serves both queries.
        store
            .expect_latest_for_window()
            .times(1)
            .return_once(move |_| Ok(rows));

        let service = LeaderboardService::new(Arc::new(store));
        let (_, top_snapshot) = service.top_n(WindowKind::AllTime, 5).await.expect("top n");
        let rank = service
            .rank_of(community, WindowKind::AllTime)
            .await
            .expect("rank")
            .expect("community present");
        assert_eq!(rank.rank, 1);
        assert_eq!(top_snapshot.generation, 1);
    }

    #[tokio::test]
    async fn rebuild_publishes_a_new_generation() {
        let mut store = MockSnapshotStore::new();
        store
            .expect_latest_for_window()
            .times(2)
            .returning(|_| Ok(Vec::new()));

        let service = LeaderboardService::new(Arc::new(store));
        let first = service.rebuild(WindowKind::Weekly).await.expect("rebuild");
        let second = service.rebuild(WindowKind::Weekly).await.expect("rebuild");
        assert!(second.generation > first.generation);
    }
}
