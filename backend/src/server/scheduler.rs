//! Scheduled aggregation loop.
//!
//! Periodically recomputes every community's snapshots and republishes
//! the leaderboard cache. Runs are resumable: communities that already
//! hold a snapshot for the current window end are skipped, so a crashed
//! run picks up where it left off on the next tick. A small random jitter
//! staggers replicas that share a store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::inbound::http::state::DynLeaderboardService;

use super::state_builders::DynAggregationService;

/// Maximum startup jitter ahead of the first run.
const MAX_STARTUP_JITTER: Duration = Duration::from_secs(60);

/// Handle owning the background loop.
pub struct AggregationScheduler {
    aggregation: Arc<DynAggregationService>,
    leaderboard: Arc<DynLeaderboardService>,
    interval: Duration,
}

impl AggregationScheduler {
    pub fn new(
        aggregation: Arc<DynAggregationService>,
        leaderboard: Arc<DynLeaderboardService>,
        interval: Duration,
    ) -> Self {
        Self {
            aggregation,
            leaderboard,
            interval,
        }
    }

    /// Run one full pass: recompute snapshots, then republish rankings.
    pub async fn run_once(&self) {
        let as_of = Utc::now();
        match self.aggregation.recompute_all(as_of).await {
            Ok(report) => {
                info!(
                    computed = report.computed,
                    resumed = report.resumed,
                    failed = report.failed.len(),
                    "aggregation pass finished"
                );
            }
            Err(error) => {
                warn!(%error, "aggregation pass failed, keeping previous snapshots");
                return;
            }
        }
        if let Err(error) = self.leaderboard.rebuild_all().await {
            warn!(%error, "leaderboard rebuild failed, serving previous generation");
        }
    }

    /// Spawn the periodic loop on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let jitter = rand::thread_rng().gen_range(Duration::ZERO..MAX_STARTUP_JITTER);
            tokio::time::sleep(jitter).await;

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ActionLedger, FixtureBaselineSource, FixtureImpactModel};
    use crate::domain::{
        ActionKind, DefaultScorePolicy, ImpactWeightingAdapter, LeaderboardService, RawMetrics,
        ScoreAggregationService, WindowKind,
    };
    use crate::outbound::memory::{InMemoryActionLedger, InMemorySnapshotStore};

    #[tokio::test]
    async fn a_pass_recomputes_and_republishes() {
        let ledger = Arc::new(InMemoryActionLedger::new());
        let snapshots = Arc::new(InMemorySnapshotStore::new());

        let user = crate::domain::UserId::random();
        let community = crate::domain::CommunityId::random();
        let metrics = RawMetrics::try_new([("kgCollected".to_owned(), 4.0)]).expect("metrics");
        ledger
            .append(crate::domain::NewActionRecord {
                dedupe_key: crate::domain::DedupeKey::derive(
                    user,
                    ActionKind::Cleanup,
                    Utc::now(),
                ),
                user_id: user,
                community_id: community,
                kind: ActionKind::Cleanup,
                raw_metrics: metrics,
                occurred_at: Utc::now(),
            })
            .await
            .expect("append");

        let aggregation: Arc<DynAggregationService> = Arc::new(ScoreAggregationService::new(
            ledger.clone() as Arc<dyn crate::domain::ports::ActionLedger>,
            snapshots.clone() as Arc<dyn crate::domain::ports::SnapshotStore>,
            ImpactWeightingAdapter::new(
                Arc::new(FixtureImpactModel) as Arc<dyn crate::domain::ports::ImpactModel>
            ),
            Arc::new(FixtureBaselineSource) as Arc<dyn crate::domain::ports::BaselineSource>,
            Arc::new(DefaultScorePolicy),
        ));
        let leaderboard: Arc<DynLeaderboardService> = Arc::new(LeaderboardService::new(
            snapshots.clone() as Arc<dyn crate::domain::ports::SnapshotStore>,
        ));

        let scheduler = AggregationScheduler::new(
            Arc::clone(&aggregation),
            Arc::clone(&leaderboard),
            Duration::from_secs(3600),
        );
        scheduler.run_once().await;

        let (entries, snapshot) = leaderboard
            .top_n(WindowKind::Weekly, 10)
            .await
            .expect("leaderboard");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].community_id, community);
        assert!(snapshot.generation >= 1);
    }
}
