//! Scheduled score aggregation.
//!
//! One serialized batch recomputes community snapshots per window kind.
//! Communities are isolated units of failure: one community's error is
//! logged and skipped, the rest proceed, and the failed community is
//! picked up by the next scheduled run. The run is resumable — a restart
//! skips every (community, window) that already has a snapshot for the
//! run's `as_of`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::error::Error;
use crate::domain::ids::CommunityId;
use crate::domain::ports::{
    ActionLedger, ActionLedgerError, BaselineSource, ImpactModel, SnapshotStore,
    SnapshotStoreError,
};
use crate::domain::scoring::{
    CommunityScoreSnapshot, ScorePolicy, WeightedRecord, WindowKind, fold_snapshot,
};
use crate::domain::weighting::CommunityBaseline;
use crate::domain::weighting_adapter::ImpactWeightingAdapter;

/// Outcome of one scheduled aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AggregationRunReport {
    /// (community, window) pairs recomputed by this run.
    pub computed: u64,
    /// Pairs skipped because a snapshot for this `as_of` already existed.
    pub resumed: u64,
    /// Communities whose recompute failed and was deferred to the next run.
    pub failed: Vec<CommunityId>,
}

/// Driving service for snapshot recomputation.
pub struct ScoreAggregationService<L: ?Sized, S: ?Sized, M: ?Sized, B: ?Sized> {
    ledger: Arc<L>,
    snapshots: Arc<S>,
    weighting: ImpactWeightingAdapter<M>,
    baselines: Arc<B>,
    policy: Arc<dyn ScorePolicy>,
}

impl<L: ?Sized, S: ?Sized, M: ?Sized, B: ?Sized> Clone for ScoreAggregationService<L, S, M, B> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            snapshots: Arc::clone(&self.snapshots),
            weighting: self.weighting.clone(),
            baselines: Arc::clone(&self.baselines),
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<L: ?Sized, S: ?Sized, M: ?Sized, B: ?Sized> ScoreAggregationService<L, S, M, B> {
    /// Create a new aggregation service.
    pub fn new(
        ledger: Arc<L>,
        snapshots: Arc<S>,
        weighting: ImpactWeightingAdapter<M>,
        baselines: Arc<B>,
        policy: Arc<dyn ScorePolicy>,
    ) -> Self {
        Self {
            ledger,
            snapshots,
            weighting,
            baselines,
            policy,
        }
    }
}

fn map_ledger_error(error: ActionLedgerError) -> Error {
    match error {
        ActionLedgerError::Connection { message } => {
            Error::service_unavailable(format!("action ledger unavailable: {message}"))
        }
        ActionLedgerError::Query { message } | ActionLedgerError::Corrupt { message } => {
            Error::internal(format!("action ledger error: {message}"))
        }
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

impl<L, S, M, B> ScoreAggregationService<L, S, M, B>
where
    L: ActionLedger + ?Sized,
    S: SnapshotStore + ?Sized,
    M: ImpactModel + ?Sized,
    B: BaselineSource + ?Sized,
{
    /// Recompute one community's snapshot for one window.
    ///
    /// Always overwrites the `(community, window, as_of)` key wholesale, so
    /// running twice for the same `as_of` is total: one retrievable
    /// snapshot, never two divergent ones.
    pub async fn recompute(
        &self,
        community_id: CommunityId,
        window: WindowKind,
        as_of: DateTime<Utc>,
    ) -> Result<CommunityScoreSnapshot, Error> {
        let baseline = self.baseline_or_default(community_id).await;
        let records = self
            .ledger
            .records_for_community(community_id, window.start(as_of), as_of)
            .await
            .map_err(map_ledger_error)?;

        let mut weighted = Vec::with_capacity(records.len());
        for record in records {
            let factor = self.weighting.weight(&record.raw_metrics, baseline).await;
            weighted.push(WeightedRecord { record, factor });
        }

        let snapshot = fold_snapshot(community_id, window, as_of, &weighted, &*self.policy);
        self.snapshots
            .upsert(&snapshot)
            .await
            .map_err(map_snapshot_error)?;
        Ok(snapshot)
    }

    /// Run the scheduled batch for every community with ledger records.
    ///
    /// Fatal errors are limited to the community listing itself; from
    /// there on, failure is per community.
    pub async fn recompute_all(&self, as_of: DateTime<Utc>) -> Result<AggregationRunReport, Error> {
        let communities = self.ledger.communities().await.map_err(map_ledger_error)?;
        let mut report = AggregationRunReport::default();

        for community_id in communities {
            match self.recompute_community(community_id, as_of, &mut report).await {
                Ok(()) => {}
                Err(error) => {
                    warn!(
                        %community_id,
                        %error,
                        "community aggregation failed, deferring to next run"
                    );
                    report.failed.push(community_id);
                }
            }
        }

        info!(
            computed = report.computed,
            resumed = report.resumed,
            failed = report.failed.len(),
            "aggregation run finished"
        );
        Ok(report)
    }

    async fn recompute_community(
        &self,
        community_id: CommunityId,
        as_of: DateTime<Utc>,
        report: &mut AggregationRunReport,
    ) -> Result<(), Error> {
        for window in WindowKind::ALL {
            let existing = self
                .snapshots
                .find(community_id, window, as_of)
                .await
                .map_err(map_snapshot_error)?;
            if existing.is_some() {
                report.resumed += 1;
                continue;
            }
            self.recompute(community_id, window, as_of).await?;
            report.computed += 1;
        }
        Ok(())
    }

    async fn baseline_or_default(&self, community_id: CommunityId) -> CommunityBaseline {
        match self.baselines.baseline_for(community_id).await {
            Ok(baseline) => baseline,
            Err(error) => {
                warn!(%community_id, %error, "baseline source unavailable, using neutral baseline");
                CommunityBaseline::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionKind, ActionRecord, DedupeKey, NewActionRecord, RawMetrics};
    use crate::domain::ids::{ActionId, UserId};
    use crate::domain::ports::{
        FixtureBaselineSource, MockActionLedger, MockImpactModel, MockSnapshotStore,
    };
    use crate::domain::scoring::DefaultScorePolicy;
    use chrono::Duration;

    fn record(community: CommunityId, units: f64, occurred_at: DateTime<Utc>) -> ActionRecord {
        let user = UserId::random();
        let new = NewActionRecord {
            dedupe_key: DedupeKey::derive(user, ActionKind::Cleanup, occurred_at),
            user_id: user,
            community_id: community,
            kind: ActionKind::Cleanup,
            raw_metrics: RawMetrics::try_new([("units".to_owned(), units)])
                .expect("valid metrics"),
            occurred_at,
        };
        ActionRecord::from_new(new, ActionId::random(), occurred_at)
    }

    fn service(
        ledger: MockActionLedger,
        snapshots: MockSnapshotStore,
        model: MockImpactModel,
    ) -> ScoreAggregationService<MockActionLedger, MockSnapshotStore, MockImpactModel, FixtureBaselineSource>
    {
        ScoreAggregationService::new(
            Arc::new(ledger),
            Arc::new(snapshots),
            ImpactWeightingAdapter::new(Arc::new(model)),
            Arc::new(FixtureBaselineSource),
            Arc::new(DefaultScorePolicy),
        )
    }

    #[tokio::test]
    async fn recompute_weights_records_and_upserts() {
        let community = CommunityId::random();
        let as_of = Utc::now();
        let records = vec![record(community, 10.0, as_of - Duration::days(1))];

        let mut ledger = MockActionLedger::new();
        ledger
            .expect_records_for_community()
            .times(1)
            .return_once(move |_, _, _| Ok(records));
        let mut snapshots = MockSnapshotStore::new();
        snapshots
            .expect_upsert()
            .withf(|s: &CommunityScoreSnapshot| (s.weighted_impact - 15.0).abs() < f64::EPSILON)
            .times(1)
            .return_once(|_| Ok(()));
        let mut model = MockImpactModel::new();
        model.expect_suggest_factor().times(1).returning(|_, _| Ok(1.5));

        let snapshot = service(ledger, snapshots, model)
            .recompute(community, WindowKind::AllTime, as_of)
            .await
            .expect("recompute succeeds");
        assert_eq!(snapshot.event_count, 1);
        assert_eq!(snapshot.unweighted_records, 0);
    }

    #[tokio::test]
    async fn batch_skips_windows_already_written_for_as_of() {
        let community = CommunityId::random();
        let as_of = Utc::now();
        let existing = CommunityScoreSnapshot {
            community_id: community,
            window: WindowKind::Weekly,
            window_end: as_of,
            event_count: 0,
            participant_count: 0,
            weighted_impact: 0.0,
            score: 0.0,
            unweighted_records: 0,
            last_activity: None,
        };

        let mut ledger = MockActionLedger::new();
        ledger
            .expect_communities()
            .times(1)
            .return_once(move || Ok(vec![community]));
        // Only the two missing windows are recomputed.
        ledger
            .expect_records_for_community()
            .times(2)
            .returning(|_, _, _| Ok(Vec::new()));
        let mut snapshots = MockSnapshotStore::new();
        snapshots.expect_find().times(3).returning(move |_, window, _| {
            if window == WindowKind::Weekly {
                Ok(Some(existing.clone()))
            } else {
                Ok(None)
            }
        });
        snapshots.expect_upsert().times(2).returning(|_| Ok(()));
        let model = MockImpactModel::new();

        let report = service(ledger, snapshots, model)
            .recompute_all(as_of)
            .await
            .expect("batch succeeds");
        assert_eq!(report.computed, 2);
        assert_eq!(report.resumed, 1);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn one_failing_community_does_not_stop_the_batch() {
        let broken = CommunityId::random();
        let healthy = CommunityId::random();
        let as_of = Utc::now();

        let mut ledger = MockActionLedger::new();
        ledger
            .expect_communities()
            .times(1)
            .return_once(move || Ok(vec![broken, healthy]));
        ledger
            .expect_records_for_community()
            .returning(move |community, _, _| {
                if community == broken {
                    Err(ActionLedgerError::query("row deserialisation failed"))
                } else {
                    Ok(Vec::new())
                }
            });
        let mut snapshots = MockSnapshotStore::new();
        snapshots.expect_find().returning(|_, _, _| Ok(None));
        snapshots.expect_upsert().times(3).returning(|_| Ok(()));
        let model = MockImpactModel::new();

        let report = service(ledger, snapshots, model)
            .recompute_all(as_of)
            .await
            .expect("batch survives one community");
        assert_eq!(report.failed, vec![broken]);
        assert_eq!(report.computed, 3);
    }
}
