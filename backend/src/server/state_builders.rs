//! Builders wiring port adapters into the engine's services.
//!
//! The adapter family is chosen once from configuration: PostgreSQL when
//! a pool is attached, in-memory otherwise. Services are built over trait
//! objects so both families flow through the same `HttpState`.

use std::sync::Arc;

use crate::domain::ports::{
    ActionLedger, BadgeAwardStore, BaselineSource, FixtureBaselineSource, FixtureImpactModel,
    FixtureNotificationDispatcher, ImpactModel, NotificationDispatcher, RegistrationLedger,
    ReputationStore, SnapshotStore,
};
use crate::domain::{
    ActionCompletionService, BadgeEvaluator, DefaultScorePolicy, Error, EventRegistrationService,
    ImpactWeightingAdapter, LeaderboardService, ReputationQueryService, ScoreAggregationService,
};
use crate::inbound::http::state::{DynLeaderboardService, HttpState};
use crate::outbound::http::HttpImpactModel;
use crate::outbound::memory::{
    InMemoryActionLedger, InMemoryBadgeAwardStore, InMemoryRegistrationLedger,
    InMemoryReputationStore, InMemorySnapshotStore,
};
use crate::outbound::persistence::{
    DieselActionLedger, DieselBadgeAwardStore, DieselRegistrationLedger, DieselReputationStore,
    DieselSnapshotStore,
};

use super::ServerConfig;

/// Aggregation service over any adapter set.
pub type DynAggregationService = ScoreAggregationService<
    dyn ActionLedger,
    dyn SnapshotStore,
    dyn ImpactModel,
    dyn BaselineSource,
>;

/// The engine's full wired state: HTTP handlers plus scheduler services.
#[derive(Clone)]
pub struct EngineState {
    pub http: HttpState,
    pub aggregation: Arc<DynAggregationService>,
    pub leaderboard: Arc<DynLeaderboardService>,
}

struct StorageAdapters {
    registrations: Arc<dyn RegistrationLedger>,
    actions: Arc<dyn ActionLedger>,
    reputation: Arc<dyn ReputationStore>,
    snapshots: Arc<dyn SnapshotStore>,
    badge_awards: Arc<dyn BadgeAwardStore>,
}

fn build_storage(config: &ServerConfig) -> StorageAdapters {
    match &config.db_pool {
        Some(pool) => StorageAdapters {
            registrations: Arc::new(DieselRegistrationLedger::new(pool.clone())),
            actions: Arc::new(DieselActionLedger::new(pool.clone())),
            reputation: Arc::new(DieselReputationStore::new(pool.clone())),
            snapshots: Arc::new(DieselSnapshotStore::new(pool.clone())),
            badge_awards: Arc::new(DieselBadgeAwardStore::new(pool.clone())),
        },
        None => StorageAdapters {
            registrations: Arc::new(InMemoryRegistrationLedger::new()),
            actions: Arc::new(InMemoryActionLedger::new()),
            reputation: Arc::new(InMemoryReputationStore::new()),
            snapshots: Arc::new(InMemorySnapshotStore::new()),
            badge_awards: Arc::new(InMemoryBadgeAwardStore::new()),
        },
    }
}

fn build_impact_model(config: &ServerConfig) -> Result<Arc<dyn ImpactModel>, Error> {
    match &config.impact_model_url {
        Some(url) => {
            let client = HttpImpactModel::new(url, config.impact_model_timeout)
                .map_err(|err| Error::service_unavailable(err.to_string()))?;
            Ok(Arc::new(client))
        }
        None => Ok(Arc::new(FixtureImpactModel)),
    }
}

/// Wire the configured adapters into services.
pub fn build_engine_state(config: &ServerConfig) -> Result<EngineState, Error> {
    let storage = build_storage(config);
    let impact_model = build_impact_model(config)?;
    let baselines: Arc<dyn BaselineSource> = Arc::new(FixtureBaselineSource);
    let notifier: Arc<dyn NotificationDispatcher> = Arc::new(FixtureNotificationDispatcher);

    let weighting =
        ImpactWeightingAdapter::new(impact_model).with_timeout(config.impact_model_timeout);
    let badges = Arc::new(BadgeEvaluator::new(
        Arc::clone(&storage.actions),
        Arc::clone(&storage.badge_awards),
    ));
    let completion = Arc::new(ActionCompletionService::new(
        Arc::clone(&storage.actions),
        Arc::clone(&storage.reputation),
        badges.as_ref().clone(),
        notifier,
    ));
    let aggregation = Arc::new(ScoreAggregationService::new(
        Arc::clone(&storage.actions),
        Arc::clone(&storage.snapshots),
        weighting,
        baselines,
        Arc::new(DefaultScorePolicy),
    ));
    let leaderboard = Arc::new(LeaderboardService::with_max_limit(
        Arc::clone(&storage.snapshots),
        config.leaderboard_max_limit,
    ));

    let http = HttpState {
        registrations: Arc::new(EventRegistrationService::new(storage.registrations)),
        completion,
        badges,
        leaderboard: Arc::clone(&leaderboard),
        reputation: Arc::new(ReputationQueryService::new(storage.reputation)),
    };

    Ok(EngineState {
        http,
        aggregation,
        leaderboard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::DEFAULT_BIND_ADDR;

    #[tokio::test]
    async fn memory_wiring_serves_an_empty_leaderboard() {
        let config = ServerConfig::new(DEFAULT_BIND_ADDR.parse().expect("valid address"));
        let state = build_engine_state(&config).expect("wiring succeeds");
        let (entries, _) = state
            .http
            .leaderboard
            .top_n(crate::domain::WindowKind::Weekly, 5)
            .await
            .expect("empty leaderboard");
        assert!(entries.is_empty());
    }
}
