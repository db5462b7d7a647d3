//! Shared HTTP adapter state.
//!
//! Handlers accept this via `actix_web::web::Data`; the services inside
//! are instantiated over port trait objects so the same handlers run
//! against the in-memory adapters in tests and PostgreSQL in production.

use std::sync::Arc;

use crate::domain::ports::{
    ActionLedger, BadgeAwardStore, NotificationDispatcher, RegistrationLedger, ReputationStore,
    SnapshotStore,
};
use crate::domain::{
    ActionCompletionService, BadgeEvaluator, EventRegistrationService, LeaderboardService,
    ReputationQueryService,
};

/// Registration service over any ledger adapter.
pub type DynRegistrationService = EventRegistrationService<dyn RegistrationLedger>;

/// Completion pipeline over any adapter set.
pub type DynCompletionService = ActionCompletionService<
    dyn ActionLedger,
    dyn ReputationStore,
    dyn BadgeAwardStore,
    dyn NotificationDispatcher,
>;

/// Badge evaluator over any adapter set.
pub type DynBadgeEvaluator = BadgeEvaluator<dyn ActionLedger, dyn BadgeAwardStore>;

/// Ranking engine over any snapshot store.
pub type DynLeaderboardService = LeaderboardService<dyn SnapshotStore>;

/// Reputation read model over any store.
pub type DynReputationService = ReputationQueryService<dyn ReputationStore>;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub registrations: Arc<DynRegistrationService>,
    pub completion: Arc<DynCompletionService>,
    pub badges: Arc<DynBadgeEvaluator>,
    pub leaderboard: Arc<DynLeaderboardService>,
    pub reputation: Arc<DynReputationService>,
}
