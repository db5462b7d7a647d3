//! Domain entities, ports, and services of the impact engine.
//!
//! Purpose: convert completed community actions into durable reputation,
//! windowed community scores, ranked leaderboards, and badge awards. The
//! action ledger owns truth; everything else is a derived view that can be
//! rebuilt by replaying it. Types keep their invariants on constructors;
//! services are generic over the port traits in [`ports`].

pub mod action;
pub mod aggregation_service;
pub mod badge;
pub mod badge_service;
pub mod completion_service;
pub mod error;
pub mod event;
pub mod ids;
pub mod leaderboard_service;
pub mod ports;
pub mod registration_service;
pub mod reputation;
pub mod reputation_service;
pub mod scoring;
pub mod weighting;
pub mod weighting_adapter;

pub use self::action::{
    ActionKind, ActionRecord, DedupeKey, DedupeKeyError, NewActionRecord, RawMetrics,
    RawMetricsError,
};
pub use self::aggregation_service::{AggregationRunReport, ScoreAggregationService};
pub use self::badge::{
    BadgeAward, BadgeCriteria, BadgeDefinition, BadgeProgress, builtin_catalogue,
};
pub use self::badge_service::{BadgeEvaluator, BadgeStanding};
pub use self::completion_service::{
    ActionCompletionService, CompleteActionRequest, CompletionReceipt,
};
pub use self::error::{Error, ErrorCode};
pub use self::event::{Event, EventLifecycle, EventValidationError, Registration};
pub use self::ids::{ActionId, BadgeId, CommunityId, EventId, UserId};
pub use self::leaderboard_service::{LeaderboardService, LeaderboardSnapshot, RankEntry};
pub use self::registration_service::{
    EventRegistrationService, RegistrationReceipt, UnregisterReceipt,
};
pub use self::reputation::{ReputationEntry, ReputationSummary, base_points};
pub use self::reputation_service::ReputationQueryService;
pub use self::scoring::{
    CommunityScoreSnapshot, DefaultScorePolicy, ScorePolicy, WindowKind, fold_snapshot,
};
pub use self::weighting::{CommunityBaseline, WeightedFactor};
pub use self::weighting_adapter::{DEFAULT_MODEL_TIMEOUT, ImpactWeightingAdapter};

/// Convenient result alias for domain operations.
pub type DomainResult<T> = Result<T, Error>;
