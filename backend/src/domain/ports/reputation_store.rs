//! Port for durable reputation entries.

use async_trait::async_trait;

use crate::domain::ids::UserId;
use crate::domain::reputation::{ReputationEntry, ReputationSummary};

/// Errors raised by reputation store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReputationStoreError {
    /// Store connection could not be established.
    #[error("reputation store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("reputation store query failed: {message}")]
    Query { message: String },
}

impl ReputationStoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Port for exactly-once point awards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReputationStore: Send + Sync {
    /// Insert an entry unless one already exists for its source action.
    ///
    /// Returns `true` when the entry was inserted, `false` when the
    /// uniqueness constraint absorbed a redelivery. This conditional
    /// insert is the exactly-once guard; callers may retry freely.
    async fn insert_once(&self, entry: &ReputationEntry) -> Result<bool, ReputationStoreError>;

    /// Aggregate view of a user's awards.
    async fn summary_for_user(
        &self,
        user_id: UserId,
    ) -> Result<ReputationSummary, ReputationStoreError>;
}

/// Fixture store: every insert reports success, summaries are empty.
#[derive(Debug, Default)]
pub struct FixtureReputationStore;

#[async_trait]
impl ReputationStore for FixtureReputationStore {
    async fn insert_once(&self, _entry: &ReputationEntry) -> Result<bool, ReputationStoreError> {
        Ok(true)
    }

    async fn summary_for_user(
        &self,
        user_id: UserId,
    ) -> Result<ReputationSummary, ReputationStoreError> {
        Ok(ReputationSummary {
            user_id,
            total_points: 0,
            actions_completed: 0,
            last_activity: None,
        })
    }
}
