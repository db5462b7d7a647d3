//! Port for at-most-once badge awards.

use async_trait::async_trait;

use crate::domain::badge::BadgeAward;
use crate::domain::ids::UserId;

/// Errors raised by badge award store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BadgeAwardStoreError {
    /// Store connection could not be established.
    #[error("badge award store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("badge award store query failed: {message}")]
    Query { message: String },
}

impl BadgeAwardStoreError {
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

/// Port for badge award persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgeAwardStore: Send + Sync {
    /// Insert an award unless one exists for `(user, badge)`.
    ///
    /// The uniqueness constraint is the actual duplicate guard: the
    /// evaluator may be invoked redundantly (retries, concurrent
    /// completions) and at most one row results.
    async fn insert_once(&self, award: &BadgeAward) -> Result<bool, BadgeAwardStoreError>;

    /// All awards held by a user, oldest first.
    async fn awards_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BadgeAward>, BadgeAwardStoreError>;
}

/// Fixture store: inserts report success, users hold no awards.
#[derive(Debug, Default)]
pub struct FixtureBadgeAwardStore;

#[async_trait]
impl BadgeAwardStore for FixtureBadgeAwardStore {
    async fn insert_once(&self, _award: &BadgeAward) -> Result<bool, BadgeAwardStoreError> {
        Ok(true)
    }

    async fn awards_for_user(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<BadgeAward>, BadgeAwardStoreError> {
        Ok(Vec::new())
    }
}
