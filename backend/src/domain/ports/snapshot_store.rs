//! Port for immutable community score snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ids::CommunityId;
use crate::domain::scoring::{CommunityScoreSnapshot, WindowKind};

/// Errors raised by snapshot store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotStoreError {
    /// Store connection could not be established.
    #[error("snapshot store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("snapshot store query failed: {message}")]
    Query { message: String },
}

impl SnapshotStoreError {
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

/// Port for snapshot history.
///
/// Snapshots are keyed by `(community, window, window_end)`. `upsert`
/// overwrites the whole row for its key, making a rerun for the same
/// `window_end` total rather than divergent; rows for other keys are
/// never touched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write a snapshot, replacing any previous row for the same key.
    async fn upsert(&self, snapshot: &CommunityScoreSnapshot) -> Result<(), SnapshotStoreError>;

    /// Fetch the snapshot for an exact key, if written.
    async fn find(
        &self,
        community_id: CommunityId,
        window: WindowKind,
        window_end: DateTime<Utc>,
    ) -> Result<Option<CommunityScoreSnapshot>, SnapshotStoreError>;

    /// The most recent snapshot per community for a window kind.
    async fn latest_for_window(
        &self,
        window: WindowKind,
    ) -> Result<Vec<CommunityScoreSnapshot>, SnapshotStoreError>;
}

/// Fixture store: writes vanish, reads come back empty.
#[derive(Debug, Default)]
pub struct FixtureSnapshotStore;

#[async_trait]
impl SnapshotStore for FixtureSnapshotStore {
    async fn upsert(&self, _snapshot: &CommunityScoreSnapshot) -> Result<(), SnapshotStoreError> {
        Ok(())
    }

    async fn find(
        &self,
        _community_id: CommunityId,
        _window: WindowKind,
        _window_end: DateTime<Utc>,
    ) -> Result<Option<CommunityScoreSnapshot>, SnapshotStoreError> {
        Ok(None)
    }

    async fn latest_for_window(
        &self,
        _window: WindowKind,
    ) -> Result<Vec<CommunityScoreSnapshot>, SnapshotStoreError> {
        Ok(Vec::new())
    }
}
