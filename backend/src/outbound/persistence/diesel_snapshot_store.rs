//! PostgreSQL-backed `SnapshotStore` using Diesel.
//!
//! Snapshots are keyed `(community_id, window, window_end)`; a rerun of
//! the same window upserts in place so scheduled recomputation is
//! idempotent. `latest_for_window` uses `DISTINCT ON` to pick the newest
//! `window_end` per community in one query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{SnapshotStore, SnapshotStoreError};
use crate::domain::{CommunityId, CommunityScoreSnapshot, WindowKind};

use super::models::SnapshotRow;
use super::pool::{DbPool, PoolError, checkout};
use super::schema::community_score_snapshots;

/// Diesel-backed implementation of the `SnapshotStore` port.
#[derive(Clone)]
pub struct DieselSnapshotStore {
    pool: DbPool,
}

impl DieselSnapshotStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> SnapshotStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            SnapshotStoreError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> SnapshotStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(%other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            SnapshotStoreError::connection("database connection error")
        }
        other => SnapshotStoreError::query(other.to_string()),
    }
}

fn row_to_snapshot(row: SnapshotRow) -> Result<CommunityScoreSnapshot, SnapshotStoreError> {
    row.into_domain()
        .map_err(|err| SnapshotStoreError::query(err.to_string()))
}

#[async_trait]
impl SnapshotStore for DieselSnapshotStore {
    async fn upsert(&self, snapshot: &CommunityScoreSnapshot) -> Result<(), SnapshotStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row = SnapshotRow::from_domain(snapshot);
        diesel::insert_into(community_score_snapshots::table)
            .values(&row)
            .on_conflict((
                community_score_snapshots::community_id,
                community_score_snapshots::window,
                community_score_snapshots::window_end,
            ))
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find(
        &self,
        community_id: CommunityId,
        window: WindowKind,
        window_end: DateTime<Utc>,
    ) -> Result<Option<CommunityScoreSnapshot>, SnapshotStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: Option<SnapshotRow> = community_score_snapshots::table
            .find((community_id.as_uuid(), window.as_str(), window_end))
            .select(SnapshotRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_snapshot).transpose()
    }

    async fn latest_for_window(
        &self,
        window: WindowKind,
    ) -> Result<Vec<CommunityScoreSnapshot>, SnapshotStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<SnapshotRow> = community_score_snapshots::table
            .filter(community_score_snapshots::window.eq(window.as_str()))
            .order((
                community_score_snapshots::community_id.asc(),
                community_score_snapshots::window_end.desc(),
            ))
            .distinct_on(community_score_snapshots::community_id)
            .select(SnapshotRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_snapshot).collect()
    }
}
