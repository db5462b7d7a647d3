//! PostgreSQL-backed `ReputationStore` using Diesel.
//!
//! The exactly-once guard is the primary key on `source_action_id`: the
//! conditional insert reports whether a row landed, and redeliveries are
//! absorbed without touching existing totals.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{ReputationStore, ReputationStoreError};
use crate::domain::{ReputationEntry, ReputationSummary, UserId};

use super::models::ReputationEntryRow;
use super::pool::{DbPool, PoolError, checkout};
use super::schema::reputation_entries;

/// Diesel-backed implementation of the `ReputationStore` port.
#[derive(Clone)]
pub struct DieselReputationStore {
    pool: DbPool,
}

impl DieselReputationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ReputationStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ReputationStoreError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> ReputationStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(%other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ReputationStoreError::connection("database connection error")
        }
        other => ReputationStoreError::query(other.to_string()),
    }
}

#[async_trait]
impl ReputationStore for DieselReputationStore {
    async fn insert_once(&self, entry: &ReputationEntry) -> Result<bool, ReputationStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(reputation_entries::table)
            .values(ReputationEntryRow::from_domain(entry))
            .on_conflict(reputation_entries::source_action_id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted > 0)
    }

    async fn summary_for_user(
        &self,
        user_id: UserId,
    ) -> Result<ReputationSummary, ReputationStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<ReputationEntryRow> = reputation_entries::table
            .filter(reputation_entries::user_id.eq(user_id.as_uuid()))
            .order(reputation_entries::awarded_at.asc())
            .select(ReputationEntryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let mut summary = ReputationSummary {
            user_id,
            total_points: 0,
            actions_completed: 0,
            last_activity: None,
        };
        for row in rows {
            let entry = row.into_domain();
            summary.total_points += u64::from(entry.points);
            summary.actions_completed += 1;
            summary.last_activity = Some(
                summary
                    .last_activity
                    .map_or(entry.awarded_at, |seen| seen.max(entry.awarded_at)),
            );
        }
        Ok(summary)
    }
}
