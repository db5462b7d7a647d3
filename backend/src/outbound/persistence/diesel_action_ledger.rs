//! PostgreSQL-backed `ActionLedger` using Diesel.
//!
//! Appends are a single `INSERT ... ON CONFLICT (dedupe_key) DO NOTHING`;
//! when the conflict absorbs the write the pre-existing row is fetched and
//! reported as a duplicate. Rows are never updated or deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{ActionLedger, ActionLedgerError, AppendOutcome};
use crate::domain::{ActionId, ActionRecord, CommunityId, NewActionRecord, UserId};

use super::models::ActionRecordRow;
use super::pool::{DbPool, PoolError, checkout};
use super::schema::action_records;

/// Diesel-backed implementation of the `ActionLedger` port.
#[derive(Clone)]
pub struct DieselActionLedger {
    pool: DbPool,
}

impl DieselActionLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ActionLedgerError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ActionLedgerError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> ActionLedgerError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(%other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ActionLedgerError::connection("database connection error")
        }
        other => ActionLedgerError::query(other.to_string()),
    }
}

fn row_to_record(row: ActionRecordRow) -> Result<ActionRecord, ActionLedgerError> {
    row.into_domain()
        .map_err(|err| ActionLedgerError::corrupt(err.to_string()))
}

#[async_trait]
impl ActionLedger for DieselActionLedger {
    async fn append(&self, new: NewActionRecord) -> Result<AppendOutcome, ActionLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;

        let record = ActionRecord::from_new(new, ActionId::random(), Utc::now());
        let row = ActionRecordRow::from_domain(&record);
        let inserted = diesel::insert_into(action_records::table)
            .values(&row)
            .on_conflict(action_records::dedupe_key)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if inserted > 0 {
            return Ok(AppendOutcome::Inserted(record));
        }

        let existing: ActionRecordRow = action_records::table
            .filter(action_records::dedupe_key.eq(record.dedupe_key.as_str()))
            .select(ActionRecordRow::as_select())
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(AppendOutcome::Duplicate(row_to_record(existing)?))
    }

    async fn find(&self, id: ActionId) -> Result<Option<ActionRecord>, ActionLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: Option<ActionRecordRow> = action_records::table
            .find(id.as_uuid())
            .select(ActionRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_record).transpose()
    }

    async fn records_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<ActionRecordRow> = action_records::table
            .filter(action_records::user_id.eq(user_id.as_uuid()))
            .order(action_records::occurred_at.asc())
            .select(ActionRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn records_for_community(
        &self,
        community_id: CommunityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<ActionRecordRow> = action_records::table
            .filter(
                action_records::community_id
                    .eq(community_id.as_uuid())
                    .and(action_records::occurred_at.gt(start))
                    .and(action_records::occurred_at.le(end)),
            )
            .order(action_records::occurred_at.asc())
            .select(ActionRecordRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn communities(&self) -> Result<Vec<CommunityId>, ActionLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let ids: Vec<uuid::Uuid> = action_records::table
            .select(action_records::community_id)
            .distinct()
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(CommunityId::from_uuid).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool_error(PoolError::checkout("timed out"));
        assert!(matches!(err, ActionLedgerError::Connection { .. }));
    }

    #[rstest]
    fn generic_diesel_errors_map_to_query_errors() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, ActionLedgerError::Query { .. }));
    }
}
