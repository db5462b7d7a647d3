//! PostgreSQL-backed `BadgeAwardStore` using Diesel.
//!
//! At-most-once awarding rests on the `(user_id, badge_id)` primary key;
//! concurrent evaluators racing the same badge leave exactly one row.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{BadgeAwardStore, BadgeAwardStoreError};
use crate::domain::{BadgeAward, UserId};

use super::models::BadgeAwardRow;
use super::pool::{DbPool, PoolError, checkout};
use super::schema::badge_awards;

/// Diesel-backed implementation of the `BadgeAwardStore` port.
#[derive(Clone)]
pub struct DieselBadgeAwardStore {
    pool: DbPool,
}

impl DieselBadgeAwardStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> BadgeAwardStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            BadgeAwardStoreError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> BadgeAwardStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(%other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            BadgeAwardStoreError::connection("database connection error")
        }
        other => BadgeAwardStoreError::query(other.to_string()),
    }
}

#[async_trait]
impl BadgeAwardStore for DieselBadgeAwardStore {
    async fn insert_once(&self, award: &BadgeAward) -> Result<bool, BadgeAwardStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(badge_awards::table)
            .values(BadgeAwardRow::from_domain(award))
            .on_conflict((badge_awards::user_id, badge_awards::badge_id))
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted > 0)
    }

    async fn awards_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<BadgeAward>, BadgeAwardStoreError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let rows: Vec<BadgeAwardRow> = badge_awards::table
            .filter(badge_awards::user_id.eq(user_id.as_uuid()))
            .order(badge_awards::awarded_at.asc())
            .select(BadgeAwardRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(BadgeAwardRow::into_domain).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_errors_map_to_connection_errors() {
        let err = map_pool_error(PoolError::checkout("pool exhausted"));
        assert!(matches!(err, BadgeAwardStoreError::Connection { .. }));
    }

    #[rstest]
    fn generic_diesel_errors_map_to_query_errors() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert!(matches!(err, BadgeAwardStoreError::Query { .. }));
    }
}
