//! PostgreSQL-backed `RegistrationLedger` using Diesel.
//!
//! The capacity invariant is enforced inside a single transaction: the
//! registration row is inserted first (`ON CONFLICT DO NOTHING` detects
//! duplicates), then the event counter is bumped by a guarded `UPDATE`
//! that only matches while `registered_count < capacity`. The row lock
//! taken by the update serialises concurrent claims; when the guard
//! matches zero rows the freshly inserted registration is deleted again
//! before the transaction commits, so a full event never leaks a row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{
    RegistrationLedger, RegistrationLedgerError, RegistrationOutcome, UnregisterOutcome,
};
use crate::domain::{Event, EventId, EventLifecycle, UserId};

use super::models::{EventRow, RegistrationRow};
use super::pool::{DbPool, PoolError, checkout};
use super::schema::{event_registrations, events};

/// Diesel-backed implementation of the `RegistrationLedger` port.
#[derive(Clone)]
pub struct DieselRegistrationLedger {
    pool: DbPool,
}

impl DieselRegistrationLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RegistrationLedgerError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            RegistrationLedgerError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> RegistrationLedgerError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(%other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RegistrationLedgerError::connection("database connection error")
        }
        other => RegistrationLedgerError::query(other.to_string()),
    }
}

/// Transaction result for the registration paths; capacity compensation
/// happens inside the transaction so every variant commits cleanly.
enum TxVerdict {
    NotFound,
    Closed,
    Accepted { current_count: i32 },
    AlreadyRegistered { current_count: i32 },
    NotRegistered,
    Full { capacity: i32 },
}

fn count_from_row(current_count: i32) -> u32 {
    u32::try_from(current_count.max(0)).unwrap_or(0)
}

fn lifecycle_is_open(lifecycle: &str) -> bool {
    matches!(lifecycle, "upcoming" | "ongoing")
}

#[async_trait]
impl RegistrationLedger for DieselRegistrationLedger {
    async fn create_event(&self, event: &Event) -> Result<(), RegistrationLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        diesel::insert_into(events::table)
            .values(EventRow::from_domain(event))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn find_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Event>, RegistrationLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let row: Option<EventRow> = events::table
            .find(event_id.as_uuid())
            .select(EventRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(|row| {
            row.into_domain()
                .map_err(|err| RegistrationLedgerError::query(err.to_string()))
        })
        .transpose()
    }

    async fn try_register(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, RegistrationLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;

        let verdict = conn
            .transaction::<TxVerdict, diesel::result::Error, _>(|conn| {
                async move {
                    let header: Option<(i32, String)> = events::table
                        .find(event_id.as_uuid())
                        .select((events::capacity, events::lifecycle))
                        .first(conn)
                        .await
                        .optional()?;
                    let Some((capacity, lifecycle)) = header else {
                        return Ok(TxVerdict::NotFound);
                    };
                    if !lifecycle_is_open(&lifecycle) {
                        return Ok(TxVerdict::Closed);
                    }

                    let row = RegistrationRow {
                        event_id: event_id.as_uuid(),
                        user_id: user_id.as_uuid(),
                        registered_at: at,
                        attended: false,
                    };
                    let inserted = diesel::insert_into(event_registrations::table)
                        .values(&row)
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        let current_count: i32 = events::table
                            .find(event_id.as_uuid())
                            .select(events::registered_count)
                            .first(conn)
                            .await?;
                        return Ok(TxVerdict::AlreadyRegistered { current_count });
                    }

                    let claimed: Option<i32> = diesel::update(
                        events::table.filter(
                            events::id
                                .eq(event_id.as_uuid())
                                .and(events::registered_count.lt(events::capacity)),
                        ),
                    )
                    .set(events::registered_count.eq(events::registered_count + 1))
                    .returning(events::registered_count)
                    .get_result(conn)
                    .await
                    .optional()?;

                    match claimed {
                        Some(current_count) => Ok(TxVerdict::Accepted { current_count }),
                        None => {
                            diesel::delete(
                                event_registrations::table.filter(
                                    event_registrations::event_id
                                        .eq(event_id.as_uuid())
                                        .and(event_registrations::user_id.eq(user_id.as_uuid())),
                                ),
                            )
                            .execute(conn)
                            .await?;
                            Ok(TxVerdict::Full { capacity })
                        }
                    }
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        match verdict {
            TxVerdict::NotFound => Err(RegistrationLedgerError::EventNotFound { event_id }),
            TxVerdict::Closed => Err(RegistrationLedgerError::EventClosed { event_id }),
            TxVerdict::Full { capacity } => Err(RegistrationLedgerError::CapacityExceeded {
                event_id,
                capacity: count_from_row(capacity),
            }),
            TxVerdict::Accepted { current_count } => Ok(RegistrationOutcome::Accepted {
                current_count: count_from_row(current_count),
            }),
            TxVerdict::AlreadyRegistered { current_count } => {
                Ok(RegistrationOutcome::AlreadyRegistered {
                    current_count: count_from_row(current_count),
                })
            }
            TxVerdict::NotRegistered => Err(RegistrationLedgerError::query(
                "unexpected unregister verdict during registration",
            )),
        }
    }

    async fn unregister(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<UnregisterOutcome, RegistrationLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;

        let verdict = conn
            .transaction::<TxVerdict, diesel::result::Error, _>(|conn| {
                async move {
                    let lifecycle: Option<String> = events::table
                        .find(event_id.as_uuid())
                        .select(events::lifecycle)
                        .first(conn)
                        .await
                        .optional()?;
                    let Some(lifecycle) = lifecycle else {
                        return Ok(TxVerdict::NotFound);
                    };
                    if !lifecycle_is_open(&lifecycle) {
                        return Ok(TxVerdict::Closed);
                    }

                    let deleted = diesel::delete(
                        event_registrations::table.filter(
                            event_registrations::event_id
                                .eq(event_id.as_uuid())
                                .and(event_registrations::user_id.eq(user_id.as_uuid())),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    if deleted == 0 {
                        return Ok(TxVerdict::NotRegistered);
                    }

                    let current_count: i32 = diesel::update(events::table.find(event_id.as_uuid()))
                        .set(events::registered_count.eq(events::registered_count - 1))
                        .returning(events::registered_count)
                        .get_result(conn)
                        .await?;
                    Ok(TxVerdict::Accepted { current_count })
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        match verdict {
            TxVerdict::NotFound => Err(RegistrationLedgerError::EventNotFound { event_id }),
            TxVerdict::Closed => Err(RegistrationLedgerError::EventClosed { event_id }),
            TxVerdict::NotRegistered => Ok(UnregisterOutcome::NotRegistered),
            TxVerdict::Accepted { current_count } => Ok(UnregisterOutcome::Removed {
                current_count: count_from_row(current_count),
            }),
            TxVerdict::Full { .. } | TxVerdict::AlreadyRegistered { .. } => Err(
                RegistrationLedgerError::query("unexpected registration verdict during unregister"),
            ),
        }
    }

    async fn set_lifecycle(
        &self,
        event_id: EventId,
        lifecycle: EventLifecycle,
    ) -> Result<(), RegistrationLedgerError> {
        let mut conn = checkout(&self.pool).await.map_err(map_pool_error)?;
        let text = match lifecycle {
            EventLifecycle::Upcoming => "upcoming",
            EventLifecycle::Ongoing => "ongoing",
            EventLifecycle::Completed => "completed",
            EventLifecycle::Cancelled => "cancelled",
        };
        let updated = diesel::update(events::table.find(event_id.as_uuid()))
            .set(events::lifecycle.eq(text))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if updated == 0 {
            return Err(RegistrationLedgerError::EventNotFound { event_id });
        }
        Ok(())
    }
}
