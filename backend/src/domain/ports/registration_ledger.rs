//! Port for the event capacity ledger.
//!
//! The check-and-increment contract is the foundation of the engine:
//! implementations must perform it as one atomic operation (a single
//! locked section in memory, a guarded transaction in PostgreSQL), never
//! as a read followed by a write across two round trips.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::event::{Event, EventLifecycle};
use crate::domain::ids::{EventId, UserId};

/// Errors raised by registration ledger adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationLedgerError {
    /// The event does not exist (or was administratively removed).
    #[error("event {event_id} not found")]
    EventNotFound { event_id: EventId },
    /// The event was already at capacity at the instant of commit.
    #[error("event {event_id} is at capacity ({capacity})")]
    CapacityExceeded { event_id: EventId, capacity: u32 },
    /// The event has completed or been cancelled.
    #[error("event {event_id} no longer accepts registration changes")]
    EventClosed { event_id: EventId },
    /// Ledger connection could not be established.
    #[error("registration ledger connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("registration ledger query failed: {message}")]
    Query { message: String },
}

impl RegistrationLedgerError {
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

/// Outcome of an atomic registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A slot was claimed; `current_count` includes this registrant.
    Accepted { current_count: u32 },
    /// The (event, user) pair already exists; the counter was untouched.
    AlreadyRegistered { current_count: u32 },
}

/// Outcome of an atomic unregistration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// The registration was removed and the counter decremented.
    Removed { current_count: u32 },
    /// No registration existed for the pair; nothing changed.
    NotRegistered,
}

/// Port for atomic, capacity-bounded event registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationLedger: Send + Sync {
    /// Store a new event.
    async fn create_event(&self, event: &Event) -> Result<(), RegistrationLedgerError>;

    /// Fetch an event by id.
    async fn find_event(&self, event_id: EventId)
    -> Result<Option<Event>, RegistrationLedgerError>;

    /// Atomically claim a slot for `(event_id, user_id)`.
    ///
    /// Succeeds only while `registered_count < capacity` at the instant of
    /// commit. A duplicate pair is reported without touching the counter.
    async fn try_register(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, RegistrationLedgerError>;

    /// Atomically release a slot if a registration exists and the event is
    /// still open.
    async fn unregister(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<UnregisterOutcome, RegistrationLedgerError>;

    /// Advance the event lifecycle.
    async fn set_lifecycle(
        &self,
        event_id: EventId,
        lifecycle: EventLifecycle,
    ) -> Result<(), RegistrationLedgerError>;
}

/// Fixture implementation for tests that do not exercise registration.
///
/// Events are never found and registrations are accepted with a count of
/// one.
#[derive(Debug, Default)]
pub struct FixtureRegistrationLedger;

#[async_trait]
impl RegistrationLedger for FixtureRegistrationLedger {
    async fn create_event(&self, _event: &Event) -> Result<(), RegistrationLedgerError> {
        Ok(())
    }

    async fn find_event(
        &self,
        _event_id: EventId,
    ) -> Result<Option<Event>, RegistrationLedgerError> {
        Ok(None)
    }

    async fn try_register(
        &self,
        _event_id: EventId,
        _user_id: UserId,
        _at: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, RegistrationLedgerError> {
        Ok(RegistrationOutcome::Accepted { current_count: 1 })
    }

    async fn unregister(
        &self,
        _event_id: EventId,
        _user_id: UserId,
    ) -> Result<UnregisterOutcome, RegistrationLedgerError> {
        Ok(UnregisterOutcome::NotRegistered)
    }

    async fn set_lifecycle(
        &self,
        _event_id: EventId,
        _lifecycle: EventLifecycle,
    ) -> Result<(), RegistrationLedgerError> {
        Ok(())
    }
}
