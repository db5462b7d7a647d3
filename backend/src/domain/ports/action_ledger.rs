//! Port for the append-only action ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::action::{ActionRecord, NewActionRecord};
use crate::domain::ids::{ActionId, CommunityId, UserId};

/// Errors raised by action ledger adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionLedgerError {
    /// Ledger connection could not be established.
    #[error("action ledger connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("action ledger query failed: {message}")]
    Query { message: String },
    /// Stored data failed to round-trip through the domain types.
    #[error("action ledger returned corrupt data: {message}")]
    Corrupt { message: String },
}

impl ActionLedgerError {
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

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Outcome of an idempotent append.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The record was inserted.
    Inserted(ActionRecord),
    /// A record with the same dedupe key already exists; the ledger is
    /// unchanged and the existing record is returned.
    Duplicate(ActionRecord),
}

impl AppendOutcome {
    /// The record backing this outcome, inserted or pre-existing.
    #[must_use]
    pub fn record(&self) -> &ActionRecord {
        match self {
            Self::Inserted(record) | Self::Duplicate(record) => record,
        }
    }

    /// True when the append created a new row.
    #[must_use]
    pub fn inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Port for the append-only, deduplicated action ledger.
///
/// The ledger never updates or deletes rows; corrections are modelled as
/// new compensating records. The dedupe-key insert must be a single
/// conditional write so concurrent appends of the same key leave exactly
/// one row.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionLedger: Send + Sync {
    /// Append a record, deduplicated by its key.
    async fn append(&self, new: NewActionRecord) -> Result<AppendOutcome, ActionLedgerError>;

    /// Fetch a record by id.
    async fn find(&self, id: ActionId) -> Result<Option<ActionRecord>, ActionLedgerError>;

    /// All records for a user, oldest first.
    async fn records_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError>;

    /// Records for a community with `occurred_at` in `(start, end]`,
    /// oldest first.
    async fn records_for_community(
        &self,
        community_id: CommunityId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError>;

    /// Every community that has at least one ledger record.
    async fn communities(&self) -> Result<Vec<CommunityId>, ActionLedgerError>;
}

/// Fixture ledger: appends succeed, queries come back empty.
#[derive(Debug, Default)]
pub struct FixtureActionLedger;

#[async_trait]
impl ActionLedger for FixtureActionLedger {
    async fn append(&self, new: NewActionRecord) -> Result<AppendOutcome, ActionLedgerError> {
        let recorded_at = new.occurred_at;
        Ok(AppendOutcome::Inserted(ActionRecord::from_new(
            new,
            ActionId::random(),
            recorded_at,
        )))
    }

    async fn find(&self, _id: ActionId) -> Result<Option<ActionRecord>, ActionLedgerError> {
        Ok(None)
    }

    async fn records_for_user(
        &self,
        _user_id: UserId,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        Ok(Vec::new())
    }

    async fn records_for_community(
        &self,
        _community_id: CommunityId,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<ActionRecord>, ActionLedgerError> {
        Ok(Vec::new())
    }

    async fn communities(&self) -> Result<Vec<CommunityId>, ActionLedgerError> {
        Ok(Vec::new())
    }
}
