//! In-process adapters for the engine's driven ports.
//!
//! Every conditional write (capacity check-and-increment, dedupe insert,
//! reputation insert, badge insert) runs under a single mutex acquisition
//! with no await inside the critical section, satisfying the same
//! atomicity contract the PostgreSQL adapters satisfy with guarded SQL.
//! Used for single-node deployments without a database and throughout the
//! test suite.

mod action_ledger;
mod badge_award_store;
mod registration_ledger;
mod reputation_store;
mod snapshot_store;

pub use action_ledger::InMemoryActionLedger;
pub use badge_award_store::InMemoryBadgeAwardStore;
pub use registration_ledger::InMemoryRegistrationLedger;
pub use reputation_store::InMemoryReputationStore;
pub use snapshot_store::InMemorySnapshotStore;
