//! PostgreSQL adapters for the engine's storage ports.
//!
//! Each adapter holds a shared `diesel-async` bb8 pool and translates
//! Diesel errors into its port's error enum. Conditional writes lean on
//! database constraints: `ON CONFLICT DO NOTHING` for the idempotent
//! inserts, a guarded `UPDATE` for the capacity counter, and composite
//! primary keys as the uniqueness guards.

mod diesel_action_ledger;
mod diesel_badge_award_store;
mod diesel_registration_ledger;
mod diesel_reputation_store;
mod diesel_snapshot_store;
mod models;
mod pool;
pub mod schema;

pub use diesel_action_ledger::DieselActionLedger;
pub use diesel_badge_award_store::DieselBadgeAwardStore;
pub use diesel_registration_ledger::DieselRegistrationLedger;
pub use diesel_reputation_store::DieselReputationStore;
pub use diesel_snapshot_store::DieselSnapshotStore;
pub use models::RowConversionError;
pub use pool::{DbConnection, DbPool, PoolConfig, PoolError, checkout};
