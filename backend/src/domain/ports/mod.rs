//! Domain ports for the hexagonal boundary.
//!
//! One file per port. Each port ships a `thiserror` error enum, a
//! `Fixture*` implementation for tests that do not exercise it, and (under
//! `cfg(test)`) a mockall mock.

mod action_ledger;
mod badge_award_store;
mod baseline_source;
mod impact_model;
mod notifier;
mod registration_ledger;
mod reputation_store;
mod snapshot_store;

#[cfg(test)]
pub use action_ledger::MockActionLedger;
pub use action_ledger::{ActionLedger, ActionLedgerError, AppendOutcome, FixtureActionLedger};
#[cfg(test)]
pub use badge_award_store::MockBadgeAwardStore;
pub use badge_award_store::{BadgeAwardStore, BadgeAwardStoreError, FixtureBadgeAwardStore};
#[cfg(test)]
pub use baseline_source::MockBaselineSource;
pub use baseline_source::{BaselineSource, BaselineSourceError, FixtureBaselineSource};
#[cfg(test)]
pub use impact_model::MockImpactModel;
pub use impact_model::{FixtureImpactModel, ImpactModel, ImpactModelError};
#[cfg(test)]
pub use notifier::MockNotificationDispatcher;
pub use notifier::{
    FixtureNotificationDispatcher, NotificationCategory, NotificationDispatcher, NotificationError,
};
#[cfg(test)]
pub use registration_ledger::MockRegistrationLedger;
pub use registration_ledger::{
    FixtureRegistrationLedger, RegistrationLedger, RegistrationLedgerError, RegistrationOutcome,
    UnregisterOutcome,
};
#[cfg(test)]
pub use reputation_store::MockReputationStore;
pub use reputation_store::{FixtureReputationStore, ReputationStore, ReputationStoreError};
#[cfg(test)]
pub use snapshot_store::MockSnapshotStore;
pub use snapshot_store::{FixtureSnapshotStore, SnapshotStore, SnapshotStoreError};
