//! Event registration service.
//!
//! Thin driving service over the [`RegistrationLedger`] port: the ledger
//! adapter owns atomicity, this layer owns the outcome/error surface. A
//! duplicate registration is a successful, idempotent outcome; only a
//! full event or a closed lifecycle rejects.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::domain::error::Error;
use crate::domain::event::{Event, EventLifecycle};
use crate::domain::ids::{EventId, UserId};
use crate::domain::ports::{
    RegistrationLedger, RegistrationLedgerError, RegistrationOutcome, UnregisterOutcome,
};

/// Result of a registration attempt surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub accepted: bool,
    /// True when the pair already existed and nothing changed.
    pub already_registered: bool,
    pub current_count: u32,
}

/// Result of an unregistration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnregisterReceipt {
    pub removed: bool,
    pub current_count: Option<u32>,
}

/// Driving service for capacity-bounded event registration.
pub struct EventRegistrationService<L: ?Sized> {
    ledger: Arc<L>,
}

impl<L: ?Sized> Clone for EventRegistrationService<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
        }
    }
}

impl<L: ?Sized> EventRegistrationService<L> {
    /// Create a new service over the given ledger adapter.
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }
}

impl<L> EventRegistrationService<L>
where
    L: RegistrationLedger + ?Sized,
{
    fn map_ledger_error(error: RegistrationLedgerError) -> Error {
        match error {
            RegistrationLedgerError::EventNotFound { event_id } => {
                Error::not_found(format!("event {event_id} not found"))
            }
            RegistrationLedgerError::CapacityExceeded { event_id, capacity } => {
                Error::capacity_exceeded("event is at capacity")
                    .with_details(json!({ "eventId": event_id, "capacity": capacity }))
            }
            RegistrationLedgerError::EventClosed { event_id } => Error::conflict(format!(
                "event {event_id} no longer accepts registration changes"
            )),
            RegistrationLedgerError::Connection { message } => {
                Error::service_unavailable(format!("registration ledger unavailable: {message}"))
            }
            RegistrationLedgerError::Query { message } => {
                Error::internal(format!("registration ledger error: {message}"))
            }
        }
    }

    /// Store a new event.
    pub async fn create_event(&self, event: &Event) -> Result<(), Error> {
        self.ledger
            .create_event(event)
            .await
            .map_err(Self::map_ledger_error)
    }

    /// Fetch an event.
    pub async fn event(&self, event_id: EventId) -> Result<Event, Error> {
        self.ledger
            .find_event(event_id)
            .await
            .map_err(Self::map_ledger_error)?
            .ok_or_else(|| Error::not_found(format!("event {event_id} not found")))
    }

    /// Attempt to claim a slot.
    pub async fn register(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<RegistrationReceipt, Error> {
        let outcome = self
            .ledger
            .try_register(event_id, user_id, Utc::now())
            .await
            .map_err(Self::map_ledger_error)?;

        let receipt = match outcome {
            RegistrationOutcome::Accepted { current_count } => {
                info!(%event_id, %user_id, current_count, "registration accepted");
                RegistrationReceipt {
                    accepted: true,
                    already_registered: false,
                    current_count,
                }
            }
            RegistrationOutcome::AlreadyRegistered { current_count } => RegistrationReceipt {
                accepted: true,
                already_registered: true,
                current_count,
            },
        };
        Ok(receipt)
    }

    /// Attempt to release a slot.
    pub async fn unregister(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<UnregisterReceipt, Error> {
        let outcome = self
            .ledger
            .unregister(event_id, user_id)
            .await
            .map_err(Self::map_ledger_error)?;

        let receipt = match outcome {
            UnregisterOutcome::Removed { current_count } => {
                info!(%event_id, %user_id, current_count, "registration removed");
                UnregisterReceipt {
                    removed: true,
                    current_count: Some(current_count),
                }
            }
            UnregisterOutcome::NotRegistered => UnregisterReceipt {
                removed: false,
                current_count: None,
            },
        };
        Ok(receipt)
    }

    /// Advance an event's lifecycle.
    pub async fn set_lifecycle(
        &self,
        event_id: EventId,
        lifecycle: EventLifecycle,
    ) -> Result<(), Error> {
        self.ledger
            .set_lifecycle(event_id, lifecycle)
            .await
            .map_err(Self::map_ledger_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::MockRegistrationLedger;

    fn service(ledger: MockRegistrationLedger) -> EventRegistrationService<MockRegistrationLedger> {
        EventRegistrationService::new(Arc::new(ledger))
    }

    #[tokio::test]
    async fn accepted_registration_reports_current_count() {
        let mut ledger = MockRegistrationLedger::new();
        ledger
            .expect_try_register()
            .times(1)
            .return_once(|_, _, _| Ok(RegistrationOutcome::Accepted { current_count: 3 }));

        let receipt = service(ledger)
            .register(EventId::random(), UserId::random())
            .await
            .expect("registration succeeds");
        assert!(receipt.accepted);
        assert!(!receipt.already_registered);
        assert_eq!(receipt.current_count, 3);
    }

    #[tokio::test]
    async fn duplicate_registration_is_success_with_flag() {
        let mut ledger = MockRegistrationLedger::new();
        ledger
            .expect_try_register()
            .times(1)
            .return_once(|_, _, _| Ok(RegistrationOutcome::AlreadyRegistered { current_count: 3 }));

        let receipt = service(ledger)
            .register(EventId::random(), UserId::random())
            .await
            .expect("duplicate is not an error");
        assert!(receipt.accepted);
        assert!(receipt.already_registered);
    }

    #[tokio::test]
    async fn capacity_exceeded_maps_to_its_own_code() {
        let event_id = EventId::random();
        let mut ledger = MockRegistrationLedger::new();
        ledger.expect_try_register().times(1).return_once(move |_, _, _| {
            Err(RegistrationLedgerError::CapacityExceeded {
                event_id,
                capacity: 5,
            })
        });

        let error = service(ledger)
            .register(event_id, UserId::random())
            .await
            .expect_err("full event rejects");
        assert_eq!(error.code(), ErrorCode::CapacityExceeded);
    }

    #[tokio::test]
    async fn closed_event_maps_to_conflict() {
        let event_id = EventId::random();
        let mut ledger = MockRegistrationLedger::new();
        ledger
            .expect_unregister()
            .times(1)
            .return_once(move |_, _| Err(RegistrationLedgerError::EventClosed { event_id }));

        let error = service(ledger)
            .unregister(event_id, UserId::random())
            .await
            .expect_err("closed event rejects");
        assert_eq!(error.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn unregister_without_registration_is_a_no_op() {
        let mut ledger = MockRegistrationLedger::new();
        ledger
            .expect_unregister()
            .times(1)
            .return_once(|_, _| Ok(UnregisterOutcome::NotRegistered));

        let receipt = service(ledger)
            .unregister(EventId::random(), UserId::random())
            .await
            .expect("no-op succeeds");
        assert!(!receipt.removed);
        assert_eq!(receipt.current_count, None);
    }
}
