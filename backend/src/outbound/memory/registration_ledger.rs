//! In-process registration ledger.
//!
//! The whole check-and-increment runs under one mutex acquisition, which
//! makes it a genuine atomic compare-and-act: concurrent registrants
//! serialise on the lock and the capacity invariant can never be violated
//! by interleaving. No await point sits inside the critical section.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::event::{Event, EventLifecycle, Registration};
use crate::domain::ids::{EventId, UserId};
use crate::domain::ports::{
    RegistrationLedger, RegistrationLedgerError, RegistrationOutcome, UnregisterOutcome,
};

#[derive(Debug)]
struct EventSlot {
    event: Event,
    registrants: HashMap<UserId, Registration>,
}

/// Mutex-serialised registration ledger.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationLedger {
    slots: Mutex<HashMap<EventId, EventSlot>>,
}

impl InMemoryRegistrationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<EventId, EventSlot>>, RegistrationLedgerError>
    {
        self.slots
            .lock()
            .map_err(|_| RegistrationLedgerError::query("registration ledger lock poisoned"))
    }
}

#[async_trait]
impl RegistrationLedger for InMemoryRegistrationLedger {
    async fn create_event(&self, event: &Event) -> Result<(), RegistrationLedgerError> {
        let mut slots = self.lock()?;
        slots.insert(
            event.id,
            EventSlot {
                event: event.clone(),
                registrants: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn find_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Event>, RegistrationLedgerError> {
        let slots = self.lock()?;
        Ok(slots.get(&event_id).map(|slot| slot.event.clone()))
    }

    async fn try_register(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<RegistrationOutcome, RegistrationLedgerError> {
        let mut slots = self.lock()?;
        let slot = slots
            .get_mut(&event_id)
            .ok_or(RegistrationLedgerError::EventNotFound { event_id })?;

        if !slot.event.lifecycle.accepts_registration_changes() {
            return Err(RegistrationLedgerError::EventClosed { event_id });
        }
        if slot.registrants.contains_key(&user_id) {
            return Ok(RegistrationOutcome::AlreadyRegistered {
                current_count: slot.event.registered_count,
            });
        }
        if slot.event.registered_count >= slot.event.capacity {
            return Err(RegistrationLedgerError::CapacityExceeded {
                event_id,
                capacity: slot.event.capacity,
            });
        }

        slot.registrants.insert(
            user_id,
            Registration {
                event_id,
                user_id,
                registered_at: at,
                attended: false,
            },
        );
        slot.event.registered_count += 1;
        Ok(RegistrationOutcome::Accepted {
            current_count: slot.event.registered_count,
        })
    }

    async fn unregister(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<UnregisterOutcome, RegistrationLedgerError> {
        let mut slots = self.lock()?;
        let slot = slots
            .get_mut(&event_id)
            .ok_or(RegistrationLedgerError::EventNotFound { event_id })?;

        if !slot.event.lifecycle.accepts_registration_changes() {
            return Err(RegistrationLedgerError::EventClosed { event_id });
        }
        if slot.registrants.remove(&user_id).is_none() {
            return Ok(UnregisterOutcome::NotRegistered);
        }
        slot.event.registered_count = slot.event.registered_count.saturating_sub(1);
        Ok(UnregisterOutcome::Removed {
            current_count: slot.event.registered_count,
        })
    }

    async fn set_lifecycle(
        &self,
        event_id: EventId,
        lifecycle: EventLifecycle,
    ) -> Result<(), RegistrationLedgerError> {
        let mut slots = self.lock()?;
        let slot = slots
            .get_mut(&event_id)
            .ok_or(RegistrationLedgerError::EventNotFound { event_id })?;
        slot.event.lifecycle = lifecycle;
        Ok(())
    }
}
