//! Community events and their capacity invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use super::ids::{CommunityId, EventId, UserId};

/// Event lifecycle states.
///
/// Transitions are forward-only: `Upcoming → Ongoing → Completed`, with
/// `Cancelled` reachable from the first two. Completed and cancelled
/// events never reopen, and their registrations are kept as historical
/// record (soft delete only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventLifecycle {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventLifecycle {
    /// Whether registrations may still be created or withdrawn.
    #[must_use]
    pub fn accepts_registration_changes(self) -> bool {
        matches!(self, Self::Upcoming | Self::Ongoing)
    }
}

/// A scheduled community event with a fixed capacity.
///
/// ## Invariants
/// - `capacity ≥ 1`, fixed at creation.
/// - `0 ≤ registered_count ≤ capacity` on every write; the registration
///   ledger enforces this with a single atomic check-and-increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub community_id: CommunityId,
    pub kind: ActionKind,
    pub scheduled_at: DateTime<Utc>,
    pub capacity: u32,
    pub registered_count: u32,
    pub lifecycle: EventLifecycle,
    pub organizer_id: UserId,
}

/// Validation errors for [`Event::try_new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    #[error("event capacity must be at least 1")]
    ZeroCapacity,
}

impl Event {
    /// Validate and construct an upcoming event with no registrants.
    pub fn try_new(
        id: EventId,
        community_id: CommunityId,
        kind: ActionKind,
        scheduled_at: DateTime<Utc>,
        capacity: u32,
        organizer_id: UserId,
    ) -> Result<Self, EventValidationError> {
        if capacity == 0 {
            return Err(EventValidationError::ZeroCapacity);
        }
        Ok(Self {
            id,
            community_id,
            kind,
            scheduled_at,
            capacity,
            registered_count: 0,
            lifecycle: EventLifecycle::Upcoming,
            organizer_id,
        })
    }

    /// Remaining registration slots.
    #[must_use]
    pub fn remaining_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.registered_count)
    }
}

/// A confirmed (event, user) registration.
///
/// The pair is unique; once the event completes the row is historical
/// record and is never physically deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: EventId,
    pub user_id: UserId,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(capacity: u32) -> Result<Event, EventValidationError> {
        Event::try_new(
            EventId::random(),
            CommunityId::random(),
            ActionKind::Cleanup,
            Utc::now(),
            capacity,
            UserId::random(),
        )
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(sample_event(0), Err(EventValidationError::ZeroCapacity));
    }

    #[test]
    fn new_events_start_upcoming_and_empty() {
        let event = sample_event(5).expect("valid event");
        assert_eq!(event.lifecycle, EventLifecycle::Upcoming);
        assert_eq!(event.registered_count, 0);
        assert_eq!(event.remaining_capacity(), 5);
    }

    #[test]
    fn closed_lifecycles_reject_registration_changes() {
        assert!(EventLifecycle::Upcoming.accepts_registration_changes());
        assert!(EventLifecycle::Ongoing.accepts_registration_changes());
        assert!(!EventLifecycle::Completed.accepts_registration_changes());
        assert!(!EventLifecycle::Cancelled.accepts_registration_changes());
    }
}
