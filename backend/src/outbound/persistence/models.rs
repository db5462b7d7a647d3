//! Row structs bridging the PostgreSQL schema and the domain model.
//!
//! Conversions are fallible in the database-to-domain direction because
//! enumerations and keys are stored as text; a row that fails to parse
//! indicates schema drift and surfaces as a query error.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    ActionId, ActionKind, ActionRecord, BadgeAward, BadgeId, CommunityId, CommunityScoreSnapshot,
    DedupeKey, Event, EventId, EventLifecycle, RawMetrics, Registration, ReputationEntry, UserId,
    WindowKind,
};

use super::schema::{
    action_records, badge_awards, community_score_snapshots, event_registrations, events,
    reputation_entries,
};

/// Raised when a stored value no longer maps onto the domain model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored {column} value {value:?} does not map to the domain model")]
pub struct RowConversionError {
    pub column: &'static str,
    pub value: String,
}

impl RowConversionError {
    fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

fn lifecycle_to_str(lifecycle: EventLifecycle) -> &'static str {
    match lifecycle {
        EventLifecycle::Upcoming => "upcoming",
        EventLifecycle::Ongoing => "ongoing",
        EventLifecycle::Completed => "completed",
        EventLifecycle::Cancelled => "cancelled",
    }
}

fn lifecycle_from_str(value: &str) -> Result<EventLifecycle, RowConversionError> {
    match value {
        "upcoming" => Ok(EventLifecycle::Upcoming),
        "ongoing" => Ok(EventLifecycle::Ongoing),
        "completed" => Ok(EventLifecycle::Completed),
        "cancelled" => Ok(EventLifecycle::Cancelled),
        other => Err(RowConversionError::new("lifecycle", other)),
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: uuid::Uuid,
    pub community_id: uuid::Uuid,
    pub kind: String,
    pub scheduled_at: DateTime<Utc>,
    pub capacity: i32,
    pub registered_count: i32,
    pub lifecycle: String,
    pub organizer_id: uuid::Uuid,
}

impl EventRow {
    pub fn from_domain(event: &Event) -> Self {
        Self {
            id: event.id.as_uuid(),
            community_id: event.community_id.as_uuid(),
            kind: event.kind.as_str().to_owned(),
            scheduled_at: event.scheduled_at,
            capacity: i32::try_from(event.capacity).unwrap_or(i32::MAX),
            registered_count: i32::try_from(event.registered_count).unwrap_or(i32::MAX),
            lifecycle: lifecycle_to_str(event.lifecycle).to_owned(),
            organizer_id: event.organizer_id.as_uuid(),
        }
    }

    pub fn into_domain(self) -> Result<Event, RowConversionError> {
        let kind: ActionKind = self
            .kind
            .parse()
            .map_err(|_| RowConversionError::new("kind", &self.kind))?;
        let lifecycle = lifecycle_from_str(&self.lifecycle)?;
        Ok(Event {
            id: EventId::from_uuid(self.id),
            community_id: CommunityId::from_uuid(self.community_id),
            kind,
            scheduled_at: self.scheduled_at,
            capacity: u32::try_from(self.capacity.max(0)).unwrap_or(0),
            registered_count: u32::try_from(self.registered_count.max(0)).unwrap_or(0),
            lifecycle,
            organizer_id: UserId::from_uuid(self.organizer_id),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = event_registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RegistrationRow {
    pub event_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub registered_at: DateTime<Utc>,
    pub attended: bool,
}

impl RegistrationRow {
    pub fn from_domain(registration: &Registration) -> Self {
        Self {
            event_id: registration.event_id.as_uuid(),
            user_id: registration.user_id.as_uuid(),
            registered_at: registration.registered_at,
            attended: registration.attended,
        }
    }

    pub fn into_domain(self) -> Registration {
        Registration {
            event_id: EventId::from_uuid(self.event_id),
            user_id: UserId::from_uuid(self.user_id),
            registered_at: self.registered_at,
            attended: self.attended,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = action_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ActionRecordRow {
    pub id: uuid::Uuid,
    pub dedupe_key: String,
    pub user_id: uuid::Uuid,
    pub community_id: uuid::Uuid,
    pub kind: String,
    pub raw_metrics: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionRecordRow {
    pub fn from_domain(record: &ActionRecord) -> Self {
        Self {
            id: record.id.as_uuid(),
            dedupe_key: record.dedupe_key.as_str().to_owned(),
            user_id: record.user_id.as_uuid(),
            community_id: record.community_id.as_uuid(),
            kind: record.kind.as_str().to_owned(),
            raw_metrics: serde_json::to_value(&record.raw_metrics)
                .unwrap_or(serde_json::Value::Null),
            occurred_at: record.occurred_at,
            recorded_at: record.recorded_at,
        }
    }

    pub fn into_domain(self) -> Result<ActionRecord, RowConversionError> {
        let kind: ActionKind = self
            .kind
            .parse()
            .map_err(|_| RowConversionError::new("kind", &self.kind))?;
        let dedupe_key = DedupeKey::try_from(self.dedupe_key.clone())
            .map_err(|_| RowConversionError::new("dedupe_key", &self.dedupe_key))?;
        let raw_metrics: RawMetrics = serde_json::from_value(self.raw_metrics.clone())
            .map_err(|_| RowConversionError::new("raw_metrics", self.raw_metrics.to_string()))?;
        Ok(ActionRecord {
            id: ActionId::from_uuid(self.id),
            dedupe_key,
            user_id: UserId::from_uuid(self.user_id),
            community_id: CommunityId::from_uuid(self.community_id),
            kind,
            raw_metrics,
            occurred_at: self.occurred_at,
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reputation_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReputationEntryRow {
    pub source_action_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub points: i32,
    pub awarded_at: DateTime<Utc>,
}

impl ReputationEntryRow {
    pub fn from_domain(entry: &ReputationEntry) -> Self {
        Self {
            source_action_id: entry.source_action_id.as_uuid(),
            user_id: entry.user_id.as_uuid(),
            points: i32::try_from(entry.points).unwrap_or(i32::MAX),
            awarded_at: entry.awarded_at,
        }
    }

    pub fn into_domain(self) -> ReputationEntry {
        ReputationEntry {
            user_id: UserId::from_uuid(self.user_id),
            source_action_id: ActionId::from_uuid(self.source_action_id),
            points: u32::try_from(self.points.max(0)).unwrap_or(0),
            awarded_at: self.awarded_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = community_score_snapshots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SnapshotRow {
    pub community_id: uuid::Uuid,
    pub window: String,
    pub window_end: DateTime<Utc>,
    pub event_count: i64,
    pub participant_count: i64,
    pub weighted_impact: f64,
    pub score: f64,
    pub unweighted_records: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl SnapshotRow {
    pub fn from_domain(snapshot: &CommunityScoreSnapshot) -> Self {
        Self {
            community_id: snapshot.community_id.as_uuid(),
            window: snapshot.window.as_str().to_owned(),
            window_end: snapshot.window_end,
            event_count: i64::try_from(snapshot.event_count).unwrap_or(i64::MAX),
            participant_count: i64::try_from(snapshot.participant_count).unwrap_or(i64::MAX),
            weighted_impact: snapshot.weighted_impact,
            score: snapshot.score,
            unweighted_records: i64::try_from(snapshot.unweighted_records).unwrap_or(i64::MAX),
            last_activity: snapshot.last_activity,
        }
    }

    pub fn into_domain(self) -> Result<CommunityScoreSnapshot, RowConversionError> {
        let window: WindowKind = self
            .window
            .parse()
            .map_err(|_| RowConversionError::new("window", &self.window))?;
        Ok(CommunityScoreSnapshot {
            community_id: CommunityId::from_uuid(self.community_id),
            window,
            window_end: self.window_end,
            event_count: u64::try_from(self.event_count.max(0)).unwrap_or(0),
            participant_count: u64::try_from(self.participant_count.max(0)).unwrap_or(0),
            weighted_impact: self.weighted_impact,
            score: self.score,
            unweighted_records: u64::try_from(self.unweighted_records.max(0)).unwrap_or(0),
            last_activity: self.last_activity,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = badge_awards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BadgeAwardRow {
    pub user_id: uuid::Uuid,
    pub badge_id: String,
    pub awarded_at: DateTime<Utc>,
    pub progress_at_award: f64,
}

impl BadgeAwardRow {
    pub fn from_domain(award: &BadgeAward) -> Self {
        Self {
            user_id: award.user_id.as_uuid(),
            badge_id: award.badge_id.as_str().to_owned(),
            awarded_at: award.awarded_at,
            progress_at_award: award.progress_at_award,
        }
    }

    pub fn into_domain(self) -> BadgeAward {
        BadgeAward {
            user_id: UserId::from_uuid(self.user_id),
            badge_id: BadgeId::new(self.badge_id),
            awarded_at: self.awarded_at,
            progress_at_award: self.progress_at_award,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lifecycle_round_trips_through_text() {
        for lifecycle in [
            EventLifecycle::Upcoming,
            EventLifecycle::Ongoing,
            EventLifecycle::Completed,
            EventLifecycle::Cancelled,
        ] {
            let text = lifecycle_to_str(lifecycle);
            assert_eq!(lifecycle_from_str(text), Ok(lifecycle));
        }
        assert!(lifecycle_from_str("archived").is_err());
    }

    #[test]
    fn event_row_preserves_domain_fields() {
        let event = Event::try_new(
            EventId::random(),
            CommunityId::random(),
            ActionKind::Cleanup,
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("valid timestamp"),
            25,
            UserId::random(),
        )
        .expect("valid event");
        let restored = EventRow::from_domain(&event)
            .into_domain()
            .expect("row converts back");
        assert_eq!(restored, event);
    }

    #[test]
    fn unknown_kind_surfaces_as_conversion_error() {
        let mut row = EventRow::from_domain(
            &Event::try_new(
                EventId::random(),
                CommunityId::random(),
                ActionKind::Recycling,
                Utc::now(),
                1,
                UserId::random(),
            )
            .expect("valid event"),
        );
        row.kind = "litter-sorting".to_owned();
        let err = row.into_domain().expect_err("unknown kind rejected");
        assert_eq!(err.column, "kind");
    }
}
