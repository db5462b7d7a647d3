//! Diesel table definitions for the engine's PostgreSQL schema.
//!
//! Kept in sync by hand with the SQL under `migrations/`.

diesel::table! {
    events (id) {
        id -> Uuid,
        community_id -> Uuid,
        #[max_length = 64]
        kind -> Varchar,
        scheduled_at -> Timestamptz,
        capacity -> Int4,
        registered_count -> Int4,
        #[max_length = 16]
        lifecycle -> Varchar,
        organizer_id -> Uuid,
    }
}

diesel::table! {
    event_registrations (event_id, user_id) {
        event_id -> Uuid,
        user_id -> Uuid,
        registered_at -> Timestamptz,
        attended -> Bool,
    }
}

diesel::table! {
    action_records (id) {
        id -> Uuid,
        #[max_length = 128]
        dedupe_key -> Varchar,
        user_id -> Uuid,
        community_id -> Uuid,
        #[max_length = 64]
        kind -> Varchar,
        raw_metrics -> Jsonb,
        occurred_at -> Timestamptz,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    reputation_entries (source_action_id) {
        source_action_id -> Uuid,
        user_id -> Uuid,
        points -> Int4,
        awarded_at -> Timestamptz,
    }
}

diesel::table! {
    community_score_snapshots (community_id, window, window_end) {
        community_id -> Uuid,
        #[max_length = 16]
        window -> Varchar,
        window_end -> Timestamptz,
        event_count -> Int8,
        participant_count -> Int8,
        weighted_impact -> Float8,
        score -> Float8,
        unweighted_records -> Int8,
        last_activity -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    badge_awards (user_id, badge_id) {
        user_id -> Uuid,
        #[max_length = 64]
        badge_id -> Varchar,
        awarded_at -> Timestamptz,
        progress_at_award -> Float8,
    }
}

diesel::joinable!(event_registrations -> events (event_id));

diesel::allow_tables_to_appear_in_same_query!(
    events,
    event_registrations,
    action_records,
    reputation_entries,
    community_score_snapshots,
    badge_awards,
);
