//! Community score snapshots and the scoring policy seam.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionRecord;
use super::ids::CommunityId;
use super::weighting::WeightedFactor;

/// Leaderboard/aggregation window kinds.
///
/// `AllTime` maps to the engine's canonical trailing 90-day impact window:
/// contributions older than that have decayed out of every ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowKind {
    Weekly,
    Monthly,
    AllTime,
}

impl WindowKind {
    /// All kinds, in recomputation order.
    pub const ALL: [Self; 3] = [Self::Weekly, Self::Monthly, Self::AllTime];

    /// Trailing window length.
    #[must_use]
    pub fn span(self) -> Duration {
        match self {
            Self::Weekly => Duration::days(7),
            Self::Monthly => Duration::days(30),
            Self::AllTime => Duration::days(90),
        }
    }

    /// Window start for a given `as_of` instant.
    #[must_use]
    pub fn start(self, as_of: DateTime<Utc>) -> DateTime<Utc> {
        as_of - self.span()
    }

    /// Canonical camelCase name used in query strings and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AllTime => "allTime",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown window kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown leaderboard window: {0}")]
pub struct ParseWindowKindError(pub String);

impl FromStr for WindowKind {
    type Err = ParseWindowKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            // Accept both the canonical camelCase and the kebab form used
            // by older clients.
            "allTime" | "all-time" => Ok(Self::AllTime),
            other => Err(ParseWindowKindError(other.to_owned())),
        }
    }
}

/// Immutable aggregate over one community and window.
///
/// ## Invariants
/// - Unique per `(community_id, window, window_end)`; recomputation for
///   the same key overwrites wholesale, so history never diverges.
/// - Written snapshots are never mutated; a new `window_end` means a new
///   snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityScoreSnapshot {
    pub community_id: CommunityId,
    pub window: WindowKind,
    pub window_end: DateTime<Utc>,
    pub event_count: u64,
    pub participant_count: u64,
    pub weighted_impact: f64,
    pub score: f64,
    /// Records that fell back to the 1.0 multiplier because the external
    /// model was unavailable; reconciled by a later scheduled run.
    pub unweighted_records: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Pure scoring policy: snapshot score from aggregate inputs.
///
/// The exact formula is tunable policy, not a structural invariant. The
/// engine only relies on the function being deterministic in its inputs
/// and monotonic in each of them.
pub trait ScorePolicy: Send + Sync {
    fn score(&self, weighted_impact: f64, event_count: u64, participant_count: u64) -> f64;
}

/// Default policy: weighted impact plus flat participation incentives.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScorePolicy;

impl ScorePolicy for DefaultScorePolicy {
    fn score(&self, weighted_impact: f64, event_count: u64, participant_count: u64) -> f64 {
        let events = event_count as f64;
        let participants = participant_count as f64;
        weighted_impact + 5.0 * events + 2.0 * participants
    }
}

/// One ledger record paired with its clamped weighting factor.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRecord {
    pub record: ActionRecord,
    pub factor: WeightedFactor,
}

/// Fold weighted records into a snapshot for one community and window.
///
/// Pure and deterministic: replaying the same records always reproduces
/// the same snapshot. Records outside `(window.start(as_of), as_of]` are
/// ignored so callers may pass an unfiltered slice.
#[must_use]
pub fn fold_snapshot(
    community_id: CommunityId,
    window: WindowKind,
    as_of: DateTime<Utc>,
    records: &[WeightedRecord],
    policy: &dyn ScorePolicy,
) -> CommunityScoreSnapshot {
    let start = window.start(as_of);
    let mut event_count = 0u64;
    let mut participants = HashSet::new();
    let mut weighted_impact = 0.0f64;
    let mut unweighted_records = 0u64;
    let mut last_activity: Option<DateTime<Utc>> = None;

    for weighted in records {
        let record = &weighted.record;
        if record.occurred_at <= start || record.occurred_at > as_of {
            continue;
        }
        event_count += 1;
        participants.insert(record.user_id);
        weighted_impact += record.raw_metrics.impact_units() * weighted.factor.multiplier();
        if !weighted.factor.is_weighted() {
            unweighted_records += 1;
        }
        last_activity = match last_activity {
            Some(at) if at >= record.occurred_at => Some(at),
            _ => Some(record.occurred_at),
        };
    }

    let participant_count = participants.len() as u64;
    CommunityScoreSnapshot {
        community_id,
        window,
        window_end: as_of,
        event_count,
        participant_count,
        weighted_impact,
        score: policy.score(weighted_impact, event_count, participant_count),
        unweighted_records,
        last_activity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::{ActionKind, DedupeKey, NewActionRecord, RawMetrics};
    use crate::domain::ids::{ActionId, UserId};
    use crate::domain::weighting::WeightedFactor;
    use chrono::TimeZone;

    fn record_at(
        community: CommunityId,
        user: UserId,
        occurred_at: DateTime<Utc>,
        units: f64,
    ) -> ActionRecord {
        let new = NewActionRecord {
            dedupe_key: DedupeKey::derive(user, ActionKind::Cleanup, occurred_at),
            user_id: user,
            community_id: community,
            kind: ActionKind::Cleanup,
            raw_metrics: RawMetrics::try_new([("units".to_owned(), units)])
                .expect("valid metrics"),
            occurred_at,
        };
        ActionRecord::from_new(new, ActionId::random(), occurred_at)
    }

    #[test]
    fn window_parsing_accepts_canonical_and_kebab_all_time() {
        assert_eq!("weekly".parse::<WindowKind>(), Ok(WindowKind::Weekly));
        assert_eq!("allTime".parse::<WindowKind>(), Ok(WindowKind::AllTime));
        assert_eq!("all-time".parse::<WindowKind>(), Ok(WindowKind::AllTime));
        assert!("yearly".parse::<WindowKind>().is_err());
    }

    #[test]
    fn fold_ignores_records_outside_the_window() {
        let community = CommunityId::random();
        let user = UserId::random();
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let inside = record_at(community, user, as_of - Duration::days(3), 10.0);
        let outside = record_at(community, user, as_of - Duration::days(10), 99.0);
        let records = vec![
            WeightedRecord {
                record: inside,
                factor: WeightedFactor::weighted(1.0),
            },
            WeightedRecord {
                record: outside,
                factor: WeightedFactor::weighted(1.0),
            },
        ];

        let snapshot = fold_snapshot(
            community,
            WindowKind::Weekly,
            as_of,
            &records,
            &DefaultScorePolicy,
        );
        assert_eq!(snapshot.event_count, 1);
        assert_eq!(snapshot.participant_count, 1);
        assert!((snapshot.weighted_impact - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fold_applies_multipliers_and_counts_unweighted_fallbacks() {
        let community = CommunityId::random();
        let as_of = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let records = vec![
            WeightedRecord {
                record: record_at(community, UserId::random(), as_of - Duration::days(1), 10.0),
                factor: WeightedFactor::weighted(2.0),
            },
            WeightedRecord {
                record: record_at(community, UserId::random(), as_of - Duration::days(2), 10.0),
                factor: WeightedFactor::unweighted(),
            },
        ];

        let snapshot = fold_snapshot(
            community,
            WindowKind::Weekly,
            as_of,
            &records,
            &DefaultScorePolicy,
        );
        assert!((snapshot.weighted_impact - 30.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.unweighted_records, 1);
        assert_eq!(snapshot.participant_count, 2);
        assert_eq!(
            snapshot.last_activity,
            Some(as_of - Duration::days(1)),
            "latest contributing record wins"
        );
    }

    #[test]
    fn default_policy_is_monotonic_in_each_input() {
        let policy = DefaultScorePolicy;
        let base = policy.score(10.0, 2, 3);
        assert!(policy.score(11.0, 2, 3) > base);
        assert!(policy.score(10.0, 3, 3) > base);
        assert!(policy.score(10.0, 2, 4) > base);
    }
}
