//! Badge definitions, criteria, and award records.
//!
//! Criteria form a closed, tagged set evaluated by one dispatch function
//! (`BadgeCriteria::evaluate`) so the evaluator stays exhaustively
//! testable — no free-form rule interpretation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::action::{ActionKind, ActionRecord};
use super::ids::{BadgeId, UserId};

/// Closed set of badge criteria variants.
///
/// An empty `kinds` list means "any action kind". `within` limits the
/// evaluation to a trailing timeframe ending at the evaluation instant;
/// `None` means the whole ledger history.
#[derive(Debug, Clone, PartialEq)]
pub enum BadgeCriteria {
    /// At least `threshold` qualifying actions.
    ActionCount {
        threshold: u32,
        kinds: Vec<ActionKind>,
        within: Option<Duration>,
    },
    /// Qualifying actions on `days` consecutive UTC days ending at the
    /// newest qualifying action.
    Streak { days: u32, kinds: Vec<ActionKind> },
    /// At least `threshold` cumulative raw impact units.
    CumulativeImpact {
        threshold: f64,
        kinds: Vec<ActionKind>,
        within: Option<Duration>,
    },
}

fn kind_qualifies(kinds: &[ActionKind], kind: ActionKind) -> bool {
    kinds.is_empty() || kinds.contains(&kind)
}

fn within_window(within: Option<Duration>, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
    within.is_none_or(|span| at > now - span)
}

/// Longest run of consecutive UTC days ending at the most recent
/// qualifying day.
fn trailing_streak_days(days: &mut Vec<chrono::NaiveDate>) -> u32 {
    days.sort_unstable();
    days.dedup();
    let Some(&last) = days.last() else {
        return 0;
    };
    let mut streak = 1u32;
    let mut cursor = last;
    for &day in days.iter().rev().skip(1) {
        let Some(previous) = cursor.pred_opt() else {
            break;
        };
        if day == previous {
            streak += 1;
            cursor = day;
        } else {
            break;
        }
    }
    streak
}

impl BadgeCriteria {
    /// Current progress toward the criterion over the user's records.
    ///
    /// Returns `(current, threshold)` in the criterion's own unit (actions,
    /// days, or impact units). `records` need not be filtered; the
    /// criterion applies its own kind and timeframe scoping.
    #[must_use]
    pub fn progress(&self, records: &[ActionRecord], now: DateTime<Utc>) -> (f64, f64) {
        match self {
            Self::ActionCount {
                threshold,
                kinds,
                within,
            } => {
                let current = records
                    .iter()
                    .filter(|r| kind_qualifies(kinds, r.kind))
                    .filter(|r| within_window(*within, now, r.occurred_at))
                    .count();
                (current as f64, f64::from(*threshold))
            }
            Self::Streak { days, kinds } => {
                let mut qualifying: Vec<_> = records
                    .iter()
                    .filter(|r| kind_qualifies(kinds, r.kind))
                    .map(|r| r.occurred_at.date_naive())
                    .collect();
                (
                    f64::from(trailing_streak_days(&mut qualifying)),
                    f64::from(*days),
                )
            }
            Self::CumulativeImpact {
                threshold,
                kinds,
                within,
            } => {
                let current: f64 = records
                    .iter()
                    .filter(|r| kind_qualifies(kinds, r.kind))
                    .filter(|r| within_window(*within, now, r.occurred_at))
                    .map(|r| r.raw_metrics.impact_units())
                    .sum();
                (current, *threshold)
            }
        }
    }

    /// Whether the criterion is satisfied.
    #[must_use]
    pub fn evaluate(&self, records: &[ActionRecord], now: DateTime<Utc>) -> bool {
        let (current, threshold) = self.progress(records, now);
        current >= threshold
    }
}

/// A badge the engine can award.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeDefinition {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub criteria: BadgeCriteria,
}

/// An at-most-once badge award.
///
/// ## Invariants
/// - Unique per `(user_id, badge_id)`, enforced by the store's conditional
///   insert; redundant or concurrent evaluation cannot duplicate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeAward {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub awarded_at: DateTime<Utc>,
    /// Progress fraction at award time, clamped to `[0, 1]` (1.0 unless a
    /// catalogue change lowered the threshold after the fact).
    pub progress_at_award: f64,
}

/// Near-miss display model for a badge not yet awarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeProgress {
    pub badge_id: BadgeId,
    pub name: String,
    pub description: String,
    /// `current / threshold`, clamped to `[0, 1]`.
    pub fraction: f64,
}

/// Clamp a raw `current / threshold` ratio into `[0, 1]`.
#[must_use]
pub fn progress_fraction(current: f64, threshold: f64) -> f64 {
    if threshold <= 0.0 {
        return 1.0;
    }
    (current / threshold).clamp(0.0, 1.0)
}

/// Built-in badge catalogue.
#[must_use]
pub fn builtin_catalogue() -> Vec<BadgeDefinition> {
    vec![
        BadgeDefinition {
            id: BadgeId::new("first-steps"),
            name: "First Steps".to_owned(),
            description: "Complete your first climate action".to_owned(),
            criteria: BadgeCriteria::ActionCount {
                threshold: 1,
                kinds: Vec::new(),
                within: None,
            },
        },
        BadgeDefinition {
            id: BadgeId::new("cleanup-crew"),
            name: "Cleanup Crew".to_owned(),
            description: "Complete five cleanups in ninety days".to_owned(),
            criteria: BadgeCriteria::ActionCount {
                threshold: 5,
                kinds: vec![ActionKind::Cleanup],
                within: Some(Duration::days(90)),
            },
        },
        BadgeDefinition {
            id: BadgeId::new("week-streak"),
            name: "Week Streak".to_owned(),
            description: "Act on seven consecutive days".to_owned(),
            criteria: BadgeCriteria::Streak {
                days: 7,
                kinds: Vec::new(),
            },
        },
        BadgeDefinition {
            id: BadgeId::new("impact-champion"),
            name: "Impact Champion".to_owned(),
            description: "Accumulate one hundred impact units in ninety days".to_owned(),
            criteria: BadgeCriteria::CumulativeImpact {
                threshold: 100.0,
                kinds: Vec::new(),
                within: Some(Duration::days(90)),
            },
        },
    ]
}
