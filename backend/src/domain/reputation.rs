//! Reputation points: the per-user durable award model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::ActionKind;
use super::ids::{ActionId, UserId};

/// Fixed base-point table per action kind.
///
/// The table is engine policy, fixed in code rather than configuration so
/// replaying the ledger always reproduces the same totals.
#[must_use]
pub fn base_points(kind: ActionKind) -> u32 {
    match kind {
        ActionKind::Cleanup => 10,
        ActionKind::TreePlantation => 15,
        ActionKind::Recycling => 8,
        ActionKind::Awareness => 5,
    }
}

/// One idempotent point award.
///
/// ## Invariants
/// - At most one entry exists per `source_action_id`; the store's
///   uniqueness constraint is the actual guard, so re-awarding after a
///   partial failure is safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationEntry {
    pub user_id: UserId,
    pub source_action_id: ActionId,
    pub points: u32,
    pub awarded_at: DateTime<Utc>,
}

/// Read-model for a user's reputation view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSummary {
    pub user_id: UserId,
    pub total_points: u64,
    pub actions_completed: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_point_table_matches_policy() {
        assert_eq!(base_points(ActionKind::Cleanup), 10);
        assert_eq!(base_points(ActionKind::TreePlantation), 15);
        assert_eq!(base_points(ActionKind::Recycling), 8);
        assert_eq!(base_points(ActionKind::Awareness), 5);
    }
}
