//! Action completion pipeline: ledger append → point award → badges.
//!
//! The ledger append is the transaction boundary. Everything downstream of
//! a successful append (reputation insert, badge evaluation, notification)
//! is idempotent against redelivery, so a caller may retry the whole
//! completion after a partial failure and never double-award. Notification
//! failures are logged and never block or fail the pipeline.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::action::{ActionKind, DedupeKey, NewActionRecord, RawMetrics};
use crate::domain::badge::BadgeAward;
use crate::domain::badge_service::BadgeEvaluator;
use crate::domain::error::Error;
use crate::domain::ids::{ActionId, CommunityId, UserId};
use crate::domain::ports::{
    ActionLedger, ActionLedgerError, BadgeAwardStore, NotificationCategory,
    NotificationDispatcher, ReputationStore, ReputationStoreError,
};
use crate::domain::reputation::{ReputationEntry, base_points};

/// Completion request assembled by the inbound adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteActionRequest {
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub kind: ActionKind,
    pub raw_metrics: RawMetrics,
    pub occurred_at: Option<chrono::DateTime<Utc>>,
    /// Caller-supplied key; derived from (user, kind, day) when absent.
    pub dedupe_key: Option<DedupeKey>,
}

/// Pipeline result surfaced to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReceipt {
    pub action_id: ActionId,
    /// True when the dedupe key already existed. `points_awarded` is
    /// normally zero then, unless the redelivery recovered an award a
    /// partial failure had dropped.
    pub already_recorded: bool,
    pub points_awarded: u32,
    pub new_badges: Vec<BadgeAward>,
}

/// Driving service composing ledger, accumulator, evaluator, and notifier.
pub struct ActionCompletionService<L: ?Sized, R: ?Sized, B: ?Sized, N: ?Sized> {
    ledger: Arc<L>,
    reputation: Arc<R>,
    badges: BadgeEvaluator<L, B>,
    notifier: Arc<N>,
}

impl<L: ?Sized, R: ?Sized, B: ?Sized, N: ?Sized> Clone for ActionCompletionService<L, R, B, N> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            reputation: Arc::clone(&self.reputation),
            badges: self.badges.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<L: ?Sized, R: ?Sized, B: ?Sized, N: ?Sized> ActionCompletionService<L, R, B, N> {
    /// Create a new pipeline service.
    pub fn new(
        ledger: Arc<L>,
        reputation: Arc<R>,
        badges: BadgeEvaluator<L, B>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            ledger,
            reputation,
            badges,
            notifier,
        }
    }
}

fn map_ledger_error(error: ActionLedgerError) -> Error {
    match error {
        ActionLedgerError::Connection { message } => {
            Error::service_unavailable(format!("action ledger unavailable: {message}"))
        }
        ActionLedgerError::Query { message } | ActionLedgerError::Corrupt { message } => {
            Error::internal(format!("action ledger error: {message}"))
        }
    }
}

fn map_reputation_error(error: ReputationStoreError) -> Error {
    match error {
        ReputationStoreError::Connection { message } => {
            Error::service_unavailable(format!("reputation store unavailable: {message}"))
        }
        ReputationStoreError::Query { message } => {
            Error::internal(format!("reputation store error: {message}"))
        }
    }
}

impl<L, R, B, N> ActionCompletionService<L, R, B, N>
where
    L: ActionLedger + ?Sized,
    R: ReputationStore + ?Sized,
    B: BadgeAwardStore + ?Sized,
    N: NotificationDispatcher + ?Sized,
{
    /// Run the completion pipeline for one action.
    pub async fn complete(
        &self,
        request: CompleteActionRequest,
    ) -> Result<CompletionReceipt, Error> {
        let now = Utc::now();
        let occurred_at = request.occurred_at.unwrap_or(now);
        let dedupe_key = request
            .dedupe_key
            .unwrap_or_else(|| DedupeKey::derive(request.user_id, request.kind, occurred_at));

        let outcome = self
            .ledger
            .append(NewActionRecord {
                dedupe_key,
                user_id: request.user_id,
                community_id: request.community_id,
                kind: request.kind,
                raw_metrics: request.raw_metrics,
                occurred_at,
            })
            .await
            .map_err(map_ledger_error)?;

        let record = outcome.record().clone();
        if !outcome.inserted() {
            // The dedupe window already holds this action. The award may
            // still be missing if an earlier delivery failed between the
            // append and the insert, so re-attempt it against the
            // canonical record; the uniqueness key absorbs the replay
            // when the points already landed.
            let points = base_points(record.kind);
            let entry = ReputationEntry {
                user_id: record.user_id,
                source_action_id: record.id,
                points,
                awarded_at: now,
            };
            let recovered = self
                .reputation
                .insert_once(&entry)
                .await
                .map_err(map_reputation_error)?;
            let new_badges = if recovered {
                warn!(
                    user_id = %record.user_id,
                    action_id = %record.id,
                    "redelivery recovered an award dropped by a partial failure"
                );
                let badges = self.badges.evaluate(record.user_id, now).await?;
                self.notify_awards(&record.user_id, points, &badges).await;
                badges
            } else {
                Vec::new()
            };
            return Ok(CompletionReceipt {
                action_id: record.id,
                already_recorded: true,
                points_awarded: if recovered { points } else { 0 },
                new_badges,
            });
        }

        let points = base_points(record.kind);
        let entry = ReputationEntry {
            user_id: record.user_id,
            source_action_id: record.id,
            points,
            awarded_at: now,
        };
        let freshly_awarded = self
            .reputation
            .insert_once(&entry)
            .await
            .map_err(map_reputation_error)?;
        if !freshly_awarded {
            // A previous partial run already credited the points; the
            // uniqueness key absorbed the redelivery.
            info!(
                user_id = %record.user_id,
                action_id = %record.id,
                "reputation entry already present, redelivery absorbed"
            );
        }

        let new_badges = self.badges.evaluate(record.user_id, now).await?;

        self.notify_awards(&record.user_id, points, &new_badges).await;

        info!(
            user_id = %record.user_id,
            action_id = %record.id,
            kind = %record.kind,
            points,
            badges = new_badges.len(),
            "action completed"
        );
        Ok(CompletionReceipt {
            action_id: record.id,
            already_recorded: false,
            points_awarded: points,
            new_badges,
        })
    }

    /// Fire-and-log award notifications; failures never propagate.
    async fn notify_awards(&self, user_id: &UserId, points: u32, badges: &[BadgeAward]) {
        let payload = json!({ "points": points });
        if let Err(error) = self
            .notifier
            .dispatch(*user_id, NotificationCategory::ReputationAwarded, payload)
            .await
        {
            warn!(%user_id, %error, "reputation notification failed");
        }
        for badge in badges {
            let payload = json!({ "badgeId": badge.badge_id });
            if let Err(error) = self
                .notifier
                .dispatch(*user_id, NotificationCategory::BadgeAwarded, payload)
                .await
            {
                warn!(%user_id, badge = %badge.badge_id, %error, "badge notification failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action::ActionRecord;
    use crate::domain::ports::{
        AppendOutcome, MockActionLedger, MockBadgeAwardStore, MockNotificationDispatcher,
        MockReputationStore, NotificationError,
    };

    fn request(kind: ActionKind) -> CompleteActionRequest {
        CompleteActionRequest {
            user_id: UserId::random(),
            community_id: CommunityId::random(),
            kind,
            raw_metrics: RawMetrics::try_new([("units".to_owned(), 2.0)])
                .expect("valid metrics"),
            occurred_at: None,
            dedupe_key: None,
        }
    }

    fn materialise(new: NewActionRecord) -> ActionRecord {
        let at = new.occurred_at;
        ActionRecord::from_new(new, ActionId::random(), at)
    }

    fn quiet_evaluator(
        ledger: Arc<MockActionLedger>,
    ) -> BadgeEvaluator<MockActionLedger, MockBadgeAwardStore> {
        // Catalogue is empty, so evaluation touches only the two reads.
        let mut awards = MockBadgeAwardStore::new();
        awards.expect_awards_for_user().returning(|_| Ok(Vec::new()));
        BadgeEvaluator::with_catalogue(ledger, Arc::new(awards), Vec::new())
    }

    #[tokio::test]
    async fn fresh_completion_awards_base_points() {
        let mut ledger = MockActionLedger::new();
        ledger
            .expect_append()
            .times(1)
            .return_once(|new| Ok(AppendOutcome::Inserted(materialise(new))));
        ledger.expect_records_for_user().returning(|_| Ok(Vec::new()));
        let ledger = Arc::new(ledger);

        let mut reputation = MockReputationStore::new();
        reputation
            .expect_insert_once()
            .withf(|entry: &ReputationEntry| entry.points == 10)
            .times(1)
            .return_once(|_| Ok(true));

        let mut notifier = MockNotificationDispatcher::new();
        notifier.expect_dispatch().times(1).return_once(|_, _, _| Ok(()));

        let service = ActionCompletionService::new(
            Arc::clone(&ledger),
            Arc::new(reputation),
            quiet_evaluator(ledger),
            Arc::new(notifier),
        );
        let receipt = service
            .complete(request(ActionKind::Cleanup))
            .await
            .expect("completion succeeds");
        assert!(!receipt.already_recorded);
        assert_eq!(receipt.points_awarded, 10);
        assert!(receipt.new_badges.is_empty());
    }

    #[tokio::test]
    async fn duplicate_append_awards_nothing() {
        let mut ledger = MockActionLedger::new();
        ledger
            .expect_append()
            .times(1)
            .return_once(|new| Ok(AppendOutcome::Duplicate(materialise(new))));
        let ledger = Arc::new(ledger);

        let mut reputation = MockReputationStore::new();
        // The replayed insert is absorbed by the uniqueness key.
        reputation.expect_insert_once().times(1).return_once(|_| Ok(false));
        let mut notifier = MockNotificationDispatcher::new();
        notifier.expect_dispatch().times(0);

        let service = ActionCompletionService::new(
            Arc::clone(&ledger),
            Arc::new(reputation),
            quiet_evaluator(ledger),
            Arc::new(notifier),
        );
        let receipt = service
            .complete(request(ActionKind::Recycling))
            .await
            .expect("duplicate is success");
        assert!(receipt.already_recorded);
        assert_eq!(receipt.points_awarded, 0);
        assert!(receipt.new_badges.is_empty());
    }

    #[tokio::test]
    async fn retry_after_failed_award_recovers_the_points() {
        let mut appends = mockall::Sequence::new();
        let mut ledger = MockActionLedger::new();
        ledger
            .expect_append()
            .times(1)
            .in_sequence(&mut appends)
            .return_once(|new| Ok(AppendOutcome::Inserted(materialise(new))));
        ledger
            .expect_append()
            .times(1)
            .in_sequence(&mut appends)
            .return_once(|new| Ok(AppendOutcome::Duplicate(materialise(new))));
        ledger.expect_records_for_user().returning(|_| Ok(Vec::new()));
        let ledger = Arc::new(ledger);

        let mut inserts = mockall::Sequence::new();
        let mut reputation = MockReputationStore::new();
        reputation
            .expect_insert_once()
            .times(1)
            .in_sequence(&mut inserts)
            .return_once(|_| Err(ReputationStoreError::connection("store offline")));
        reputation
            .expect_insert_once()
            .withf(|entry: &ReputationEntry| entry.points == 10)
            .times(1)
            .in_sequence(&mut inserts)
            .return_once(|_| Ok(true));

        let mut notifier = MockNotificationDispatcher::new();
        notifier.expect_dispatch().times(1).return_once(|_, _, _| Ok(()));

        let service = ActionCompletionService::new(
            Arc::clone(&ledger),
            Arc::new(reputation),
            quiet_evaluator(ledger),
            Arc::new(notifier),
        );
        let delivery = request(ActionKind::Cleanup);
        service
            .complete(delivery.clone())
            .await
            .expect_err("first delivery fails after the append");
        let receipt = service
            .complete(delivery)
            .await
            .expect("redelivery recovers the award");
        assert!(receipt.already_recorded);
        assert_eq!(receipt.points_awarded, 10, "the dropped points are credited");
    }

    #[tokio::test]
    async fn absorbed_reputation_redelivery_still_completes() {
        let mut ledger = MockActionLedger::new();
        ledger
            .expect_append()
            .times(1)
            .return_once(|new| Ok(AppendOutcome::Inserted(materialise(new))));
        ledger.expect_records_for_user().returning(|_| Ok(Vec::new()));
        let ledger = Arc::new(ledger);

        let mut reputation = MockReputationStore::new();
        reputation.expect_insert_once().times(1).return_once(|_| Ok(false));
        let mut notifier = MockNotificationDispatcher::new();
        notifier.expect_dispatch().times(1).return_once(|_, _, _| Ok(()));

        let service = ActionCompletionService::new(
            Arc::clone(&ledger),
            Arc::new(reputation),
            quiet_evaluator(ledger),
            Arc::new(notifier),
        );
        let receipt = service
            .complete(request(ActionKind::TreePlantation))
            .await
            .expect("absorbed redelivery still succeeds");
        assert!(!receipt.already_recorded);
        assert_eq!(receipt.points_awarded, 15);
    }

    #[tokio::test]
    async fn notification_failure_never_fails_the_pipeline() {
        let mut ledger = MockActionLedger::new();
        ledger
            .expect_append()
            .times(1)
            .return_once(|new| Ok(AppendOutcome::Inserted(materialise(new))));
        ledger.expect_records_for_user().returning(|_| Ok(Vec::new()));
        let ledger = Arc::new(ledger);

        let mut reputation = MockReputationStore::new();
        reputation.expect_insert_once().times(1).return_once(|_| Ok(true));
        let mut notifier = MockNotificationDispatcher::new();
        notifier
            .expect_dispatch()
            .times(1)
            .return_once(|_, _, _| Err(NotificationError::delivery("push gateway down")));

        let service = ActionCompletionService::new(
            Arc::clone(&ledger),
            Arc::new(reputation),
            quiet_evaluator(ledger),
            Arc::new(notifier),
        );
        let receipt = service
            .complete(request(ActionKind::Awareness))
            .await
            .expect("delivery failure is swallowed");
        assert_eq!(receipt.points_awarded, 5);
    }
}
