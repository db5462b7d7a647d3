//! Badge eligibility evaluation.
//!
//! The evaluator itself carries no duplicate protection: it may run
//! redundantly for the same qualifying action (retries, concurrent
//! completions) because the award store's conditional insert is the
//! at-most-once guard. Whatever `insert_once` reports as absorbed is
//! simply not returned as newly awarded.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::badge::{
    BadgeAward, BadgeDefinition, BadgeProgress, builtin_catalogue, progress_fraction,
};
use crate::domain::error::Error;
use crate::domain::ids::UserId;
use crate::domain::ports::{
    ActionLedger, ActionLedgerError, BadgeAwardStore, BadgeAwardStoreError,
};

/// A user's badge view: held awards plus near-miss progress.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeStanding {
    pub awarded: Vec<BadgeAward>,
    pub in_progress: Vec<BadgeProgress>,
}

/// Rule engine over the closed badge criteria set.
pub struct BadgeEvaluator<L: ?Sized, B: ?Sized> {
    ledger: Arc<L>,
    awards: Arc<B>,
    catalogue: Arc<Vec<BadgeDefinition>>,
}

impl<L: ?Sized, B: ?Sized> Clone for BadgeEvaluator<L, B> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            awards: Arc::clone(&self.awards),
            catalogue: Arc::clone(&self.catalogue),
        }
    }
}

impl<L: ?Sized, B: ?Sized> BadgeEvaluator<L, B> {
    /// Create an evaluator over the built-in catalogue.
    pub fn new(ledger: Arc<L>, awards: Arc<B>) -> Self {
        Self::with_catalogue(ledger, awards, builtin_catalogue())
    }

    /// Create an evaluator with an explicit catalogue.
    pub fn with_catalogue(
        ledger: Arc<L>,
        awards: Arc<B>,
        catalogue: Vec<BadgeDefinition>,
    ) -> Self {
        Self {
            ledger,
            awards,
            catalogue: Arc::new(catalogue),
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

fn map_award_error(error: BadgeAwardStoreError) -> Error {
    match error {
        BadgeAwardStoreError::Connection { message } => {
            Error::service_unavailable(format!("badge award store unavailable: {message}"))
        }
        BadgeAwardStoreError::Query { message } => {
            Error::internal(format!("badge award store error: {message}"))
        }
    }
}

impl<L, B> BadgeEvaluator<L, B>
where
    L: ActionLedger + ?Sized,
    B: BadgeAwardStore + ?Sized,
{
    /// Evaluate every catalogue badge for the user and attempt awards.
    ///
    /// Returns the badges newly awarded by this invocation. Badges whose
    /// insert was absorbed by the uniqueness constraint (already held,
    /// or raced by a concurrent evaluation) are excluded.
    pub async fn evaluate(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Vec<BadgeAward>, Error> {
        let records = self
            .ledger
            .records_for_user(user_id)
            .await
            .map_err(map_ledger_error)?;
        let held: Vec<_> = self
            .awards
            .awards_for_user(user_id)
            .await
            .map_err(map_award_error)?
            .into_iter()
            .map(|award| award.badge_id)
            .collect();

        let mut newly_awarded = Vec::new();
        for badge in self.catalogue.iter() {
            if held.contains(&badge.id) {
                continue;
            }
            let (current, threshold) = badge.criteria.progress(&records, now);
            if current < threshold {
                continue;
            }
            let award = BadgeAward {
                user_id,
                badge_id: badge.id.clone(),
                awarded_at: now,
                progress_at_award: progress_fraction(current, threshold),
            };
            if self
                .awards
                .insert_once(&award)
                .await
                .map_err(map_award_error)?
            {
                info!(%user_id, badge = %award.badge_id, "badge awarded");
                newly_awarded.push(award);
            }
        }
        Ok(newly_awarded)
    }

    /// Held awards plus progress fractions for badges not yet earned.
    pub async fn standing(&self, user_id: UserId, now: DateTime<Utc>) -> Result<BadgeStanding, Error> {
        let records = self
            .ledger
            .records_for_user(user_id)
            .await
            .map_err(map_ledger_error)?;
        let awarded = self
            .awards
            .awards_for_user(user_id)
            .await
            .map_err(map_award_error)?;
        let held: Vec<_> = awarded.iter().map(|award| award.badge_id.clone()).collect();

        let in_progress = self
            .catalogue
            .iter()
            .filter(|badge| !held.contains(&badge.id))
            .map(|badge| {
                let (current, threshold) = badge.criteria.progress(&records, now);
                BadgeProgress {
                    badge_id: badge.id.clone(),
                    name: badge.name.clone(),
                    description: badge.description.clone(),
                    fraction: progress_fraction(current, threshold),
                }
            })
            .collect();

        Ok(BadgeStanding {
            awarded,
            in_progress,
        })
    }
}
