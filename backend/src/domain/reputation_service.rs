//! Reputation read model.

use std::sync::Arc;

use crate::domain::error::Error;
use crate::domain::ids::UserId;
use crate::domain::ports::{ReputationStore, ReputationStoreError};
use crate::domain::reputation::ReputationSummary;

/// Query service for a user's reputation view.
pub struct ReputationQueryService<R: ?Sized> {
    store: Arc<R>,
}

impl<R: ?Sized> Clone for ReputationQueryService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: ?Sized> ReputationQueryService<R> {
    pub fn new(store: Arc<R>) -> Self {
        Self { store }
    }
}

impl<R> ReputationQueryService<R>
where
    R: ReputationStore + ?Sized,
{
    /// Total points, actions credited, and last activity for a user.
    pub async fn summary(&self, user_id: UserId) -> Result<ReputationSummary, Error> {
        self.store
            .summary_for_user(user_id)
            .await
            .map_err(|error| match error {
                ReputationStoreError::Connection { message } => {
                    Error::service_unavailable(format!("reputation store unavailable: {message}"))
                }
                ReputationStoreError::Query { message } => {
                    Error::internal(format!("reputation store error: {message}"))
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::ports::MockReputationStore;

    #[tokio::test]
    async fn summary_passes_through_the_store_view() {
        let user = UserId::random();
        let mut store = MockReputationStore::new();
        store
            .expect_summary_for_user()
            .times(1)
            .return_once(move |user_id| {
                Ok(ReputationSummary {
                    user_id,
                    total_points: 25,
                    actions_completed: 2,
                    last_activity: None,
                })
            });

        let summary = ReputationQueryService::new(Arc::new(store))
            .summary(user)
            .await
            .expect("summary");
        assert_eq!(summary.total_points, 25);
        assert_eq!(summary.actions_completed, 2);
    }

    #[tokio::test]
    async fn connection_failures_surface_as_unavailable() {
        let mut store = MockReputationStore::new();
        store
            .expect_summary_for_user()
            .times(1)
            .return_once(|_| Err(ReputationStoreError::connection("pool exhausted")));

        let error = ReputationQueryService::new(Arc::new(store))
            .summary(UserId::random())
            .await
            .expect_err("unavailable");
        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
