//! Port for the external notification dispatcher.
//!
//! The dispatcher is consumed through a notify-with-preference-check
//! interface owned by the surrounding platform. The engine never retries
//! delivery failures; the completion service logs them and moves on, so an
//! unreachable dispatcher can never block an awarding transaction.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ids::UserId;

/// Notification categories the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationCategory {
    ReputationAwarded,
    BadgeAwarded,
}

/// Errors raised by notification dispatcher adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// Delivery failed; callers log and continue.
    #[error("notification delivery failed: {message}")]
    Delivery { message: String },
}

impl NotificationError {
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

/// Port for award notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Dispatch a notification, honouring the user's preferences
    /// downstream.
    async fn dispatch(
        &self,
        user_id: UserId,
        category: NotificationCategory,
        payload: Value,
    ) -> Result<(), NotificationError>;
}

/// Fixture dispatcher that swallows every notification.
#[derive(Debug, Default)]
pub struct FixtureNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for FixtureNotificationDispatcher {
    async fn dispatch(
        &self,
        _user_id: UserId,
        _category: NotificationCategory,
        _payload: Value,
    ) -> Result<(), NotificationError> {
        Ok(())
    }
}
