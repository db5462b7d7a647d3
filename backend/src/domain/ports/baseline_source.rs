//! Port for the external environmental-data service.

use async_trait::async_trait;

use crate::domain::ids::CommunityId;
use crate::domain::weighting::CommunityBaseline;

/// Errors raised by baseline source adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BaselineSourceError {
    /// The source could not be reached.
    #[error("baseline source unavailable: {message}")]
    Unavailable { message: String },
}

impl BaselineSourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Read-only port for per-community environmental baselines.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BaselineSource: Send + Sync {
    /// Baseline context for a community (e.g. AQI, green cover).
    async fn baseline_for(
        &self,
        community_id: CommunityId,
    ) -> Result<CommunityBaseline, BaselineSourceError>;
}

/// Fixture source returning a neutral baseline for every community.
#[derive(Debug, Default)]
pub struct FixtureBaselineSource;

#[async_trait]
impl BaselineSource for FixtureBaselineSource {
    async fn baseline_for(
        &self,
        _community_id: CommunityId,
    ) -> Result<CommunityBaseline, BaselineSourceError> {
        Ok(CommunityBaseline::default())
    }
}
