//! Port for the external impact-weighting model.
//!
//! The model is advisory only. Its suggestion is always clamp-wrapped by
//! the weighting adapter, and unavailability degrades to the deterministic
//! 1.0 fallback; nothing in the engine depends on it answering, answering
//! in time, or answering sensibly.

use async_trait::async_trait;

use crate::domain::action::RawMetrics;
use crate::domain::weighting::CommunityBaseline;

/// Errors raised by impact model adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImpactModelError {
    /// The model endpoint could not be reached or answered with an error.
    #[error("impact model unavailable: {message}")]
    Unavailable { message: String },
    /// The model answered with something that is not a number.
    #[error("impact model returned a malformed suggestion: {message}")]
    Malformed { message: String },
}

impl ImpactModelError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Port for contextual impact-factor suggestions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImpactModel: Send + Sync {
    /// Suggest a contextual multiplier for the given metrics and baseline.
    ///
    /// The raw suggestion is unclamped; the weighting adapter owns the
    /// bound.
    async fn suggest_factor(
        &self,
        metrics: &RawMetrics,
        baseline: CommunityBaseline,
    ) -> Result<f64, ImpactModelError>;
}

/// Deterministic rule-based model used when no external endpoint is
/// configured: neutral 1.0 for every action.
#[derive(Debug, Default)]
pub struct FixtureImpactModel;

#[async_trait]
impl ImpactModel for FixtureImpactModel {
    async fn suggest_factor(
        &self,
        _metrics: &RawMetrics,
        _baseline: CommunityBaseline,
    ) -> Result<f64, ImpactModelError> {
        Ok(1.0)
    }
}
