//! Timeout-bounded adapter around the external impact model.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::action::RawMetrics;
use crate::domain::ports::ImpactModel;
use crate::domain::weighting::{CommunityBaseline, WeightedFactor};

/// Default upper bound on an external model call.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Clamp-and-fallback wrapper for impact-factor suggestions.
///
/// `weight` is infallible by design: a model error, a timeout, or a
/// non-finite suggestion all degrade to the deterministic 1.0 fallback,
/// flagged unweighted so a later scheduled run can reconcile. The adapter
/// therefore can never block or fail an aggregation pass.
pub struct ImpactWeightingAdapter<M: ?Sized> {
    model: Arc<M>,
    timeout: Duration,
}

impl<M: ?Sized> Clone for ImpactWeightingAdapter<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            timeout: self.timeout,
        }
    }
}

impl<M: ?Sized> ImpactWeightingAdapter<M> {
    /// Wrap a model with the default timeout.
    pub fn new(model: Arc<M>) -> Self {
        Self {
            model,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Override the call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<M> ImpactWeightingAdapter<M>
where
    M: ImpactModel + ?Sized,
{
    /// Produce a clamped multiplier for one record's metrics.
    pub async fn weight(
        &self,
        metrics: &RawMetrics,
        baseline: CommunityBaseline,
    ) -> WeightedFactor {
        let call = self.model.suggest_factor(metrics, baseline);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(suggestion)) => WeightedFactor::weighted(suggestion),
            Ok(Err(error)) => {
                warn!(%error, "impact model failed, using unweighted fallback");
                WeightedFactor::unweighted()
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "impact model timed out, using unweighted fallback"
                );
                WeightedFactor::unweighted()
            }
        }
    }
}
