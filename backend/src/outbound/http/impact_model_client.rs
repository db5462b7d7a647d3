//! `reqwest`-backed adapter for the scenario/AI impact model.
//!
//! The endpoint contract is a single POST accepting the raw metrics and
//! the community baseline, answering `{ "factor": <number> }`. The
//! weighting adapter clamps and timeout-bounds every call, so this client
//! only maps transport failures into port errors.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::action::RawMetrics;
use crate::domain::ports::{ImpactModel, ImpactModelError};
use crate::domain::weighting::CommunityBaseline;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    raw_metrics: &'a RawMetrics,
    baseline: CommunityBaseline,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    factor: f64,
}

/// HTTP client implementing the [`ImpactModel`] port.
#[derive(Debug, Clone)]
pub struct HttpImpactModel {
    client: reqwest::Client,
    suggest_url: String,
}

impl HttpImpactModel {
    /// Build a client for the model endpoint.
    ///
    /// The client-level timeout backstops the weighting adapter's own
    /// bound so a stalled connection cannot pin a connection slot.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ImpactModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ImpactModelError::unavailable(err.to_string()))?;
        Ok(Self {
            client,
            suggest_url: format!("{}/suggest", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ImpactModel for HttpImpactModel {
    async fn suggest_factor(
        &self,
        metrics: &RawMetrics,
        baseline: CommunityBaseline,
    ) -> Result<f64, ImpactModelError> {
        let response = self
            .client
            .post(&self.suggest_url)
            .json(&SuggestRequest {
                raw_metrics: metrics,
                baseline,
            })
            .send()
            .await
            .map_err(|err| ImpactModelError::unavailable(err.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|err| ImpactModelError::unavailable(err.to_string()))?;
        let body: SuggestResponse = response
            .json()
            .await
            .map_err(|err| ImpactModelError::malformed(err.to_string()))?;
        Ok(body.factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_url_is_joined_without_double_slashes() {
        let model = HttpImpactModel::new("http://model.internal/", Duration::from_secs(5))
            .expect("client builds");
        assert_eq!(model.suggest_url, "http://model.internal/suggest");
    }
}
