//! Action completion API handler.
//!
//! ```text
//! POST /api/v1/actions
//! ```
//!
//! One call runs the whole pipeline: deduplicated ledger append,
//! exactly-once reputation award, badge evaluation, notification.

use actix_web::{post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    ActionKind, CommunityId, CompleteActionRequest, CompletionReceipt, DedupeKey, Error,
    RawMetrics, RawMetricsError, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Action completion request body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: Uuid,
    #[schema(value_type = String, format = Uuid)]
    pub community_id: Uuid,
    /// Action kind, e.g. `"recycling"`.
    pub action_kind: String,
    /// Named non-negative measurements, e.g. `{"kgCollected": 12.5}`.
    pub raw_metrics: std::collections::BTreeMap<String, f64>,
    /// Defaults to now when absent.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Caller-supplied idempotency key; derived from (user, kind, UTC day)
    /// when absent.
    #[serde(default)]
    pub dedupe_key: Option<String>,
}

fn map_metrics_error(err: RawMetricsError) -> Error {
    match err {
        RawMetricsError::BlankName => Error::invalid_request("metric names must not be blank")
            .with_details(json!({ "field": "rawMetrics" })),
        RawMetricsError::InvalidValue { name, value } => Error::invalid_request(format!(
            "metric {name:?} must be a finite, non-negative number, got {value}"
        ))
        .with_details(json!({ "field": "rawMetrics", "metric": name })),
    }
}

impl TryFrom<ActionRequest> for CompleteActionRequest {
    type Error = Error;

    fn try_from(value: ActionRequest) -> Result<Self, Self::Error> {
        let kind: ActionKind = value.action_kind.parse().map_err(|_| {
            Error::invalid_request(format!("unknown action kind {:?}", value.action_kind))
                .with_details(json!({ "field": "actionKind" }))
        })?;
        let raw_metrics = RawMetrics::try_new(value.raw_metrics).map_err(map_metrics_error)?;
        let dedupe_key = value
            .dedupe_key
            .map(DedupeKey::try_from)
            .transpose()
            .map_err(|err| {
                Error::invalid_request(err.to_string())
                    .with_details(json!({ "field": "dedupeKey" }))
            })?;
        Ok(Self {
            user_id: UserId::from_uuid(value.user_id),
            community_id: CommunityId::from_uuid(value.community_id),
            kind,
            raw_metrics,
            occurred_at: value.occurred_at,
            dedupe_key,
        })
    }
}

/// Record a completed action.
///
/// Redelivery of the same dedupe key is a success reported via
/// `alreadyRecorded`; no points or badges are awarded twice.
#[utoipa::path(
    post,
    path = "/api/v1/actions",
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Completion receipt"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["actions"],
    operation_id = "completeAction"
)]
#[post("/actions")]
pub async fn complete_action(
    state: web::Data<HttpState>,
    payload: web::Json<ActionRequest>,
) -> ApiResult<web::Json<CompletionReceipt>> {
    let request = CompleteActionRequest::try_from(payload.into_inner())?;
    let receipt = state.completion.complete(request).await?;
    Ok(web::Json(receipt))
}
