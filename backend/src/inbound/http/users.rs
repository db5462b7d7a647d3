//! User read-model API handlers.
//!
//! ```text
//! GET /api/v1/users/{userId}/reputation
//! GET /api/v1/users/{userId}/badges
//! ```

use actix_web::{get, web};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{BadgeAward, BadgeProgress, ReputationSummary, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// A user's badge standing: held awards plus near-miss progress.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BadgesResponse {
    #[schema(value_type = Vec<Object>)]
    pub awarded: Vec<BadgeAward>,
    #[schema(value_type = Vec<Object>)]
    pub in_progress: Vec<BadgeProgress>,
}

/// A user's reputation totals.
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/reputation",
    params(("userId" = String, Path, format = Uuid)),
    responses(
        (status = 200, description = "Reputation summary"),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUserReputation"
)]
#[get("/users/{user_id}/reputation")]
pub async fn get_reputation(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<ReputationSummary>> {
    let summary = state
        .reputation
        .summary(UserId::from_uuid(path.into_inner()))
        .await?;
    Ok(web::Json(summary))
}

/// A user's badges, awarded and in progress.
///
/// A user with no history gets empty lists plus zero-fraction progress
/// rows for the catalogue, never an error.
#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/badges",
    params(("userId" = String, Path, format = Uuid)),
    responses(
        (status = 200, description = "Badge standing", body = BadgesResponse),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["users"],
    operation_id = "getUserBadges"
)]
#[get("/users/{user_id}/badges")]
pub async fn get_badges(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<BadgesResponse>> {
    let standing = state
        .badges
        .standing(UserId::from_uuid(path.into_inner()), Utc::now())
        .await?;
    Ok(web::Json(BadgesResponse {
        awarded: standing.awarded,
        in_progress: standing.in_progress,
    }))
}
