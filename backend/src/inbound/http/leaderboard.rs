//! Leaderboard API handlers.
//!
//! ```text
//! GET /api/v1/leaderboard?window=weekly&limit=10
//! GET /api/v1/communities/{communityId}/rank?window=weekly
//! ```
//!
//! Both read the same cached, versioned ordering so a community's rank
//! always agrees with the page it would appear on.

use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{CommunityId, Error, RankEntry, WindowKind};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Query parameters shared by the ranking endpoints.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    /// `weekly`, `monthly`, or `allTime`; defaults to `allTime`.
    #[serde(default)]
    pub window: Option<String>,
    /// Page size; clamped server-side.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Leaderboard page response.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub window: String,
    /// Cache generation the page was served from.
    pub generation: u64,
    pub generated_at: DateTime<Utc>,
    #[schema(value_type = Vec<Object>)]
    pub entries: Vec<RankEntry>,
}

/// Community rank response.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankResponse {
    pub window: String,
    pub generation: u64,
    #[schema(value_type = Object)]
    pub entry: RankEntry,
}

fn parse_window(raw: Option<&str>) -> Result<WindowKind, Error> {
    match raw {
        None => Ok(WindowKind::AllTime),
        Some(text) => text.parse().map_err(|_| {
            Error::invalid_request(format!("unknown ranking window {text:?}"))
                .with_details(json!({ "field": "window" }))
        }),
    }
}

/// Ranked communities for a window.
#[utoipa::path(
    get,
    path = "/api/v1/leaderboard",
    params(LeaderboardQuery),
    responses(
        (status = 200, description = "Leaderboard page", body = LeaderboardResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["leaderboard"],
    operation_id = "getLeaderboard"
)]
#[get("/leaderboard")]
pub async fn get_leaderboard(
    state: web::Data<HttpState>,
    query: web::Query<LeaderboardQuery>,
) -> ApiResult<web::Json<LeaderboardResponse>> {
    let window = parse_window(query.window.as_deref())?;
    let limit = query.limit.unwrap_or(usize::MAX);
    let (entries, snapshot) = state.leaderboard.top_n(window, limit).await?;
    Ok(web::Json(LeaderboardResponse {
        window: window.as_str().to_owned(),
        generation: snapshot.generation,
        generated_at: snapshot.generated_at,
        entries,
    }))
}

/// A single community's rank.
#[utoipa::path(
    get,
    path = "/api/v1/communities/{communityId}/rank",
    params(
        ("communityId" = String, Path, format = Uuid),
        LeaderboardQuery
    ),
    responses(
        (status = 200, description = "Community rank", body = RankResponse),
        (status = 404, description = "Community has no ranked snapshot", body = ErrorSchema)
    ),
    tags = ["leaderboard"],
    operation_id = "getCommunityRank"
)]
#[get("/communities/{community_id}/rank")]
pub async fn get_community_rank(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
    query: web::Query<LeaderboardQuery>,
) -> ApiResult<web::Json<RankResponse>> {
    let window = parse_window(query.window.as_deref())?;
    let community_id = CommunityId::from_uuid(path.into_inner());
    let snapshot = state.leaderboard.current(window).await?;
    let entry = snapshot.rank_of(community_id).cloned().ok_or_else(|| {
        Error::not_found(format!(
            "community {community_id} is not ranked in this window"
        ))
    })?;
    Ok(web::Json(RankResponse {
        window: window.as_str().to_owned(),
        generation: snapshot.generation,
        entry,
    }))
}
