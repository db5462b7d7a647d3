//! Event and registration API handlers.
//!
//! ```text
//! POST   /api/v1/events
//! GET    /api/v1/events/{eventId}
//! POST   /api/v1/events/{eventId}/registrations
//! DELETE /api/v1/events/{eventId}/registrations/{userId}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{
    ActionKind, CommunityId, Error, Event, EventId, EventValidationError, RegistrationReceipt,
    UnregisterReceipt, UserId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Event creation request body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Hosting community.
    #[schema(value_type = String, format = Uuid)]
    pub community_id: Uuid,
    /// Action kind the event counts toward, e.g. `"cleanup"`.
    pub kind: String,
    pub scheduled_at: DateTime<Utc>,
    /// Fixed registration capacity, at least 1.
    pub capacity: u32,
    #[schema(value_type = String, format = Uuid)]
    pub organizer_id: Uuid,
}

/// Registration request body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: Uuid,
}

fn parse_kind(kind: &str) -> Result<ActionKind, Error> {
    kind.parse().map_err(|_| {
        Error::invalid_request(format!("unknown action kind {kind:?}"))
            .with_details(json!({ "field": "kind" }))
    })
}

fn map_validation_error(err: EventValidationError) -> Error {
    match err {
        EventValidationError::ZeroCapacity => {
            Error::invalid_request("event capacity must be at least 1")
                .with_details(json!({ "field": "capacity" }))
        }
    }
}

/// Create an event.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 503, description = "Storage unavailable", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "createEvent"
)]
#[post("/events")]
pub async fn create_event(
    state: web::Data<HttpState>,
    payload: web::Json<CreateEventRequest>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let event = Event::try_new(
        EventId::random(),
        CommunityId::from_uuid(payload.community_id),
        parse_kind(&payload.kind)?,
        payload.scheduled_at,
        payload.capacity,
        UserId::from_uuid(payload.organizer_id),
    )
    .map_err(map_validation_error)?;

    state.registrations.create_event(&event).await?;
    Ok(HttpResponse::Created().json(event))
}

/// Fetch an event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{eventId}",
    params(("eventId" = String, Path, format = Uuid)),
    responses(
        (status = 200, description = "Event"),
        (status = 404, description = "Event not found", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "getEvent"
)]
#[get("/events/{event_id}")]
pub async fn get_event(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Event>> {
    let event = state
        .registrations
        .event(EventId::from_uuid(path.into_inner()))
        .await?;
    Ok(web::Json(event))
}

/// Register a user for an event.
///
/// Duplicate registration is idempotent and reported via
/// `alreadyRegistered`; a full event rejects with `capacity_exceeded`.
#[utoipa::path(
    post,
    path = "/api/v1/events/{eventId}/registrations",
    params(("eventId" = String, Path, format = Uuid)),
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration outcome"),
        (status = 404, description = "Event not found", body = ErrorSchema),
        (status = 409, description = "Event full or closed", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "registerForEvent"
)]
#[post("/events/{event_id}/registrations")]
pub async fn register(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<web::Json<RegistrationReceipt>> {
    let receipt = state
        .registrations
        .register(
            EventId::from_uuid(path.into_inner()),
            UserId::from_uuid(payload.user_id),
        )
        .await?;
    Ok(web::Json(receipt))
}

/// Withdraw a user's registration.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{eventId}/registrations/{userId}",
    params(
        ("eventId" = String, Path, format = Uuid),
        ("userId" = String, Path, format = Uuid)
    ),
    responses(
        (status = 200, description = "Unregistration outcome"),
        (status = 404, description = "Event not found", body = ErrorSchema),
        (status = 409, description = "Event closed", body = ErrorSchema)
    ),
    tags = ["events"],
    operation_id = "unregisterFromEvent"
)]
#[delete("/events/{event_id}/registrations/{user_id}")]
pub async fn unregister(
    state: web::Data<HttpState>,
    path: web::Path<(Uuid, Uuid)>,
) -> ApiResult<web::Json<UnregisterReceipt>> {
    let (event_id, user_id) = path.into_inner();
    let receipt = state
        .registrations
        .unregister(EventId::from_uuid(event_id), UserId::from_uuid(user_id))
        .await?;
    Ok(web::Json(receipt))
}
