//! OpenAPI documentation configuration.
//!
//! Registers every HTTP endpoint and the adapter-layer schema wrappers.
//! The generated document backs Swagger UI in debug builds.

use utoipa::OpenApi;

use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Impact engine API",
        description = "Event registration, action completion, reputation, leaderboards, and badges."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::events::create_event,
        crate::inbound::http::events::get_event,
        crate::inbound::http::events::register,
        crate::inbound::http::events::unregister,
        crate::inbound::http::actions::complete_action,
        crate::inbound::http::leaderboard::get_leaderboard,
        crate::inbound::http::leaderboard::get_community_rank,
        crate::inbound::http::users::get_reputation,
        crate::inbound::http::users::get_badges,
        crate::inbound::http::health::healthz,
        crate::inbound::http::health::readyz,
    ),
    components(schemas(ErrorSchema, ErrorCodeSchema))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_all_endpoints() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/v1/events",
            "/api/v1/events/{eventId}",
            "/api/v1/events/{eventId}/registrations",
            "/api/v1/events/{eventId}/registrations/{userId}",
            "/api/v1/actions",
            "/api/v1/leaderboard",
            "/api/v1/communities/{communityId}/rank",
            "/api/v1/users/{userId}/reputation",
            "/api/v1/users/{userId}/badges",
            "/healthz",
            "/readyz",
        ] {
            assert!(paths.contains(&expected), "missing path {expected}");
        }
    }
}
