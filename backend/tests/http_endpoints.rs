//! End-to-end HTTP flows over the in-memory adapter family.

use actix_web::{App, test, web};
use serde_json::{Value, json};

use backend::inbound::http::actions::complete_action;
use backend::inbound::http::events::{create_event, get_event, register, unregister};
use backend::inbound::http::leaderboard::{get_community_rank, get_leaderboard};
use backend::inbound::http::users::{get_badges, get_reputation};
use backend::server::{ServerConfig, build_engine_state};

fn test_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().expect("valid address"))
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.http.clone()))
                .service(
                    web::scope("/api/v1")
                        .service(create_event)
                        .service(get_event)
                        .service(register)
                        .service(unregister)
                        .service(complete_action)
                        .service(get_leaderboard)
                        .service(get_community_rank)
                        .service(get_reputation)
                        .service(get_badges),
                ),
        )
        .await
    };
}

macro_rules! create_sample_event {
    ($app:expr, $capacity:expr) => {{
        let request = test::TestRequest::post()
            .uri("/api/v1/events")
            .set_json(json!({
                "communityId": uuid::Uuid::new_v4(),
                "kind": "cleanup",
                "scheduledAt": "2026-09-05T10:00:00Z",
                "capacity": $capacity,
                "organizerId": uuid::Uuid::new_v4(),
            }))
            .to_request();
        let response = test::call_service(&$app, request).await;
        assert_eq!(response.status(), actix_web::http::StatusCode::CREATED);
        let body: Value = test::read_body_json(response).await;
        body
    }};
}

#[actix_web::test]
async fn registration_flow_reports_idempotence_and_capacity() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);

    let event = create_sample_event!(app, 1);
    let event_id = event["id"].as_str().expect("event id").to_owned();
    let user = uuid::Uuid::new_v4();

    // First registration claims the only slot.
    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/events/{event_id}/registrations"))
            .set_json(json!({ "userId": user }))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["accepted"], json!(true));
    assert_eq!(body["alreadyRegistered"], json!(false));
    assert_eq!(body["currentCount"], json!(1));

    // The same user again is an idempotent success.
    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/events/{event_id}/registrations"))
            .set_json(json!({ "userId": user }))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["alreadyRegistered"], json!(true));
    assert_eq!(body["currentCount"], json!(1));

    // A different user hits capacity.
    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/api/v1/events/{event_id}/registrations"))
            .set_json(json!({ "userId": uuid::Uuid::new_v4() }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), actix_web::http::StatusCode::CONFLICT);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], json!("capacity_exceeded"));

    // Withdrawing frees the slot.
    let response = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/events/{event_id}/registrations/{user}"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["removed"], json!(true));
    assert_eq!(body["currentCount"], json!(0));
}

#[actix_web::test]
async fn unknown_event_returns_not_found() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/events/{}", uuid::Uuid::new_v4()))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), actix_web::http::StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], json!("not_found"));
}

#[actix_web::test]
async fn completing_an_action_awards_points_and_badges() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);
    let user = uuid::Uuid::new_v4();

    let payload = json!({
        "userId": user,
        "communityId": uuid::Uuid::new_v4(),
        "actionKind": "tree-plantation",
        "rawMetrics": { "treesPlanted": 3.0 },
        "occurredAt": "2026-08-28T09:00:00Z",
    });

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/actions")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["alreadyRecorded"], json!(false));
    assert_eq!(body["pointsAwarded"], json!(15));
    assert_eq!(body["newBadges"][0]["badgeId"], json!("first-steps"));

    // Redelivery of the same (user, kind, day) is absorbed.
    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/actions")
            .set_json(&payload)
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["alreadyRecorded"], json!(true));
    assert_eq!(body["pointsAwarded"], json!(0));

    // Read models agree.
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/users/{user}/reputation"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["totalPoints"], json!(15));
    assert_eq!(body["actionsCompleted"], json!(1));

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/users/{user}/badges"))
            .to_request(),
    )
    .await;
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["awarded"][0]["badgeId"], json!("first-steps"));
    assert!(body["inProgress"].as_array().is_some());
}

#[actix_web::test]
async fn invalid_action_kind_is_rejected_with_details() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/actions")
            .set_json(json!({
                "userId": uuid::Uuid::new_v4(),
                "communityId": uuid::Uuid::new_v4(),
                "actionKind": "litter-walk",
                "rawMetrics": {},
            }))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], json!("invalid_request"));
    assert_eq!(body["details"]["field"], json!("actionKind"));
}

#[actix_web::test]
async fn leaderboard_serves_recomputed_rankings() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);
    let community = uuid::Uuid::new_v4();

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/v1/actions")
            .set_json(json!({
                "userId": uuid::Uuid::new_v4(),
                "communityId": community,
                "actionKind": "recycling",
                "rawMetrics": { "kgRecycled": 12.0 },
            }))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());

    // Recompute and republish, as the scheduler would.
    state
        .aggregation
        .recompute_all(chrono::Utc::now())
        .await
        .expect("aggregation");
    state.leaderboard.rebuild_all().await.expect("rebuild");

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/leaderboard?window=weekly&limit=5")
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["window"], json!("weekly"));
    assert_eq!(
        body["entries"][0]["communityId"],
        json!(community.to_string())
    );
    assert_eq!(body["entries"][0]["rank"], json!(1));

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/api/v1/communities/{community}/rank?window=weekly"))
            .to_request(),
    )
    .await;
    assert!(response.status().is_success());
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["entry"]["rank"], json!(1));

    // An unranked community is a 404, not an empty page.
    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!(
                "/api/v1/communities/{}/rank?window=weekly",
                uuid::Uuid::new_v4()
            ))
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), actix_web::http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unknown_window_is_rejected() {
    let state = build_engine_state(&test_config()).expect("wiring succeeds");
    let app = test_app!(state);

    let response = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/leaderboard?window=fortnightly")
            .to_request(),
    )
    .await;
    assert_eq!(response.status(), actix_web::http::StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], json!("invalid_request"));
}
