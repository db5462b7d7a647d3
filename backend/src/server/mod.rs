//! Server construction and wiring.

pub mod config;
pub mod scheduler;
pub mod state_builders;

pub use config::{ConfigError, ServerConfig};
pub use scheduler::AggregationScheduler;
pub use state_builders::{DynAggregationService, EngineState, build_engine_state};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::actions::complete_action;
use crate::inbound::http::events::{create_event, get_event, register, unregister};
use crate::inbound::http::health::{HealthState, healthz, readyz};
use crate::inbound::http::leaderboard::{get_community_rank, get_leaderboard};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users::{get_badges, get_reputation};
use crate::middleware::RequestLog;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
    } = deps;

    let api = web::scope("/api/v1")
        .service(create_event)
        .service(get_event)
        .service(register)
        .service(unregister)
        .service(complete_action)
        .service(get_leaderboard)
        .service(get_community_rank)
        .service(get_reputation)
        .service(get_badges);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .wrap(RequestLog)
        .service(api)
        .service(healthz)
        .service(readyz);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct the Actix HTTP server and spawn the aggregation scheduler.
///
/// # Errors
/// Propagates [`std::io::Error`] when wiring the engine, binding the
/// socket, or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let engine = build_engine_state(&config)
        .map_err(|err| std::io::Error::other(format!("engine wiring failed: {err}")))?;

    AggregationScheduler::new(
        engine.aggregation,
        engine.leaderboard,
        config.aggregation_interval,
    )
    .spawn();

    let http_state = web::Data::new(engine.http);
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
