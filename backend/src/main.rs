//! Engine entry-point: wires adapters, REST endpoints, and the scheduler.

use std::env;

use actix_web::web;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::outbound::persistence::PoolConfig;
use backend::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let mut config = ServerConfig::from_env()
        .map_err(|err| std::io::Error::other(format!("configuration error: {err}")))?;

    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PoolConfig::new(database_url)
                .build()
                .await
                .map_err(|err| std::io::Error::other(format!("pool build failed: {err}")))?;
            config = config.with_db_pool(pool);
            info!("using PostgreSQL storage");
        }
        Err(_) => {
            warn!("DATABASE_URL not set, using in-memory storage (state is not durable)");
        }
    }

    let bind_addr = config.bind_addr();
    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(%bind_addr, "engine listening");
    server.await
}
