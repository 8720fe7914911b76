use crate::identity::{HttpIdentityClient, IdentityError};
use crate::rate_limit::{RateLimitError, RateLimitPolicy, RedisRateLimiter};
use crate::server::ServerState;
use chirp_common::snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId};
use chirp_db::client::DbClient;
use serde::Deserialize;
use sqlx::PgPool;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod feed;
mod identity;
mod rate_limit;
mod server;
mod store;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid snowflake worker or process id: {0}")]
    SnowflakeId(#[from] SnowflakePartOutOfRangeError<u8>),
    #[error("Error connecting to database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error connecting to rate limit backend: {0}")]
    RateLimit(#[from] RateLimitError),
    #[error("Error building identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    redis_url: String,
    identity_base_url: String,
    identity_secret_key: String,
    #[serde(default)]
    worker_id: u8,
    #[serde(default)]
    process_id: u8,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirp_api=debug,chirp_common=debug,chirp_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let worker_id = WorkerId::try_from(env.worker_id)?;
    let process_id = ProcessId::try_from(env.process_id)?;

    let pool = PgPool::connect(&env.database_url).await?;
    let db_client = DbClient::new(pool, worker_id, process_id);

    let rate_limiter = RedisRateLimiter::connect(
        &env.redis_url,
        RateLimitPolicy::default(),
        worker_id,
        process_id,
    )
    .await?;
    let identity = HttpIdentityClient::new(env.identity_base_url, env.identity_secret_key)?;

    let state = ServerState {
        post_store: Arc::new(db_client),
        identity: Arc::new(identity),
        rate_limiter: Arc::new(rate_limiter),
    };

    let app = server::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    debug!(%server_address, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to install shutdown signal handler");
    }
}
