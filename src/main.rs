//! Roster - user directory REST service
//!
//! Exposes user CRUD under /v1/users plus health endpoints, backed by
//! PostgreSQL through a keyed connection cache.

mod api;
mod config;
mod db;
mod dto;
mod error;
mod serializer;
mod services;

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::{DbPools, PgConnector, UserRepository, DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH};
use crate::services::UserService;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub pools: Arc<DbPools>,
    pub users: Arc<UserService>,
    /// Cancelled on shutdown; in-flight operations observe it and bail.
    pub shutdown: CancellationToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Roster");

    let pools = Arc::new(DbPools::new(PgConnector::new(config.database.clone())));
    let shutdown = CancellationToken::new();

    // Open and validate the default connection up front, and run migrations
    let key = DbPools::key(DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH);
    let database = pools.get(&key, &shutdown).await?;
    database.migrate().await?;
    tracing::info!("Database connected and migrated");

    let repository = Arc::new(UserRepository::new(pools.clone()));
    let users = Arc::new(UserService::new(repository));

    let state = AppState {
        pools,
        users,
        shutdown: shutdown.clone(),
    };

    let app = Router::new()
        .merge(api::health::router())
        .nest("/v1", api::users::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
