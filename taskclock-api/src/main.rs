//! # TaskClock API Server
//!
//! HTTP front end of TaskClock: projects, their members and tasks, and the
//! time spent on them.
//!
//! ## Startup
//!
//! 1. Install the tracing subscriber (`RUST_LOG` overrides the default filter)
//! 2. Load [`Config`] from the environment
//! 3. Connect to PostgreSQL and apply pending migrations
//! 4. Serve the router until Ctrl-C, then drain the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskclock-api
//! ```

use std::sync::Arc;
use taskclock_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskclock_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskclock_api=debug,taskclock_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TaskClock API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        max_connections: config.database.max_connections,
        ..DatabaseConfig::from_url(&config.database.url)
    })
    .await?;
    run_migrations(&pool).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(Arc::new(PgStore::new(pool.clone())), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
