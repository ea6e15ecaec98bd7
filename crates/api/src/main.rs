//! API server entry point.

use std::time::Duration;

use api::config::{Config, LogFormat};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(app: axum::Router, addr: &str) {
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle =
        api::routes::metrics::install_recorder().expect("failed to install Prometheus recorder");

    // 3. Build the stores and application state
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(url)
                .await
                .expect("failed to connect to database");
            storage::postgres::run_migrations(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!(
                max_connections = config.database_max_connections,
                "using PostgreSQL stores"
            );

            let state =
                api::postgres_state(pool, config.cart_settings(), config.checkout_settings());
            api::create_app(state, metrics_handle)
        }
        None => {
            let (state, catalog) =
                api::in_memory_state(config.cart_settings(), config.checkout_settings());
            match &config.catalog_seed_file {
                Some(path) => {
                    let json = tokio::fs::read_to_string(path)
                        .await
                        .expect("failed to read catalog seed file");
                    let products = api::seed_catalog(&catalog, &json)
                        .await
                        .expect("failed to parse catalog seed file");
                    tracing::warn!(
                        %path,
                        products,
                        "DATABASE_URL not set, using in-memory stores"
                    );
                }
                None => tracing::warn!(
                    "DATABASE_URL not set and no CATALOG_SEED_FILE given: the in-memory catalog \
                     is empty, so every checkout will fail with product not found"
                ),
            }
            api::create_app(state, metrics_handle)
        }
    };

    // 4. Start server
    serve(app, &config.addr()).await;
}
