use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use tigertix_api::config::{Config, LogFormat};
use tigertix_api::database::{self, DatabaseConfig};
use tigertix_api::services::{seed_data, SqliteInventoryStore};
use tigertix_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = Arc::new(Config::from_env()?);

    init_tracing(config.log_format);
    info!("Starting TigerTix API server...");

    let db = DatabaseConfig::new(config.database_path.clone(), config.busy_timeout());
    database::run_migrations(&db)?;

    let store = Arc::new(SqliteInventoryStore::new(db));
    if config.seed_sample_events {
        let seed_store = store.clone();
        tokio::task::spawn_blocking(move || seed_data::seed_sample_events(seed_store.as_ref()))
            .await??;
    }

    let app_state = AppState::new(store, config.clone());
    info!(
        max_attempts = config.purchase_max_attempts,
        retry_base_ms = config.purchase_retry_base_ms,
        busy_timeout_ms = config.busy_timeout_ms,
        "Reservation engine ready"
    );

    let app = build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tigertix_api=debug,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
