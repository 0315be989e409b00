use school_service::{build_router, config::SchoolConfig, db, AppState};
use service_core::observability::init_tracing;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = SchoolConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        environment = ?config.environment,
        "Starting school service"
    );

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await.map_err(|e| {
        service_core::error::AppError::InternalError(anyhow::anyhow!(
            "Migration failed: {}",
            e
        ))
    })?;

    let bind_addr = config.common.bind_addr();
    let state = AppState::new(config, pool);
    let app = build_router(state);

    tracing::info!(addr = %bind_addr, "Listening for connections");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| service_core::error::AppError::InternalError(anyhow::anyhow!(e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| service_core::error::AppError::InternalError(anyhow::anyhow!(e)))?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
