use crate::{create_router, AppState};
use collecthub_core::{ConfigManager, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

pub struct Server {
    state: AppState,
    config: Arc<ConfigManager>,
}

impl Server {
    pub async fn new(config: Arc<ConfigManager>) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { state, config })
    }

    pub async fn run(self) -> Result<()> {
        let settings = self.config.settings();
        let router = create_router(self.state.clone());

        let listener =
            TcpListener::bind((settings.server.host.as_str(), settings.server.port)).await?;
        let addr = listener.local_addr()?;

        info!("Starting CollectHub API server ({} environment)", settings.env);
        info!("Server listening on http://{}", addr);
        info!("  GET  /health - Health check");
        info!("  GET  /ping - Liveness probe");
        info!("  POST /api/aipersonality/analysis - Personality analysis");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}
