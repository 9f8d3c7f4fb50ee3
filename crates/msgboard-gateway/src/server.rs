use std::future::Future;
use std::sync::Arc;

use msgboard_common::{Error, Result};
use msgboard_config::AppConfig;
use msgboard_db::{MessageProvider, MessageStore};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Binds the configured port and serves the message API and static assets.
pub struct GatewayServer {
    config: AppConfig,
    messages: Arc<dyn MessageProvider>,
}

impl GatewayServer {
    pub fn new(config: AppConfig, messages: Arc<dyn MessageProvider>) -> Self {
        Self { config, messages }
    }

    /// Open the configured database, creating the schema if needed.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let store = MessageStore::open(&config.storage.database_path).await?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Serve on `gateway.host:gateway.port` until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.gateway.host, self.config.gateway.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let state = Arc::new(AppState::new(self.config, self.messages));
        let app = build_router(state);

        info!("msgboard gateway listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Gateway(format!("server error: {e}")))?;

        info!("msgboard gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!("failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    }
}
