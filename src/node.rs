use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{router, ApiState};
use crate::config::ServerConfig;
use crate::scheduler::{Scheduler, SharedScheduler};

/// Composition root: owns the scheduler instance and serves it over HTTP.
pub struct Server {
    pub config: ServerConfig,
    pub scheduler: SharedScheduler,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            scheduler: Scheduler::shared(),
        }
    }

    /// Bind the configured address and serve until `shutdown` is cancelled.
    pub async fn run(
        self,
        shutdown: CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(self.config.listen_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener. Lets tests bind port 0.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = listener.local_addr()?;
        let app = router(ApiState {
            scheduler: self.scheduler.clone(),
        });

        tracing::info!(addr = %addr, "Scheduler API listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        tracing::info!("Scheduler API stopped");
        Ok(())
    }
}
