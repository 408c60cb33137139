//! ServerBuilder for assembling and serving the HTTP API

use super::exposure::RestExposure;
use super::host::AppState;
use crate::config::{ShopConfig, StorageBackend};
use crate::storage::Stores;
use crate::storage::seed::seed_demo;
use anyhow::{Result, bail};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder wiring configuration and storage into a router
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new(ShopConfig::default())
///     .with_stores(Stores::in_memory())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ShopConfig,
    stores: Option<Stores>,
}

impl ServerBuilder {
    pub fn new(config: ShopConfig) -> Self {
        Self {
            config,
            stores: None,
        }
    }

    /// Use already opened storage instead of the configured backend
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Build the shared handler state
    ///
    /// Without explicit stores only the in-memory backend can be opened
    /// synchronously; use [`serve`](Self::serve) for the others.
    pub fn build_state(self) -> Result<AppState> {
        let stores = match self.stores {
            Some(stores) => stores,
            #[cfg(feature = "in-memory")]
            None if self.config.storage.backend == StorageBackend::InMemory => {
                Stores::in_memory()
            }
            None => bail!(
                "storage backend {:?} must be opened before building; call .with_stores()",
                self.config.storage.backend
            ),
        };
        Ok(AppState::new(stores, self.config))
    }

    /// Build the final REST router with tracing and CORS layers
    pub fn build(self) -> Result<Router> {
        let state = self.build_state()?;
        Ok(RestExposure::build_router(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()))
    }

    /// Open storage if needed, seed it when configured, then serve with
    /// graceful shutdown
    ///
    /// This will:
    /// - Bind to the configured address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(mut self) -> Result<()> {
        let stores = match self.stores.take() {
            Some(stores) => stores,
            None => Stores::open(&self.config.storage).await?,
        };

        if self.config.storage.seed_demo {
            seed_demo(&stores).await?;
        }

        let addr = self.config.socket_addr()?;
        let app = self.with_stores(stores).build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
