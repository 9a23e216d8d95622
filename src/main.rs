//! CBM Dashboard server.
//!
//! Serves the server-rendered dashboard pages, the widget data API and
//! the static client bundle.

#[cfg(feature = "server")]
mod server {
    use cbm_dashboard::{api, config, store};

    use anyhow::Result;
    use std::net::SocketAddr;
    use tokio::signal;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    pub async fn run() -> Result<()> {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "cbm_dashboard=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();

        tracing::info!("Starting CBM Dashboard v{}", env!("CARGO_PKG_VERSION"));

        let config = config::load_config()?;
        tracing::info!("Configuration loaded, port: {}", config.port);

        // A missing or unreadable data file serves an empty dashboard
        // rather than refusing to start.
        let store = match store::MetricsStore::load(&config.data_file) {
            Ok(store) => {
                tracing::info!(records = store.len(), file = %config.data_file, "data loaded");
                store
            }
            Err(e) => {
                tracing::warn!(file = %config.data_file, error = %e, "data load failed, starting empty");
                store::MetricsStore::empty()
            }
        };

        let state = api::AppState::new(store, config.warning_limit);
        let app = api::router(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        tracing::info!("Listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutdown complete");
        Ok(())
    }

    /// Wait for shutdown signal (Ctrl+C or SIGTERM)
    async fn shutdown_signal() {
        let ctrl_c = async {
            if signal::ctrl_c().await.is_err() {
                tracing::error!("Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(_) => {
                    tracing::error!("Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        }
    }
}

#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run().await
}

#[cfg(not(feature = "server"))]
fn main() {}
