//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::Config;
use crate::directory::DirectoryClient;
use crate::ops::Prober;

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: DirectoryClient,
    /// Absent when no operations base URL is configured; operations routes
    /// then answer with an error envelope.
    pub prober: Option<Arc<Prober>>,
}

/// Web server for Wavegate.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: Config, directory: DirectoryClient, prober: Option<Arc<Prober>>) -> Self {
        Self {
            state: AppState {
                config: Arc::new(config),
                directory,
                prober,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Operations proxies
            .route("/api/health", get(handlers::handle_health))
            .route("/api/metrics", get(handlers::handle_metrics))
            .route("/api/logs", get(handlers::handle_logs))
            .route("/api/ops/status", get(handlers::handle_ops_status))
            // Station directory
            .route("/api/stations/search", get(handlers::handle_station_search))
            .route(
                "/api/stations/countries",
                get(handlers::handle_station_countries),
            )
            .route("/api/stations/tags", get(handlers::handle_station_tags))
            .route(
                "/api/stations/languages",
                get(handlers::handle_station_languages),
            )
            .route(
                "/api/stations/{stationuuid}/click",
                post(handlers::handle_station_click),
            )
            .layer(cors)
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
