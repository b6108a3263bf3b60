//! Gateway server implementation

use axum::{
    extract::FromRef,
    handler::Handler,
    middleware,
    routing::{get, post},
    Router,
};
use dirauth_auth::{DirectoryConnector, DirectoryQuery, LdapConnector, UserAuthenticator};
use dirauth_core::{config::GatewayConfig, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{info, warn};

use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub authenticator: Arc<UserAuthenticator>,
    pub query: Arc<DirectoryQuery>,
    pub metrics: Arc<MetricsRecorder>,
}

impl AppState {
    /// Wire the directory flows over `connector`. The service credential is
    /// resolved here, once.
    pub fn new(
        config: GatewayConfig,
        connector: Arc<dyn DirectoryConnector>,
        metrics: Arc<MetricsRecorder>,
    ) -> Result<Self> {
        let directory = Arc::new(config.directory.clone());
        let service = directory.service_credential()?;

        let query = Arc::new(DirectoryQuery::new(
            connector.clone(),
            directory.clone(),
            service,
        ));
        let authenticator = Arc::new(UserAuthenticator::new(
            connector,
            directory,
            query.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            authenticator,
            query,
            metrics,
        })
    }
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Directory authentication gateway
pub struct GatewayServer {
    config: GatewayConfig,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        self.config.validate()?;

        let metrics = Arc::new(MetricsRecorder::install()?);
        info!("Prometheus metrics initialized");

        let connector = Arc::new(LdapConnector::new(&self.config.directory));
        info!(
            url = %connector.url(),
            base_dn = %self.config.directory.base_dn,
            profile_lookup = ?self.config.directory.profile_lookup,
            "Directory configured"
        );

        let addr = self.config.server.socket_address();
        let state = AppState::new(self.config, connector, metrics)?;
        let app = create_router(state);

        let listener = TcpListener::bind(&addr).await?;

        info!("Dirauth gateway listening on http://{}", addr);
        info!("Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Dirauth gateway stopped");
        Ok(())
    }
}

pub fn create_router(state: AppState) -> Router {
    let http_metrics = middleware::from_fn_with_state(state.metrics.clone(), metrics_middleware);

    Router::new()
        .route("/", get(routes::not_found))
        .route("/api", get(routes::service_info))
        .route("/api/auth", post(routes::authenticate))
        .route("/api/users", get(routes::list_users))
        .route("/metrics", get(metrics_handler))
        .route_layer(http_metrics.clone())
        // Fallback requests have no MatchedPath and are counted as "unmatched"
        .fallback(routes::not_found.layer(http_metrics))
        .layer(CatchPanicLayer::custom(routes::handle_panic))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
