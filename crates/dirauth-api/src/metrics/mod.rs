//! Prometheus metrics for Dirauth
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dirauth_core::{Error, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "dirauth_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "dirauth_http_request_duration_seconds";

    // Directory flow metrics
    pub const AUTH_ATTEMPTS_TOTAL: &str = "dirauth_auth_attempts_total";
    pub const USER_LISTINGS_TOTAL: &str = "dirauth_user_listings_total";
    pub const USERS_LISTED: &str = "dirauth_users_listed";

    // System metrics
    pub const UPTIME_SECONDS: &str = "dirauth_uptime_seconds";
    pub const INFO: &str = "dirauth_info";
}

/// Authentication outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthResult {
    Verified,
    ProfileIncomplete,
    Rejected,
    InvalidRequest,
    Failed,
}

impl AuthResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::ProfileIncomplete => "profile_incomplete",
            Self::Rejected => "rejected",
            Self::InvalidRequest => "invalid_request",
            Self::Failed => "failed",
        }
    }

    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::InvalidCredentials => Self::Rejected,
            Error::InvalidRequest(_) => Self::InvalidRequest,
            _ => Self::Failed,
        }
    }
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the process-wide Prometheus recorder
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            Error::InternalError(format!("Failed to install Prometheus recorder: {}", e))
        })?;

        // Set initial info metric
        gauge!(names::INFO, "version" => dirauth_core::VERSION).set(1.0);

        Ok(Self::with_handle(handle))
    }

    /// Recorder that is not installed globally; renders nothing
    pub fn detached() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        Self::with_handle(recorder.handle())
    }

    fn with_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle,
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "path" => path.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string(),
            "path" => path.to_string()
        )
        .record(duration_secs);
    }

    /// Record an authentication attempt
    pub fn record_auth(&self, result: AuthResult) {
        counter!(names::AUTH_ATTEMPTS_TOTAL, "result" => result.as_str()).increment(1);
    }

    /// Record a bulk listing
    pub fn record_listing(&self, users: Option<usize>) {
        counter!(
            names::USER_LISTINGS_TOTAL,
            "status" => if users.is_some() { "success" } else { "error" }
        )
        .increment(1);

        if let Some(count) = users {
            gauge!(names::USERS_LISTED).set(count as f64);
        }
    }
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, &path, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRecorder>>) -> impl IntoResponse {
    let output = metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
