//! HTTP endpoint handlers.
//!
//! - `/`: index page
//! - `/health`: server health statistics (text)
//! - `/api/*`: JSON resource figures, see [`api`]
//!
//! Every collecting handler runs its reads on the blocking pool through
//! [`run_blocking`], bounded by the configured request timeout.

pub mod api;
pub mod health;
pub mod root;

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, warn};

use procpulse::{AssemblyMode, CollectError, Collector, ResourceKind, Sample, SamplingStrategy};

use crate::state::SharedState;

pub use health::health_handler;
pub use root::root_handler;

/// Error type for `/api/*` failures, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    Collect(CollectError),
    Timeout(Duration),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Collect(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Collect(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Collect(e) => write!(f, "{}", e),
            ApiError::Timeout(after) => {
                write!(f, "collection timed out after {} ms", after.as_millis())
            }
            ApiError::Internal(msg) => f.write_str(msg),
        }
    }
}

impl From<CollectError> for ApiError {
    fn from(e: CollectError) -> Self {
        ApiError::Collect(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Runs `work` on the blocking pool under the request timeout and records
/// the outcome in the health counters.
pub async fn run_blocking<T, F>(state: &SharedState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollectError> + Send + 'static,
{
    let started = Instant::now();
    let limit = state.config.request_timeout();
    let stats = &state.health_stats;

    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(Ok(value))) => {
            stats.record_collection_success(started.elapsed());
            Ok(value)
        }
        Ok(Ok(Err(e))) => {
            stats.record_collection_failure();
            debug!("Collection failed: {}", e);
            Err(ApiError::Collect(e))
        }
        Ok(Err(join_err)) => {
            stats.record_collection_failure();
            warn!("Collection task failed: {}", join_err);
            Err(ApiError::Internal(format!(
                "collection task failed: {}",
                join_err
            )))
        }
        Err(_) => {
            stats.record_collection_timeout();
            warn!("Collection timed out after {:?}", limit);
            Err(ApiError::Timeout(limit))
        }
    }
}

/// Best-effort sample of `kinds` with the given strategy and no previous snapshot.
pub async fn sample(
    state: &SharedState,
    kinds: &[ResourceKind],
    strategy: SamplingStrategy,
) -> Result<Sample, ApiError> {
    let collector = Collector::new(state.reader.clone(), kinds, AssemblyMode::BestEffort);
    let sample = run_blocking(state, move || strategy.sample(&collector, None)).await?;
    if let Some(procs) = &sample.snapshot.processes {
        state.health_stats.record_processes_seen(procs.len());
    }
    Ok(sample)
}

/// Counts every request and its duration for `/health`.
async fn track_requests(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let started = Instant::now();
    state.health_stats.record_http_request();
    let response = next.run(req).await;
    state
        .health_stats
        .record_request_duration(started.elapsed().as_secs_f64() * 1000.0);
    response
}

/// Builds the application router.
pub fn build_router(state: SharedState) -> Router {
    let mut app = Router::new().route("/", get(root_handler));

    if state.config.health_enabled() {
        app = app.route("/health", get(health_handler));
    }

    app = app
        .route("/api/cpu", get(api::cpu_handler))
        .route("/api/disk", get(api::disk_handler))
        .route("/api/memory", get(api::memory_handler))
        .route("/api/network", get(api::network_handler))
        .route("/api/process", get(api::process_handler))
        .route("/api/all", get(api::all_handler))
        .route("/api/loadavg", get(api::loadavg_handler))
        .route("/api/uptime", get(api::uptime_handler))
        .route("/api/topcpu", get(api::top_cpu_handler))
        .route("/api/topram", get(api::top_ram_handler))
        .route("/api/steal", get(api::steal_handler))
        .route("/api/sockstat", get(api::sockstat_handler))
        .route("/api/filenr", get(api::filenr_handler))
        .route("/api/pressure", get(api::pressure_handler))
        .route("/api/vmstat", get(api::vmstat_handler))
        .route("/api/snmp", get(api::snmp_handler))
        .route("/api/netstat", get(api::netstat_handler));

    if state.config.gpu_enabled() {
        app = app.route("/api/gpu", get(api::gpu_handler));
    }

    app.layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use procpulse::{FixedReader, ProcfsReader, Reader};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::state::AppState;

    fn test_state(reader: Arc<dyn Reader>) -> SharedState {
        let config = Config {
            sample_pause_ms: Some(10),
            request_timeout_ms: Some(2000),
            enable_gpu: Some(false),
            ..Config::default()
        };
        AppState::new(config, reader)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_cpu_route_formats_percentages() {
        let app = build_router(test_state(Arc::new(FixedReader)));
        let (status, body) = get_json(app, "/api/cpu").await;
        assert_eq!(status, StatusCode::OK);
        // Both reads of the fixed reader are identical, so the interval has no ticks.
        assert_eq!(body["total_usage"], "0.00%");
        assert_eq!(body["idle_usage"], "0.00%");
    }

    #[tokio::test]
    async fn test_memory_route_keeps_human_sizes() {
        let app = build_router(test_state(Arc::new(FixedReader)));
        let (status, body) = get_json(app, "/api/memory").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_memory"], "16.0 GB");
        assert_eq!(body["free_memory"], "8.0 GB");
        assert_eq!(body["percent_used"], "50.00%");
    }

    #[tokio::test]
    async fn test_all_route_has_every_section() {
        let app = build_router(test_state(Arc::new(FixedReader)));
        let (status, body) = get_json(app, "/api/all").await;
        assert_eq!(status, StatusCode::OK);
        for key in [
            "cpu",
            "memory",
            "load_avg",
            "uptime",
            "steal_iowait",
            "sockets",
            "file_descriptors",
            "pressure",
            "top_cpu",
            "top_ram",
            "disks",
            "network",
        ] {
            assert!(!body[key].is_null(), "missing {}", key);
        }
        assert_eq!(body["uptime"]["formatted"], "1d 0h 0m");
        assert_eq!(body["load_avg"]["1m"], "0.50");
    }

    #[tokio::test]
    async fn test_top_ram_orders_by_rss() {
        let app = build_router(test_state(Arc::new(FixedReader)));
        let (status, body) = get_json(app, "/api/topram").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["System", "csrss.exe", "smss.exe"]);
    }

    #[tokio::test]
    async fn test_missing_source_is_503() {
        let reader = ProcfsReader::new(PathBuf::from("/nonexistent/proc"));
        let app = build_router(test_state(Arc::new(reader)));
        let (status, body) = get_json(app, "/api/loadavg").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("loadavg"));
    }

    #[tokio::test]
    async fn test_malformed_source_is_500() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("meminfo"), "garbage\n").unwrap();
        let app = build_router(test_state(Arc::new(ProcfsReader::new(dir.path()))));
        let (status, body) = get_json(app, "/api/memory").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_gpu_route_absent_when_disabled() {
        let app = build_router(test_state(Arc::new(FixedReader)));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/api/gpu")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_counts_requests() {
        let state = test_state(Arc::new(FixedReader));
        let app = build_router(state.clone());
        let _ = get_json(app.clone(), "/api/vmstat").await;

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("http_requests_total"));
        assert_eq!(
            state
                .health_stats
                .collection_success_count
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }
}
