//! Health check endpoint handler.
//!
//! `/health` returns plain text: a status line, the server uptime and the
//! [`HealthStats`](crate::health_stats::HealthStats) table.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::atomic::Ordering;
use tracing::{debug, instrument};

use procpulse::format::format_duration;

use crate::state::SharedState;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "procpulse - Linux resource counters as JSON";

/// Handler for the /health endpoint.
///
/// Always 200: the server is up even when the last collection failed. The
/// status line says which.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let stats = &state.health_stats;
    let failures = stats.collection_failure_count.load(Ordering::Relaxed);
    let successes = stats.collection_success_count.load(Ordering::Relaxed);

    let message = match (successes, failures) {
        (0, 0) => "OK - no collection yet",
        (_, 0) => "OK",
        (0, _) => "Degraded - every collection failed",
        _ => "OK - some collections failed",
    };

    let uptime_str = format_duration(state.start_time.elapsed().as_secs_f64());
    let table = stats.render_table();

    (
        StatusCode::OK,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nReader: {reader}\nUptime: {uptime_str}\n\n{table}\n{FOOTER_TEXT}\n",
            reader = state.reader.name()
        ),
    )
}
