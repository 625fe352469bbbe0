//! Root endpoint handler for the landing page.

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use procpulse::format::format_duration;

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Routes listed on the index page, in display order.
const ENDPOINTS: &[(&str, &str)] = &[
    ("/api/all", "Summary of every resource in one sample"),
    ("/api/cpu", "CPU usage over one sample pause"),
    ("/api/memory", "Memory and swap usage"),
    ("/api/disk", "Completed reads and writes per block device"),
    ("/api/network", "Bytes and packets per interface"),
    ("/api/process", "All processes with resident memory"),
    ("/api/topcpu", "Top processes by CPU share"),
    ("/api/topram", "Top processes by resident memory"),
    ("/api/loadavg", "Load averages"),
    ("/api/uptime", "System uptime"),
    ("/api/steal", "CPU steal and I/O wait"),
    ("/api/sockstat", "Socket usage"),
    ("/api/filenr", "File descriptor usage"),
    ("/api/pressure", "Pressure stall information"),
    ("/api/vmstat", "Paging, swapping and OOM counters"),
    ("/api/snmp", "IP, TCP and UDP counters"),
    ("/api/netstat", "Extended TCP and IP counters"),
];

/// Handler for the root `/` endpoint.
#[instrument(skip(state))]
pub async fn root_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing / request");

    let version = env!("CARGO_PKG_VERSION");
    let built = option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown");
    let uptime = format_duration(state.start_time.elapsed().as_secs_f64());

    let mut items = String::new();
    let extra = [
        (state.config.gpu_enabled(), "/api/gpu", "NVIDIA GPU statistics"),
        (state.config.health_enabled(), "/health", "Server health statistics (text)"),
    ];
    let listed = ENDPOINTS
        .iter()
        .copied()
        .chain(extra.iter().filter(|e| e.0).map(|e| (e.1, e.2)));
    for (path, desc) in listed {
        writeln!(
            items,
            r#"        <li><a href="{path}">{path}</a><div class="endpoint-desc">{desc}</div></li>"#
        )
        .ok();
    }

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>procpulse</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; line-height: 1.6; }}
        .container {{ max-width: 900px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }}
        h1 {{ color: #333; border-bottom: 3px solid #2e8b57; padding-bottom: 15px; }}
        .info {{ background: #e9ecef; padding: 15px; border-radius: 4px; }}
        .endpoint-list {{ list-style: none; padding: 0; }}
        .endpoint-list li {{ margin: 12px 0; padding: 10px 15px; background: #f8f9fa; border-left: 4px solid #2e8b57; }}
        .endpoint-list a {{ color: #2e8b57; font-weight: 600; text-decoration: none; }}
        .endpoint-desc {{ color: #666; }}
        .footer {{ margin-top: 40px; color: #666; font-size: 0.9em; text-align: center; }}
    </style>
</head>
<body>
<div class="container">
    <h1>procpulse</h1>
    <div class="info">
        Version <b>{version}</b> | Built <b>{built}</b> | Reader <b>{reader}</b> | Uptime <b>{uptime}</b>
    </div>
    <h2>Endpoints</h2>
    <ul class="endpoint-list">
{items}    </ul>
    <div class="footer">{footer}</div>
</div>
</body>
</html>"#,
        reader = state.reader.name(),
        footer = FOOTER_TEXT
    );

    Html(html)
}
