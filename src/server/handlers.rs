//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::{AppState, ProbeModule};
use crate::error::{AppError, AppResult};
use crate::metrics::internal_metrics;
use crate::transformer::{PrometheusFormatter, PrometheusMetric};

/// Prometheus text exposition content type
const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Module used when the probe does not name one
pub const DEFAULT_MODULE: &str = "default";

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// `/probe` query parameters
#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    pub module: Option<String>,
    pub target: Option<String>,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>rJSON-Exporter</title>
</head>
<body>
    <h1>rJSON-Exporter</h1>
    <p>Version: {}</p>
    <form action="/probe">
        <label>Target:</label> <input type="text" name="target" placeholder="http://localhost:8000/data.json">
        <label>Module:</label> <input type="text" name="module" value="{}">
        <input type="submit" value="Probe">
    </form>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        DEFAULT_MODULE,
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Exporter self-metrics
pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        internal_metrics().format_prometheus(),
    )
}

/// Probe endpoint - fetches the target's JSON document and returns the
/// module's metrics in Prometheus format
#[instrument(skip(state), name = "probe_handler")]
pub async fn probe(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> AppResult<Response> {
    let start = Instant::now();

    let module_name = params
        .module
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MODULE.to_string());

    let module = state
        .modules
        .get(&module_name)
        .ok_or_else(|| AppError::UnknownModule(module_name.clone()))?;

    let target = params
        .target
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingTarget)?;

    let result = scrape(&state, module, &module_name, &target).await;

    let elapsed = start.elapsed().as_secs_f64();
    match result {
        Ok(body) => {
            internal_metrics().record_probe_success(&module_name, elapsed);
            Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
        }
        Err(e) => {
            internal_metrics().record_probe_failure(&module_name, elapsed);
            Err(e)
        }
    }
}

async fn scrape(
    state: &AppState,
    module: &ProbeModule,
    module_name: &str,
    target: &str,
) -> AppResult<String> {
    debug!(module = %module_name, target = %target, "Probing target");

    let data = state
        .fetcher
        .fetch(target, &module.config)
        .await
        .map_err(|source| AppError::Fetch {
            target: target.to_string(),
            source,
        })?;

    let document: Value =
        serde_json::from_slice(&data).map_err(|_| AppError::InvalidResponse {
            target: target.to_string(),
            body: String::from_utf8_lossy(&data).into_owned(),
        })?;

    let metrics: Vec<PrometheusMetric> = module
        .engine
        .collect(&document)
        .map(|observation| observation.to_prometheus())
        .collect();

    info!(
        module = %module_name,
        target = %target,
        observations = metrics.len(),
        "Probe completed"
    );
    internal_metrics().record_observations(module_name, metrics.len());

    Ok(PrometheusFormatter::new()
        .with_timestamps(true)
        .format(&metrics))
}
