use crate::envelope::{failure, ErrorCode, LeadsResponse};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use leadpipe_core::{Error, LeadQuery, ModelFactory, SearchBackend};
use leadpipe_local::{BatchConfig, LeadPipeline};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Quota bucket for requests that arrive without a forwarded-client header.
/// All such clients share it.
const ANONYMOUS_CLIENT: &str = "unknown";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub limiter: Arc<leadpipe_local::SlidingWindowLimiter>,
    pub search: Arc<dyn SearchBackend>,
    pub models: Arc<dyn ModelFactory>,
    pub batch: BatchConfig,
    pub http: reqwest::Client,
    pub echo_ip_url: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/leads", post(generate_leads))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsRequest {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub email_domain: String,
    #[serde(default)]
    pub api_key: String,
}

fn client_key(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
}

/// `POST /api/leads` — run one search-and-extract pass.
///
/// Gate order matters: rate limiting counts every attempt (even ones that
/// would fail validation), and validation rejects before any network call.
/// A malformed JSON body is treated as an empty request, which then fails
/// validation the same way an empty object would.
async fn generate_leads(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<LeadsRequest>>,
) -> Response {
    let key = client_key(&headers);
    if !state.limiter.allow(key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return failure(
            ErrorCode::RateLimited,
            "Too many requests, please try again later",
        );
    }

    let Json(req) = body.unwrap_or_default();
    if req.api_key.trim().is_empty() {
        return failure(ErrorCode::MissingApiKey, "Please provide a valid API key");
    }
    if req.keyword.trim().is_empty() {
        return failure(ErrorCode::MissingKeyword, "Please provide a search keyword");
    }

    let model = state.models.for_api_key(req.api_key.trim());
    let query = LeadQuery {
        keyword: req.keyword,
        location: req.location,
        email_domain: req.email_domain,
        max_results: None,
    };

    let pipeline = LeadPipeline::new(state.search.clone(), state.batch.clone());
    match pipeline.run(&query, model.as_ref()).await {
        Ok(report) => Json(LeadsResponse {
            success: true,
            results_count: report.summary.records_kept,
            total_found: report.summary.snippets_found,
            processing_rate: report.summary.success_rate_percent,
            data: report.leads,
        })
        .into_response(),
        Err(Error::NoResults(msg)) => failure(ErrorCode::NoResults, msg),
        Err(e @ (Error::Fetch(_) | Error::Blocked(_))) => {
            tracing::error!(error = %e, "search fetch failed");
            failure(ErrorCode::SearchFailed, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "lead generation failed");
            failure(ErrorCode::Internal, "Internal server error")
        }
    }
}

#[derive(Debug, Deserialize)]
struct EchoIp {
    origin: String,
}

/// `GET /api/health` — liveness probe that also verifies outbound egress by
/// asking an echo-IP service who we are.
async fn health(State(state): State<AppState>) -> Response {
    let result = state
        .http
        .get(&state.echo_ip_url)
        .timeout(HEALTH_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => match resp.json::<EchoIp>().await {
            Ok(echo) => Json(serde_json::json!({
                "success": true,
                "status": "ok",
                "ip": echo.origin,
                "message": "Service is healthy",
            }))
            .into_response(),
            Err(e) => {
                tracing::warn!(error = %e, "health check: echo response unreadable");
                unhealthy()
            }
        },
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), "health check: echo service errored");
            unhealthy()
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check: echo service unreachable");
            unhealthy()
        }
    }
}

fn unhealthy() -> Response {
    (
        ErrorCode::HealthCheckFailed.status(),
        Json(serde_json::json!({
            "success": false,
            "status": "error",
            "error": ErrorCode::HealthCheckFailed.as_str(),
            "message": "Service is unavailable",
        })),
    )
        .into_response()
}
