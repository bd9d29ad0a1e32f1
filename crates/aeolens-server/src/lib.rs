//! HTTP API for aeolens
//!
//! Thin layer over `aeolens-core`: every handler parses the request, runs one
//! pipeline and wraps the report in [`ApiResponse`].

use aeolens_core::config::DEFAULT_MAX_REQUEST_PAGES;
use aeolens_core::{AuditContext, AuditError, run_full_pipeline, run_with_competitors};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const SERVICE_NAME: &str = "AEO Analysis API";

/// Front-end origins allowed to call the API.
pub const ALLOWED_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Clone)]
pub struct AppState {
    pub context: AuditContext,
    pub max_request_pages: usize,
}

impl AppState {
    pub fn new(context: AuditContext) -> Self {
        Self {
            context,
            max_request_pages: DEFAULT_MAX_REQUEST_PAGES,
        }
    }

    pub fn with_max_request_pages(mut self, max_request_pages: usize) -> Self {
        self.max_request_pages = max_request_pages.max(1);
        self
    }

    /// Context for one request; a requested page budget is capped at
    /// `max_request_pages`.
    fn context_for(&self, max_pages: Option<usize>) -> AuditContext {
        match max_pages {
            Some(max_pages) => self
                .context
                .with_max_pages(max_pages.min(self.max_request_pages)),
            None => self.context.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub url: String,
    #[serde(default, alias = "max_pages")]
    pub max_pages: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A failed pipeline, rendered as `{success: false, error}`.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn from_audit(prefix: &str, err: AuditError) -> Self {
        let status = match err {
            AuditError::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            AuditError::RootUnreachable(_) | AuditError::RootStatus { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: format!("{prefix}: {err}"),
        }
    }

    fn internal(message: String) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

fn success<T: Serialize>(report: &T) -> Result<Json<ApiResponse>, ApiError> {
    let data = serde_json::to_value(report)
        .map_err(|e| ApiError::internal(format!("Failed to serialize report: {e}")))?;
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    }))
}

pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = ALLOWED_ORIGINS
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/analyze_with_competitors", post(analyze_with_competitors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn root() -> Json<JsonValue> {
    Json(json!({"message": format!("{SERVICE_NAME} is running")}))
}

async fn health() -> Json<JsonValue> {
    Json(json!({"status": "healthy", "service": SERVICE_NAME}))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    tracing::info!(url = %request.url, max_pages = ?request.max_pages, "Starting AEO analysis");

    let context = state.context_for(request.max_pages);

    let report = run_full_pipeline(&context, &request.url).await.map_err(|err| {
        tracing::error!(url = %request.url, error = %err, "AEO analysis failed");
        ApiError::from_audit("Analysis failed", err)
    })?;

    tracing::info!(url = %request.url, score = report.audit_report.aeo_score_pct, "AEO analysis completed");
    success(&report)
}

async fn analyze_with_competitors(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    tracing::info!(url = %request.url, "Starting AEO analysis with competitors");

    let context = state.context_for(request.max_pages);

    let report = run_with_competitors(&context, &request.url).await.map_err(|err| {
        tracing::error!(url = %request.url, error = %err, "AEO analysis with competitors failed");
        ApiError::from_audit("Analysis with competitors failed", err)
    })?;

    tracing::info!(
        url = %request.url,
        competitors = report.competitor_analysis.total_competitors,
        "AEO analysis with competitors completed"
    );
    success(&report)
}
