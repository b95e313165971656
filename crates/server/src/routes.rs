use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use moneyleaks_analysis::{
    build_prompt, local_advice, Analysis, AnalysisError, PdftotextExtractor, StatementPipeline,
    TextExtractor, UnavailableExtractor, Upload,
};
use moneyleaks_core::Summary;
use moneyleaks_import::{CategoryRuleEngine, DelimitedOptions, MapContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use crate::advice::AdviceClient;
use crate::config::ServerConfig;
use crate::error::ApiError;

/// Multipart field carrying the statement.
pub const UPLOAD_FIELD: &str = "file";

const HOSTED_FALLBACK_NOTE: &str = "Gemini model call failed; showing offline advice instead.";
const NO_MODEL_NOTE: &str = "No hosted model configured; showing offline advice instead.";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: StatementPipeline<dyn TextExtractor>,
    pub advice: AdviceClient,
    pub analysis_enabled: bool,
}

impl AppState {
    /// Wire the pipeline, rule file and advice client from configuration.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let extractor: Arc<dyn TextExtractor> =
            match PdftotextExtractor::new(config.pdftotext_path.clone()) {
                Ok(e) => {
                    tracing::info!(program = %e.program().display(), "pdf text extraction enabled");
                    Arc::new(e)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "pdf uploads will be rejected");
                    Arc::new(UnavailableExtractor::new(e.to_string()))
                }
            };

        let mut pipeline = StatementPipeline::new(extractor).with_delimited_options(
            DelimitedOptions { delimiter: config.delimiter_byte()? },
        );
        if let Some(path) = &config.rules_path {
            let rules = CategoryRuleEngine::from_toml_file(path)?;
            tracing::info!(path = %path.display(), rules = rules.len(), "loaded category rules");
            pipeline = pipeline.with_rules(rules);
        }

        Ok(Self {
            pipeline,
            advice: AdviceClient::new(config.gemini.clone()),
            analysis_enabled: config.analysis_enabled,
        })
    }
}

pub fn app(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/analyze", post(analyze))
        .route("/advice", post(advice))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "MoneyLeaks backend is running" }))
}

async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Analysis>, ApiError> {
    if !state.analysis_enabled {
        return Err(ApiError::gone("Statement analysis has moved to a different service"));
    }

    let span = tracing::info_span!(
        "analyze",
        request_id = %Uuid::new_v4(),
        statement_id = tracing::field::Empty,
    );

    async move {
        let upload = read_upload(multipart?).await?;
        let ctx = MapContext::today();
        let analysis = state.pipeline.analyze(upload, &ctx).await?;
        Ok::<_, ApiError>(Json(analysis))
    }
    .instrument(span)
    .await
}

/// Pull the statement out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(AnalysisError::UnreadableUpload("Uploaded file is empty".into()).into());
        }
        tracing::debug!(?filename, ?content_type, size = bytes.len(), "received upload");
        return Ok(Upload { filename, content_type, bytes: bytes.to_vec() });
    }
    Err(AnalysisError::UnreadableUpload("No file uploaded".into()).into())
}

/// Keeps the status multer reports, so a body over the limit is a 413.
fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        AnalysisError::UnreadableUpload(rejection.body_text()).into()
    }
}

#[derive(Debug, Deserialize)]
struct AdviceRequest {
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct AdviceResponse {
    advice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

async fn advice(
    State(state): State<AppState>,
    payload: Result<Json<AdviceRequest>, JsonRejection>,
) -> Result<Json<AdviceResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let summary = request
        .summary
        .ok_or_else(|| ApiError::bad_request("Missing summary in request body"))?;

    if !state.advice.is_configured() {
        return Ok(Json(AdviceResponse {
            advice: local_advice(&summary),
            note: Some(NO_MODEL_NOTE.to_string()),
        }));
    }

    match state.advice.generate(&build_prompt(&summary)).await {
        Ok(advice) => Ok(Json(AdviceResponse { advice, note: None })),
        Err(e) => {
            tracing::warn!(error = %e, "hosted advice failed, using local advice");
            Ok(Json(AdviceResponse {
                advice: local_advice(&summary),
                note: Some(HOSTED_FALLBACK_NOTE.to_string()),
            }))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
