use crate::config::Config;
use crate::engines;
use crate::error::OcrError;
use crate::image_io::ImageSource;
use crate::ocr::OcrOrchestrator;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OcrOrchestrator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(orchestrator: OcrOrchestrator, config: Config) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            config: Arc::new(config),
        }
    }
}

/// OCR response
#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
    pub confidence: f64,
    pub word_count: usize,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Recognizer serving requests
    pub engine: String,
    /// Backends compiled into this build
    pub available_engines: Vec<String>,
}

/// Routes with the upload limit and request tracing applied
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config, orchestrator: OcrOrchestrator) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(orchestrator, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();
    let max = state.config.max_file_size;

    let mut file: Option<(String, Bytes)> = None;
    let mut preprocess = true;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            OcrError::ImageTooLarge {
                size: content_length(&headers),
                max,
            }
        } else {
            OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e))
        }
    })? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        OcrError::ImageTooLarge {
                            size: content_length(&headers),
                            max,
                        }
                    } else {
                        OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                    }
                })?;
                file = Some((file_name, data));
            }
            "preprocess" => {
                let value = field.text().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Invalid preprocess flag: {}", e))
                })?;
                preprocess = parse_flag(&value).ok_or_else(|| {
                    OcrError::InvalidRequest(format!(
                        "preprocess must be true or false, got {:?}",
                        value
                    ))
                })?;
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (file_name, data) = file.ok_or(OcrError::MissingFile)?;

    if data.len() > max {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max,
        });
    }

    // Preprocessing and recognition are CPU-bound
    let orchestrator = state.orchestrator.clone();
    let result = tokio::task::spawn_blocking(move || {
        let source = ImageSource::Bytes {
            name: &file_name,
            data: &data,
        };
        orchestrator.process_image_with_confidence(source, preprocess)
    })
    .await
    .map_err(|e| OcrError::Internal(format!("OCR task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "OCR completed in {}ms, confidence: {:.2}, words: {}",
        processing_time_ms,
        result.confidence,
        result.word_count
    );

    Ok(Json(OcrResponse {
        text: result.text,
        confidence: result.confidence,
        word_count: result.word_count,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: state.orchestrator.recognizer_name().to_string(),
        available_engines: engines::available_engines()
            .into_iter()
            .map(String::from)
            .collect(),
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn content_length(headers: &HeaderMap) -> usize {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
