use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    /// The source could not be read or decoded, or it has zero area.
    #[error("Failed to load image {image}: {reason}")]
    ImageLoad { image: String, reason: String },

    /// Loading or recognition failed while processing `image`.
    #[error("OCR processing failed for {image}: {cause}")]
    OcrProcessing {
        image: String,
        #[source]
        cause: Box<OcrError>,
    },

    #[error("Text recognition failed: {0}")]
    Recognition(String),

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    pub(crate) fn image_load(image: impl Into<String>, reason: impl ToString) -> Self {
        OcrError::ImageLoad {
            image: image.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn processing(image: impl Into<String>, cause: OcrError) -> Self {
        OcrError::OcrProcessing {
            image: image.into(),
            cause: Box::new(cause),
        }
    }

    /// The innermost error, looking through `OcrProcessing` wrappers.
    pub fn root_cause(&self) -> &OcrError {
        match self {
            OcrError::OcrProcessing { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match self.root_cause() {
            OcrError::ImageLoad { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "IMAGE_LOAD_ERROR"),
            OcrError::Recognition(_) | OcrError::OcrProcessing { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "OCR_PROCESSING_ERROR")
            }
            OcrError::InitializationError(_) => (StatusCode::SERVICE_UNAVAILABLE, "INIT_ERROR"),
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
