use actix_web::{
    HttpResponse, ResponseError,
    http::{StatusCode, header::ContentType},
};
use serde_json::json;

/// Every way a relay request can end without a streamed completion.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(#[from] reqwest::Error),

    #[error("Upstream responded with status {status}")]
    UpstreamError { status: u16, body: String },

    #[error("Not found")]
    NotFound,
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            RelayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::UpstreamError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            RelayError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            RelayError::InvalidJson(_) => builder
                .content_type(ContentType::json())
                .body(json!({ "error": "Invalid JSON" }).to_string()),
            RelayError::UpstreamUnreachable(e) => builder.content_type(ContentType::json()).body(
                json!({ "error": "Upstream request failed", "detail": e.to_string() }).to_string(),
            ),
            // Forwarded verbatim; the provider's own error document is the most
            // useful thing the caller can see.
            RelayError::UpstreamError { body, .. } if !body.is_empty() => builder
                .content_type(ContentType::json())
                .body(body.clone()),
            RelayError::UpstreamError { .. } => builder
                .content_type(ContentType::json())
                .body(json!({ "error": "Upstream error" }).to_string()),
            RelayError::NotFound => builder
                .content_type(ContentType::plaintext())
                .body("Not found"),
        }
    }
}
