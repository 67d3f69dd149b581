use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use prismchat_shared::schemas::ErrorBody;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("invalid request: {details}"))]
    Validation { details: String },

    #[snafu(display("conversation '{id}' not found"))]
    NotFound { id: String },

    #[snafu(display("failed to read upload form: {details}"))]
    UploadForm { details: String },

    #[snafu(display("failed to store upload '{name}': {source}"))]
    Storage { name: String, source: std::io::Error },

    #[snafu(display("redaction failed for '{name}': {source}"))]
    Redaction {
        name: String,
        source: crate::redaction::RedactionError,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::UploadForm { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Storage { .. } | ApiError::Redaction { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
