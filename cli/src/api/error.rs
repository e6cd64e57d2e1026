// API Error Responses
//
// Maps kernel failures onto status codes and the JSON bodies clients expect.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use gridstore_kernel::registry::RegistryError;
use gridstore_kernel::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Storage failure reported with a fixed public message.
    #[error("{public}: {source}")]
    Storage {
        public: &'static str,
        flagged: bool,
        #[source]
        source: StoreError,
    },

    /// Storage failure whose raw error text is returned to the client.
    #[error("{0}")]
    StorageVerbose(StoreError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    /// `{ error }` body on failure.
    pub fn storage(public: &'static str, source: StoreError) -> Self {
        Self::Storage {
            public,
            flagged: false,
            source,
        }
    }

    /// `{ success: false, error }` body on failure.
    pub fn flagged_storage(public: &'static str, source: StoreError) -> Self {
        Self::Storage {
            public,
            flagged: true,
            source,
        }
    }

    /// Convert a registry failure, using `on_storage` for storage errors.
    pub fn from_registry(err: RegistryError, on_storage: fn(StoreError) -> ApiError) -> Self {
        match err {
            RegistryError::Validation(message) => Self::Validation(message),
            RegistryError::NotFound(_) => Self::NotFound("Sheet not found!".into()),
            RegistryError::Storage(source) => on_storage(source),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid request body: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "message": message }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Storage {
                public, flagged, ..
            } => {
                tracing::error!(error = %self, "storage operation failed");
                let body = if *flagged {
                    json!({ "success": false, "error": public })
                } else {
                    json!({ "error": public })
                };
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            ApiError::StorageVerbose(source) => {
                tracing::error!(error = %source, "storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "message": "Internal Server Error",
                        "error": source.to_string(),
                    }),
                )
            }
            ApiError::Task(err) => {
                tracing::error!(error = %err, "request task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
