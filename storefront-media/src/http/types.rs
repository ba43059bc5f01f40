//! Wire types of the gallery API

use crate::gallery::RemoteAsset;
use crate::storage::StorageError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Body of `GET /images`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagesResponse {
    /// Whether the listing succeeded
    pub success: bool,
    /// Every asset in the bucket
    #[serde(default)]
    pub images: Vec<RemoteAsset>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `DELETE /images`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Key to delete
    pub file_name: String,
}

/// Body of `POST /images/delete`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    /// Keys to delete
    pub file_names: Vec<String>,
}

/// Response of both delete routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    /// Whether the call succeeded
    pub success: bool,
    /// Number of keys that existed and were removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error returned by the handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Rejects a malformed request
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Status code sent to the client
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let status = match &err {
            StorageError::NotFound(_) | StorageError::BucketNotFound(_) => StatusCode::NOT_FOUND,
            StorageError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StorageError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            StorageError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            StorageError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StorageError::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Gallery request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "Gallery request rejected");
        }
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
