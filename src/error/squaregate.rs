use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error as ThisError;

use super::upstream::HttpError;

#[derive(Debug, ThisError)]
pub enum SquaregateError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Missing client_id and no application id configured")]
    MissingClientId,

    #[error("Missing client_secret and no application secret configured")]
    MissingClientSecret,

    #[error("Square rejected the token exchange with status: {0}")]
    AuthorizationFailed(StatusCode),

    #[error("Square returned an empty or unstructured token response")]
    BadUpstreamPayload,

    #[error("Square is unreachable after retries")]
    UpstreamUnavailable,
}

impl IntoResponse for SquaregateError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            SquaregateError::Http(HttpError::Timeout { .. }) => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorObject {
                    code: "UPSTREAM_TIMEOUT".to_string(),
                    message: "Upstream service timed out.".to_string(),
                    details: None,
                },
            ),

            SquaregateError::Http(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                },
            ),

            SquaregateError::MissingClientId => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "MISSING_CLIENT_ID".to_string(),
                    message: "client_id is required.".to_string(),
                    details: None,
                },
            ),

            SquaregateError::MissingClientSecret => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "MISSING_CLIENT_SECRET".to_string(),
                    message: "client_secret is required.".to_string(),
                    details: None,
                },
            ),

            SquaregateError::AuthorizationFailed(upstream) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "AUTHORIZATION_FAILED".to_string(),
                    message: "Square rejected the authorization code.".to_string(),
                    details: Some(json!({ "upstream_status": upstream.as_u16() })),
                },
            ),

            SquaregateError::BadUpstreamPayload => (
                StatusCode::BAD_GATEWAY,
                ApiErrorObject {
                    code: "BAD_UPSTREAM_PAYLOAD".to_string(),
                    message: "Failed to parse upstream response.".to_string(),
                    details: None,
                },
            ),

            SquaregateError::UpstreamUnavailable => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiErrorObject {
                    code: "UPSTREAM_UNAVAILABLE".to_string(),
                    message: "Upstream service is unavailable.".to_string(),
                    details: None,
                },
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
