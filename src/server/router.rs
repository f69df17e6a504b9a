use crate::config::{BasicConfig, SquareResolvedConfig};
use crate::providers::SquareClient;
use crate::server::routes::square;
use crate::utils::random::url_safe_token;

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    url_safe_token(12)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct SquaregateState {
    pub square: Arc<SquareClient>,
    pub square_cfg: Arc<SquareResolvedConfig>,
}

impl SquaregateState {
    pub fn new(square: Arc<SquareClient>, square_cfg: Arc<SquareResolvedConfig>) -> Self {
        Self { square, square_cfg }
    }

    /// Configured application id, if any.
    pub fn default_client_id(&self) -> Option<String> {
        Some(self.square_cfg.application_id.clone()).filter(|s| !s.is_empty())
    }

    /// Configured application secret, if any.
    pub fn default_client_secret(&self) -> Option<String> {
        Some(self.square_cfg.application_secret.clone()).filter(|s| !s.is_empty())
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    // Always reflect `x-request-id` for easier correlation, even if the client didn't send one.
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis();
    let path = uri.path();
    let protocol = format_http_version(version);

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

/// CORS for the configured origins; `None` when no valid origin is configured.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            let origin = origin.trim().trim_end_matches('/');
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    // Wildcards cannot be combined with credentials, so methods and headers are mirrored.
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_credentials(true)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request()),
    )
}

pub fn squaregate_router(state: SquaregateState, basic: &BasicConfig) -> Router {
    let prefix = basic.api_prefix.trim_end_matches('/');

    let router = Router::new()
        .nest(&format!("{prefix}/square"), square::router())
        .fallback(not_found_handler)
        .with_state(state);

    let router = match cors_layer(&basic.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.layer(middleware::from_fn(access_log))
}
