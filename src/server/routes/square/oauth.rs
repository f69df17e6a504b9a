use crate::error::SquaregateError;
use crate::http::ProviderResponse;
use crate::providers::AuthorizeParams;
use crate::server::router::SquaregateState;
use crate::utils::random::url_safe_token;
use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::Value;
use squaregate_schema::{AuthUrlResponse, ObtainTokenPayload, ObtainTokenRequest};
use tracing::{info, warn};

/// GET /api/v1/square/oauth2/auth-url
///
/// Builds the Square authorize link for a seller. Recognised query keys are
/// `client_id`, `scope`, `locale`, `session` and `state`; anything else is
/// forwarded to Square in the order given.
pub async fn square_auth_url(
    State(state): State<SquaregateState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<AuthUrlResponse>, SquaregateError> {
    let mut client_id = None;
    let mut csrf_state = None;
    let mut scope = None;
    let mut locale = None;
    let mut session = false;
    let mut extra = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "client_id" => client_id = Some(value),
            "state" => csrf_state = Some(value),
            "scope" => scope = Some(value),
            "locale" => locale = Some(value),
            "session" => session = parse_flag(&value),
            _ => extra.push((key, value)),
        }
    }

    let client_id = non_empty(client_id)
        .or_else(|| state.default_client_id())
        .ok_or(SquaregateError::MissingClientId)?;
    let csrf_state = non_empty(csrf_state).unwrap_or_else(|| url_safe_token(16));

    let mut params = AuthorizeParams::new(client_id, csrf_state.clone()).with_session(session);
    if let Some(scope) = non_empty(scope) {
        params = params.with_scope(scope);
    }
    if let Some(locale) = non_empty(locale) {
        params = params.with_locale(locale);
    }
    params.extra = extra;

    let auth_url = state.square.build_authorize_link(&params);
    info!(client_id = %params.client_id, "Issued Square authorize link");
    Ok(Json(AuthUrlResponse {
        auth_url,
        state: csrf_state,
    }))
}

/// POST /api/v1/square/oauth2/obtain-token
///
/// Trades an authorization code for Square credentials and relays the token
/// mapping unchanged. Nothing is stored.
pub async fn square_obtain_token(
    State(state): State<SquaregateState>,
    Json(req): Json<ObtainTokenRequest>,
) -> Result<Json<Value>, SquaregateError> {
    let client_id = non_empty(req.client_id.clone())
        .or_else(|| state.default_client_id())
        .ok_or(SquaregateError::MissingClientId)?;
    let client_secret = non_empty(req.client_secret.clone())
        .or_else(|| state.default_client_secret())
        .ok_or(SquaregateError::MissingClientSecret)?;

    let payload = ObtainTokenPayload {
        client_id,
        client_secret,
        code: req.code.clone(),
        grant_type: req.grant_type().to_string(),
    };

    match state.square.obtain_token(&payload).await? {
        ProviderResponse::Body(Value::Object(token)) => {
            let merchant_id = token
                .get("merchant_id")
                .and_then(Value::as_str)
                .unwrap_or("-");
            info!(%merchant_id, "Square token obtained");
            Ok(Json(Value::Object(token)))
        }
        ProviderResponse::Body(_) | ProviderResponse::EmptyBody => {
            warn!("Square token endpoint answered without a token object");
            Err(SquaregateError::BadUpstreamPayload)
        }
        ProviderResponse::Rejected { status, .. } => {
            warn!(%status, "Square rejected the token exchange");
            Err(SquaregateError::AuthorizationFailed(status))
        }
        ProviderResponse::Unreachable => {
            warn!("Square token endpoint unreachable after retries");
            Err(SquaregateError::UpstreamUnavailable)
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
