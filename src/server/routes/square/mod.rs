use crate::server::router::SquaregateState;
use axum::{
    Router,
    routing::{get, post},
};

pub mod oauth;

/// Square OAuth routes, mounted under `{api_prefix}/square`.
pub fn router() -> Router<SquaregateState> {
    Router::new()
        .route("/oauth2/auth-url", get(oauth::square_auth_url))
        .route("/oauth2/obtain-token", post(oauth::square_obtain_token))
}
