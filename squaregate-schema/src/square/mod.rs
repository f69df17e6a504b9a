mod auth_url;
mod token;

pub use auth_url::AuthUrlResponse;
pub use token::{DEFAULT_GRANT_TYPE, ObtainTokenPayload, ObtainTokenRequest};
