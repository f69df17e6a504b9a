use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_GRANT_TYPE: &str = "authorization_code";

/// JSON body sent to Square's `/oauth2/token` endpoint.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ObtainTokenPayload {
    pub client_id: String,
    pub client_secret: String,
    pub code: String,
    pub grant_type: String,
}

// Debug output is redacted to avoid leaking secrets.
impl fmt::Debug for ObtainTokenPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObtainTokenPayload")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("code", &"<redacted>")
            .field("grant_type", &self.grant_type)
            .finish()
    }
}

/// Inbound body for the obtain-token route.
///
/// Credentials are optional here; the service falls back to its configured
/// application id and secret when they are omitted.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ObtainTokenRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,
}

impl ObtainTokenRequest {
    pub fn grant_type(&self) -> &str {
        self.grant_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_GRANT_TYPE)
    }
}
