use serde::{Deserialize, Serialize};

/// Body returned by the authorize-link route.
///
/// `state` echoes the value embedded in `auth_url` so the caller can verify the
/// callback it later receives from Square.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthUrlResponse {
    pub auth_url: String,
    pub state: String,
}
