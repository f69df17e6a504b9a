use crate::utils::logging::{body_preview, with_pretty_json_debug};
use reqwest::StatusCode;
use serde_json::{Map, Value};

/// Statuses treated as a successful provider answer. Anything else is a rejection.
pub const CORRECT_RESPONSE_STATUSES: [StatusCode; 2] = [StatusCode::OK, StatusCode::CREATED];

pub const UPSTREAM_BODY_PREVIEW_CHARS: usize = 300;

/// Outcome of one logical request against the provider, after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    /// Success status with a well-formed JSON body.
    Body(Value),
    /// Success status, but the body was empty or not JSON.
    EmptyBody,
    /// Status outside [`CORRECT_RESPONSE_STATUSES`]; `diagnostic` is a body preview.
    Rejected {
        status: StatusCode,
        diagnostic: String,
    },
    /// Every attempt failed at the transport level or ran past its deadline.
    Unreachable,
}

impl ProviderResponse {
    /// Collapses the outcome to "parsed body or nothing".
    pub fn into_body(self) -> Option<Value> {
        match self {
            ProviderResponse::Body(value) => Some(value),
            _ => None,
        }
    }

    /// Like [`Self::into_body`], but only keeps JSON objects.
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self.into_body() {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

/// Classifies a fully read response by status code, then parses the body.
///
/// The content type is ignored: Square occasionally omits it, so any body is
/// offered to the JSON parser.
pub fn classify(status: StatusCode, body: &[u8]) -> ProviderResponse {
    tracing::debug!(%status, "Upstream response received");

    if CORRECT_RESPONSE_STATUSES.contains(&status) {
        if body.iter().all(u8::is_ascii_whitespace) {
            return ProviderResponse::EmptyBody;
        }
        return match serde_json::from_slice::<Value>(body) {
            Ok(value) => ProviderResponse::Body(value),
            Err(err) => {
                tracing::debug!(
                    %status,
                    error = %err,
                    body = %preview(body),
                    "Upstream success body is not JSON"
                );
                ProviderResponse::EmptyBody
            }
        };
    }

    let diagnostic = preview(body);
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => with_pretty_json_debug(&value, |pretty| {
            tracing::debug!(%status, body = %pretty, "Upstream rejected request");
        }),
        Err(_) => tracing::debug!(%status, body = %diagnostic, "Upstream rejected request"),
    }
    ProviderResponse::Rejected { status, diagnostic }
}

fn preview(body: &[u8]) -> String {
    body_preview(body, UPSTREAM_BODY_PREVIEW_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_statuses_yield_parsed_json() {
        let body = br#"{"access_token":"AT"}"#;
        assert_eq!(
            classify(StatusCode::OK, body),
            ProviderResponse::Body(json!({ "access_token": "AT" }))
        );
        assert_eq!(
            classify(StatusCode::CREATED, body),
            ProviderResponse::Body(json!({ "access_token": "AT" }))
        );
    }

    #[test]
    fn empty_or_malformed_success_body_is_empty_not_error() {
        assert_eq!(classify(StatusCode::OK, b""), ProviderResponse::EmptyBody);
        assert_eq!(classify(StatusCode::OK, b"  \n"), ProviderResponse::EmptyBody);
        assert_eq!(
            classify(StatusCode::OK, b"<html>ok</html>"),
            ProviderResponse::EmptyBody
        );
    }

    #[test]
    fn other_statuses_are_rejected_regardless_of_body() {
        for status in [
            StatusCode::NO_CONTENT,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let outcome = classify(status, br#"{"error":"invalid_grant"}"#);
            assert_eq!(
                outcome,
                ProviderResponse::Rejected {
                    status,
                    diagnostic: r#"{"error":"invalid_grant"}"#.to_string(),
                }
            );
            assert_eq!(outcome.into_body(), None);
        }
    }

    #[test]
    fn rejection_diagnostic_is_truncated() {
        let body = "x".repeat(UPSTREAM_BODY_PREVIEW_CHARS * 2);
        match classify(StatusCode::BAD_GATEWAY, body.as_bytes()) {
            ProviderResponse::Rejected { diagnostic, .. } => {
                assert_eq!(diagnostic.chars().count(), UPSTREAM_BODY_PREVIEW_CHARS);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn into_object_drops_non_object_bodies() {
        assert_eq!(ProviderResponse::Body(json!([1, 2])).into_object(), None);
        assert_eq!(ProviderResponse::EmptyBody.into_object(), None);
        assert_eq!(ProviderResponse::Unreachable.into_object(), None);
        let map = ProviderResponse::Body(json!({ "a": 1 }))
            .into_object()
            .expect("object body");
        assert_eq!(map.get("a"), Some(&json!(1)));
    }
}
