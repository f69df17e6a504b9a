use crate::config::LinkEncoding;
use url::Url;

pub const DEFAULT_SCOPE: &str = "CUSTOMERS_WRITE CUSTOMERS_READ";
pub const DEFAULT_LOCALE: &str = "en-US";

/// Inputs of a Square authorize link.
///
/// `extra` is appended after the fixed parameters, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeParams {
    pub client_id: String,
    pub scope: String,
    pub locale: String,
    /// Forces the seller to sign in again when `true`.
    pub session: bool,
    pub state: String,
    pub extra: Vec<(String, String)>,
}

impl AuthorizeParams {
    pub fn new(client_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: DEFAULT_SCOPE.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            session: false,
            state: state.into(),
            extra: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_session(mut self, session: bool) -> Self {
        self.session = session;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    // Square accepts the lowercase `true`/`false` form for `session`.
    fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        let session = if self.session { "true" } else { "false" };
        [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("session", session),
            ("state", self.state.as_str()),
            ("locale", self.locale.as_str()),
        ]
        .into_iter()
        .chain(self.extra.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Appends `params` to `endpoint` as a query string. Pure; no validation.
pub fn build_authorize_link(
    endpoint: &Url,
    params: &AuthorizeParams,
    encoding: LinkEncoding,
) -> String {
    match encoding {
        LinkEncoding::Verbatim => {
            let query = params
                .pairs()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            format!("{endpoint}?{query}")
        }
        LinkEncoding::Encoded => {
            let mut url = endpoint.clone();
            url.query_pairs_mut().extend_pairs(params.pairs());
            url.into()
        }
    }
}
