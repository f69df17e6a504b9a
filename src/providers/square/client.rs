use super::authorize::{AuthorizeParams, build_authorize_link};
use crate::config::{LinkEncoding, SquareResolvedConfig};
use crate::error::HttpError;
use crate::http::{HttpSession, ProviderResponse, RequestOptions};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use squaregate_schema::ObtainTokenPayload;
use tracing::{debug, info};
use url::Url;

const SQUARE_VERSION_HEADER: HeaderName = HeaderName::from_static("square-version");

/// Client for Square's OAuth endpoints.
///
/// Owns the shared [`HttpSession`]; create it once, call [`SquareClient::setup`]
/// before the first request and [`SquareClient::shutdown`] after the last one.
#[derive(Debug)]
pub struct SquareClient {
    session: HttpSession,
    authorize_url: Url,
    token_url: Url,
    square_version: HeaderValue,
    link_encoding: LinkEncoding,
}

impl SquareClient {
    pub fn new(cfg: &SquareResolvedConfig) -> Result<Self, HttpError> {
        let base = cfg.base_url.as_str().trim_end_matches('/');
        let square_version = HeaderValue::from_str(&cfg.square_version).map_err(|e| {
            HttpError::InvalidHeader(format!("Square-Version {:?}: {e}", cfg.square_version))
        })?;

        Ok(Self {
            session: HttpSession::new(cfg.session.clone()),
            authorize_url: Url::parse(&format!("{base}/oauth2/authorize"))?,
            token_url: Url::parse(&format!("{base}/oauth2/token"))?,
            square_version,
            link_encoding: cfg.link_encoding,
        })
    }

    pub fn setup(&self) -> Result<(), HttpError> {
        self.session.setup()
    }

    pub async fn shutdown(self) {
        self.session.shutdown().await;
    }

    pub fn authorize_url(&self) -> &Url {
        &self.authorize_url
    }

    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Builds the URL a seller visits to grant access. No network call.
    pub fn build_authorize_link(&self, params: &AuthorizeParams) -> String {
        build_authorize_link(&self.authorize_url, params, self.link_encoding)
    }

    /// POSTs `payload` to `/oauth2/token` and reports the classified outcome.
    pub async fn obtain_token(
        &self,
        payload: &ObtainTokenPayload,
    ) -> Result<ProviderResponse, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(SQUARE_VERSION_HEADER, self.square_version.clone());

        let options = RequestOptions {
            headers,
            json: Some(serde_json::to_value(payload)?),
            ..RequestOptions::default()
        };

        let response = self
            .session
            .request(Method::POST, &self.token_url, &options)
            .await?;

        match &response {
            ProviderResponse::Body(_) => info!("Square OAuth2 code exchange completed"),
            other => debug!(outcome = ?other, "Square OAuth2 code exchange produced no token"),
        }
        Ok(response)
    }

    /// Exchanges an authorization code for an access/refresh token pair.
    ///
    /// Returns the token mapping exactly as Square sent it, or `None` when the
    /// call was rejected, came back without a JSON object, or never got through.
    pub async fn exchange_code_for_token(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        grant_type: &str,
    ) -> Result<Option<Map<String, Value>>, HttpError> {
        let payload = ObtainTokenPayload {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            code: code.to_string(),
            grant_type: grant_type.to_string(),
        };
        Ok(self.obtain_token(&payload).await?.into_object())
    }
}
