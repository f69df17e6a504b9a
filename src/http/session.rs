use super::response::{ProviderResponse, classify};
use super::retry::{RetryError, RetryOutcome, RetryPolicy};
use crate::error::{HttpError, IsRetryable};
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Pause before tearing the pool down so TLS connections can close cleanly.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Hard cap on a single HTTP call (connect + headers + body).
    pub total_timeout: Duration,
    pub user_agent: String,
    pub proxy: Option<Url>,
    /// Policy wrapped around every [`HttpSession::request`].
    pub retry: RetryPolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(4),
            user_agent: crate::SQUAREGATE_USER_AGENT.to_string(),
            proxy: None,
            retry: RetryPolicy::base(),
        }
    }
}

/// Transport options for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
}

/// Shared connection pool plus the request lifecycle built on top of it.
///
/// The pool is created by [`HttpSession::setup`] and torn down by
/// [`HttpSession::shutdown`], which consumes the session so nothing can be sent
/// afterwards.
#[derive(Debug)]
pub struct HttpSession {
    settings: SessionSettings,
    client: OnceLock<reqwest::Client>,
}

impl HttpSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            client: OnceLock::new(),
        }
    }

    /// Opens the connection pool. Calling it again is a no-op.
    pub fn setup(&self) -> Result<(), HttpError> {
        if self.client.get().is_some() {
            return Ok(());
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(self.settings.user_agent.as_str())
            .timeout(self.settings.total_timeout);

        if let Some(proxy_url) = self.settings.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }

        // A concurrent setup may win the race; its client is kept and ours dropped.
        let _ = self.client.set(builder.build()?);
        debug!(
            total_timeout = ?self.settings.total_timeout,
            proxy = %self.settings.proxy.as_ref().map(Url::as_str).unwrap_or("<none>"),
            "HTTP session opened"
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.client.get().is_some()
    }

    /// Issues one logical request under the session's retry policy.
    ///
    /// Transport failures and timeouts are retried and, once exhausted, reported
    /// as [`ProviderResponse::Unreachable`]. HTTP statuses are never retried.
    pub async fn request(
        &self,
        method: Method,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<ProviderResponse, HttpError> {
        let client = self.client.get().ok_or(HttpError::SessionNotReady)?;
        debug!(%method, url = %url, "Dispatching upstream request");

        let outcome = self
            .settings
            .retry
            .run(
                || Self::send_once(client, method.clone(), url, options),
                HttpError::is_retryable,
            )
            .await;

        match outcome {
            Ok(RetryOutcome::Completed(response)) => Ok(response),
            Ok(RetryOutcome::Exhausted) => Ok(ProviderResponse::Unreachable),
            Err(RetryError::Timeout { attempts, limit }) => {
                Err(HttpError::Timeout { attempts, limit })
            }
            Err(RetryError::Exhausted { last_error, .. } | RetryError::Fatal(last_error)) => {
                Err(last_error)
            }
        }
    }

    async fn send_once(
        client: &reqwest::Client,
        method: Method,
        url: &Url,
        options: &RequestOptions,
    ) -> Result<ProviderResponse, HttpError> {
        let mut request = client.request(method, url.clone());
        if !options.headers.is_empty() {
            request = request.headers(options.headers.clone());
        }
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = options.json.as_ref() {
            request = request.json(body);
        }

        let resp = request.send().await?;
        let status = resp.status();
        // Draining the body hands the connection back to the pool; dropping
        // `resp` on the error path releases it as well.
        let body = resp.bytes().await?;
        Ok(classify(status, &body))
    }

    /// Graceful teardown: waits [`SHUTDOWN_GRACE`], then drops the pool.
    pub async fn shutdown(self) {
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        drop(self.client);
        info!("HTTP session closed");
    }
}
