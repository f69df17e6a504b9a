use crate::http::{RetryPolicy, SessionSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::Level;
use url::Url;

pub static SQUARE_SANDBOX_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://connect.squareupsandbox.com").expect("valid Square sandbox URL")
});

pub static SQUARE_PRODUCTION_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://connect.squareup.com").expect("valid Square production URL")
});

pub const DEFAULT_SQUARE_VERSION: &str = "2022-08-23";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SquareEnvironment {
    #[default]
    Sandbox,
    Production,
}

impl SquareEnvironment {
    pub fn base_url(self) -> &'static Url {
        match self {
            SquareEnvironment::Sandbox => &SQUARE_SANDBOX_URL,
            SquareEnvironment::Production => &SQUARE_PRODUCTION_URL,
        }
    }
}

/// How query values are written into the authorize link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkEncoding {
    /// Values are concatenated as given, without escaping.
    #[default]
    Verbatim,
    /// Values are form-urlencoded.
    Encoded,
}

/// Square provider configuration managed by Figment.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SquareConfig {
    /// TOML: `square.environment` (`sandbox` | `production`). Default: `sandbox`.
    #[serde(default)]
    pub environment: SquareEnvironment,

    /// Overrides the environment's base URL (useful for tests and mocks).
    /// TOML: `square.base_url`.
    #[serde(default)]
    pub base_url: Option<Url>,

    /// Application ID from the Square Developer Dashboard; default `client_id`.
    /// TOML: `square.application_id`.
    #[serde(default)]
    pub application_id: String,

    /// Application secret; default `client_secret` for token exchange.
    /// TOML: `square.application_secret`.
    #[serde(default)]
    pub application_secret: String,

    /// Value of the `Square-Version` header.
    /// TOML: `square.square_version`. Default: `2022-08-23`.
    #[serde(default = "default_square_version")]
    pub square_version: String,

    /// Optional upstream HTTP proxy. Example: `http://127.0.0.1:1080`.
    #[serde(default)]
    pub proxy: Option<Url>,

    /// Total timeout of one HTTP call, in seconds.
    /// TOML: `square.session_timeout_secs`. Default: `4`.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// TOML: `square.link_encoding` (`verbatim` | `encoded`). Default: `verbatim`.
    #[serde(default)]
    pub link_encoding: LinkEncoding,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SquareConfig {
    fn default() -> Self {
        Self {
            environment: SquareEnvironment::default(),
            base_url: None,
            application_id: String::new(),
            application_secret: String::new(),
            square_version: default_square_version(),
            proxy: None,
            session_timeout_secs: default_session_timeout_secs(),
            link_encoding: LinkEncoding::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for SquareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SquareConfig")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("application_id", &self.application_id)
            .field("application_secret", &"<redacted>")
            .field("square_version", &self.square_version)
            .field("proxy", &self.proxy)
            .field("session_timeout_secs", &self.session_timeout_secs)
            .field("link_encoding", &self.link_encoding)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Retry policy for Square calls. TOML table: `square.retry`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per request. Default: `2`.
    #[serde(default = "default_tries")]
    pub tries: usize,

    /// Pause before the first retry, in milliseconds. Default: `2000`.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Growth of the pause after each retry, in milliseconds. Default: `0`.
    #[serde(default)]
    pub increase_ms: u64,

    /// Deadline per attempt in milliseconds; `0` disables it. Default: `10000`.
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,

    #[serde(default = "default_show_logs")]
    pub show_logs: bool,

    /// Fail instead of degrading to an empty result. Default: `false`.
    #[serde(default)]
    pub raise_on_failure: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            tries: default_tries(),
            interval_ms: default_interval_ms(),
            increase_ms: duration_ms(RetryPolicy::square().increase),
            total_timeout_ms: default_total_timeout_ms(),
            show_logs: default_show_logs(),
            raise_on_failure: RetryPolicy::square().raise_on_failure,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            tries: self.tries,
            interval: Duration::from_millis(self.interval_ms),
            increase: Duration::from_millis(self.increase_ms),
            total_timeout: (self.total_timeout_ms > 0)
                .then(|| Duration::from_millis(self.total_timeout_ms)),
            show_logs: self.show_logs,
            log_level: Level::DEBUG,
            raise_on_failure: self.raise_on_failure,
        }
    }
}

#[derive(Clone)]
pub struct SquareResolvedConfig {
    pub base_url: Url,
    pub application_id: String,
    pub application_secret: String,
    pub square_version: String,
    pub link_encoding: LinkEncoding,
    pub session: SessionSettings,
}

impl fmt::Debug for SquareResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SquareResolvedConfig")
            .field("base_url", &self.base_url.as_str())
            .field("application_id", &self.application_id)
            .field("application_secret", &"<redacted>")
            .field("square_version", &self.square_version)
            .field("link_encoding", &self.link_encoding)
            .field("session", &self.session)
            .finish()
    }
}

impl SquareConfig {
    pub fn resolve(&self) -> SquareResolvedConfig {
        SquareResolvedConfig {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| self.environment.base_url().clone()),
            application_id: self.application_id.trim().to_string(),
            application_secret: self.application_secret.trim().to_string(),
            square_version: self.square_version.clone(),
            link_encoding: self.link_encoding,
            session: SessionSettings {
                total_timeout: Duration::from_secs(self.session_timeout_secs),
                proxy: self.proxy.clone(),
                retry: self.retry.policy(),
                ..SessionSettings::default()
            },
        }
    }
}

fn default_square_version() -> String {
    DEFAULT_SQUARE_VERSION.to_string()
}

fn default_session_timeout_secs() -> u64 {
    4
}

fn default_tries() -> usize {
    RetryPolicy::square().tries
}

fn default_interval_ms() -> u64 {
    duration_ms(RetryPolicy::square().interval)
}

fn default_total_timeout_ms() -> u64 {
    RetryPolicy::square().total_timeout.map_or(0, duration_ms)
}

fn default_show_logs() -> bool {
    RetryPolicy::square().show_logs
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
