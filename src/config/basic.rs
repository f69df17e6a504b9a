use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};

/// Basic (core) configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BasicConfig {
    /// HTTP server listen address (e.g., "0.0.0.0", "127.0.0.1").
    /// TOML: `basic.listen_addr`. Default: `0.0.0.0`.
    #[serde(default = "default_listen_ip")]
    pub listen_addr: IpAddr,

    /// HTTP server listen port.
    /// TOML: `basic.listen_port`. Default: `8000`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Log level for tracing subscriber initialization (e.g., "error", "warn", "info", "debug", "trace").
    /// TOML: `basic.loglevel`. Default: `info`.
    #[serde(default)]
    pub loglevel: String,

    /// Forces `debug` logging when `RUST_LOG` is unset.
    /// TOML: `basic.debug`. Default: `false`.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub project_name: String,

    #[serde(default)]
    pub project_version: String,

    #[serde(default)]
    pub project_description: String,

    /// Prefix for every API route.
    /// TOML: `basic.api_prefix`. Default: `/api/v1`.
    #[serde(default)]
    pub api_prefix: String,

    /// Origins allowed by CORS; empty disables the CORS layer.
    /// TOML: `basic.cors_origins`, either a list or a comma-separated string.
    /// Example: `["http://localhost:3000", "http://localhost:8080"]`.
    #[serde(default, deserialize_with = "deserialize_origins_lax")]
    pub cors_origins: Vec<String>,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_ip(),
            listen_port: default_listen_port(),
            loglevel: "info".to_string(),
            debug: false,
            project_name: "Square Integration Service".to_string(),
            project_version: env!("CARGO_PKG_VERSION").to_string(),
            project_description: "Square Integration Service".to_string(),
            api_prefix: "/api/v1".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl BasicConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            self.loglevel.as_str()
        }
    }
}

fn deserialize_origins_lax<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;

    let items = match v {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        Value::String(s) if s.trim_start().starts_with('[') => {
            serde_json::from_str::<Vec<Value>>(&s).map_err(D::Error::custom)?
        }
        Value::String(s) => s
            .split(',')
            .map(|origin| Value::String(origin.to_string()))
            .collect(),
        _ => {
            return Err(D::Error::custom(
                "expected a list or a comma-separated string for basic.cors_origins",
            ));
        }
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| Ok(s.to_string()))
            }
            _ => Some(Err(D::Error::custom(
                "basic.cors_origins entries must be strings",
            ))),
        })
        .collect()
}

/// Default IP address for the HTTP server listen address.
fn default_listen_ip() -> IpAddr {
    Ipv4Addr::new(0, 0, 0, 0).into()
}

/// Default port for the HTTP server.
fn default_listen_port() -> u16 {
    8000
}
