mod basic;
mod square;

pub use basic::BasicConfig;
pub use square::{
    DEFAULT_SQUARE_VERSION, LinkEncoding, RetryConfig, SQUARE_PRODUCTION_URL, SQUARE_SANDBOX_URL,
    SquareConfig, SquareEnvironment, SquareResolvedConfig,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::LazyLock};

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core server configuration (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Square OAuth settings (see `square` table in config.toml).
    #[serde(default)]
    pub square: SquareConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "SQUAREGATE_";

impl Config {
    /// Builds a Figment that merges defaults, an optional config TOML file and
    /// `SQUAREGATE_*` environment variables (`__` separates nested keys, e.g.
    /// `SQUAREGATE_SQUARE__APPLICATION_ID`).
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration by merging defaults, `config.toml` if present, and the environment.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml + env): {err}")
        })
    }

    pub fn square(&self) -> SquareResolvedConfig {
        self.square.resolve()
    }
}

/// Global, lazily-initialized configuration instance.
pub static CONFIG: LazyLock<Config> = LazyLock::new(Config::from_optional_toml);
