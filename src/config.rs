//! Application configuration
//!
//! Settings are layered: `config/default.toml`, then `config/{APP_ENV}.toml`,
//! then `MEDIPORTAL__*` environment variables.

use serde::Deserialize;
use url::Url;

const ENV_PREFIX: &str = "MEDIPORTAL";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

fn default_workers() -> usize {
    4
}

fn default_max_connections() -> u32 {
    5
}

fn default_token_ttl() -> i64 {
    12
}

fn default_timeout() -> u64 {
    30
}

fn default_max_history() -> usize {
    12
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl AssistantConfig {
    /// Endpoint for chat completions, resolved against `base_url`.
    pub fn completions_url(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("assistant.base_url: {}", e)))?;
        base.join("chat/completions")
            .map_err(|e| ConfigError::Invalid(format!("assistant.base_url: {}", e)))
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        if self.assistant.max_history < 2 {
            return Err(ConfigError::Invalid("assistant.max_history must be at least 2".into()));
        }
        self.assistant.completions_url()?;
        Ok(())
    }
}

/// Load configuration from file and environment
pub fn load_config() -> Result<Config, ConfigError> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());

    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/default"))
        .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("cors.allowed_origins")
                .try_parsing(true),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            workers: 1,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        },
        auth: AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hs256".into(),
            token_ttl_hours: 1,
        },
        cors: CorsConfig::default(),
        assistant: AssistantConfig {
            base_url: "http://127.0.0.1:9/v1/".into(),
            api_key: "test".into(),
            model: "test-model".into(),
            timeout_secs: 5,
            max_history: 4,
        },
        logging: LoggingConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_is_rejected() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn completions_url_keeps_base_path() {
        let config = test_config();
        let url = config.assistant.completions_url().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/v1/chat/completions");
    }

    #[test]
    fn bad_assistant_url_is_rejected() {
        let mut config = test_config();
        config.assistant.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }
}
