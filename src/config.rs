use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.paystack.co";

/// Payment gateway configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct GatewayConfig {
    /// Secret key sent as a bearer token on every gateway call
    #[validate(length(min = 1))]
    pub secret_key: String,

    /// Base URL of the gateway API (overridden in tests)
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Frontend URL the gateway redirects back to after checkout
    #[validate(length(min = 1))]
    pub callback_url: String,
}

fn default_gateway_base_url() -> String {
    DEFAULT_GATEWAY_BASE_URL.to_string()
}

/// SMTP mail configuration.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct MailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "Realty Team".to_string()
}

/// Application configuration, layered from config files and APP__ env vars.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT signing secret
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration: u64,

    /// Refresh token lifetime in seconds
    #[serde(default = "default_refresh_expiration")]
    pub refresh_token_expiration: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development, test, production)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format
    #[serde(default)]
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins; unset means permissive
    /// in development and an error in production
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[validate]
    pub gateway: GatewayConfig,

    #[validate]
    pub mail: MailConfig,
}

fn default_jwt_expiration() -> u64 {
    3600
}

fn default_refresh_expiration() -> u64 {
    14 * 24 * 3600
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

/// Loads configuration from `config/default.toml`, an optional
/// `config/<environment>.toml` overlay, and `APP__`-prefixed environment
/// variables (e.g. `APP__GATEWAY__SECRET_KEY`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .add_source(File::from(Path::new(CONFIG_DIR).join("default.toml")).required(false));

    let overlay = Path::new(CONFIG_DIR).join(format!("{environment}.toml"));
    builder = builder.add_source(File::from(overlay).required(false));

    let settings = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .set_default("environment", environment.clone())?
        .build()?;

    let cfg: AppConfig = settings.try_deserialize()?;
    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "a".repeat(64),
            jwt_expiration: default_jwt_expiration(),
            refresh_token_expiration: default_refresh_expiration(),
            host: default_host(),
            port: default_port(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            db_max_connections: 2,
            db_min_connections: 1,
            gateway: GatewayConfig {
                secret_key: "sk_test_123".to_string(),
                base_url: default_gateway_base_url(),
                callback_url: "https://app.example.com/checkout/done".to_string(),
            },
            mail: MailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: default_smtp_port(),
                smtp_username: "mailer".to_string(),
                smtp_password: "secret".to_string(),
                from_email: "no-reply@example.com".to_string(),
                from_name: default_from_name(),
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_gateway_secret_is_rejected() {
        let mut cfg = base_config();
        cfg.gateway.secret_key = String::new();
        assert!(cfg.validate().is_err());
    }
}
