//! services/bot/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::SecretString;
use tracing::Level;

/// Fallback access password used when `ACCESS_PASSWORD` is unset.
/// Known to anyone who has read this file; set the variable in production.
pub const DEFAULT_ACCESS_PASSWORD: &str = "default_password";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// How updates reach the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateMode {
    /// Long polling with `getUpdates`.
    Polling,
    /// Telegram pushes updates to our HTTP endpoint.
    Webhook,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: SecretString,
    pub telegram_api_url: String,
    pub keitaro_api_url: String,
    pub keitaro_api_key: SecretString,
    pub group_id: i64,
    pub traffic_source_id: i64,
    pub access_password: SecretString,
    /// True when `access_password` is the built-in fallback.
    pub using_default_password: bool,
    pub notify_chat_id: String,
    pub tracker_admin_url: String,
    pub results_group: String,
    pub update_mode: UpdateMode,
    pub bind_address: SocketAddr,
    /// Public URL registered with Telegram in webhook mode.
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<SecretString>,
    pub http_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };
        let or_default = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        // --- Telegram ---
        let bot_token = SecretString::new(required("BOT_TOKEN")?);
        let telegram_api_url = or_default("TELEGRAM_API_URL", "https://api.telegram.org");

        // --- Tracker ---
        let keitaro_api_url = required("KEITARO_API_URL")?;
        let keitaro_api_key = SecretString::new(required("KEITARO_API_KEY")?);
        let group_id = parse_var("GROUP_ID", &required("GROUP_ID")?)?;
        let traffic_source_id = parse_var("TRAFFIC_SOURCE_ID", &required("TRAFFIC_SOURCE_ID")?)?;

        // --- Access ---
        let (access_password, using_default_password) = match lookup("ACCESS_PASSWORD") {
            Some(password) if !password.is_empty() => (SecretString::new(password), false),
            _ => (SecretString::new(DEFAULT_ACCESS_PASSWORD.to_string()), true),
        };

        // --- Replies and notifications ---
        let notify_chat_id = or_default("NOTIFY_CHAT_ID", "-4702632205");
        let tracker_admin_url = or_default("TRACKER_ADMIN_URL", "https://k-tracker.online");
        let results_group = or_default("RESULTS_GROUP", "NDA_FirstCPA_helper_reults");

        // --- Transport ---
        let update_mode = match or_default("UPDATE_MODE", "polling").to_lowercase().as_str() {
            "polling" => UpdateMode::Polling,
            "webhook" => UpdateMode::Webhook,
            other => {
                return Err(ConfigError::InvalidValue(
                    "UPDATE_MODE".to_string(),
                    format!("'{}' is not one of 'polling' or 'webhook'", other),
                ))
            }
        };
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;
        let webhook_url = lookup("WEBHOOK_URL").filter(|value| !value.is_empty());
        let webhook_secret = lookup("WEBHOOK_SECRET")
            .filter(|value| !value.is_empty())
            .map(SecretString::new);
        // The endpoint authenticates Telegram by this token alone.
        if update_mode == UpdateMode::Webhook && webhook_secret.is_none() {
            return Err(ConfigError::MissingVar("WEBHOOK_SECRET".to_string()));
        }
        let http_timeout = Duration::from_secs(parse_var(
            "HTTP_TIMEOUT_SECS",
            &or_default("HTTP_TIMEOUT_SECS", "30"),
        )?);

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bot_token,
            telegram_api_url,
            keitaro_api_url,
            keitaro_api_key,
            group_id,
            traffic_source_id,
            access_password,
            using_default_password,
            notify_chat_id,
            tracker_admin_url,
            results_group,
            update_mode,
            bind_address,
            webhook_url,
            webhook_secret,
            http_timeout,
            log_level,
        })
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
