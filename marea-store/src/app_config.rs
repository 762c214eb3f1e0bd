use serde::Deserialize;
use std::env;
use uuid::Uuid;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_offer_timeout_seconds")]
    pub offer_timeout_seconds: u64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_pickup_point")]
    pub pickup_point: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// When set, this captain is promoted to the front of every eligible
    /// candidate list.
    #[serde(default)]
    pub priority_captain_id: Option<Uuid>,
}

fn default_offer_timeout_seconds() -> u64 {
    60
}

fn default_sweep_interval_seconds() -> u64 {
    5
}

fn default_pickup_point() -> String {
    "Plaza Mayor".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of MAREA)
            .add_source(config::Environment::with_prefix("MAREA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
