use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub kafka_brokers: Option<String>,
    pub webhook_secret: Option<String>,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "3000"),
            database_url: required("DATABASE_URL"),
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5"),
            kafka_brokers: optional("KAFKA_BROKERS"),
            webhook_secret: optional("WEBHOOK_SECRET"),
            sweep_interval_secs: try_load("SWEEP_INTERVAL_SECS", "60"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => {
            info!("{key} not set, feature disabled");
            None
        }
    }
}

fn required(key: &str) -> String {
    env::var(key)
        .map_err(|_| {
            warn!("Required environment variable {key} not found");
        })
        .expect("Environment misconfigured!")
}
