use std::{env, time::Duration};

use chrono_tz::Tz;

use crate::{bridge::codec::MAX_INBOUND_FRAME, domain::settings::DEFAULT_API_ENDPOINT};

use super::env::{
    AppConfig, BridgeConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig,
};

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            downloads_dir: env::var("DOWNLOADS_DIR").unwrap_or_else(|_| "downloads".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "siteguard.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone_name =
            env::var("SITEGUARD_TIMEZONE").unwrap_or_else(|_| "Asia/Kolkata".to_string());
        let timezone: Tz = timezone_name.parse().map_err(|_| ConfigError::Invalid {
            key: "SITEGUARD_TIMEZONE",
            value: timezone_name.clone(),
        })?;

        let classifier = ClassifierConfig {
            default_endpoint: env::var("DEFAULT_API_ENDPOINT")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", 3_600)?),
        };

        let bridge = BridgeConfig {
            max_inbound_bytes: parse_or("BRIDGE_MAX_INBOUND_BYTES", MAX_INBOUND_FRAME as u64)?
                .min(MAX_INBOUND_FRAME as u64) as usize,
        };

        Ok(Self {
            directories,
            logging,
            timezone,
            classifier,
            bridge,
        })
    }
}

fn parse_or(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}
