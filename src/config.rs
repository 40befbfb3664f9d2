//! Configuration management
//!
//! Agent settings (interval, HTTP, logging, endpoints) come from an optional
//! TOML file. Device, property and guest identity come from the environment
//! and are loaded once at startup.

use crate::models::Credential;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

/// Global daemon settings
#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    /// Check interval in seconds for daemon mode
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            check_interval: default_check_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Maximum number of attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    /// Canary URL that answers `success\n` when the device is online
    #[serde(default = "default_probe_url")]
    pub probe_url: String,

    /// Hostname of the splash page the gateway redirects to
    #[serde(default = "default_portal_host")]
    pub portal_host: String,

    /// Base URL of the registration API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            probe_url: default_probe_url(),
            portal_host: default_portal_host(),
            api_base_url: default_api_base_url(),
        }
    }
}

// Default value functions
fn default_check_interval() -> u64 {
    30
}

/// Allowed request timeout, in seconds
const HTTP_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 10..=30;

fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_probe_url() -> String {
    crate::probe::PROBE_URL.to_string()
}

fn default_portal_host() -> String {
    crate::probe::PORTAL_HOST.to_string()
}

fn default_api_base_url() -> String {
    crate::portal::skyadmin::API_BASE_URL.to_string()
}

impl Config {
    /// Load configuration from `path`, or from the first default location
    /// that exists. Falls back to defaults if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        let config_paths = vec![
            PathBuf::from("skyreg.toml"),
            PathBuf::from("/etc/skyreg/config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".config/skyreg/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                return Self::from_file(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.global.check_interval == 0 {
            bail!("global.check_interval must be greater than zero");
        }
        if !HTTP_TIMEOUT_RANGE.contains(&self.http.timeout) {
            bail!(
                "http.timeout must be between {} and {} seconds, got {}",
                HTTP_TIMEOUT_RANGE.start(),
                HTTP_TIMEOUT_RANGE.end(),
                self.http.timeout
            );
        }
        if self.http.max_retries == 0 {
            bail!("http.max_retries must be at least 1");
        }
        Ok(())
    }
}

/// Device, property and guest identity, read from the environment once
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub api_token: Credential,
    pub vlan: String,
    pub mac_address: String,
    pub ip_address: String,
    pub nseid: String,
    pub last_name: String,
    pub room_number: String,
    /// Only used for diagnostics; requests use the id the gateway reports
    pub property_id: u32,
    pub registration_method_id: u32,
    pub rate_plan_id: u32,
}

impl EnvironmentConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_token: Credential::new(string_var(
                &lookup,
                "API_TOKEN",
                "b2507058a2c145d60c6d919c0347fe9c",
            )),
            vlan: string_var(&lookup, "VLAN", "3300"),
            mac_address: string_var(&lookup, "MAC_ADDRESS", "D4CA6DA65E0E"),
            ip_address: string_var(&lookup, "IP_ADDRESS", "10.0.24.21"),
            nseid: string_var(&lookup, "NSEID", "a39d49"),
            last_name: string_var(&lookup, "LASTNAME", "Michael"),
            room_number: string_var(&lookup, "ROOMNUMBER", "101"),
            property_id: int_var(&lookup, "PROPERTYID", 1234),
            registration_method_id: int_var(&lookup, "REGMETHODID", 2),
            rate_plan_id: int_var(&lookup, "RATEPLANID", 3),
        }
    }
}

fn string_var<F>(lookup: &F, key: &str, fallback: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value,
        None => {
            tracing::warn!("{} is not set, using default {}", key, fallback);
            fallback.to_string()
        }
    }
}

fn int_var<F>(lookup: &F, key: &str, fallback: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        tracing::warn!("{} is not set, using default {}", key, fallback);
        return fallback;
    };

    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!("failed to parse {} as int, using default {}", key, fallback);
        fallback
    })
}
