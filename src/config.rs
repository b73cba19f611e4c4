//! Configuration management for geotally
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every section has defaults, so an empty file is a valid configuration.

use crate::error::{AppError, AppResult};
use crate::geo::{LOCAL_LABEL, UNKNOWN_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

/// Upper bound for the `/slow` endpoint delay
pub const MAX_SLOW_MS: u64 = 10_000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Address to bind the listener to
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` is not an IP address literal.
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let ip = self.host.parse::<IpAddr>().map_err(|_| {
            AppError::Config(format!(
                "server.host '{}' is not an IP address (use 0.0.0.0, 127.0.0.1 or ::1)",
                self.host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Which incremental version of the demo app to serve
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppVariant {
    /// Greeting, health, version and about pages
    Basic,
    /// Basic plus the pipeline status pages
    Extended,
    /// Extended plus country tagging, metrics and the fault endpoints
    #[default]
    Instrumented,
}

impl AppVariant {
    /// Version string reported by `/version`
    pub fn version(&self) -> &'static str {
        match self {
            AppVariant::Basic => "1.0.0",
            AppVariant::Extended => "2.0.0",
            AppVariant::Instrumented => "3.0.0",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppVariant::Basic => "basic",
            AppVariant::Extended => "extended",
            AppVariant::Instrumented => "instrumented",
        }
    }

    pub fn is_instrumented(&self) -> bool {
        matches!(self, AppVariant::Instrumented)
    }
}

/// Application behavior configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub variant: AppVariant,
}

/// Mock geolocation configuration
///
/// Fields are private so the label set can only come from deserialization
/// (or defaults) and is checked by [`Config::validate`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoConfig {
    #[serde(default = "default_local_addresses")]
    local_addresses: Vec<String>,
    #[serde(default = "default_countries")]
    countries: Vec<String>,
}

impl GeoConfig {
    /// Addresses that always resolve to the `Local` label
    pub fn local_addresses(&self) -> &[String] {
        &self.local_addresses
    }

    /// Country labels picked from for every other address
    pub fn countries(&self) -> &[String] {
        &self.countries
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            local_addresses: default_local_addresses(),
            countries: default_countries(),
        }
    }
}

fn default_local_addresses() -> Vec<String> {
    ["127.0.0.1", "::1", "localhost"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_countries() -> Vec<String> {
    [
        "USA",
        "UK",
        "Germany",
        "France",
        "Japan",
        "India",
        "Brazil",
        "Canada",
        "Australia",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Settings for the demo-only endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DemoConfig {
    /// Lower bound of the `/slow` delay in milliseconds
    #[serde(default = "default_slow_min_ms")]
    pub slow_min_ms: u64,
    /// Upper bound of the `/slow` delay in milliseconds (inclusive)
    #[serde(default = "default_slow_max_ms")]
    pub slow_max_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            slow_min_ms: default_slow_min_ms(),
            slow_max_ms: default_slow_max_ms(),
        }
    }
}

fn default_slow_min_ms() -> u64 {
    1000
}

fn default_slow_max_ms() -> u64 {
    3000
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when
    /// building a `Config` by hand.
    pub fn validate(&self) -> AppResult<()> {
        self.server.socket_addr()?;

        let countries = self.geo.countries();
        if countries.is_empty() {
            return Err(AppError::Config(
                "geo.countries must contain at least one country label".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for country in countries {
            if country.trim().is_empty() {
                return Err(AppError::Config(
                    "geo.countries must not contain blank labels".to_string(),
                ));
            }
            if country == LOCAL_LABEL || country == UNKNOWN_LABEL {
                return Err(AppError::Config(format!(
                    "geo.countries must not contain the reserved label '{}'",
                    country
                )));
            }
            if !seen.insert(country.as_str()) {
                return Err(AppError::Config(format!(
                    "geo.countries contains duplicate label '{}'",
                    country
                )));
            }
        }

        if self.demo.slow_min_ms > self.demo.slow_max_ms {
            return Err(AppError::Config(format!(
                "demo.slow_min_ms ({}) must not exceed demo.slow_max_ms ({})",
                self.demo.slow_min_ms, self.demo.slow_max_ms
            )));
        }
        if self.demo.slow_max_ms > MAX_SLOW_MS {
            return Err(AppError::Config(format!(
                "demo.slow_max_ms ({}) must not exceed {}",
                self.demo.slow_max_ms, MAX_SLOW_MS
            )));
        }

        let level = self.observability.log_level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AppError::Config(format!(
                "observability.log_level '{}' is not one of {:?}",
                self.observability.log_level, LOG_LEVELS
            )));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
