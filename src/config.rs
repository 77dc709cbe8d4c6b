use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::DEFAULT_TLE_URL;
use crate::ephemeris::Observer;
use crate::registry::DEFAULT_REGISTRY_URL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid station coordinates: {0}")]
    Coordinates(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default, rename = "loop")]
    pub poll: LoopConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    /// `"lat, lon"` in decimal degrees.
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_tle_url")]
    pub url: String,
    #[serde(default = "default_refresh", deserialize_with = "humantime_duration")]
    pub refresh_every: Duration,
    /// Optional exact-name filter; when present, only these satellites are
    /// kept from the TLE source.
    #[serde(default)]
    pub satellites: Option<HashSet<String>>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_tle_url(),
            refresh_every: default_refresh(),
            satellites: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: default_registry_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoopConfig {
    #[serde(default = "default_tick", deserialize_with = "humantime_duration")]
    pub tick: Duration,
    #[serde(default = "default_granularity", deserialize_with = "humantime_duration")]
    pub granularity: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            granularity: default_granularity(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Target address for the UDP frequency forwarder, e.g.
    /// `"127.0.0.1:5556"`.
    #[serde(default)]
    pub udp: Option<String>,
}

fn default_tle_url() -> String {
    DEFAULT_TLE_URL.to_string()
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_refresh() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_tick() -> Duration {
    Duration::from_secs(5)
}

fn default_granularity() -> Duration {
    Duration::from_secs(1)
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn observer(&self) -> Result<Observer, ConfigError> {
        Observer::from_coordinates(&self.station.coordinates, Some(self.station.altitude_m))
            .ok_or_else(|| ConfigError::Coordinates(self.station.coordinates.clone()))
    }
}
