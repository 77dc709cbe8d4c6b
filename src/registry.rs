use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_REGISTRY_URL: &str = "https://db.satnogs.org/api/transmitters";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("transmitter registry fetch failed: {0}")]
    Http(String),
    #[error("transmitter registry returned malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmitterStatus {
    Active,
    Inactive,
    Invalid,
    #[serde(other)]
    Unknown,
}

/// One transmitter record as served by the registry. Only the fields the
/// frequency selection needs are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct Transmitter {
    pub status: TransmitterStatus,
    #[serde(default)]
    pub downlink_low: Option<u64>,
    #[serde(default)]
    pub description: String,
}

/// Downlink frequency lookup by NORAD id.
pub trait TransmitterRegistry {
    fn transmitters(&self, norad_id: u32) -> Result<Vec<Transmitter>, RegistryError>;
}

/// The SatNOGS transmitter database.
pub struct SatnogsRegistry {
    base_url: String,
}

impl SatnogsRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl TransmitterRegistry for SatnogsRegistry {
    fn transmitters(&self, norad_id: u32) -> Result<Vec<Transmitter>, RegistryError> {
        let url = format!(
            "{}/?format=json&satellite__norad_cat_id={}",
            self.base_url.trim_end_matches('/'),
            norad_id
        );
        log::debug!("fetching transmitters from {url}");
        let body = ureq::get(&url)
            .call()
            .map_err(|e| RegistryError::Http(e.to_string()))?
            .into_string()
            .map_err(|e| RegistryError::Http(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}
