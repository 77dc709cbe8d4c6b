use super::error::CatalogError;

pub const DEFAULT_TLE_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=tle";

/// Where raw TLE text comes from. Three lines per satellite: name line,
/// element line 1, element line 2.
pub trait TleSource {
    fn fetch(&self) -> Result<String, CatalogError>;
}

pub struct HttpTleSource {
    url: String,
}

impl HttpTleSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl TleSource for HttpTleSource {
    fn fetch(&self) -> Result<String, CatalogError> {
        log::debug!("fetching tle catalog from {}", self.url);
        let response = ureq::get(&self.url)
            .call()
            .map_err(|e| CatalogError::Fetch(e.to_string()))?;
        response
            .into_string()
            .map_err(|e| CatalogError::Fetch(e.to_string()))
    }
}
