use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("tle fetch failed: {0}")]
    Fetch(String),
    #[error("invalid tle for {name}: {message}")]
    Parse { name: String, message: String },
    #[error("tle source returned no satellites")]
    Empty,
    #[error("unknown satellite: {0}")]
    UnknownSatellite(String),
}
