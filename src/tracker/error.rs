use thiserror::Error;

use crate::ephemeris::EphemerisError;
use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("{0} is visible, a next pass cannot be computed while overhead")]
    AlreadyVisible(String),
    #[error("{0} is not visible, there is no current pass")]
    NotVisible(String),
    #[error("no downlink frequency cached for {0}")]
    FrequencyUnavailable(String),
    #[error("{0} stays above the horizon, no setting instant to sample towards")]
    NeverSets(String),
    #[error(transparent)]
    Ephemeris(#[from] EphemerisError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
