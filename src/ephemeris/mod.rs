mod error;
mod observer;
mod propagator;

pub use error::EphemerisError;
pub use observer::{Observer, EARTH_ROTATION_RAD_S};
pub use propagator::Sgp4Ephemeris;

use chrono::{DateTime, Utc};

use crate::catalog::ElementSet;

/// One topocentric look from the observer to the satellite.
#[derive(Debug, Clone, Copy)]
pub struct Look {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    /// Line-of-sight velocity in m/s, positive when receding.
    pub range_rate_m_s: f64,
}

/// Horizon-crossing geometry of one visibility window.
#[derive(Debug, Clone, Copy)]
pub struct Crossing {
    pub aos: DateTime<Utc>,
    pub aos_azimuth_deg: f64,
    pub culmination: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub los: DateTime<Utc>,
    pub los_azimuth_deg: f64,
}

/// The propagation capability the tracker and driver consume. The production
/// implementation is [`Sgp4Ephemeris`]; tests substitute scripted fakes.
pub trait Ephemeris {
    /// Look angles and range-rate at an explicit instant.
    fn propagate(
        &self,
        elements: &ElementSet,
        observer: &Observer,
        t: DateTime<Utc>,
    ) -> Result<Look, EphemerisError>;

    /// The next complete visibility window starting after `after`. When the
    /// satellite is above the horizon at `after`, the ongoing window is
    /// skipped and the one after it is returned.
    fn next_crossing(
        &self,
        elements: &ElementSet,
        observer: &Observer,
        after: DateTime<Utc>,
    ) -> Result<Crossing, EphemerisError>;
}
