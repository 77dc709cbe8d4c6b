use chrono::{DateTime, Duration, Utc};

use super::error::EphemerisError;
use super::observer::{Observer, EARTH_ROTATION_RAD_S};
use super::{Crossing, Ephemeris, Look};
use crate::catalog::ElementSet;

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for the initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement
const HORIZON_ELEVATION: f64 = 0.0;

/// SGP4-backed ephemeris: propagates element sets with the `sgp4` crate and
/// converts TEME state vectors to topocentric look angles.
pub struct Sgp4Ephemeris {
    search_window: Duration,
}

impl Sgp4Ephemeris {
    pub fn new() -> Self {
        Self {
            search_window: Duration::hours(24),
        }
    }

    pub fn with_search_window(search_window: Duration) -> Self {
        Self { search_window }
    }

    /// Binary search for the exact horizon crossing between a below-horizon
    /// and an above-horizon coarse sample. Returns the instant on the `high`
    /// side of the bracket and the azimuth there.
    fn refine_crossing(
        &self,
        elements: &ElementSet,
        observer: &Observer,
        before: DateTime<Utc>,
        after: DateTime<Utc>,
        rising: bool,
    ) -> Result<(DateTime<Utc>, f64), EphemerisError> {
        let mut low = before;
        let mut high = after;

        while (high - low).num_seconds() > FINE_STEP_SECONDS {
            let mid = low + (high - low) / 2;
            let look = self.propagate(elements, observer, mid)?;
            let above = look.elevation_deg > HORIZON_ELEVATION;
            if above == rising {
                high = mid;
            } else {
                low = mid;
            }
        }

        let look = self.propagate(elements, observer, high)?;
        Ok((high, look.azimuth_deg))
    }
}

impl Default for Sgp4Ephemeris {
    fn default() -> Self {
        Self::new()
    }
}

impl Ephemeris for Sgp4Ephemeris {
    fn propagate(
        &self,
        elements: &ElementSet,
        observer: &Observer,
        t: DateTime<Utc>,
    ) -> Result<Look, EphemerisError> {
        let minutes = elements
            .elements
            .datetime_to_minutes_since_epoch(&t.naive_utc())
            .map_err(|e| EphemerisError::Propagation(e.to_string()))?;

        let prediction = elements
            .constants
            .propagate(minutes)
            .map_err(|e| EphemerisError::Propagation(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&t.naive_utc()));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sat_vel_ecef = teme_to_ecef_velocity(prediction.position, prediction.velocity, sidereal);

        let sta_ecef = observer.position_ecef_km();
        let sta_vel = observer.velocity_ecef_km_s();

        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let enu = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
        let azimuth_deg = enu.0.atan2(enu.1).to_degrees().rem_euclid(360.0);
        let elevation_deg = if range_km > 0.0 {
            (enu.2 / range_km).asin().to_degrees()
        } else {
            0.0
        };

        let los_unit = if range_km > 0.0 {
            [dr[0] / range_km, dr[1] / range_km, dr[2] / range_km]
        } else {
            [0.0, 0.0, 0.0]
        };
        let rel_vel = [
            sat_vel_ecef[0] - sta_vel[0],
            sat_vel_ecef[1] - sta_vel[1],
            sat_vel_ecef[2] - sta_vel[2],
        ];
        let range_rate_km_s =
            rel_vel[0] * los_unit[0] + rel_vel[1] * los_unit[1] + rel_vel[2] * los_unit[2];

        Ok(Look {
            elevation_deg,
            azimuth_deg,
            range_rate_m_s: range_rate_km_s * 1000.0,
        })
    }

    fn next_crossing(
        &self,
        elements: &ElementSet,
        observer: &Observer,
        after: DateTime<Utc>,
    ) -> Result<Crossing, EphemerisError> {
        let coarse = Duration::seconds(COARSE_STEP_SECONDS);
        let end = after + self.search_window;
        let mut cursor = after;

        // If we start inside a pass, skip forward to its setting edge first.
        while cursor <= end && self.propagate(elements, observer, cursor)?.elevation_deg > HORIZON_ELEVATION {
            cursor += coarse;
        }

        // Coarse scan for the rising edge.
        let mut below = cursor;
        loop {
            if cursor > end {
                return Err(EphemerisError::NoCrossing(self.search_window.num_hours()));
            }
            let look = self.propagate(elements, observer, cursor)?;
            if look.elevation_deg > HORIZON_ELEVATION {
                break;
            }
            below = cursor;
            cursor += coarse;
        }
        let (aos, aos_azimuth_deg) = self.refine_crossing(elements, observer, below, cursor, true)?;

        // Walk through the pass tracking the culmination, then find the
        // setting edge. Culmination is resolved at coarse-step resolution.
        let mut max_elevation_deg = f64::MIN;
        let mut culmination = cursor;
        let mut inside = cursor;
        loop {
            if cursor > end + self.search_window {
                return Err(EphemerisError::NoCrossing(self.search_window.num_hours()));
            }
            let look = self.propagate(elements, observer, cursor)?;
            if look.elevation_deg <= HORIZON_ELEVATION {
                break;
            }
            if look.elevation_deg > max_elevation_deg {
                max_elevation_deg = look.elevation_deg;
                culmination = cursor;
            }
            inside = cursor;
            cursor += coarse;
        }
        let (los, los_azimuth_deg) =
            self.refine_crossing(elements, observer, inside, cursor, false)?;

        Ok(Crossing {
            aos,
            aos_azimuth_deg,
            culmination,
            max_elevation_deg,
            los,
            los_azimuth_deg,
        })
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = [
        vel_teme[0] * cos_gmst + vel_teme[1] * sin_gmst,
        -vel_teme[0] * sin_gmst + vel_teme[1] * cos_gmst,
        vel_teme[2],
    ];
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
