use chrono::{DateTime, Duration, Utc};

use super::time_table::TimeTable;

/// Snapshot of a satellite's pass state at one evaluation instant. Exactly
/// one variant applies; the fields of the other do not exist.
#[derive(Debug, Clone)]
pub enum PassReport {
    /// The satellite is above the horizon right now.
    Overhead {
        elevation_deg: f64,
        /// Doppler-corrected downlink frequency at the evaluation instant.
        frequency_hz: i64,
        time_to_los: Duration,
        time_table: TimeTable,
    },
    /// The satellite is below the horizon; this is the next pass.
    Upcoming {
        aos: DateTime<Utc>,
        aos_in: Duration,
        aos_azimuth_deg: f64,
        max_elevation_deg: f64,
        max_elevation_time: DateTime<Utc>,
        duration: Duration,
        los: DateTime<Utc>,
        los_azimuth_deg: f64,
        /// Time until LOS; positive while LOS lies in the future.
        los_in: Duration,
        time_table: TimeTable,
    },
}

impl PassReport {
    pub fn time_table(&self) -> &TimeTable {
        match self {
            PassReport::Overhead { time_table, .. } => time_table,
            PassReport::Upcoming { time_table, .. } => time_table,
        }
    }

    pub fn is_overhead(&self) -> bool {
        matches!(self, PassReport::Overhead { .. })
    }

    /// Emit the one-line pass summary for this satellite.
    pub fn log(&self, satellite: &str) {
        match self {
            PassReport::Overhead {
                elevation_deg,
                frequency_hz,
                time_to_los,
                ..
            } => {
                log::info!(
                    "{}: overhead, elevation {:.2} deg, downlink {} Hz, LOS in {}",
                    satellite,
                    elevation_deg,
                    frequency_hz,
                    human(*time_to_los)
                );
            }
            PassReport::Upcoming {
                aos,
                aos_in,
                max_elevation_deg,
                duration,
                ..
            } => {
                log::info!(
                    "{}: next pass at {} UTC (in {}), max elevation {:.2} deg, duration {}",
                    satellite,
                    aos.format("%H:%M:%S %d/%m/%Y"),
                    human(*aos_in),
                    max_elevation_deg,
                    human(*duration)
                );
            }
        }
    }
}

fn human(d: Duration) -> String {
    let seconds = d.num_seconds().max(0) as u64;
    humantime::format_duration(std::time::Duration::from_secs(seconds)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_human_readable() {
        assert_eq!(human(Duration::seconds(754)), "12m 34s");
        assert_eq!(human(Duration::seconds(-5)), "0s");
    }
}
