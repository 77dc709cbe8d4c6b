use chrono::{DateTime, Duration, Utc};

use super::error::TrackError;
use super::pass::PassReport;
use super::time_table::{TimeTable, TimeTableSample};
use crate::catalog::ElementSet;
use crate::ephemeris::{Ephemeris, Observer};
use crate::registry::{TransmitterRegistry, TransmitterStatus};

/// Doppler speed-of-light constant, m/s. The source system used exactly
/// 3e8 rather than the true value; kept for compatibility.
pub const DOPPLER_C_M_S: f64 = 300_000_000.0;

pub const DEFAULT_GRANULARITY: Duration = Duration::seconds(1);

/// Minimum wait between unsuccessful transmitter-registry lookups for one
/// satellite.
const FREQUENCY_RETRY: Duration = Duration::minutes(15);

/// Longest visibility window the sampler will walk before concluding the
/// satellite never sets for this observer.
const MAX_SAMPLED_SPAN: Duration = Duration::hours(24);

/// One tracked satellite: its current element set plus the cached downlink
/// frequency. The two caches age independently; a catalog refresh replaces
/// the elements without touching the frequency.
pub struct Tracker {
    elements: ElementSet,
    frequency_hz: Option<u64>,
    frequency_updated_at: Option<DateTime<Utc>>,
    frequency_attempted_at: Option<DateTime<Utc>>,
}

impl Tracker {
    pub fn new(elements: ElementSet) -> Self {
        Self {
            elements,
            frequency_hz: None,
            frequency_updated_at: None,
            frequency_attempted_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.elements.name
    }

    pub fn norad_id(&self) -> u32 {
        self.elements.norad_id
    }

    pub fn elements(&self) -> &ElementSet {
        &self.elements
    }

    pub fn frequency_hz(&self) -> Option<u64> {
        self.frequency_hz
    }

    pub fn frequency_updated_at(&self) -> Option<DateTime<Utc>> {
        self.frequency_updated_at
    }

    pub(crate) fn replace_elements(&mut self, elements: ElementSet) {
        self.elements = elements;
    }

    /// Whether the driver should attempt a registry lookup for this
    /// satellite: no frequency cached and no recent unsuccessful attempt.
    pub fn needs_frequency(&self, now: DateTime<Utc>) -> bool {
        self.frequency_hz.is_none()
            && self
                .frequency_attempted_at
                .is_none_or(|t| now - t >= FREQUENCY_RETRY)
    }

    /// Adopt a downlink frequency verbatim, bypassing the registry.
    pub fn force_frequency(&mut self, hz: u64, now: DateTime<Utc>) {
        log::info!("{}: downlink frequency forced to {} Hz", self.name(), hz);
        self.frequency_hz = Some(hz);
        self.frequency_updated_at = Some(now);
    }

    /// Look the satellite up in the transmitter registry and adopt the first
    /// record whose status is active. First match wins; no active record (or
    /// an active record without a downlink) leaves the cache unchanged.
    pub fn update_frequency(
        &mut self,
        registry: &dyn TransmitterRegistry,
        now: DateTime<Utc>,
    ) -> Result<(), TrackError> {
        self.frequency_attempted_at = Some(now);
        let transmitters = registry.transmitters(self.norad_id())?;

        match transmitters
            .iter()
            .find(|t| t.status == TransmitterStatus::Active)
        {
            Some(transmitter) => match transmitter.downlink_low {
                Some(hz) => {
                    log::info!(
                        "{}: selected downlink {} Hz ({})",
                        self.name(),
                        hz,
                        transmitter.description
                    );
                    self.frequency_hz = Some(hz);
                    self.frequency_updated_at = Some(now);
                }
                None => log::warn!(
                    "{}: active transmitter \"{}\" has no downlink frequency",
                    self.name(),
                    transmitter.description
                ),
            },
            None => log::warn!("{}: no active transmitter in the registry", self.name()),
        }
        Ok(())
    }

    pub fn is_overhead(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        now: DateTime<Utc>,
    ) -> Result<bool, TrackError> {
        let look = ephemeris.propagate(&self.elements, observer, now)?;
        Ok(look.elevation_deg > 0.0)
    }

    /// Doppler-corrected downlink frequency at `now`.
    pub fn doppler_frequency(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        now: DateTime<Utc>,
    ) -> Result<i64, TrackError> {
        let look = ephemeris.propagate(&self.elements, observer, now)?;
        self.doppler_from_rate(look.range_rate_m_s)
    }

    fn doppler_from_rate(&self, range_rate_m_s: f64) -> Result<i64, TrackError> {
        let f0 = self
            .frequency_hz
            .ok_or_else(|| TrackError::FrequencyUnavailable(self.name().to_string()))?
            as f64;
        Ok((f0 - range_rate_m_s * f0 / DOPPLER_C_M_S).round() as i64)
    }

    /// Sample the current or next visibility window.
    ///
    /// When the satellite is below the horizon the sampler starts at the
    /// predicted AOS plus one granularity step, so the first sample is above
    /// the horizon by construction.
    pub fn time_table(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        now: DateTime<Utc>,
        granularity: Duration,
    ) -> Result<TimeTable, TrackError> {
        let start = if self.is_overhead(ephemeris, observer, now)? {
            now
        } else {
            let crossing = ephemeris.next_crossing(&self.elements, observer, now)?;
            // Clamped so a pass shorter than one step still gets a sample.
            (crossing.aos + granularity).min(crossing.culmination)
        };
        self.sample_window(ephemeris, observer, start, granularity)
    }

    /// March from `start` by `granularity`, recording samples while the
    /// elevation stays positive. The first non-positive instant is the LOS
    /// boundary, excluded from the samples.
    fn sample_window(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        start: DateTime<Utc>,
        granularity: Duration,
    ) -> Result<TimeTable, TrackError> {
        let mut cursor = start;
        let mut samples = Vec::new();
        loop {
            if cursor - start > MAX_SAMPLED_SPAN {
                return Err(TrackError::NeverSets(self.name().to_string()));
            }
            let look = ephemeris.propagate(&self.elements, observer, cursor)?;
            if look.elevation_deg <= 0.0 {
                break;
            }
            samples.push(TimeTableSample {
                t: cursor,
                elevation_deg: look.elevation_deg,
                azimuth_deg: look.azimuth_deg,
            });
            cursor += granularity;
        }
        Ok(TimeTable::new(samples, cursor))
    }

    /// Report on the upcoming pass. Hard precondition: the satellite must be
    /// below the horizon.
    pub fn next_pass(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        now: DateTime<Utc>,
        granularity: Duration,
    ) -> Result<PassReport, TrackError> {
        if self.is_overhead(ephemeris, observer, now)? {
            return Err(TrackError::AlreadyVisible(self.name().to_string()));
        }

        let crossing = ephemeris.next_crossing(&self.elements, observer, now)?;
        let start = (crossing.aos + granularity).min(crossing.culmination);
        let time_table = self.sample_window(ephemeris, observer, start, granularity)?;

        Ok(PassReport::Upcoming {
            aos: crossing.aos,
            aos_in: crossing.aos - now,
            aos_azimuth_deg: crossing.aos_azimuth_deg,
            max_elevation_deg: crossing.max_elevation_deg,
            max_elevation_time: crossing.culmination,
            duration: crossing.los - crossing.aos,
            los: crossing.los,
            los_azimuth_deg: crossing.los_azimuth_deg,
            los_in: crossing.los - now,
            time_table,
        })
    }

    /// Report on the ongoing pass. Hard precondition: the satellite must be
    /// above the horizon. Requires a cached downlink frequency for the
    /// Doppler figure.
    pub fn current_pass(
        &self,
        ephemeris: &dyn Ephemeris,
        observer: &Observer,
        now: DateTime<Utc>,
        granularity: Duration,
    ) -> Result<PassReport, TrackError> {
        let look = ephemeris.propagate(&self.elements, observer, now)?;
        if look.elevation_deg <= 0.0 {
            return Err(TrackError::NotVisible(self.name().to_string()));
        }

        let frequency_hz = self.doppler_from_rate(look.range_rate_m_s)?;
        let time_table = self.sample_window(ephemeris, observer, now, granularity)?;

        Ok(PassReport::Overhead {
            elevation_deg: look.elevation_deg,
            frequency_hz,
            time_to_los: time_table.los() - now,
            time_table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{Crossing, EphemerisError, Look};
    use crate::registry::{RegistryError, Transmitter};
    use chrono::TimeZone;

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn element_set(name: &str) -> ElementSet {
        ElementSet::parse(name, ISS_LINE1, ISS_LINE2, Utc::now()).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    fn observer() -> Observer {
        Observer::new(47.97, 7.40, 200.0)
    }

    /// Scripted adapter: above the horizon during [aos, los), below outside,
    /// with a fixed range-rate and a triangular elevation profile.
    struct FakeEphemeris {
        aos: DateTime<Utc>,
        los: DateTime<Utc>,
        range_rate_m_s: f64,
    }

    impl FakeEphemeris {
        fn window(aos: DateTime<Utc>, los: DateTime<Utc>) -> Self {
            Self {
                aos,
                los,
                range_rate_m_s: 0.0,
            }
        }
    }

    impl Ephemeris for FakeEphemeris {
        fn propagate(
            &self,
            _elements: &ElementSet,
            _observer: &Observer,
            t: DateTime<Utc>,
        ) -> Result<Look, EphemerisError> {
            let elevation_deg = if t >= self.aos && t < self.los {
                let half = (self.los - self.aos).num_seconds() as f64 / 2.0;
                let offset = (t - self.aos).num_seconds() as f64;
                1.0 + half - (offset - half).abs()
            } else {
                -10.0
            };
            Ok(Look {
                elevation_deg,
                azimuth_deg: 180.0,
                range_rate_m_s: self.range_rate_m_s,
            })
        }

        fn next_crossing(
            &self,
            _elements: &ElementSet,
            _observer: &Observer,
            _after: DateTime<Utc>,
        ) -> Result<Crossing, EphemerisError> {
            Ok(Crossing {
                aos: self.aos,
                aos_azimuth_deg: 12.0,
                culmination: self.aos + (self.los - self.aos) / 2,
                max_elevation_deg: 45.0,
                los: self.los,
                los_azimuth_deg: 200.0,
            })
        }
    }

    struct FakeRegistry {
        transmitters: Vec<Transmitter>,
        fail: bool,
    }

    impl TransmitterRegistry for FakeRegistry {
        fn transmitters(&self, _norad_id: u32) -> Result<Vec<Transmitter>, RegistryError> {
            if self.fail {
                return Err(RegistryError::Http("connection refused".into()));
            }
            Ok(self.transmitters.clone())
        }
    }

    fn transmitter(status: TransmitterStatus, downlink: Option<u64>, desc: &str) -> Transmitter {
        Transmitter {
            status,
            downlink_low: downlink,
            description: desc.to_string(),
        }
    }

    #[test]
    fn is_overhead_follows_the_adapter_elevation_sign() {
        let eph = FakeEphemeris::window(t0(), t0() + Duration::minutes(10));
        let tracker = Tracker::new(element_set("NOAA 19"));

        assert!(!tracker
            .is_overhead(&eph, &observer(), t0() - Duration::seconds(1))
            .unwrap());
        assert!(tracker
            .is_overhead(&eph, &observer(), t0() + Duration::minutes(5))
            .unwrap());
        assert!(!tracker
            .is_overhead(&eph, &observer(), t0() + Duration::minutes(10))
            .unwrap());
    }

    #[test]
    fn next_pass_while_overhead_is_a_precondition_violation() {
        let eph = FakeEphemeris::window(t0(), t0() + Duration::minutes(10));
        let tracker = Tracker::new(element_set("NOAA 19"));
        let err = tracker
            .next_pass(&eph, &observer(), t0() + Duration::minutes(5), DEFAULT_GRANULARITY)
            .unwrap_err();
        assert!(matches!(err, TrackError::AlreadyVisible(_)));
    }

    #[test]
    fn current_pass_while_below_horizon_is_a_precondition_violation() {
        let eph = FakeEphemeris::window(t0(), t0() + Duration::minutes(10));
        let tracker = Tracker::new(element_set("NOAA 19"));
        let err = tracker
            .current_pass(&eph, &observer(), t0() - Duration::minutes(5), DEFAULT_GRANULARITY)
            .unwrap_err();
        assert!(matches!(err, TrackError::NotVisible(_)));
    }

    #[test]
    fn upcoming_time_table_starts_one_step_after_aos() {
        let aos = t0() + Duration::minutes(20);
        let los = aos + Duration::minutes(10);
        let eph = FakeEphemeris::window(aos, los);
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());

        let report = tracker
            .next_pass(&eph, &observer(), t0(), DEFAULT_GRANULARITY)
            .unwrap();
        let PassReport::Upcoming {
            aos: report_aos,
            duration,
            time_table,
            ..
        } = &report
        else {
            panic!("expected an upcoming pass");
        };

        assert_eq!(*report_aos, aos);
        assert_eq!(*duration, los - aos);
        assert_eq!(time_table.start(), aos + DEFAULT_GRANULARITY);

        // Never empty, strictly increasing, all samples above the horizon.
        let samples = time_table.samples();
        assert!(!samples.is_empty());
        assert!(samples.windows(2).all(|w| w[1].t > w[0].t));
        assert!(samples.iter().all(|s| s.elevation_deg > 0.0));
        assert_eq!(time_table.los(), los);
    }

    #[test]
    fn a_pass_shorter_than_one_step_still_yields_a_sample() {
        let aos = t0() + Duration::minutes(20);
        let los = aos + Duration::seconds(30);
        let eph = FakeEphemeris::window(aos, los);
        let tracker = Tracker::new(element_set("NOAA 19"));

        let report = tracker
            .next_pass(&eph, &observer(), t0(), Duration::seconds(60))
            .unwrap();
        let table = report.time_table();
        assert!(!table.samples().is_empty());
        // The first step overshoots LOS, so sampling falls back to the
        // culmination instant.
        assert_eq!(table.start(), aos + Duration::seconds(15));
        assert!(table.samples().iter().all(|s| s.elevation_deg > 0.0));
    }

    #[test]
    fn a_satellite_that_never_sets_is_an_error() {
        // Always above the horizon, like a geostationary bird overhead.
        struct AlwaysUp;

        impl Ephemeris for AlwaysUp {
            fn propagate(
                &self,
                _elements: &ElementSet,
                _observer: &Observer,
                _t: DateTime<Utc>,
            ) -> Result<Look, EphemerisError> {
                Ok(Look {
                    elevation_deg: 35.0,
                    azimuth_deg: 180.0,
                    range_rate_m_s: 0.0,
                })
            }

            fn next_crossing(
                &self,
                _elements: &ElementSet,
                _observer: &Observer,
                _after: DateTime<Utc>,
            ) -> Result<Crossing, EphemerisError> {
                Err(EphemerisError::NoCrossing(0))
            }
        }

        let tracker = Tracker::new(element_set("GEO BIRD"));
        let err = tracker
            .time_table(&AlwaysUp, &observer(), t0(), Duration::hours(1))
            .unwrap_err();
        assert!(matches!(err, TrackError::NeverSets(_)));
    }

    #[test]
    fn current_pass_reports_elevation_frequency_and_time_to_los() {
        let aos = t0() - Duration::minutes(2);
        let los = t0() + Duration::minutes(8);
        let eph = FakeEphemeris::window(aos, los);
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());

        let report = tracker
            .current_pass(&eph, &observer(), t0(), DEFAULT_GRANULARITY)
            .unwrap();
        let PassReport::Overhead {
            elevation_deg,
            frequency_hz,
            time_to_los,
            time_table,
        } = &report
        else {
            panic!("expected an overhead pass");
        };

        assert!(*elevation_deg > 0.0);
        assert_eq!(*frequency_hz, 137_100_000); // zero range-rate
        assert_eq!(*time_to_los, los - t0());
        assert_eq!(time_table.start(), t0());
    }

    #[test]
    fn current_pass_without_a_frequency_is_unavailable() {
        let eph = FakeEphemeris::window(t0() - Duration::minutes(2), t0() + Duration::minutes(8));
        let tracker = Tracker::new(element_set("NOAA 19"));
        let err = tracker
            .current_pass(&eph, &observer(), t0(), DEFAULT_GRANULARITY)
            .unwrap_err();
        assert!(matches!(err, TrackError::FrequencyUnavailable(_)));
    }

    #[test]
    fn doppler_decreases_as_range_rate_increases() {
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());

        let mut last = i64::MAX;
        for rate in [-7000.0, -3000.0, 0.0, 3000.0, 7000.0] {
            let mut eph =
                FakeEphemeris::window(t0() - Duration::minutes(2), t0() + Duration::minutes(8));
            eph.range_rate_m_s = rate;
            let f = tracker.doppler_frequency(&eph, &observer(), t0()).unwrap();
            assert!(f < last, "doppler must fall as the satellite recedes");
            last = f;
        }
    }

    #[test]
    fn doppler_matches_the_reference_formula() {
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());

        let mut eph =
            FakeEphemeris::window(t0() - Duration::minutes(2), t0() + Duration::minutes(8));
        eph.range_rate_m_s = 3000.0;
        // 137.1e6 * (1 - 3000 / 3e8) = 137_098_629
        assert_eq!(
            tracker.doppler_frequency(&eph, &observer(), t0()).unwrap(),
            137_098_629
        );
    }

    #[test]
    fn first_active_transmitter_wins() {
        let registry = FakeRegistry {
            transmitters: vec![
                transmitter(TransmitterStatus::Inactive, Some(145_800_000), "old"),
                transmitter(TransmitterStatus::Active, Some(137_100_000), "APT"),
                transmitter(TransmitterStatus::Active, Some(137_912_500), "HRPT"),
            ],
            fail: false,
        };
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.update_frequency(&registry, t0()).unwrap();
        assert_eq!(tracker.frequency_hz(), Some(137_100_000));
    }

    #[test]
    fn no_active_transmitter_leaves_the_cache_unchanged() {
        let registry = FakeRegistry {
            transmitters: vec![transmitter(TransmitterStatus::Inactive, Some(1), "off")],
            fail: false,
        };
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());
        tracker.update_frequency(&registry, t0()).unwrap();
        assert_eq!(tracker.frequency_hz(), Some(137_100_000));
    }

    #[test]
    fn registry_failure_keeps_the_previous_frequency() {
        let registry = FakeRegistry {
            transmitters: vec![],
            fail: true,
        };
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        tracker.force_frequency(137_100_000, t0());
        assert!(tracker.update_frequency(&registry, t0()).is_err());
        assert_eq!(tracker.frequency_hz(), Some(137_100_000));
    }

    #[test]
    fn frequency_lookups_are_rate_limited_after_an_unsuccessful_attempt() {
        let registry = FakeRegistry {
            transmitters: vec![],
            fail: false,
        };
        let mut tracker = Tracker::new(element_set("NOAA 19"));
        assert!(tracker.needs_frequency(t0()));

        tracker.update_frequency(&registry, t0()).unwrap();
        assert!(!tracker.needs_frequency(t0() + Duration::minutes(1)));
        assert!(tracker.needs_frequency(t0() + Duration::minutes(20)));

        tracker.force_frequency(137_100_000, t0() + Duration::minutes(21));
        assert!(!tracker.needs_frequency(t0() + Duration::hours(5)));
    }
}
