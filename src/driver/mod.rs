mod sink;

pub use sink::{LogSink, PassSink, PrintSink, UdpFrequencySink};

use chrono::{DateTime, Duration, Utc};

use crate::catalog::Catalog;
use crate::ephemeris::{Ephemeris, Observer};
use crate::registry::TransmitterRegistry;
use crate::tracker::{TrackError, Tracker};

/// The polling control loop: each tick refreshes the catalog, evaluates
/// every tracked satellite, and hands the resulting pass reports to the
/// sinks. Failures are logged per satellite and never abort the tick.
pub struct Driver {
    catalog: Catalog,
    observer: Observer,
    ephemeris: Box<dyn Ephemeris>,
    registry: Box<dyn TransmitterRegistry>,
    tick: std::time::Duration,
    granularity: Duration,
    sinks: Vec<Box<dyn PassSink>>,
}

impl Driver {
    pub fn new(
        catalog: Catalog,
        observer: Observer,
        ephemeris: Box<dyn Ephemeris>,
        registry: Box<dyn TransmitterRegistry>,
        tick: std::time::Duration,
        granularity: Duration,
    ) -> Self {
        Self {
            catalog,
            observer,
            ephemeris,
            registry,
            tick,
            granularity,
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn PassSink>) {
        self.sinks.push(sink);
    }

    pub fn run(&mut self) -> ! {
        log::info!(
            "polling driver started, tick every {}",
            humantime::format_duration(self.tick)
        );
        loop {
            std::thread::sleep(self.tick);
            self.tick_once(Utc::now());
        }
    }

    /// One complete tick. Public so callers (and tests) can drive the loop
    /// without sleeping.
    pub fn tick_once(&mut self, now: DateTime<Utc>) {
        if let Err(e) = self.catalog.refresh(now) {
            log::warn!("catalog refresh failed, keeping previous catalog: {e}");
        }

        let Self {
            catalog,
            observer,
            ephemeris,
            registry,
            granularity,
            sinks,
            ..
        } = self;

        let mut trackers: Vec<&mut Tracker> = catalog.trackers_mut().collect();
        trackers.sort_by(|a, b| a.name().cmp(b.name()));

        for tracker in trackers {
            if let Err(e) = evaluate(
                tracker,
                ephemeris.as_ref(),
                registry.as_ref(),
                observer,
                now,
                *granularity,
                sinks,
            ) {
                log::warn!("{}: evaluation failed: {}", tracker.name(), e);
            }
        }
    }
}

fn evaluate(
    tracker: &mut Tracker,
    ephemeris: &dyn Ephemeris,
    registry: &dyn TransmitterRegistry,
    observer: &Observer,
    now: DateTime<Utc>,
    granularity: Duration,
    sinks: &mut [Box<dyn PassSink>],
) -> Result<(), TrackError> {
    // A registry outage must not suppress the pass report; only the
    // overhead Doppler figure needs the cached frequency.
    if tracker.needs_frequency(now) {
        if let Err(e) = tracker.update_frequency(registry, now) {
            log::warn!("{}: transmitter lookup failed: {}", tracker.name(), e);
        }
    }

    let report = if tracker.is_overhead(ephemeris, observer, now)? {
        tracker.current_pass(ephemeris, observer, now, granularity)?
    } else {
        tracker.next_pass(ephemeris, observer, now, granularity)?
    };

    for sink in sinks.iter_mut() {
        sink.report(tracker.name(), &report);
    }
    Ok(())
}
