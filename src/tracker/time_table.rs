use chrono::{DateTime, Duration, Utc};

/// One above-horizon sample of a visibility window.
#[derive(Debug, Clone, Copy)]
pub struct TimeTableSample {
    pub t: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
}

/// The sampled profile of one contiguous visibility window.
///
/// Samples are ordered by instant, strictly increasing, and all have
/// elevation > 0. The LOS boundary (the first non-positive instant the
/// sampler hit) is carried separately; it is not a sample.
#[derive(Debug, Clone)]
pub struct TimeTable {
    samples: Vec<TimeTableSample>,
    los: DateTime<Utc>,
}

impl TimeTable {
    pub(crate) fn new(samples: Vec<TimeTableSample>, los: DateTime<Utc>) -> Self {
        debug_assert!(!samples.is_empty());
        Self { samples, los }
    }

    pub fn samples(&self) -> &[TimeTableSample] {
        &self.samples
    }

    /// Instant of the first sample: AOS plus one granularity step for an
    /// upcoming pass, "now" for an ongoing one.
    pub fn start(&self) -> DateTime<Utc> {
        self.samples[0].t
    }

    pub fn los(&self) -> DateTime<Utc> {
        self.los
    }

    pub fn duration(&self) -> Duration {
        self.los - self.start()
    }

    pub fn max_elevation(&self) -> (DateTime<Utc>, f64) {
        let best = self
            .samples
            .iter()
            .fold(&self.samples[0], |best, s| {
                if s.elevation_deg > best.elevation_deg {
                    s
                } else {
                    best
                }
            });
        (best.t, best.elevation_deg)
    }

    /// Render every sample as a fixed-width table.
    pub fn table(&self) -> String {
        let mut out = header();
        for sample in &self.samples {
            out.push_str(&row(sample));
        }
        out
    }

    /// Render at most 15 evenly spaced rows, always ending on the last
    /// sample.
    pub fn table_mini(&self) -> String {
        const MAX_ROWS: usize = 15;
        let stride = (self.samples.len() / MAX_ROWS).max(1);

        let mut out = header();
        for sample in self.samples.iter().step_by(stride) {
            out.push_str(&row(sample));
        }
        if self.samples.len() > 1 && (self.samples.len() - 1) % stride != 0 {
            if let Some(last) = self.samples.last() {
                out.push_str(&row(last));
            }
        }
        out
    }
}

fn header() -> String {
    format!(
        "| {:<20} | {:<8} | {:<8} |\n| {} | {} | {} |\n",
        "Time",
        "Az",
        "El",
        "-".repeat(20),
        "-".repeat(8),
        "-".repeat(8)
    )
}

fn row(sample: &TimeTableSample) -> String {
    format!(
        "| {:<20} | {:<8.3} | {:<8.3} |\n",
        sample.t.format("%H:%M:%S %d/%m/%Y"),
        sample.azimuth_deg,
        sample.elevation_deg
    )
}
