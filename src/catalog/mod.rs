mod error;
mod parser;
mod source;

pub use error::CatalogError;
pub use source::{HttpTleSource, TleSource, DEFAULT_TLE_URL};

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use crate::tracker::Tracker;

/// One satellite's orbital elements as loaded from the TLE source.
/// Immutable; a catalog refresh replaces it wholesale.
pub struct ElementSet {
    pub name: String,
    pub norad_id: u32,
    pub line1: String,
    pub line2: String,
    pub elements: Elements,
    pub constants: Constants,
    pub loaded_at: DateTime<Utc>,
}

impl ElementSet {
    pub fn parse(
        name: &str,
        line1: &str,
        line2: &str,
        loaded_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        let parse_err = |message: String| CatalogError::Parse {
            name: name.to_string(),
            message,
        };

        let elements = Elements::from_tle(
            Some(name.to_string()),
            line1.as_bytes(),
            line2.as_bytes(),
        )
        .map_err(|e| parse_err(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| parse_err(e.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            norad_id: elements.norad_id as u32,
            line1: line1.to_string(),
            line2: line2.to_string(),
            elements,
            constants,
            loaded_at,
        })
    }
}

/// Named TLE index with TTL-based refresh.
///
/// `last_update` only advances after a successful fetch and parse: a failed
/// refresh keeps the previous contents and stays eligible for retry on the
/// very next `refresh` call instead of waiting out the TTL again.
pub struct Catalog {
    source: Box<dyn TleSource>,
    refresh_interval: Duration,
    name_filter: Option<HashSet<String>>,
    last_update: Option<DateTime<Utc>>,
    satellites: HashMap<String, Tracker>,
}

impl Catalog {
    pub fn new(
        source: Box<dyn TleSource>,
        refresh_interval: Duration,
        name_filter: Option<HashSet<String>>,
    ) -> Self {
        Self {
            source,
            refresh_interval,
            name_filter,
            last_update: None,
            satellites: HashMap::new(),
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// Exact-match lookup; satellite catalog names are not normalized.
    pub fn get(&self, name: &str) -> Result<&Tracker, CatalogError> {
        self.satellites
            .get(name)
            .ok_or_else(|| CatalogError::UnknownSatellite(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Tracker, CatalogError> {
        self.satellites
            .get_mut(name)
            .ok_or_else(|| CatalogError::UnknownSatellite(name.to_string()))
    }

    pub fn trackers(&self) -> impl Iterator<Item = &Tracker> {
        self.satellites.values()
    }

    pub fn trackers_mut(&mut self) -> impl Iterator<Item = &mut Tracker> {
        self.satellites.values_mut()
    }

    /// Refresh the element sets when the TTL has lapsed. Trackers that
    /// survive the refresh keep their cached downlink frequency; only their
    /// element set is replaced.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), CatalogError> {
        if let Some(last) = self.last_update {
            if now < last + self.refresh_interval {
                return Ok(());
            }
        }

        log::info!("updating tle catalog");
        let text = self.source.fetch()?;
        let sets = parser::parse_catalog(&text, self.name_filter.as_ref(), now)?;
        if sets.is_empty() {
            // Stale-but-valid beats empty; treat this run as failed.
            return Err(CatalogError::Empty);
        }

        let mut next = HashMap::with_capacity(sets.len());
        for set in sets {
            log::debug!("loaded tle for {} (norad {})", set.name, set.norad_id);
            match self.satellites.remove(&set.name) {
                Some(mut tracker) => {
                    tracker.replace_elements(set);
                    next.insert(tracker.name().to_string(), tracker);
                }
                None => {
                    next.insert(set.name.clone(), Tracker::new(set));
                }
            }
        }

        log::info!("tle catalog updated: {} satellites", next.len());
        self.satellites = next;
        self.last_update = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    fn catalog_text(names: &[&str]) -> String {
        names
            .iter()
            .map(|n| format!("{n}\n{ISS_LINE1}\n{ISS_LINE2}\n"))
            .collect()
    }

    /// Replays a scripted sequence of fetch outcomes, then falls back to a
    /// fixed text (when given). Counts calls through a shared cell.
    struct ScriptedSource {
        script: RefCell<VecDeque<Result<String, CatalogError>>>,
        fallback: Option<String>,
        calls: Rc<Cell<u32>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<String, CatalogError>>) -> (Self, Rc<Cell<u32>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    script: RefCell::new(script.into()),
                    fallback: None,
                    calls: calls.clone(),
                },
                calls,
            )
        }

        fn repeating(text: String) -> (Self, Rc<Cell<u32>>) {
            let calls = Rc::new(Cell::new(0));
            (
                Self {
                    script: RefCell::new(VecDeque::new()),
                    fallback: Some(text),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl TleSource for ScriptedSource {
        fn fetch(&self) -> Result<String, CatalogError> {
            self.calls.set(self.calls.get() + 1);
            if let Some(outcome) = self.script.borrow_mut().pop_front() {
                return outcome;
            }
            match &self.fallback {
                Some(text) => Ok(text.clone()),
                None => Err(CatalogError::Fetch("script exhausted".into())),
            }
        }
    }

    fn t0() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap()
    }

    #[test]
    fn refresh_is_a_no_op_within_the_ttl() {
        let (source, calls) = ScriptedSource::repeating(catalog_text(&["NOAA 19"]));
        let mut catalog = Catalog::new(Box::new(source), Duration::hours(1), None);

        catalog.refresh(t0()).unwrap();
        assert_eq!(calls.get(), 1);

        catalog.refresh(t0() + Duration::minutes(30)).unwrap();
        assert_eq!(calls.get(), 1);

        catalog.refresh(t0() + Duration::hours(1)).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(catalog.last_update(), Some(t0() + Duration::hours(1)));
    }

    #[test]
    fn name_filter_retains_only_matching_entries() {
        let (source, _) = ScriptedSource::repeating(catalog_text(&["NOAA 15", "NOAA 19", "NOAA 18"]));
        let filter: HashSet<String> = ["NOAA 19".to_string()].into();
        let mut catalog = Catalog::new(Box::new(source), Duration::hours(1), Some(filter));

        catalog.refresh(t0()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("NOAA 19").is_ok());
        assert!(matches!(
            catalog.get("NOAA 15"),
            Err(CatalogError::UnknownSatellite(_))
        ));
    }

    #[test]
    fn failed_fetch_keeps_contents_and_retries_on_the_next_call() {
        let (source, _) = ScriptedSource::new(vec![
            Ok(catalog_text(&["NOAA 19"])),
            Err(CatalogError::Fetch("connection refused".into())),
            Ok(catalog_text(&["NOAA 19", "NOAA 18"])),
        ]);
        let ttl = Duration::hours(1);
        let mut catalog = Catalog::new(Box::new(source), ttl, None);

        catalog.refresh(t0()).unwrap();
        assert_eq!(catalog.len(), 1);

        // TTL lapses, fetch fails: previous contents stay, last_update does
        // not advance.
        let failed_at = t0() + ttl;
        assert!(catalog.refresh(failed_at).is_err());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.last_update(), Some(t0()));

        // The very next call retries instead of waiting out another TTL.
        catalog.refresh(failed_at + Duration::seconds(5)).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.last_update(), Some(failed_at + Duration::seconds(5)));
    }

    #[test]
    fn empty_parse_counts_as_a_failed_refresh() {
        let (source, _) = ScriptedSource::new(vec![Ok(String::new())]);
        let mut catalog = Catalog::new(Box::new(source), Duration::hours(1), None);
        assert!(matches!(catalog.refresh(t0()), Err(CatalogError::Empty)));
        assert_eq!(catalog.last_update(), None);
    }

    #[test]
    fn surviving_trackers_keep_their_cached_frequency() {
        let (source, _) = ScriptedSource::repeating(catalog_text(&["NOAA 19"]));
        let mut catalog = Catalog::new(Box::new(source), Duration::hours(1), None);

        catalog.refresh(t0()).unwrap();
        catalog.get_mut("NOAA 19").unwrap().force_frequency(137_100_000, t0());

        catalog.refresh(t0() + Duration::hours(2)).unwrap();
        let tracker = catalog.get("NOAA 19").unwrap();
        assert_eq!(tracker.frequency_hz(), Some(137_100_000));
        assert_eq!(tracker.elements().loaded_at, t0() + Duration::hours(2));
    }
}
