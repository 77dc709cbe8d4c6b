use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::error::CatalogError;
use super::ElementSet;

/// Parse newline-delimited TLE text into element sets.
///
/// The stream is strict three-line groups: name, element line 1, element
/// line 2. Filtered-out names still consume their two element lines (without
/// parsing them) so the stream stays aligned. A truncated tail ends the run,
/// keeping whatever was parsed before it.
pub fn parse_catalog(
    text: &str,
    filter: Option<&HashSet<String>>,
    loaded_at: DateTime<Utc>,
) -> Result<Vec<ElementSet>, CatalogError> {
    let mut lines = text.lines();
    let mut sets = Vec::new();

    loop {
        let name = match lines.next() {
            Some(line) => line.trim_end(),
            None => break,
        };
        if name.is_empty() {
            break;
        }

        if filter.is_some_and(|f| !f.contains(name)) {
            if lines.next().is_none() || lines.next().is_none() {
                break;
            }
            continue;
        }

        let (Some(line1), Some(line2)) = (lines.next(), lines.next()) else {
            break;
        };
        sets.push(ElementSet::parse(name, line1.trim(), line2.trim(), loaded_at)?);
    }

    Ok(sets)
}
