//! Reference data read once at startup: the instrument list and the
//! historical price series shown before live samples exist.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chart::{ChartSeries, PriceSample};

/// One entry of the instrument selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
}

/// Loads the instrument list from a JSON array of `{name}` records.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_instruments(path: &Path) -> crate::Result<Vec<Instrument>> {
    let contents = std::fs::read_to_string(path)?;
    let instruments: Vec<Instrument> = serde_json::from_str(&contents)?;
    info!(count = instruments.len(), path = %path.display(), "Loaded instrument list");
    Ok(instruments)
}

/// Historical series keyed by instrument name.
#[derive(Debug, Clone, Default)]
pub struct HistoricalSeries {
    series: HashMap<String, ChartSeries>,
}

impl HistoricalSeries {
    /// Parses a JSON object mapping instrument names to `[{time, value}]`.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::Json`](crate::BookwatchError::Json) for
    /// malformed input and
    /// [`BookwatchError::OrderingViolation`](crate::BookwatchError::OrderingViolation)
    /// if any series is not strictly increasing in time.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        let raw: HashMap<String, Vec<PriceSample>> = serde_json::from_str(json)?;
        let series = raw
            .into_iter()
            .map(|(name, samples)| Ok((name, ChartSeries::from_samples(samples)?)))
            .collect::<crate::Result<HashMap<_, _>>>()?;
        Ok(Self { series })
    }

    /// Loads the historical series from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are
    /// rejected by [`HistoricalSeries::from_json`].
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let history = Self::from_json(&contents)?;
        info!(
            instruments = history.series.len(),
            path = %path.display(),
            "Loaded historical series"
        );
        Ok(history)
    }

    /// Returns the stored series for an instrument.
    #[must_use]
    pub fn for_instrument(&self, name: &str) -> Option<&ChartSeries> {
        self.series.get(name)
    }
}
