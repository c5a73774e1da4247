//! Chart sample series.
//!
//! A [`ChartSeries`] only ever grows at the end and its timestamps are
//! strictly increasing. The check happens on every append, so an invalid
//! series can never be built.

use serde::{Deserialize, Serialize};

use crate::{BookwatchError, Result};

/// One chart point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    /// Unix epoch seconds.
    #[serde(rename = "time")]
    pub timestamp: i64,
    pub value: f64,
}

impl PriceSample {
    #[must_use]
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Append-only sequence of samples ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    samples: Vec<PriceSample>,
}

impl ChartSeries {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from existing samples, checking their order.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::OrderingViolation`] at the first sample
    /// that does not follow its predecessor.
    pub fn from_samples(samples: Vec<PriceSample>) -> Result<Self> {
        let mut series = Self {
            samples: Vec::with_capacity(samples.len()),
        };
        for sample in samples {
            series.append(sample)?;
        }
        Ok(series)
    }

    /// Appends a sample to the end of the series.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::OrderingViolation`] if the sample's
    /// timestamp is not strictly greater than the last one. The series is
    /// left unchanged.
    pub fn append(&mut self, sample: PriceSample) -> Result<()> {
        if let Some(last) = self.samples.last()
            && sample.timestamp <= last.timestamp
        {
            return Err(BookwatchError::OrderingViolation {
                last: last.timestamp,
                attempted: sample.timestamp,
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    #[must_use]
    pub fn samples(&self) -> &[PriceSample] {
        &self.samples
    }

    /// The most recent `n` samples (all of them if fewer exist).
    #[must_use]
    pub fn tail(&self, n: usize) -> &[PriceSample] {
        let start = self.samples.len().saturating_sub(n);
        &self.samples[start..]
    }

    #[must_use]
    pub fn last(&self) -> Option<&PriceSample> {
        self.samples.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Picks what the chart should draw: live samples once any exist, the
/// historical fallback until then.
#[must_use]
pub fn display_series<'a>(
    live: &'a [PriceSample],
    fallback: Option<&'a ChartSeries>,
) -> &'a [PriceSample] {
    match fallback {
        Some(history) if live.is_empty() => history.samples(),
        _ => live,
    }
}
