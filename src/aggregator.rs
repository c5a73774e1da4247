//! Last-traded-price bucketing.
//!
//! [`PriceAggregator`] turns an irregular stream of LTP values into one
//! chart sample per bucket. Values are pushed with [`PriceAggregator::ingest`]
//! whenever a book snapshot arrives; [`PriceAggregator::tick`] is called on
//! an independent clock and emits a sample once a full bucket has elapsed
//! since the previous emission.
//!
//! A bucket in which no trade arrived repeats the last known price, so the
//! chart never has gaps once the first value has been seen. A value that did
//! arrive inside the bucket always wins over the carried-forward one.

use std::time::Duration;

use tracing::{debug, warn};

use crate::Result;
use crate::chart::{ChartSeries, PriceSample};
use crate::config::MIN_BUCKET_MS;

/// Buffers LTP values and emits bucketed samples into its own series.
#[derive(Debug, Clone)]
pub struct PriceAggregator {
    bucket_width_ms: u64,
    /// Latest value received since the last emission.
    buffered: Option<f64>,
    /// Latest value ever received.
    last_known: Option<f64>,
    /// Unix millis of the last emission (creation time before the first).
    bucket_start_ms: u64,
    series: ChartSeries,
}

impl PriceAggregator {
    /// Creates an aggregator whose first bucket starts at `started_at_ms`.
    ///
    /// Bucket widths under one second are raised to one second.
    #[must_use]
    pub fn new(bucket_width: Duration, started_at_ms: u64) -> Self {
        let bucket_width_ms = u64::try_from(bucket_width.as_millis())
            .unwrap_or(u64::MAX)
            .max(MIN_BUCKET_MS);
        Self {
            bucket_width_ms,
            buffered: None,
            last_known: None,
            bucket_start_ms: started_at_ms,
            series: ChartSeries::new(),
        }
    }

    /// Records a new last traded price.
    pub fn ingest(&mut self, value: f64) {
        if !value.is_finite() {
            warn!(value, "Ignoring non-finite last traded price");
            return;
        }
        self.buffered = Some(value);
        self.last_known = Some(value);
    }

    /// Emits a sample if a full bucket has elapsed since the last emission.
    ///
    /// Returns `Ok(None)` when the bucket is still open or no value has ever
    /// been ingested; in the latter case the bucket start is left where it
    /// is, so the first value is emitted on the next check.
    ///
    /// # Errors
    ///
    /// Returns [`BookwatchError::OrderingViolation`](crate::BookwatchError::OrderingViolation)
    /// if the emission would not advance the series; the aggregator state is
    /// left untouched in that case.
    pub fn tick(&mut self, now_ms: u64) -> Result<Option<PriceSample>> {
        if now_ms.saturating_sub(self.bucket_start_ms) < self.bucket_width_ms {
            return Ok(None);
        }

        let Some(value) = self.buffered.or(self.last_known) else {
            return Ok(None);
        };

        let timestamp = i64::try_from(now_ms / 1_000).unwrap_or(i64::MAX);
        let sample = PriceSample::new(timestamp, value);
        self.series.append(sample)?;

        self.buffered = None;
        self.last_known = Some(value);
        self.bucket_start_ms = now_ms;
        debug!(timestamp, value, "Emitted chart sample");

        Ok(Some(sample))
    }

    /// Samples emitted so far.
    #[must_use]
    pub fn series(&self) -> &ChartSeries {
        &self.series
    }

    #[must_use]
    pub fn last_known(&self) -> Option<f64> {
        self.last_known
    }
}
