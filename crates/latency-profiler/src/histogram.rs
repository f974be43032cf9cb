use hdrhistogram::Histogram as HdrHistogram;
use std::time::Duration;
use serde::{Deserialize, Serialize};

const SIGNIFICANT_DIGITS: u8 = 3;

/// Auto-resizing HDR histogram of nanosecond latencies.
#[derive(Debug, Clone)]
pub struct Histogram {
    inner: HdrHistogram<u64>,
}

impl Histogram {
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: HdrHistogram::<u64>::new(SIGNIFICANT_DIGITS)
                .expect("3 significant digits is always a valid histogram precision"),
        }
    }

    #[inline]
    pub fn record(&mut self, value: u64) {
        // Auto-resize only fails on overflow of u64 bucket counts.
        let _ = self.inner.record(value);
    }

    #[inline]
    pub fn record_duration(&mut self, duration: Duration) {
        self.record(duration.as_nanos() as u64);
    }

    #[inline]
    pub fn percentile(&self, percentile: f64) -> u64 {
        self.inner.value_at_percentile(percentile)
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn percentiles(&self) -> HistogramPercentiles {
        HistogramPercentiles {
            p50: self.percentile(50.0),
            p90: self.percentile(90.0),
            p95: self.percentile(95.0),
            p99: self.percentile(99.0),
        }
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Percentiles in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramPercentiles {
    pub p50: u64,
    pub p90: u64,
    pub p95: u64,
    pub p99: u64,
}
