use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Running latency statistics for a single measurement name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyMetrics {
    count: u64,
    sum_ns: u64,
    min_ns: u64,
    max_ns: u64,
    sum_squared_ns: u128,
}

impl LatencyMetrics {
    #[inline]
    pub fn new() -> Self {
        Self {
            count: 0,
            sum_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            sum_squared_ns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, latency: Duration) {
        let ns = latency.as_nanos() as u64;

        self.count += 1;
        self.sum_ns = self.sum_ns.saturating_add(ns);
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.sum_squared_ns += u128::from(ns) * u128::from(ns);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn sum(&self) -> Duration {
        Duration::from_nanos(self.sum_ns)
    }

    #[inline]
    pub fn min(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.min_ns)
        }
    }

    #[inline]
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns)
    }

    #[inline]
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.sum_ns / self.count)
        }
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            0.0
        } else {
            let mean = self.sum_ns as f64 / self.count as f64;
            let sum_squared = self.sum_squared_ns as f64;
            let count = self.count as f64;

            (sum_squared / count - mean * mean).max(0.0)
        }
    }

    #[inline]
    pub fn std_dev(&self) -> Duration {
        Duration::from_nanos(self.variance().sqrt() as u64)
    }
}

impl Default for LatencyMetrics {
    fn default() -> Self {
        Self::new()
    }
}
