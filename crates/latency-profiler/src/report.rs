use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::frame_rate::FrameRateTracker;
use crate::histogram::{Histogram, HistogramPercentiles};
use crate::metrics::LatencyMetrics;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("I/O error writing profile report: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error writing profile report: {0}")]
    Csv(#[from] csv::Error),
}

/// Latency summary for one measurement name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySummary {
    pub name: String,
    pub count: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub mean_ns: u64,
    pub std_dev_ns: u64,
    pub percentiles: HistogramPercentiles,
}

impl LatencySummary {
    pub fn from_parts(name: &str, metrics: &LatencyMetrics, histogram: Option<&Histogram>) -> Self {
        Self {
            name: name.to_owned(),
            count: metrics.count(),
            min_ns: metrics.min().as_nanos() as u64,
            max_ns: metrics.max().as_nanos() as u64,
            mean_ns: metrics.mean().as_nanos() as u64,
            std_dev_ns: metrics.std_dev().as_nanos() as u64,
            percentiles: histogram.map(Histogram::percentiles).unwrap_or_default(),
        }
    }
}

/// Frame-rate summary for one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRateSummary {
    pub stream: String,
    pub frames: u64,
    pub fps: f64,
    pub min_interval_ns: u64,
    pub max_interval_ns: u64,
    pub mean_interval_ns: u64,
}

impl FrameRateSummary {
    pub fn from_tracker(stream: &str, tracker: &FrameRateTracker) -> Self {
        let intervals = tracker.intervals();
        Self {
            stream: stream.to_owned(),
            frames: tracker.frames(),
            fps: tracker.fps(),
            min_interval_ns: intervals.min().as_nanos() as u64,
            max_interval_ns: intervals.max().as_nanos() as u64,
            mean_interval_ns: intervals.mean().as_nanos() as u64,
        }
    }
}

/// Point-in-time snapshot of everything a profiler has recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub label: String,
    pub generated_at: DateTime<Utc>,
    pub latencies: Vec<LatencySummary>,
    pub frame_rates: Vec<FrameRateSummary>,
    /// Measurements started but not yet ended at snapshot time.
    pub open_measurements: usize,
    pub unmatched_ends: u64,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    kind: &'static str,
    name: &'a str,
    count: u64,
    min_ns: u64,
    max_ns: u64,
    mean_ns: u64,
    p50_ns: u64,
    p95_ns: u64,
    p99_ns: u64,
    fps: f64,
}

impl ProfileReport {
    pub fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            generated_at: Utc::now(),
            latencies: Vec::new(),
            frame_rates: Vec::new(),
            open_measurements: 0,
            unmatched_ends: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty() && self.frame_rates.is_empty()
    }

    pub fn latency(&self, name: &str) -> Option<&LatencySummary> {
        self.latencies.iter().find(|l| l.name == name)
    }

    pub fn frame_rate(&self, stream: &str) -> Option<&FrameRateSummary> {
        self.frame_rates.iter().find(|f| f.stream == stream)
    }

    /// Writes one CSV row per latency name and per stream.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        let mut writer = csv::Writer::from_path(path)?;

        for latency in &self.latencies {
            writer.serialize(CsvRow {
                kind: "latency",
                name: &latency.name,
                count: latency.count,
                min_ns: latency.min_ns,
                max_ns: latency.max_ns,
                mean_ns: latency.mean_ns,
                p50_ns: latency.percentiles.p50,
                p95_ns: latency.percentiles.p95,
                p99_ns: latency.percentiles.p99,
                fps: 0.0,
            })?;
        }

        for stream in &self.frame_rates {
            writer.serialize(CsvRow {
                kind: "frame_rate",
                name: &stream.stream,
                count: stream.frames,
                min_ns: stream.min_interval_ns,
                max_ns: stream.max_interval_ns,
                mean_ns: stream.mean_interval_ns,
                p50_ns: 0,
                p95_ns: 0,
                p99_ns: 0,
                fps: stream.fps,
            })?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "profile report [{}] at {}", self.label, self.generated_at.to_rfc3339())?;
        for l in &self.latencies {
            writeln!(
                f,
                "  {:<24} n={:<6} min={:<10} mean={:<10} p99={:<10} max={}",
                l.name,
                l.count,
                format_duration_ns(l.min_ns),
                format_duration_ns(l.mean_ns),
                format_duration_ns(l.percentiles.p99),
                format_duration_ns(l.max_ns),
            )?;
        }
        for s in &self.frame_rates {
            writeln!(f, "  {:<24} frames={:<6} fps={:.2}", s.stream, s.frames, s.fps)?;
        }
        if self.open_measurements > 0 || self.unmatched_ends > 0 {
            writeln!(
                f,
                "  open={} unmatched_ends={}",
                self.open_measurements, self.unmatched_ends
            )?;
        }
        Ok(())
    }
}

pub fn format_duration_ns(nanos: u64) -> String {
    if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}μs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", nanos as f64 / 1_000_000_000.0)
    }
}
