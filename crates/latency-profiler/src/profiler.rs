use crate::frame_rate::FrameRateTracker;
use crate::histogram::Histogram;
use crate::metrics::LatencyMetrics;
use crate::report::{format_duration_ns, FrameRateSummary, LatencySummary, ProfileReport};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A measurement strategy.
///
/// Implementations must tolerate concurrent calls for different `(name, id)`
/// keys, repeated starts for the same key, and ends with no matching start.
pub trait Profiler: Send + Sync {
    /// Opens a measurement for `(name, id)`.
    fn start(&self, name: &str, id: i32);

    /// Closes the most recent open measurement for `(name, id)`.
    fn end(&self, name: &str, id: i32);

    /// Marks one frame delivered on `stream`.
    fn profile_frame_rate(&self, stream: &str);

    /// Snapshots everything recorded so far.
    fn report(&self) -> ProfileReport;
}

impl<P: Profiler + ?Sized> Profiler for Arc<P> {
    fn start(&self, name: &str, id: i32) {
        (**self).start(name, id)
    }

    fn end(&self, name: &str, id: i32) {
        (**self).end(name, id)
    }

    fn profile_frame_rate(&self, stream: &str) {
        (**self).profile_frame_rate(stream)
    }

    fn report(&self) -> ProfileReport {
        (**self).report()
    }
}

impl<P: Profiler + ?Sized> Profiler for Box<P> {
    fn start(&self, name: &str, id: i32) {
        (**self).start(name, id)
    }

    fn end(&self, name: &str, id: i32) {
        (**self).end(name, id)
    }

    fn profile_frame_rate(&self, stream: &str) {
        (**self).profile_frame_rate(stream)
    }

    fn report(&self) -> ProfileReport {
        (**self).report()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfilerOptions {
    /// Tag carried into reports and log lines.
    pub label: String,
    /// Log every completed measurement as it ends.
    pub stopwatch: bool,
    /// Log per-stream fps each time this much time has passed.
    pub fps_print_interval: Option<Duration>,
}

impl ProfilerOptions {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_stopwatch(mut self, stopwatch: bool) -> Self {
        self.stopwatch = stopwatch;
        self
    }

    pub fn with_fps_print_interval(mut self, interval: Option<Duration>) -> Self {
        self.fps_print_interval = interval;
        self
    }
}

/// Default [`Profiler`]: wall-clock latencies per measurement name plus
/// per-stream frame-rate tracking.
#[derive(Debug)]
pub struct LatencyProfiler {
    options: ProfilerOptions,
    active: Mutex<HashMap<(String, i32), Vec<Instant>>>,
    measurements: RwLock<HashMap<String, LatencyMetrics>>,
    histograms: RwLock<HashMap<String, Histogram>>,
    frame_rates: Mutex<HashMap<String, FrameRateTracker>>,
    unmatched_ends: AtomicU64,
}

impl LatencyProfiler {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_options(ProfilerOptions::new(label))
    }

    pub fn with_options(options: ProfilerOptions) -> Self {
        Self {
            options,
            active: Mutex::new(HashMap::new()),
            measurements: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            frame_rates: Mutex::new(HashMap::new()),
            unmatched_ends: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.options.label
    }

    pub fn record_latency(&self, name: &str, latency: Duration) {
        let ns = latency.as_nanos() as u64;

        {
            let mut measurements = self.measurements.write();
            match measurements.get_mut(name) {
                Some(metrics) => metrics.record(latency),
                None => {
                    let mut metrics = LatencyMetrics::new();
                    metrics.record(latency);
                    measurements.insert(name.to_owned(), metrics);
                }
            }
        }
        self.histograms
            .write()
            .entry(name.to_owned())
            .or_default()
            .record(ns);

        metrics::histogram!("camera_profiler_latency_ns", "event" => name.to_owned())
            .record(ns as f64);

        if self.options.stopwatch {
            tracing::info!(
                "[{}] {} took {}",
                self.options.label,
                name,
                format_duration_ns(ns)
            );
        }
    }

    pub fn metrics(&self, name: &str) -> Option<LatencyMetrics> {
        self.measurements.read().get(name).cloned()
    }

    pub fn open_measurements(&self) -> usize {
        self.active.lock().values().map(Vec::len).sum()
    }

    pub fn unmatched_ends(&self) -> u64 {
        self.unmatched_ends.load(Ordering::Relaxed)
    }

}

impl Profiler for LatencyProfiler {
    #[inline]
    fn start(&self, name: &str, id: i32) {
        let now = Instant::now();
        self.active
            .lock()
            .entry((name.to_owned(), id))
            .or_default()
            .push(now);
    }

    fn end(&self, name: &str, id: i32) {
        let now = Instant::now();
        let started = {
            let mut active = self.active.lock();
            let key = (name.to_owned(), id);
            let started = active.get_mut(&key).and_then(Vec::pop);
            if active.get(&key).is_some_and(Vec::is_empty) {
                active.remove(&key);
            }
            started
        };

        match started {
            Some(start) => self.record_latency(name, now.saturating_duration_since(start)),
            None => {
                self.unmatched_ends.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("camera_profiler_unmatched_ends_total").increment(1);
                tracing::debug!("[{}] end for {}#{} without start", self.options.label, name, id);
            }
        }
    }

    fn profile_frame_rate(&self, stream: &str) {
        let now = Instant::now();
        let interval_fps = {
            let mut frame_rates = self.frame_rates.lock();
            match frame_rates.get_mut(stream) {
                Some(tracker) => tracker.tick(now, self.options.fps_print_interval),
                None => {
                    let mut tracker = FrameRateTracker::new();
                    let fps = tracker.tick(now, self.options.fps_print_interval);
                    frame_rates.insert(stream.to_owned(), tracker);
                    fps
                }
            }
        };

        if let Some(fps) = interval_fps {
            tracing::info!("[{}] {} fps {:.2}", self.options.label, stream, fps);
        }
    }

    fn report(&self) -> ProfileReport {
        let mut latencies: Vec<LatencySummary> = {
            let measurements = self.measurements.read();
            let histograms = self.histograms.read();
            measurements
                .iter()
                .map(|(name, metrics)| LatencySummary::from_parts(name, metrics, histograms.get(name)))
                .collect()
        };
        latencies.sort_by(|a, b| a.name.cmp(&b.name));

        let mut frame_rates: Vec<FrameRateSummary> = self
            .frame_rates
            .lock()
            .iter()
            .map(|(stream, tracker)| FrameRateSummary::from_tracker(stream, tracker))
            .collect();
        frame_rates.sort_by(|a, b| a.stream.cmp(&b.stream));

        let mut report = ProfileReport::empty(self.options.label.clone());
        report.latencies = latencies;
        report.frame_rates = frame_rates;
        report.open_measurements = self.open_measurements();
        report.unmatched_ends = self.unmatched_ends();
        report
    }
}
