use crate::metrics::LatencyMetrics;
use std::time::{Duration, Instant};

/// Per-stream frame delivery tracker.
///
/// Every call to [`FrameRateTracker::tick`] marks one delivered frame. The
/// tracker keeps the overall rate since the first frame, the distribution of
/// inter-frame intervals, and a rolling window used for periodic logging.
#[derive(Debug, Clone)]
pub struct FrameRateTracker {
    frames: u64,
    first_frame: Option<Instant>,
    last_frame: Option<Instant>,
    intervals: LatencyMetrics,
    window_start: Option<Instant>,
    window_frames: u64,
}

impl FrameRateTracker {
    pub fn new() -> Self {
        Self {
            frames: 0,
            first_frame: None,
            last_frame: None,
            intervals: LatencyMetrics::new(),
            window_start: None,
            window_frames: 0,
        }
    }

    /// Records a frame delivered at `now`.
    ///
    /// Returns the fps of the just-closed window when `print_interval` is set
    /// and has elapsed since the window opened.
    pub fn tick(&mut self, now: Instant, print_interval: Option<Duration>) -> Option<f64> {
        if let Some(last) = self.last_frame {
            self.intervals.record(now.saturating_duration_since(last));
        }
        self.first_frame.get_or_insert(now);
        self.last_frame = Some(now);
        self.frames += 1;

        let window_start = *self.window_start.get_or_insert(now);
        self.window_frames += 1;

        let interval = print_interval?;
        let elapsed = now.saturating_duration_since(window_start);
        if elapsed < interval || elapsed.is_zero() {
            return None;
        }

        // The frame that closes a window also opens the next one.
        let fps = (self.window_frames - 1) as f64 / elapsed.as_secs_f64();
        self.window_start = Some(now);
        self.window_frames = 1;
        Some(fps)
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn intervals(&self) -> &LatencyMetrics {
        &self.intervals
    }

    pub fn elapsed(&self) -> Duration {
        match (self.first_frame, self.last_frame) {
            (Some(first), Some(last)) => last.saturating_duration_since(first),
            _ => Duration::ZERO,
        }
    }

    /// Average frames per second between the first and last frame.
    pub fn fps(&self) -> f64 {
        let elapsed = self.elapsed();
        if self.frames < 2 || elapsed.is_zero() {
            0.0
        } else {
            (self.frames - 1) as f64 / elapsed.as_secs_f64()
        }
    }
}

impl Default for FrameRateTracker {
    fn default() -> Self {
        Self::new()
    }
}
