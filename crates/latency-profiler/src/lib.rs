pub mod profiler;
pub mod metrics;
pub mod histogram;
pub mod frame_rate;
pub mod report;
pub mod recording;

pub use profiler::{LatencyProfiler, Profiler, ProfilerOptions};
pub use crate::metrics::LatencyMetrics;
pub use histogram::{Histogram, HistogramPercentiles};
pub use frame_rate::FrameRateTracker;
pub use report::{format_duration_ns, FrameRateSummary, LatencySummary, ProfileReport, ProfilerError};
pub use recording::{ProfilerCall, RecordingProfiler};
