//! # Camera profiling
//!
//! Instrumentation for camera capture pipelines:
//! - Scoped latency guards for device lifecycle events
//! - First-frame and per-request reprocessing latency
//! - Per-stream frame-rate tracking
//! - Lazily created, eagerly retired profilers per camera

pub mod config;
pub mod pipeline;

pub use aidl_profiler;
pub use latency_profiler;

pub use aidl_profiler::{AidlProfiler, EventType, ProfilingFlags, ScopedProfiler};
pub use config::PipelineConfig;
pub use pipeline::CameraPipeline;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
