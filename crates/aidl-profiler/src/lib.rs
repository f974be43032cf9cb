//! Per-camera profiling orchestration.
//!
//! An [`AidlProfiler`] owns one profiler per [`ProfilerCategory`], creates
//! them lazily when a pipeline hook first needs one, and retires them once
//! nothing of that category is in flight. [`ScopedProfiler`] guards measure
//! a unit of work for exactly as long as they live.

pub mod event;
pub mod factory;
pub mod flags;
pub mod orchestrator;
pub mod scoped;

pub use event::{EventType, ProfilerCategory, FIRST_FRAME, REPROCESSING};
pub use factory::{DefaultProfilerFactory, ProfilerFactory};
pub use flags::{global_flags, set_global_flags, FlagsError, ProfilingFlags};
pub use orchestrator::{
    create, create_with_factory, create_with_flags, AidlProfiler, AidlProfilerImpl, DisabledAidlProfiler,
};
pub use scoped::{EndCallback, ScopedProfiler};

pub use latency_profiler::{Profiler, ProfileReport};
