//! Shared helpers for integration tests

#![allow(dead_code)]

use aidl_profiler::{AidlProfilerImpl, ProfilerCategory, ProfilerFactory, ProfilingFlags};
use latency_profiler::{Profiler, RecordingProfiler};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Hands out a fresh [`RecordingProfiler`] per request and keeps them all.
#[derive(Default)]
pub struct RecordingFactory {
    created: Mutex<Vec<(ProfilerCategory, Arc<RecordingProfiler>)>>,
}

impl RecordingFactory {
    pub fn created(&self, category: ProfilerCategory) -> Vec<Arc<RecordingProfiler>> {
        self.created
            .lock()
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, p)| Arc::clone(p))
            .collect()
    }

    pub fn total_created(&self) -> usize {
        self.created.lock().len()
    }

    pub fn total_calls(&self) -> usize {
        self.created.lock().iter().map(|(_, p)| p.call_count()).sum()
    }
}

impl ProfilerFactory for RecordingFactory {
    fn create_profiler(
        &self,
        category: ProfilerCategory,
        _camera_id: u32,
        _flag: i32,
        _fps_print_interval: Duration,
    ) -> Arc<dyn Profiler> {
        let profiler = Arc::new(RecordingProfiler::new(category.as_str()));
        self.created.lock().push((category, Arc::clone(&profiler)));
        profiler
    }
}

pub fn all_enabled() -> ProfilingFlags {
    ProfilingFlags {
        latency: aidl_profiler::flags::PRINT_BIT,
        fps: aidl_profiler::flags::PRINT_BIT,
        reprocess_latency: aidl_profiler::flags::PRINT_BIT,
        ..ProfilingFlags::default()
    }
}

pub fn recording_orchestrator(camera_id: u32, flags: ProfilingFlags) -> (Arc<AidlProfilerImpl>, Arc<RecordingFactory>) {
    let factory = Arc::new(RecordingFactory::default());
    let profiler = Arc::new(AidlProfilerImpl::new(camera_id, flags, factory.clone()));
    (profiler, factory)
}
