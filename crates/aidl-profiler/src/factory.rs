use latency_profiler::{LatencyProfiler, Profiler, ProfilerOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::event::ProfilerCategory;
use crate::flags::{PRINT_FPS_PER_INTERVAL_BIT, STOPWATCH_BIT};

/// Builds the default profiler for a category when no custom one is given.
pub trait ProfilerFactory: Send + Sync {
    fn create_profiler(
        &self,
        category: ProfilerCategory,
        camera_id: u32,
        flag: i32,
        fps_print_interval: Duration,
    ) -> Arc<dyn Profiler>;
}

impl<F> ProfilerFactory for F
where
    F: Fn(ProfilerCategory, u32, i32, Duration) -> Arc<dyn Profiler> + Send + Sync,
{
    fn create_profiler(
        &self,
        category: ProfilerCategory,
        camera_id: u32,
        flag: i32,
        fps_print_interval: Duration,
    ) -> Arc<dyn Profiler> {
        self(category, camera_id, flag, fps_print_interval)
    }
}

/// Creates [`LatencyProfiler`]s configured from the category flag bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProfilerFactory;

impl ProfilerFactory for DefaultProfilerFactory {
    fn create_profiler(
        &self,
        category: ProfilerCategory,
        camera_id: u32,
        flag: i32,
        fps_print_interval: Duration,
    ) -> Arc<dyn Profiler> {
        let print_fps = flag & PRINT_FPS_PER_INTERVAL_BIT != 0 && !fps_print_interval.is_zero();
        let options = ProfilerOptions::new(format!("camera{}/{}", camera_id, category))
            .with_stopwatch(flag & STOPWATCH_BIT != 0)
            .with_fps_print_interval(print_fps.then_some(fps_print_interval));

        Arc::new(LatencyProfiler::with_options(options))
    }
}
