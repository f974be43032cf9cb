use chrono::Utc;
use latency_profiler::Profiler;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::event::{EventType, ProfilerCategory, FIRST_FRAME, REPROCESSING};
use crate::factory::{DefaultProfilerFactory, ProfilerFactory};
use crate::flags::{self, ProfilingFlags, DUMP_BIT, PRINT_BIT};
use crate::scoped::{EndCallback, ScopedProfiler};

const DUMP_FILE_PREFIX: &str = "aidl_hal_";

/// Per-camera profiling coordinator.
///
/// All hooks are fire-and-forget: they never fail and never block on
/// anything but a short internal critical section. Misuse (an end without a
/// start, a second first-frame start) is logged and ignored.
pub trait AidlProfiler: Send + Sync {
    /// Returns a guard measuring `event_type` until it is dropped.
    ///
    /// Custom profilers are adopted only if the matching slot is empty;
    /// `custom_fps` is considered for [`EventType::ConfigureStream`] only.
    fn make_scoped_profiler(
        &self,
        event_type: EventType,
        custom_latency_profiler: Option<Box<dyn Profiler>>,
        custom_fps_profiler: Option<Box<dyn Profiler>>,
    ) -> ScopedProfiler;

    /// Call before the first capture request is submitted.
    fn first_frame_start(&self);

    /// Call once every buffer of the first frame has been received.
    fn first_frame_end(&self);

    /// Call before a reprocess request with `id` is sent.
    fn reprocessing_request_start(&self, custom_reprocessing_profiler: Option<Box<dyn Profiler>>, id: i32);

    /// Call when the reprocess result for `id` is received.
    fn reprocessing_result_end(&self, id: i32);

    /// Call after each frame delivered on stream `name`.
    fn profile_frame_rate(&self, name: &str);

    fn camera_id(&self) -> u32;
    fn latency_flag(&self) -> i32;
    fn fps_flag(&self) -> i32;
    fn reprocess_latency_flag(&self) -> i32;
}

/// Creates the orchestrator for `camera_id` from the process-wide flags.
pub fn create(camera_id: u32) -> Arc<dyn AidlProfiler> {
    create_with_flags(camera_id, flags::global_flags())
}

pub fn create_with_flags(camera_id: u32, flags: ProfilingFlags) -> Arc<dyn AidlProfiler> {
    create_with_factory(camera_id, flags, Arc::new(DefaultProfilerFactory))
}

pub fn create_with_factory(
    camera_id: u32,
    flags: ProfilingFlags,
    factory: Arc<dyn ProfilerFactory>,
) -> Arc<dyn AidlProfiler> {
    if !flags.any_enabled() {
        debug!("profiling disabled for camera {}", camera_id);
        return Arc::new(DisabledAidlProfiler::new(camera_id, flags));
    }
    Arc::new(AidlProfilerImpl::new(camera_id, flags, factory))
}

/// Stand-in used when every profiling category is off. Every hook is a
/// no-op and nothing is ever allocated.
#[derive(Debug, Clone)]
pub struct DisabledAidlProfiler {
    camera_id: u32,
    flags: ProfilingFlags,
}

impl DisabledAidlProfiler {
    pub fn new(camera_id: u32, flags: ProfilingFlags) -> Self {
        Self { camera_id, flags }
    }
}

impl AidlProfiler for DisabledAidlProfiler {
    fn make_scoped_profiler(
        &self,
        event_type: EventType,
        _custom_latency_profiler: Option<Box<dyn Profiler>>,
        _custom_fps_profiler: Option<Box<dyn Profiler>>,
    ) -> ScopedProfiler {
        ScopedProfiler::disabled(event_type.as_str(), 0)
    }

    fn first_frame_start(&self) {}

    fn first_frame_end(&self) {}

    fn reprocessing_request_start(&self, _custom_reprocessing_profiler: Option<Box<dyn Profiler>>, _id: i32) {}

    fn reprocessing_result_end(&self, _id: i32) {}

    fn profile_frame_rate(&self, _name: &str) {}

    fn camera_id(&self) -> u32 {
        self.camera_id
    }

    fn latency_flag(&self) -> i32 {
        self.flags.latency
    }

    fn fps_flag(&self) -> i32 {
        self.flags.fps
    }

    fn reprocess_latency_flag(&self) -> i32 {
        self.flags.reprocess_latency
    }
}

#[derive(Default)]
struct State {
    latency: Option<Arc<dyn Profiler>>,
    // Live scoped guards plus an open first frame.
    latency_in_flight: usize,
    fps: Option<Arc<dyn Profiler>>,
    reprocessing: Option<Arc<dyn Profiler>>,
    // id -> nesting depth
    reprocessing_in_flight: HashMap<i32, u32>,
    first_frame: Option<i32>,
    first_frame_count: i32,
    event_counts: [i32; EventType::ALL.len()],
}

impl State {
    fn slot(&mut self, category: ProfilerCategory) -> &mut Option<Arc<dyn Profiler>> {
        match category {
            ProfilerCategory::Latency => &mut self.latency,
            ProfilerCategory::Reprocessing => &mut self.reprocessing,
            ProfilerCategory::FrameRate => &mut self.fps,
        }
    }

    fn next_event_id(&mut self, event_type: EventType) -> i32 {
        let count = &mut self.event_counts[event_type.index()];
        let id = *count;
        *count = count.wrapping_add(1);
        id
    }

    fn release_latency(&mut self) -> Option<Arc<dyn Profiler>> {
        self.latency_in_flight = self.latency_in_flight.saturating_sub(1);
        if self.latency_in_flight == 0 {
            self.latency.take()
        } else {
            None
        }
    }
}

struct Inner {
    camera_id: u32,
    flags: ProfilingFlags,
    factory: Arc<dyn ProfilerFactory>,
    state: Mutex<State>,
    /// Keeps dump file names unique when retirements share a timestamp.
    dump_seq: AtomicU64,
}

impl Inner {
    /// Returns the profiler in `category`'s slot, filling an empty slot with
    /// `custom` or, failing that, a factory-built default.
    fn acquire(
        &self,
        state: &mut State,
        category: ProfilerCategory,
        custom: Option<Box<dyn Profiler>>,
    ) -> Arc<dyn Profiler> {
        let slot = state.slot(category);
        if let Some(existing) = slot.as_ref() {
            if custom.is_some() {
                debug!(
                    "camera {}: {} profiler in use, custom profiler ignored",
                    self.camera_id, category
                );
            }
            return Arc::clone(existing);
        }

        let profiler: Arc<dyn Profiler> = match custom {
            Some(custom) => Arc::from(custom),
            None => self.factory.create_profiler(
                category,
                self.camera_id,
                self.flags.flag(category),
                self.flags.fps_print_interval(),
            ),
        };
        debug!("camera {}: {} profiler created", self.camera_id, category);
        *slot = Some(Arc::clone(&profiler));
        profiler
    }

    fn on_scoped_end(&self, event_type: EventType, counted: bool) {
        let mut retired = Vec::new();
        {
            let mut state = self.state.lock();
            if counted {
                if let Some(profiler) = state.release_latency() {
                    retired.push((ProfilerCategory::Latency, profiler));
                }
            }
            if event_type == EventType::Close {
                if let Some(profiler) = state.fps.take() {
                    retired.push((ProfilerCategory::FrameRate, profiler));
                }
            }
        }
        for (category, profiler) in retired {
            self.retire(category, profiler);
        }
    }

    /// Final bookkeeping for a profiler leaving its slot.
    fn retire(&self, category: ProfilerCategory, profiler: Arc<dyn Profiler>) {
        let flag = self.flags.flag(category);
        debug!("camera {}: {} profiler released", self.camera_id, category);
        if flag & (PRINT_BIT | DUMP_BIT) == 0 {
            return;
        }

        let report = profiler.report();
        if flag & PRINT_BIT != 0 {
            info!("camera {} {} {}", self.camera_id, category, report);
        }
        if flag & DUMP_BIT != 0 {
            let file_name = format!(
                "{}{}_{}_{}_{}.csv",
                DUMP_FILE_PREFIX,
                self.camera_id,
                category,
                Utc::now().format("%Y%m%d_%H%M%S%.3f"),
                self.dump_seq.fetch_add(1, Ordering::Relaxed)
            );
            let path = self.flags.dump_dir.join(file_name);
            if let Err(e) = report.write_csv(&path) {
                warn!("camera {}: failed to dump {} report to {}: {}", self.camera_id, category, path.display(), e);
            }
        }
    }
}

/// The active orchestrator.
pub struct AidlProfilerImpl {
    inner: Arc<Inner>,
}

impl AidlProfilerImpl {
    pub fn new(camera_id: u32, flags: ProfilingFlags, factory: Arc<dyn ProfilerFactory>) -> Self {
        info!(
            "camera {}: profiling latency={:#x} fps={:#x} reprocess={:#x}",
            camera_id, flags.latency, flags.fps, flags.reprocess_latency
        );
        Self {
            inner: Arc::new(Inner {
                camera_id,
                flags,
                factory,
                state: Mutex::new(State::default()),
                dump_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Whether `category`'s slot currently holds a profiler.
    pub fn has_profiler(&self, category: ProfilerCategory) -> bool {
        self.inner.state.lock().slot(category).is_some()
    }

    /// Open reprocessing ids, ascending.
    pub fn reprocessing_in_flight(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.inner.state.lock().reprocessing_in_flight.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn latency_in_flight(&self) -> usize {
        self.inner.state.lock().latency_in_flight
    }

    fn end_callback(&self, event_type: EventType, counted: bool) -> EndCallback {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.on_scoped_end(event_type, counted);
            }
        })
    }

    #[inline]
    fn enabled(&self, category: ProfilerCategory) -> bool {
        self.inner.flags.is_enabled(category)
    }
}

impl AidlProfiler for AidlProfilerImpl {
    fn make_scoped_profiler(
        &self,
        event_type: EventType,
        custom_latency_profiler: Option<Box<dyn Profiler>>,
        custom_fps_profiler: Option<Box<dyn Profiler>>,
    ) -> ScopedProfiler {
        let mut state = self.inner.state.lock();

        if event_type == EventType::ConfigureStream && self.enabled(ProfilerCategory::FrameRate) {
            self.inner.acquire(&mut state, ProfilerCategory::FrameRate, custom_fps_profiler);
        }

        let id = state.next_event_id(event_type);
        if !self.enabled(ProfilerCategory::Latency) {
            drop(state);
            // Close still retires the fps profiler.
            let callback = (event_type == EventType::Close).then(|| self.end_callback(event_type, false));
            return ScopedProfiler::new(None, event_type.as_str(), id, callback);
        }

        let profiler = self.inner.acquire(&mut state, ProfilerCategory::Latency, custom_latency_profiler);
        state.latency_in_flight += 1;
        drop(state);

        ScopedProfiler::new(
            Some(profiler),
            event_type.as_str(),
            id,
            Some(self.end_callback(event_type, true)),
        )
    }

    fn first_frame_start(&self) {
        if !self.enabled(ProfilerCategory::Latency) {
            return;
        }

        let (profiler, id) = {
            let mut state = self.inner.state.lock();
            if let Some(open) = state.first_frame {
                debug!("camera {}: first frame #{} already started", self.inner.camera_id, open);
                return;
            }
            let profiler = self.inner.acquire(&mut state, ProfilerCategory::Latency, None);
            let id = state.first_frame_count;
            state.first_frame_count = state.first_frame_count.wrapping_add(1);
            state.first_frame = Some(id);
            state.latency_in_flight += 1;
            (profiler, id)
        };

        profiler.start(FIRST_FRAME, id);
    }

    fn first_frame_end(&self) {
        let (profiler, id, retired) = {
            let mut state = self.inner.state.lock();
            let Some(id) = state.first_frame.take() else {
                debug!("camera {}: first frame end without start", self.inner.camera_id);
                return;
            };
            let Some(profiler) = state.latency.clone() else {
                warn!("camera {}: first frame #{} open without latency profiler", self.inner.camera_id, id);
                return;
            };
            let retired = state.release_latency();
            (profiler, id, retired)
        };

        profiler.end(FIRST_FRAME, id);
        if let Some(retired) = retired {
            self.inner.retire(ProfilerCategory::Latency, retired);
        }
    }

    fn reprocessing_request_start(&self, custom_reprocessing_profiler: Option<Box<dyn Profiler>>, id: i32) {
        if !self.enabled(ProfilerCategory::Reprocessing) {
            return;
        }

        let profiler = {
            let mut state = self.inner.state.lock();
            let profiler = self.inner.acquire(&mut state, ProfilerCategory::Reprocessing, custom_reprocessing_profiler);
            *state.reprocessing_in_flight.entry(id).or_insert(0) += 1;
            profiler
        };

        profiler.start(REPROCESSING, id);
    }

    fn reprocessing_result_end(&self, id: i32) {
        let (profiler, retired) = {
            let mut state = self.inner.state.lock();
            let Some(depth) = state.reprocessing_in_flight.get_mut(&id) else {
                debug!("camera {}: reprocessing end for unknown id {}", self.inner.camera_id, id);
                return;
            };
            *depth -= 1;
            if *depth == 0 {
                state.reprocessing_in_flight.remove(&id);
            }

            let Some(profiler) = state.reprocessing.clone() else {
                warn!("camera {}: reprocessing id {} open without profiler", self.inner.camera_id, id);
                return;
            };
            let retired = if state.reprocessing_in_flight.is_empty() {
                state.reprocessing.take()
            } else {
                None
            };
            (profiler, retired)
        };

        profiler.end(REPROCESSING, id);
        if let Some(retired) = retired {
            self.inner.retire(ProfilerCategory::Reprocessing, retired);
        }
    }

    fn profile_frame_rate(&self, name: &str) {
        if !self.enabled(ProfilerCategory::FrameRate) {
            return;
        }

        let profiler = {
            let mut state = self.inner.state.lock();
            self.inner.acquire(&mut state, ProfilerCategory::FrameRate, None)
        };
        profiler.profile_frame_rate(name);
    }

    fn camera_id(&self) -> u32 {
        self.inner.camera_id
    }

    fn latency_flag(&self) -> i32 {
        self.inner.flags.latency
    }

    fn fps_flag(&self) -> i32 {
        self.inner.flags.fps
    }

    fn reprocess_latency_flag(&self) -> i32 {
        self.inner.flags.reprocess_latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latency_profiler::{ProfilerCall, RecordingProfiler};
    use parking_lot::Mutex as PlMutex;

    /// Factory handing out fresh recording profilers and remembering them.
    #[derive(Default)]
    struct RecordingFactory {
        created: PlMutex<Vec<(ProfilerCategory, Arc<RecordingProfiler>)>>,
    }

    impl RecordingFactory {
        fn created(&self, category: ProfilerCategory) -> Vec<Arc<RecordingProfiler>> {
            self.created
                .lock()
                .iter()
                .filter(|(c, _)| *c == category)
                .map(|(_, p)| Arc::clone(p))
                .collect()
        }

        fn total_calls(&self) -> usize {
            self.created.lock().iter().map(|(_, p)| p.call_count()).sum()
        }
    }

    impl ProfilerFactory for RecordingFactory {
        fn create_profiler(
            &self,
            category: ProfilerCategory,
            _camera_id: u32,
            _flag: i32,
            _fps_print_interval: std::time::Duration,
        ) -> Arc<dyn Profiler> {
            let profiler = Arc::new(RecordingProfiler::new(category.as_str()));
            self.created.lock().push((category, Arc::clone(&profiler)));
            profiler
        }
    }

    fn enabled_flags() -> ProfilingFlags {
        ProfilingFlags {
            latency: PRINT_BIT,
            fps: PRINT_BIT,
            reprocess_latency: PRINT_BIT,
            ..ProfilingFlags::default()
        }
    }

    fn orchestrator(flags: ProfilingFlags) -> (AidlProfilerImpl, Arc<RecordingFactory>) {
        let factory = Arc::new(RecordingFactory::default());
        (AidlProfilerImpl::new(1, flags, factory.clone()), factory)
    }

    #[test]
    fn test_reprocessing_scenario() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.reprocessing_request_start(None, 42);
        profiler.reprocessing_request_start(None, 43);
        assert_eq!(factory.created(ProfilerCategory::Reprocessing).len(), 1);

        profiler.reprocessing_result_end(42);
        assert_eq!(profiler.reprocessing_in_flight(), vec![43]);
        assert!(profiler.has_profiler(ProfilerCategory::Reprocessing));

        profiler.reprocessing_result_end(43);
        assert!(profiler.reprocessing_in_flight().is_empty());
        assert!(!profiler.has_profiler(ProfilerCategory::Reprocessing));

        let recording = &factory.created(ProfilerCategory::Reprocessing)[0];
        assert_eq!(
            recording.timeline(),
            vec![
                ProfilerCall::Start { name: REPROCESSING.into(), id: 42 },
                ProfilerCall::Start { name: REPROCESSING.into(), id: 43 },
                ProfilerCall::End { name: REPROCESSING.into(), id: 42 },
                ProfilerCall::End { name: REPROCESSING.into(), id: 43 },
            ]
        );
        // Retired with PRINT_BIT set.
        assert_eq!(recording.reports(), 1);
    }

    #[test]
    fn test_reprocessing_recreated_after_release() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.reprocessing_request_start(None, 1);
        profiler.reprocessing_result_end(1);
        profiler.reprocessing_request_start(None, 2);

        assert_eq!(factory.created(ProfilerCategory::Reprocessing).len(), 2);
        assert!(profiler.has_profiler(ProfilerCategory::Reprocessing));
    }

    #[test]
    fn test_unknown_reprocessing_end_is_noop() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.reprocessing_result_end(7);
        assert!(profiler.reprocessing_in_flight().is_empty());
        assert!(!profiler.has_profiler(ProfilerCategory::Reprocessing));

        profiler.reprocessing_request_start(None, 8);
        profiler.reprocessing_result_end(7);
        assert_eq!(profiler.reprocessing_in_flight(), vec![8]);
        assert!(profiler.has_profiler(ProfilerCategory::Reprocessing));
        assert_eq!(factory.created(ProfilerCategory::Reprocessing)[0].ends(), 0);
    }

    #[test]
    fn test_same_reprocessing_id_nests() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.reprocessing_request_start(None, 5);
        profiler.reprocessing_request_start(None, 5);

        profiler.reprocessing_result_end(5);
        assert_eq!(profiler.reprocessing_in_flight(), vec![5]);
        assert!(profiler.has_profiler(ProfilerCategory::Reprocessing));

        profiler.reprocessing_result_end(5);
        assert!(profiler.reprocessing_in_flight().is_empty());
        assert!(!profiler.has_profiler(ProfilerCategory::Reprocessing));

        profiler.reprocessing_result_end(5);
        let recording = &factory.created(ProfilerCategory::Reprocessing)[0];
        assert_eq!((recording.starts(), recording.ends()), (2, 2));
    }

    #[test]
    fn test_custom_reprocessing_profiler_adopted_only_when_absent() {
        let (profiler, factory) = orchestrator(enabled_flags());
        let first = Arc::new(RecordingProfiler::new("custom-1"));
        let second = Arc::new(RecordingProfiler::new("custom-2"));

        profiler.reprocessing_request_start(Some(Box::new(first.clone())), 1);
        profiler.reprocessing_request_start(Some(Box::new(second.clone())), 2);
        assert!(factory.created(ProfilerCategory::Reprocessing).is_empty());
        assert_eq!(first.starts(), 2);
        assert_eq!(second.call_count(), 0);

        profiler.reprocessing_result_end(1);
        profiler.reprocessing_result_end(2);

        profiler.reprocessing_request_start(Some(Box::new(second.clone())), 3);
        assert_eq!(second.starts(), 1);
        assert_eq!(first.starts(), 2);
    }

    #[test]
    fn test_first_frame_pair() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.first_frame_start();
        assert!(profiler.has_profiler(ProfilerCategory::Latency));
        assert_eq!(profiler.latency_in_flight(), 1);

        profiler.first_frame_end();
        assert!(!profiler.has_profiler(ProfilerCategory::Latency));
        assert_eq!(profiler.latency_in_flight(), 0);

        let recording = &factory.created(ProfilerCategory::Latency)[0];
        assert_eq!(
            recording.timeline(),
            vec![
                ProfilerCall::Start { name: FIRST_FRAME.into(), id: 0 },
                ProfilerCall::End { name: FIRST_FRAME.into(), id: 0 },
            ]
        );
    }

    #[test]
    fn test_first_frame_end_without_start() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.first_frame_end();

        assert!(factory.created(ProfilerCategory::Latency).is_empty());
        assert_eq!(profiler.latency_in_flight(), 0);
    }

    #[test]
    fn test_repeated_first_frame_start_is_ignored() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.first_frame_start();
        profiler.first_frame_start();
        profiler.first_frame_end();
        profiler.first_frame_end();

        let recording = &factory.created(ProfilerCategory::Latency)[0];
        assert_eq!((recording.starts(), recording.ends()), (1, 1));
    }

    #[test]
    fn test_scoped_profilers_share_latency_slot() {
        let (profiler, factory) = orchestrator(enabled_flags());

        let open = profiler.make_scoped_profiler(EventType::Open, None, None);
        let configure = profiler.make_scoped_profiler(EventType::ConfigureStream, None, None);
        assert_eq!(profiler.latency_in_flight(), 2);
        assert_eq!(factory.created(ProfilerCategory::Latency).len(), 1);
        assert!(profiler.has_profiler(ProfilerCategory::FrameRate));

        drop(open);
        assert!(profiler.has_profiler(ProfilerCategory::Latency));
        drop(configure);
        assert!(!profiler.has_profiler(ProfilerCategory::Latency));
        // fps survives until close
        assert!(profiler.has_profiler(ProfilerCategory::FrameRate));

        let close = profiler.make_scoped_profiler(EventType::Close, None, None);
        drop(close);
        assert!(!profiler.has_profiler(ProfilerCategory::FrameRate));
        assert_eq!(factory.created(ProfilerCategory::FrameRate)[0].reports(), 1);
    }

    #[test]
    fn test_event_ids_count_per_type() {
        let (profiler, _factory) = orchestrator(enabled_flags());

        let a = profiler.make_scoped_profiler(EventType::Flush, None, None);
        let b = profiler.make_scoped_profiler(EventType::Flush, None, None);
        let c = profiler.make_scoped_profiler(EventType::Open, None, None);

        assert_eq!((a.id(), b.id(), c.id()), (0, 1, 0));
        assert_eq!(a.name(), "Flush");
    }

    #[test]
    fn test_custom_latency_and_fps_profilers() {
        let (profiler, factory) = orchestrator(enabled_flags());
        let latency = Arc::new(RecordingProfiler::new("latency"));
        let fps = Arc::new(RecordingProfiler::new("fps"));

        let guard = profiler.make_scoped_profiler(
            EventType::ConfigureStream,
            Some(Box::new(latency.clone())),
            Some(Box::new(fps.clone())),
        );
        profiler.profile_frame_rate("preview");
        drop(guard);

        assert_eq!((latency.starts(), latency.ends()), (1, 1));
        assert_eq!(fps.frames(), 1);
        assert!(factory.created(ProfilerCategory::Latency).is_empty());
        assert!(factory.created(ProfilerCategory::FrameRate).is_empty());
    }

    #[test]
    fn test_frame_rate_uses_one_shared_profiler() {
        let (profiler, factory) = orchestrator(enabled_flags());

        profiler.profile_frame_rate("preview");
        profiler.profile_frame_rate("video");
        profiler.profile_frame_rate("preview");

        let created = factory.created(ProfilerCategory::FrameRate);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].frames(), 3);
    }

    #[test]
    fn test_latency_disabled_guard_is_noop() {
        let flags = ProfilingFlags {
            latency: 0,
            ..enabled_flags()
        };
        let (profiler, factory) = orchestrator(flags);

        let guard = profiler.make_scoped_profiler(EventType::Open, None, None);
        assert!(!guard.is_active());
        drop(guard);
        profiler.first_frame_start();
        profiler.first_frame_end();

        assert!(factory.created(ProfilerCategory::Latency).is_empty());
    }

    #[test]
    fn test_close_retires_fps_when_latency_disabled() {
        let flags = ProfilingFlags {
            latency: 0,
            ..enabled_flags()
        };
        let (profiler, _factory) = orchestrator(flags);

        drop(profiler.make_scoped_profiler(EventType::ConfigureStream, None, None));
        assert!(profiler.has_profiler(ProfilerCategory::FrameRate));

        drop(profiler.make_scoped_profiler(EventType::Close, None, None));
        assert!(!profiler.has_profiler(ProfilerCategory::FrameRate));
    }

    #[test]
    fn test_guard_outliving_orchestrator() {
        let (profiler, factory) = orchestrator(enabled_flags());

        let guard = profiler.make_scoped_profiler(EventType::Open, None, None);
        drop(profiler);
        drop(guard);

        let recording = &factory.created(ProfilerCategory::Latency)[0];
        assert_eq!((recording.starts(), recording.ends()), (1, 1));
    }

    #[test]
    fn test_disabled_create_makes_no_calls() {
        let factory = Arc::new(RecordingFactory::default());
        let profiler = create_with_factory(9, ProfilingFlags::disabled(), factory.clone());

        let guard = profiler.make_scoped_profiler(EventType::Open, None, None);
        profiler.first_frame_start();
        profiler.reprocessing_request_start(None, 1);
        profiler.profile_frame_rate("preview");
        profiler.reprocessing_result_end(1);
        profiler.first_frame_end();
        drop(guard);

        assert_eq!(factory.total_calls(), 0);
        assert!(factory.created.lock().is_empty());
        assert_eq!(profiler.camera_id(), 9);
        assert_eq!(profiler.latency_flag(), 0);
    }

    #[test]
    fn test_disabled_create_ignores_custom_profilers() {
        let custom = Arc::new(RecordingProfiler::new("custom"));
        let profiler = create_with_flags(2, ProfilingFlags::disabled());

        drop(profiler.make_scoped_profiler(EventType::Open, Some(Box::new(custom.clone())), None));
        profiler.reprocessing_request_start(Some(Box::new(custom.clone())), 3);
        profiler.reprocessing_result_end(3);

        assert_eq!(custom.call_count(), 0);
    }

    #[test]
    fn test_accessors() {
        let flags = ProfilingFlags {
            latency: 1,
            fps: 2,
            reprocess_latency: 3,
            ..ProfilingFlags::default()
        };
        let profiler = create_with_flags(4, flags);

        assert_eq!(profiler.camera_id(), 4);
        assert_eq!(profiler.latency_flag(), 1);
        assert_eq!(profiler.fps_flag(), 2);
        assert_eq!(profiler.reprocess_latency_flag(), 3);
    }

    #[test]
    fn test_no_report_without_print_or_dump() {
        let flags = ProfilingFlags {
            reprocess_latency: crate::flags::STOPWATCH_BIT,
            ..ProfilingFlags::default()
        };
        let (profiler, factory) = orchestrator(flags);

        profiler.reprocessing_request_start(None, 1);
        profiler.reprocessing_result_end(1);

        assert_eq!(factory.created(ProfilerCategory::Reprocessing)[0].reports(), 0);
    }

    #[test]
    fn test_dump_writes_csv() {
        let dir = std::env::temp_dir().join(format!("aidl_profiler_dump_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let flags = ProfilingFlags {
            reprocess_latency: DUMP_BIT,
            dump_dir: dir.clone(),
            ..ProfilingFlags::default()
        };
        let profiler = create_with_flags(6, flags);

        profiler.reprocessing_request_start(None, 11);
        profiler.reprocessing_result_end(11);

        let dumps: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(dumps.len(), 1);
        assert!(dumps[0].starts_with("aidl_hal_6_reprocessing_"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_each_retirement_dumps_its_own_file() {
        let dir = std::env::temp_dir().join(format!("aidl_profiler_dump_seq_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let flags = ProfilingFlags {
            reprocess_latency: DUMP_BIT,
            dump_dir: dir.clone(),
            ..ProfilingFlags::default()
        };
        let profiler = create_with_flags(7, flags);

        for id in 0..10 {
            profiler.reprocessing_request_start(None, id);
            profiler.reprocessing_result_end(id);
        }

        let dumps = std::fs::read_dir(&dir).unwrap().filter_map(|e| e.ok()).count();
        assert_eq!(dumps, 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_dump_failure_is_swallowed() {
        let flags = ProfilingFlags {
            reprocess_latency: DUMP_BIT | PRINT_BIT,
            dump_dir: "/nonexistent/profiler/dir".into(),
            ..ProfilingFlags::default()
        };
        let profiler = create_with_flags(6, flags);

        profiler.reprocessing_request_start(None, 1);
        profiler.reprocessing_result_end(1);
    }

    #[test]
    fn test_end_callback_runs_once_per_guard() {
        let (profiler, _factory) = orchestrator(enabled_flags());
        let guards: Vec<_> = (0..4)
            .map(|_| profiler.make_scoped_profiler(EventType::None, None, None))
            .collect();
        assert_eq!(profiler.latency_in_flight(), 4);

        for (dropped, guard) in guards.into_iter().enumerate() {
            drop(guard);
            assert_eq!(profiler.latency_in_flight(), 3 - dropped);
        }
        assert!(!profiler.has_profiler(ProfilerCategory::Latency));
    }
}
