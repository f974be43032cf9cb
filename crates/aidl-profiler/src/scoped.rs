use latency_profiler::Profiler;
use std::fmt;
use std::sync::Arc;

pub type EndCallback = Box<dyn FnOnce() + Send>;

/// Scope-bound measurement.
///
/// Construction starts `(name, id)` on the profiler; dropping the guard ends
/// it and then runs the end callback. Both happen exactly once, on every exit
/// path including unwinding. Without a profiler the measurement is a no-op
/// but the callback still runs.
#[must_use = "the measurement ends as soon as the guard is dropped"]
pub struct ScopedProfiler {
    profiler: Option<Arc<dyn Profiler>>,
    name: String,
    id: i32,
    end_callback: Option<EndCallback>,
}

impl ScopedProfiler {
    pub fn new(
        profiler: Option<Arc<dyn Profiler>>,
        name: impl Into<String>,
        id: i32,
        end_callback: Option<EndCallback>,
    ) -> Self {
        let name = name.into();
        if let Some(profiler) = &profiler {
            profiler.start(&name, id);
        }
        Self {
            profiler,
            name,
            id,
            end_callback,
        }
    }

    /// A guard that measures nothing and has no callback.
    pub fn disabled(name: impl Into<String>, id: i32) -> Self {
        Self::new(None, name, id, None)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.profiler.is_some()
    }
}

impl Drop for ScopedProfiler {
    fn drop(&mut self) {
        if let Some(profiler) = self.profiler.take() {
            profiler.end(&self.name, self.id);
        }
        if let Some(callback) = self.end_callback.take() {
            callback();
        }
    }
}

impl fmt::Debug for ScopedProfiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedProfiler")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.profiler.is_some())
            .field("has_callback", &self.end_callback.is_some())
            .finish()
    }
}
