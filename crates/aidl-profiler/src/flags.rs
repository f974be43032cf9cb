//! Profiling flags, read once per orchestrator.
//!
//! Each category flag is a bitmask. Zero disables the category; any other
//! value enables it and the individual bits select what happens to the
//! collected data.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::event::ProfilerCategory;

pub const DISABLE: i32 = 0;
/// Log the report when the category's profiler is retired.
pub const PRINT_BIT: i32 = 1 << 0;
/// Dump the report as CSV when the category's profiler is retired.
pub const DUMP_BIT: i32 = 1 << 1;
/// Log every measurement as soon as it ends.
pub const STOPWATCH_BIT: i32 = 1 << 2;
/// Log per-stream fps once per print interval.
pub const PRINT_FPS_PER_INTERVAL_BIT: i32 = 1 << 3;

pub const ENV_LATENCY: &str = "CAMERA_PROFILER_LATENCY";
pub const ENV_FPS: &str = "CAMERA_PROFILER_FPS";
pub const ENV_REPROCESS: &str = "CAMERA_PROFILER_REPROCESS";
pub const ENV_DUMP_DIR: &str = "CAMERA_PROFILER_DUMP_DIR";
pub const ENV_FPS_INTERVAL_SECS: &str = "CAMERA_PROFILER_FPS_INTERVAL_SECS";

pub const DEFAULT_DUMP_DIR: &str = "/data/vendor/camera/profiler";
pub const DEFAULT_FPS_INTERVAL_SECS: u64 = 2;

#[derive(Error, Debug)]
pub enum FlagsError {
    #[error("failed to read profiling flags from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse profiling flags: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilingFlags {
    pub latency: i32,
    pub fps: i32,
    pub reprocess_latency: i32,
    pub dump_dir: PathBuf,
    pub fps_print_interval_secs: u64,
}

impl Default for ProfilingFlags {
    fn default() -> Self {
        Self {
            latency: DISABLE,
            fps: DISABLE,
            reprocess_latency: DISABLE,
            dump_dir: PathBuf::from(DEFAULT_DUMP_DIR),
            fps_print_interval_secs: DEFAULT_FPS_INTERVAL_SECS,
        }
    }
}

impl ProfilingFlags {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// All categories on, reports logged on retirement.
    pub fn print_all() -> Self {
        Self {
            latency: PRINT_BIT,
            fps: PRINT_BIT,
            reprocess_latency: PRINT_BIT,
            ..Self::default()
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds flags from a key lookup. Missing keys keep their defaults;
    /// malformed values are logged and read as disabled.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut flags = Self::default();
        let flag = |key: &str| lookup(key).map(|v| parse_flag(key, &v)).unwrap_or(DISABLE);

        flags.latency = flag(ENV_LATENCY);
        flags.fps = flag(ENV_FPS);
        flags.reprocess_latency = flag(ENV_REPROCESS);

        if let Some(dir) = lookup(ENV_DUMP_DIR).filter(|d| !d.trim().is_empty()) {
            flags.dump_dir = PathBuf::from(dir.trim());
        }
        if let Some(secs) = lookup(ENV_FPS_INTERVAL_SECS) {
            match secs.trim().parse::<u64>() {
                Ok(secs) => flags.fps_print_interval_secs = secs,
                Err(_) => tracing::warn!("ignoring malformed {}={:?}", ENV_FPS_INTERVAL_SECS, secs),
            }
        }
        flags
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, FlagsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FlagsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn flag(&self, category: ProfilerCategory) -> i32 {
        match category {
            ProfilerCategory::Latency => self.latency,
            ProfilerCategory::Reprocessing => self.reprocess_latency,
            ProfilerCategory::FrameRate => self.fps,
        }
    }

    #[inline]
    pub fn is_enabled(&self, category: ProfilerCategory) -> bool {
        self.flag(category) != DISABLE
    }

    pub fn any_enabled(&self) -> bool {
        self.latency != DISABLE || self.fps != DISABLE || self.reprocess_latency != DISABLE
    }

    pub fn fps_print_interval(&self) -> Duration {
        Duration::from_secs(self.fps_print_interval_secs)
    }
}

fn parse_flag(key: &str, value: &str) -> i32 {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i32::from_str_radix(hex, 16),
        None => value.parse::<i32>(),
    };
    parsed.unwrap_or_else(|_| {
        tracing::warn!("ignoring malformed {}={:?}, profiling disabled", key, value);
        DISABLE
    })
}

static GLOBAL_FLAGS: Lazy<RwLock<ProfilingFlags>> =
    Lazy::new(|| RwLock::new(ProfilingFlags::from_env()));

/// Process-wide flags consulted by [`crate::create`]. Initialized from the
/// environment on first use.
pub fn global_flags() -> ProfilingFlags {
    GLOBAL_FLAGS.read().clone()
}

/// Replaces the process-wide flags. Orchestrators that already exist keep
/// the flags they were created with.
pub fn set_global_flags(flags: ProfilingFlags) {
    *GLOBAL_FLAGS.write() = flags;
}
