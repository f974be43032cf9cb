//! Configuration for the simulated capture pipeline

use aidl_profiler::ProfilingFlags;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub camera_id: u32,
    pub streams: Vec<String>,
    pub frames: u32,
    pub frame_interval_us: u64,
    /// Send a reprocess request every this many frames; 0 disables reprocessing.
    pub reprocess_every: u32,
    pub reprocess_latency_us: u64,
    pub profiling: ProfilingFlags,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            streams: vec!["preview".to_string(), "video".to_string()],
            frames: 120,
            frame_interval_us: 33_333,
            reprocess_every: 30,
            reprocess_latency_us: 80_000,
            profiling: ProfilingFlags::print_all(),
        }
    }
}

impl PipelineConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config {}", path))?;
        let config: PipelineConfig = toml::from_str(&content)?;
        Ok(config)
    }
}
