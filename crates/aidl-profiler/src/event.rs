use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement name for the first-frame latency.
pub const FIRST_FRAME: &str = "First frame";
/// Measurement name for reprocessing request latency.
pub const REPROCESSING: &str = "Reprocessing";

/// Device lifecycle events that can be wrapped in a scoped measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    None,
    Open,
    ConfigureStream,
    Flush,
    Close,
}

impl EventType {
    pub const ALL: [EventType; 5] = [
        EventType::None,
        EventType::Open,
        EventType::ConfigureStream,
        EventType::Flush,
        EventType::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::None => "None",
            EventType::Open => "Open",
            EventType::ConfigureStream => "Configure streams",
            EventType::Flush => "Flush",
            EventType::Close => "Close",
        }
    }

    #[inline]
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability slots owned by an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfilerCategory {
    /// Lifecycle events and first-frame latency.
    Latency,
    Reprocessing,
    FrameRate,
}

impl ProfilerCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfilerCategory::Latency => "latency",
            ProfilerCategory::Reprocessing => "reprocessing",
            ProfilerCategory::FrameRate => "fps",
        }
    }
}

impl fmt::Display for ProfilerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
