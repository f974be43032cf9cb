//! Call-recording [`Profiler`] for verifying call counts and order.

use crate::profiler::Profiler;
use crate::report::ProfileReport;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilerCall {
    Start { name: String, id: i32 },
    End { name: String, id: i32 },
    FrameRate { stream: String },
    Report,
}

#[derive(Debug, Default)]
pub struct RecordingProfiler {
    label: String,
    calls: Mutex<Vec<ProfilerCall>>,
}

impl RecordingProfiler {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProfilerCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn starts(&self) -> usize {
        self.count(|c| matches!(c, ProfilerCall::Start { .. }))
    }

    pub fn ends(&self) -> usize {
        self.count(|c| matches!(c, ProfilerCall::End { .. }))
    }

    pub fn frames(&self) -> usize {
        self.count(|c| matches!(c, ProfilerCall::FrameRate { .. }))
    }

    pub fn reports(&self) -> usize {
        self.count(|c| matches!(c, ProfilerCall::Report))
    }

    /// Start/end calls only, in order.
    pub fn timeline(&self) -> Vec<ProfilerCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, ProfilerCall::Start { .. } | ProfilerCall::End { .. }))
            .cloned()
            .collect()
    }

    fn count(&self, pred: impl Fn(&ProfilerCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }
}

impl Profiler for RecordingProfiler {
    fn start(&self, name: &str, id: i32) {
        self.calls.lock().push(ProfilerCall::Start { name: name.to_owned(), id });
    }

    fn end(&self, name: &str, id: i32) {
        self.calls.lock().push(ProfilerCall::End { name: name.to_owned(), id });
    }

    fn profile_frame_rate(&self, stream: &str) {
        self.calls.lock().push(ProfilerCall::FrameRate { stream: stream.to_owned() });
    }

    fn report(&self) -> ProfileReport {
        self.calls.lock().push(ProfilerCall::Report);
        ProfileReport::empty(self.label.clone())
    }
}
