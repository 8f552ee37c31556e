use serde::{Deserialize, Serialize};

/// Progress notifications emitted while a pipeline stage runs.
///
/// `Skipped` doubles as the observable cache-hit signal: a caller that wants
/// to know whether training actually ran listens for it instead of
/// re-inspecting model files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    Started { stage: String },
    Message { stage: String, message: String },
    Skipped { stage: String, reason: String },
    Finished { stage: String },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: StageEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: StageEvent) {
        match event {
            StageEvent::Started { stage } => println!("[{stage}] started"),
            StageEvent::Message { stage, message } => println!("[{stage}] {message}"),
            StageEvent::Skipped { stage, reason } => println!("[{stage}] skipped ({reason})"),
            StageEvent::Finished { stage } => println!("[{stage}] finished"),
        }
    }
}

/// Sink that discards all events.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: StageEvent) {}
}
