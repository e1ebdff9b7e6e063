//! Error sink that keeps what it records.

use artworks_api::{errors::PipelineError, services::error_sink::ErrorSink};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryErrorSink {
    entries: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl MemoryErrorSink {
    /// `(kind, message)` of everything recorded so far.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().unwrap().clone()
    }
}

impl ErrorSink for MemoryErrorSink {
    fn record(&self, _operation: &'static str, _caller: Uuid, error: &PipelineError) {
        self.entries
            .lock()
            .unwrap()
            .push((error.kind().to_string(), error.to_string()));
    }
}
