//! Out-of-band recording of unexpected failures.

use crate::errors::PipelineError;
use uuid::Uuid;

/// Receives server-side failures for later inspection. Recording never
/// changes the response the caller gets.
pub trait ErrorSink: Send + Sync {
    fn record(&self, operation: &'static str, caller: Uuid, error: &PipelineError);
}

/// Writes failures to the `tracing` pipeline at error level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn record(&self, operation: &'static str, caller: Uuid, error: &PipelineError) {
        tracing::error!(
            operation,
            %caller,
            kind = error.kind(),
            error = %error,
            "unexpected failure"
        );
    }
}
