// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for individual step execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A step body is about to run.
///
/// # Log Level
/// `debug!` - Per-step detail
pub struct StepExecutionStarted<'a> {
    pub step_id: &'a str,
}

impl Display for StepExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting step '{}'", self.step_id)
    }
}

impl StructuredLog for StepExecutionStarted<'_> {
    fn log(&self) {
        tracing::debug!(step_id = self.step_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("step", span_name = name, step_id = self.step_id)
    }
}

/// A step body returned successfully.
///
/// # Log Level
/// `debug!` - Per-step detail
pub struct StepExecutionCompleted<'a> {
    pub step_id: &'a str,
    pub duration: Duration,
}

impl Display for StepExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step '{}' completed in {:?}", self.step_id, self.duration)
    }
}

impl StructuredLog for StepExecutionCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            step_id = self.step_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "step_completed",
            span_name = name,
            step_id = self.step_id,
            duration = ?self.duration,
        )
    }
}

/// A step body returned an error or panicked.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stepchain::observability::messages::step::StepExecutionFailed;
///
/// let error = anyhow::anyhow!("disk full");
/// let msg = StepExecutionFailed {
///     step_id: "package",
///     error: &error,
/// };
///
/// assert_eq!(msg.to_string(), "Step 'package' failed: disk full");
/// ```
pub struct StepExecutionFailed<'a> {
    pub step_id: &'a str,
    pub error: &'a anyhow::Error,
}

impl Display for StepExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Step '{}' failed: {:#}", self.step_id, self.error)
    }
}

impl StructuredLog for StepExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            step_id = self.step_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "step_failed",
            span_name = name,
            step_id = self.step_id,
            error = %self.error,
        )
    }
}

/// A step was not run because a step it requires failed.
///
/// # Log Level
/// `warn!` - Consequence of an earlier failure
pub struct StepSkipped<'a> {
    pub step_id: &'a str,
    pub upstream: &'a str,
}

impl Display for StepSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping step '{}': upstream step '{}' failed",
            self.step_id, self.upstream
        )
    }
}

impl StructuredLog for StepSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            step_id = self.step_id,
            upstream = self.upstream,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "step_skipped",
            span_name = name,
            step_id = self.step_id,
            upstream = self.upstream,
        )
    }
}
