// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for executor lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Executor selection from configuration
//! * Chain execution lifecycle (start, completion, failure)
//! * Wave computation and scheduler health

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Execution started with the given executor.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use stepchain::observability::messages::engine::ExecutionStarted;
///
/// let msg = ExecutionStarted {
///     strategy: "WorkQueue",
///     step_count: 5,
///     max_concurrency: 4,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Starting chain execution with WorkQueue executor: 5 steps, max_concurrency=4"
/// );
/// ```
pub struct ExecutionStarted<'a> {
    pub strategy: &'a str,
    pub step_count: usize,
    pub max_concurrency: usize,
}

impl Display for ExecutionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting chain execution with {} executor: {} steps, max_concurrency={}",
            self.strategy, self.step_count, self.max_concurrency
        )
    }
}

impl StructuredLog for ExecutionStarted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            step_count = self.step_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution",
            span_name = name,
            strategy = self.strategy,
            step_count = self.step_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Execution completed with every step successful.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ExecutionCompleted<'a> {
    pub strategy: &'a str,
    pub step_count: usize,
    pub duration: Duration,
}

impl Display for ExecutionCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Chain execution completed with {} executor: {} steps in {:?}",
            self.strategy, self.step_count, self.duration
        )
    }
}

impl StructuredLog for ExecutionCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            strategy = self.strategy,
            step_count = self.step_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "execution_completed",
            span_name = name,
            strategy = self.strategy,
            step_count = self.step_count,
            duration = ?self.duration,
        )
    }
}

/// Execution finished with one or more errors.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stepchain::observability::messages::engine::ExecutionFailed;
///
/// let msg = ExecutionFailed {
///     strategy: "Level",
///     error_count: 2,
/// };
///
/// assert_eq!(msg.to_string(), "Chain execution failed with Level executor: 2 error(s)");
/// ```
pub struct ExecutionFailed<'a> {
    pub strategy: &'a str,
    pub error_count: usize,
}

impl Display for ExecutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Chain execution failed with {} executor: {} error(s)",
            self.strategy, self.error_count
        )
    }
}

impl StructuredLog for ExecutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            strategy = self.strategy,
            error_count = self.error_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "execution_failed",
            span_name = name,
            strategy = self.strategy,
            error_count = self.error_count,
        )
    }
}

/// Waves computed for the level-by-level executor.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LevelComputationCompleted {
    pub wave_count: usize,
    pub step_count: usize,
}

impl Display for LevelComputationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Computed {} waves for {} steps",
            self.wave_count, self.step_count
        )
    }
}

impl StructuredLog for LevelComputationCompleted {
    fn log(&self) {
        tracing::info!(
            wave_count = self.wave_count,
            step_count = self.step_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "level_computation",
            span_name = name,
            wave_count = self.wave_count,
            step_count = self.step_count,
        )
    }
}

/// Steps remain pending but nothing is running or ready.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct SchedulerDeadlockDetected {
    pub stuck_count: usize,
}

impl Display for SchedulerDeadlockDetected {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduler deadlock: {} steps can never become ready",
            self.stuck_count
        )
    }
}

impl StructuredLog for SchedulerDeadlockDetected {
    fn log(&self) {
        tracing::error!(stuck_count = self.stuck_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "scheduler_deadlock",
            span_name = name,
            stuck_count = self.stuck_count,
        )
    }
}

/// Executor chosen from configuration.
///
/// # Log Level
/// `debug!` - Configuration detail
pub struct ExecutorSelected<'a> {
    pub strategy: &'a str,
    pub max_concurrency: usize,
}

impl Display for ExecutorSelected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Selected {} executor with max_concurrency={}",
            self.strategy, self.max_concurrency
        )
    }
}

impl StructuredLog for ExecutorSelected<'_> {
    fn log(&self) {
        tracing::debug!(
            strategy = self.strategy,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "executor_selected",
            span_name = name,
            strategy = self.strategy,
            max_concurrency = self.max_concurrency,
        )
    }
}
