// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::items::ItemId;

/// How the executors react to a failing step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStrategy {
    /// Stop scheduling new steps after the first failure. Steps already running
    /// still finish.
    #[default]
    FailFast,
    /// Keep scheduling every step that does not depend on a failed one.
    ContinueOnError,
}

/// A single problem recorded while running a chain.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// The step body returned an error or panicked
    #[error("Step '{step}' failed: {cause:#}")]
    StepFailed {
        step: String,
        cause: Arc<anyhow::Error>,
    },

    /// The step was not run because a step it requires failed
    #[error("Step '{step}' skipped: upstream step '{upstream}' failed")]
    SkippedDueToUpstreamFailure { step: String, upstream: String },

    /// The step was never started because the run stopped early (fail-fast)
    #[error("Step '{step}' was not scheduled: execution stopped after a failure")]
    NotScheduled { step: String },

    /// Steps remain but none can make progress
    #[error("Scheduler deadlock: steps [{}] can never become ready", .stuck.join(", "))]
    SchedulerDeadlock { stuck: Vec<String> },

    /// A seed was supplied for an item the chain does not declare as initial
    #[error("Seed item {item} is not declared as an initial item of this chain")]
    UndeclaredInitialItem { item: ItemId },

    /// An initial item required by some step was not seeded
    #[error("Initial item {item} is required but was not seeded")]
    MissingInitialItem { item: ItemId },

    /// Engine invariant violation (task join failure and similar)
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ExecutionError {
    /// Step the error is about, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            ExecutionError::StepFailed { step, .. }
            | ExecutionError::SkippedDueToUpstreamFailure { step, .. }
            | ExecutionError::NotScheduled { step } => Some(step),
            _ => None,
        }
    }
}

/// Every problem recorded during one execution.
///
/// Ordered as: pre-run errors, failed steps, skipped dependents, steps never
/// scheduled, engine errors.
#[derive(Debug, Clone, Error)]
pub struct BuildFailure {
    pub errors: Vec<ExecutionError>,
}

impl BuildFailure {
    pub fn new(errors: Vec<ExecutionError>) -> Self {
        Self { errors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ids of the steps whose body failed.
    pub fn failed_steps(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                ExecutionError::StepFailed { step, .. } => Some(step.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of the steps skipped because of an upstream failure.
    pub fn skipped_steps(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                ExecutionError::SkippedDueToUpstreamFailure { step, .. } => Some(step.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Root cause of a failed step.
    pub fn cause_of(&self, step_id: &str) -> Option<&anyhow::Error> {
        self.errors.iter().find_map(|e| match e {
            ExecutionError::StepFailed { step, cause } if step == step_id => Some(cause.as_ref()),
            _ => None,
        })
    }
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Build failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for BuildFailure {
    type Item = ExecutionError;
    type IntoIter = std::vec::IntoIter<ExecutionError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
