// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for chain assembly and validation.
//!
//! This module contains message types for logging events related to:
//! * Validation lifecycle
//! * Cyclic dependency detection
//! * Ordering edges dropped to keep the graph acyclic
//! * Pruning of steps that do not contribute to the declared outputs

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Cyclic dependency detected between steps.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use stepchain::observability::messages::validation::CyclicDependencyDetected;
///
/// let cycle = vec!["compile", "link", "compile"];
/// let msg = CyclicDependencyDetected { cycle: &cycle };
///
/// assert_eq!(msg.to_string(), "Cyclic dependency detected: compile -> link -> compile");
/// ```
pub struct CyclicDependencyDetected<'a> {
    pub cycle: &'a [&'a str],
}

impl Display for CyclicDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cyclic dependency detected: {}", self.cycle.join(" -> "))
    }
}

impl StructuredLog for CyclicDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
        )
    }
}

/// An ordered optional edge was dropped because it would close a cycle.
///
/// # Log Level
/// `warn!` - Ordering hint not honoured
pub struct OrderingEdgeDropped<'a> {
    pub producer: &'a str,
    pub consumer: &'a str,
}

impl Display for OrderingEdgeDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Ordering edge '{}' -> '{}' dropped: it would create a cycle",
            self.consumer, self.producer
        )
    }
}

impl StructuredLog for OrderingEdgeDropped<'_> {
    fn log(&self) {
        tracing::warn!(
            producer = self.producer,
            consumer = self.consumer,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "span_name",
            name = name,
            producer = self.producer,
            consumer = self.consumer,
        )
    }
}

/// Steps removed because no declared output depends on them.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StepsPruned {
    pub pruned_count: usize,
    pub kept_count: usize,
}

impl Display for StepsPruned {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pruned {} steps not contributing to the outputs; {} steps remain",
            self.pruned_count, self.kept_count
        )
    }
}

impl StructuredLog for StepsPruned {
    fn log(&self) {
        tracing::info!(
            pruned_count = self.pruned_count,
            kept_count = self.kept_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            pruned_count = self.pruned_count,
            kept_count = self.kept_count,
        )
    }
}

/// Chain validation started.
///
/// # Log Level
/// `debug!` - Lifecycle detail
pub struct ValidationStarted {
    pub step_count: usize,
}

impl Display for ValidationStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Validating build chain of {} steps", self.step_count)
    }
}

impl StructuredLog for ValidationStarted {
    fn log(&self) {
        tracing::debug!(step_count = self.step_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::DEBUG,
            "span_name",
            name = name,
            step_count = self.step_count,
        )
    }
}

/// Chain validated and ranked.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use stepchain::observability::messages::validation::ValidationCompleted;
///
/// let msg = ValidationCompleted {
///     step_count: 4,
///     edge_count: 3,
///     wave_count: 3,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Build chain validated: 4 steps, 3 edges, 3 waves"
/// );
/// ```
pub struct ValidationCompleted {
    pub step_count: usize,
    pub edge_count: usize,
    pub wave_count: usize,
}

impl Display for ValidationCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build chain validated: {} steps, {} edges, {} waves",
            self.step_count, self.edge_count, self.wave_count
        )
    }
}

impl StructuredLog for ValidationCompleted {
    fn log(&self) {
        tracing::info!(
            step_count = self.step_count,
            edge_count = self.edge_count,
            wave_count = self.wave_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::INFO,
            "span_name",
            name = name,
            step_count = self.step_count,
            edge_count = self.edge_count,
            wave_count = self.wave_count,
        )
    }
}

/// Chain validation failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ValidationFailed {
    pub error_count: usize,
}

impl Display for ValidationFailed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Build chain validation failed with {} errors",
            self.error_count
        )
    }
}

impl StructuredLog for ValidationFailed {
    fn log(&self) {
        tracing::error!(error_count = self.error_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            error_count = self.error_count,
        )
    }
}
