// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use crate::items::ItemId;

/// A single problem found while building a chain.
///
/// These are build-configuration errors: they are always detected when the
/// chain is frozen, never while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A required item has no producer and is not an initial item
    #[error("Step '{step}' requires item {item} which has no producer and is not an initial item")]
    MissingProducer { step: String, item: ItemId },

    /// Two steps produce the same simple or final item
    #[error("Item {item} has multiple producers: '{first}' and '{second}'")]
    DuplicateProducer {
        item: ItemId,
        first: String,
        second: String,
    },

    /// The required-dependency graph contains a cycle
    #[error("Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Step ids along the cycle; the first id is repeated at the end
        cycle: Vec<String>,
    },

    /// An item is used in a way its kind does not allow
    #[error("Invalid use of item {item}{}: {reason}", StepSuffix(.step))]
    InvalidItemKind {
        item: ItemId,
        step: Option<String>,
        reason: String,
    },

    /// Two steps were registered under the same id
    #[error("Duplicate step ID: '{step}'")]
    DuplicateStepId { step: String },

    /// A step produces a simple item that is supplied externally
    #[error("Item {item} cannot be produced by '{step}': it is an initial item")]
    ProducesInitialItem { item: ItemId, step: String },

    /// A declared output item can never be produced
    #[error("Output item {item} has no producer and is not an initial item")]
    MissingOutputProducer { item: ItemId },
}

struct StepSuffix<'a>(&'a Option<String>);

impl fmt::Display for StepSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(step) => write!(f, " in step '{}'", step),
            None => Ok(()),
        }
    }
}

/// Every problem found while building a chain, reported together so they can
/// be fixed in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ChainValidationError {
    pub errors: Vec<ChainError>,
}

impl ChainValidationError {
    pub fn new(errors: Vec<ChainError>) -> Self {
        Self { errors }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainError> {
        self.errors.iter()
    }

    /// The cycles reported, as lists of step ids.
    pub fn cycles(&self) -> Vec<&[String]> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                ChainError::CyclicDependency { cycle } => Some(cycle.as_slice()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ChainValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Build chain validation failed with {} error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for ChainValidationError {
    type Item = ChainError;
    type IntoIter = std::vec::IntoIter<ChainError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
