// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Step registration and build chain assembly.
//!
//! Steps are registered on a [`ChainBuilder`], each declaring the items it
//! produces and consumes. [`ChainBuilder::build`] turns those declarations into
//! a [`BuildChain`]: producers are wired to consumers, the graph is checked for
//! missing producers, conflicting producers, kind misuse and cycles, and every
//! problem found is reported together in a
//! [`ChainValidationError`](crate::errors::ChainValidationError).

mod build_chain;
mod builder;
pub(crate) mod graph;
mod provider;
mod step;
pub(crate) mod validation;

pub use build_chain::{BuildChain, Dot};
pub use builder::{ChainBuilder, StepBuilder};
pub use graph::{DroppedEdge, Edge, EdgeKind, StepNode};
pub use provider::BuildProvider;
pub use step::{
    AndThen, BuildStep, BuildStepExt, Cardinality, Consume, Produce, ProduceFlags, Requirement,
    SharedStep, StepDescriptor,
};
