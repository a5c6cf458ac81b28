// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build step bodies and their declared capabilities.

use std::fmt;
use std::sync::Arc;

use crate::context::StepContext;
use crate::items::{ItemId, ItemKind};

/// A unit of work in a build chain.
///
/// Step bodies are synchronous: the executor runs each one on a blocking worker
/// and treats it as complete when `execute` returns. A body only sees the items
/// it declared, through the [`StepContext`].
///
/// Closures of the form `Fn(&StepContext) -> anyhow::Result<()>` implement this
/// trait, so most steps never name it:
///
/// ```rust
/// use stepchain::chain::ChainBuilder;
/// use stepchain::items::{BuildItem, ItemKind};
///
/// struct Banner(String);
/// impl BuildItem for Banner {
///     const KIND: ItemKind = ItemKind::Simple;
/// }
///
/// let mut builder = ChainBuilder::new();
/// builder
///     .add_step("banner", |ctx| {
///         ctx.produce(Banner("hello".into()))?;
///         Ok(())
///     })
///     .produces::<Banner>()
///     .build();
/// let chain = builder.build().unwrap();
/// assert_eq!(chain.len(), 1);
/// ```
pub trait BuildStep: Send + Sync {
    fn execute(&self, context: &StepContext<'_>) -> anyhow::Result<()>;
}

impl<F> BuildStep for F
where
    F: Fn(&StepContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn execute(&self, context: &StepContext<'_>) -> anyhow::Result<()> {
        self(context)
    }
}

/// A body already shared behind an `Arc`, as stored in a descriptor.
#[derive(Clone)]
pub struct SharedStep(pub Arc<dyn BuildStep>);

impl BuildStep for SharedStep {
    fn execute(&self, context: &StepContext<'_>) -> anyhow::Result<()> {
        self.0.execute(context)
    }
}

/// Two step bodies run one after the other as a single step.
///
/// The second body only runs when the first succeeds.
pub struct AndThen<A, B> {
    first: A,
    second: B,
}

impl<A: BuildStep, B: BuildStep> BuildStep for AndThen<A, B> {
    fn execute(&self, context: &StepContext<'_>) -> anyhow::Result<()> {
        self.first.execute(context)?;
        self.second.execute(context)
    }
}

pub trait BuildStepExt: BuildStep + Sized {
    /// Composes this body with `next`, which runs after it within the same step.
    fn and_then<B: BuildStep>(self, next: B) -> AndThen<Self, B> {
        AndThen {
            first: self,
            second: next,
        }
    }
}

impl<S: BuildStep + Sized> BuildStepExt for S {}

/// Whether a consumer needs the item to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Requirement {
    /// Ordered after every producer; skipped when a producer fails.
    Required,
    /// No ordering: the item may be absent or, for multi items, partial.
    Optional,
    /// Ordered after the producers when that is acyclic, but never skipped
    /// because a producer failed.
    OptionalOrdered,
}

impl Requirement {
    pub fn is_required(self) -> bool {
        self == Requirement::Required
    }
}

/// How many values a consumer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    Single,
    Multi,
}

impl Cardinality {
    /// The cardinality matching an item kind.
    pub fn for_kind(kind: ItemKind) -> Self {
        if kind.is_multi() {
            Cardinality::Multi
        } else {
            Cardinality::Single
        }
    }
}

/// Modifiers of a production declaration.
///
/// # Examples
///
/// ```rust
/// use stepchain::chain::ProduceFlags;
///
/// let flags = ProduceFlags::OVERRIDABLE.with(ProduceFlags::WEAK);
/// assert!(flags.overridable && flags.weak);
/// assert!(!flags.order_only);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProduceFlags {
    pub overridable: bool,
    pub weak: bool,
    pub order_only: bool,
}

impl ProduceFlags {
    pub const NONE: Self = Self {
        overridable: false,
        weak: false,
        order_only: false,
    };
    pub const OVERRIDABLE: Self = Self {
        overridable: true,
        ..Self::NONE
    };
    pub const WEAK: Self = Self {
        weak: true,
        ..Self::NONE
    };
    pub const ORDER_ONLY: Self = Self {
        order_only: true,
        ..Self::NONE
    };

    /// Union of both flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self {
            overridable: self.overridable || other.overridable,
            weak: self.weak || other.weak,
            order_only: self.order_only || other.order_only,
        }
    }
}

/// A declared production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Produce {
    pub item: ItemId,
    /// Kind claimed by the declaration
    pub kind: ItemKind,
    /// Only used when no non-overridable producer exists
    pub overridable: bool,
    /// Does not pull the step into a pruned chain
    pub weak: bool,
    /// Orders the step before every consumer of the item without writing it
    pub order_only: bool,
}

/// A declared consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consume {
    pub item: ItemId,
    pub requirement: Requirement,
    pub cardinality: Cardinality,
}

/// A registered step: identity, declarations and body.
#[derive(Clone)]
pub struct StepDescriptor {
    pub id: String,
    pub produces: Vec<Produce>,
    pub consumes: Vec<Consume>,
    pub body: Arc<dyn BuildStep>,
}

impl StepDescriptor {
    pub fn produce_of(&self, item: &ItemId) -> Option<&Produce> {
        self.produces.iter().find(|p| &p.item == item)
    }

    pub fn consume_of(&self, item: &ItemId) -> Option<&Consume> {
        self.consumes.iter().find(|c| &c.item == item)
    }
}

impl fmt::Debug for StepDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("id", &self.id)
            .field("produces", &self.produces)
            .field("consumes", &self.consumes)
            .finish()
    }
}
