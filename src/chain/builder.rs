// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Fluent registration API for build steps.

use std::sync::Arc;

use crate::chain::graph::ChainGraph;
use crate::chain::step::{
    BuildStep, BuildStepExt, Cardinality, Consume, Produce, ProduceFlags, Requirement, SharedStep,
    StepDescriptor,
};
use crate::chain::{BuildChain, BuildProvider};
use crate::context::StepContext;
use crate::errors::ChainValidationError;
use crate::items::{BuildItem, ItemId, ItemKind};

/// Accumulates step declarations until [`ChainBuilder::build`] validates and
/// freezes them into a [`BuildChain`].
///
/// Nothing is checked while steps are being added; every problem is reported
/// at once by `build`.
///
/// # Examples
///
/// ```rust
/// use stepchain::chain::ChainBuilder;
/// use stepchain::items::{BuildItem, ItemKind};
///
/// struct SourceFile(String);
/// impl BuildItem for SourceFile {
///     const KIND: ItemKind = ItemKind::Multi;
/// }
///
/// struct FileCount(usize);
/// impl BuildItem for FileCount {
///     const KIND: ItemKind = ItemKind::Simple;
/// }
///
/// let mut builder = ChainBuilder::new();
/// builder
///     .add_step("scan", |ctx| {
///         ctx.produce(SourceFile("main.rs".into()))?;
///         ctx.produce(SourceFile("lib.rs".into()))?;
///         Ok(())
///     })
///     .produces::<SourceFile>()
///     .build();
/// builder
///     .add_step("count", |ctx| {
///         let files = ctx.consume_multi::<SourceFile>()?;
///         ctx.produce(FileCount(files.len()))?;
///         Ok(())
///     })
///     .consumes::<SourceFile>()
///     .produces::<FileCount>()
///     .build();
///
/// let chain = builder.build().unwrap();
/// assert_eq!(chain.execution_order(), vec!["scan", "count"]);
/// ```
#[derive(Default)]
pub struct ChainBuilder {
    steps: Vec<StepDescriptor>,
    initial: Vec<ItemId>,
    outputs: Vec<ItemId>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts declaring a step whose body is a closure.
    pub fn add_step<F>(&mut self, id: impl Into<String>, body: F) -> StepBuilder<'_>
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_build_step(id, body)
    }

    /// Starts declaring a step backed by any [`BuildStep`] implementation.
    pub fn add_build_step<S>(&mut self, id: impl Into<String>, step: S) -> StepBuilder<'_>
    where
        S: BuildStep + 'static,
    {
        StepBuilder {
            chain: self,
            descriptor: StepDescriptor {
                id: id.into(),
                produces: Vec::new(),
                consumes: Vec::new(),
                body: Arc::new(step),
            },
        }
    }

    /// Declares an item that is supplied by the caller before execution.
    ///
    /// A simple initial item can not also be produced by a step.
    pub fn add_initial<T: BuildItem>(&mut self) -> &mut Self {
        self.add_initial_id(ItemId::of::<T>())
    }

    pub fn add_initial_qualified<T: BuildItem>(&mut self, qualifier: &str) -> &mut Self {
        self.add_initial_id(ItemId::qualified::<T>(qualifier))
    }

    pub fn add_initial_id(&mut self, id: ItemId) -> &mut Self {
        if !self.initial.contains(&id) {
            self.initial.push(id);
        }
        self
    }

    /// Declares an item the caller wants from the build.
    ///
    /// Once at least one output is declared, only the steps that contribute to
    /// an output (directly or through the items they consume) are kept.
    pub fn add_output<T: BuildItem>(&mut self) -> &mut Self {
        self.add_output_id(ItemId::of::<T>())
    }

    pub fn add_output_id(&mut self, id: ItemId) -> &mut Self {
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        self
    }

    /// Lets an independently written module register its steps and items.
    pub fn add_provider(&mut self, provider: &dyn BuildProvider) -> &mut Self {
        provider.install_into(self);
        self
    }

    /// Number of steps registered so far.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Validates the registered steps and freezes them into a chain.
    ///
    /// The builder is left untouched, so more steps may be added and another
    /// chain built afterwards.
    pub fn build(&self) -> Result<BuildChain, ChainValidationError> {
        let graph = ChainGraph::assemble(&self.steps, &self.initial, &self.outputs)?;
        Ok(BuildChain::new(graph))
    }

    fn register(&mut self, descriptor: StepDescriptor) {
        self.steps.push(descriptor);
    }
}

/// Declares the capabilities of one step. Call [`StepBuilder::build`] to add
/// the step to the chain builder; a dropped `StepBuilder` registers nothing.
#[must_use = "a step is only registered once `build` is called"]
pub struct StepBuilder<'a> {
    chain: &'a mut ChainBuilder,
    descriptor: StepDescriptor,
}

impl StepBuilder<'_> {
    /// Declares that the step produces the unqualified item `T`.
    pub fn produces<T: BuildItem>(self) -> Self {
        self.produce(ItemId::of::<T>(), T::KIND, ProduceFlags::NONE)
    }

    pub fn produces_qualified<T: BuildItem>(self, qualifier: &str) -> Self {
        self.produce(ItemId::qualified::<T>(qualifier), T::KIND, ProduceFlags::NONE)
    }

    /// Declares a fallback production, used only when no other step produces
    /// `T` without this flag.
    pub fn produces_overridable<T: BuildItem>(self) -> Self {
        self.produce(ItemId::of::<T>(), T::KIND, ProduceFlags::OVERRIDABLE)
    }

    pub fn produces_overridable_qualified<T: BuildItem>(self, qualifier: &str) -> Self {
        self.produce(ItemId::qualified::<T>(qualifier), T::KIND, ProduceFlags::OVERRIDABLE)
    }

    /// Declares a production that does not pull this step into a pruned chain.
    pub fn produces_weak<T: BuildItem>(self) -> Self {
        self.produce(ItemId::of::<T>(), T::KIND, ProduceFlags::WEAK)
    }

    pub fn produces_weak_qualified<T: BuildItem>(self, qualifier: &str) -> Self {
        self.produce(ItemId::qualified::<T>(qualifier), T::KIND, ProduceFlags::WEAK)
    }

    /// Orders the step before every consumer of `T`. The step may not write
    /// `T` and does not count as its producer.
    pub fn before_consume<T: BuildItem>(self) -> Self {
        self.produce(ItemId::of::<T>(), T::KIND, ProduceFlags::ORDER_ONLY)
    }

    pub fn before_consume_qualified<T: BuildItem>(self, qualifier: &str) -> Self {
        self.produce(ItemId::qualified::<T>(qualifier), T::KIND, ProduceFlags::ORDER_ONLY)
    }

    /// Declares a production with an explicitly claimed kind.
    pub fn produces_id(self, id: ItemId, kind: ItemKind) -> Self {
        self.produce(id, kind, ProduceFlags::NONE)
    }

    pub fn produces_id_with(self, id: ItemId, kind: ItemKind, flags: ProduceFlags) -> Self {
        self.produce(id, kind, flags)
    }

    /// Declares a required consumption of `T`; multi items are read as a list.
    pub fn consumes<T: BuildItem>(self) -> Self {
        self.consume(ItemId::of::<T>(), Requirement::Required, Cardinality::for_kind(T::KIND))
    }

    /// Declares an optional consumption of `T` with no ordering guarantee.
    pub fn consumes_optional<T: BuildItem>(self) -> Self {
        self.consume(ItemId::of::<T>(), Requirement::Optional, Cardinality::for_kind(T::KIND))
    }

    /// Declares an optional consumption of `T` that runs after its producers.
    pub fn consumes_ordered<T: BuildItem>(self) -> Self {
        self.consume(
            ItemId::of::<T>(),
            Requirement::OptionalOrdered,
            Cardinality::for_kind(T::KIND),
        )
    }

    pub fn consumes_ordered_qualified<T: BuildItem>(self, qualifier: &str) -> Self {
        self.consumes_qualified::<T>(qualifier, Requirement::OptionalOrdered)
    }

    pub fn consumes_qualified<T: BuildItem>(self, qualifier: &str, requirement: Requirement) -> Self {
        self.consume(
            ItemId::qualified::<T>(qualifier),
            requirement,
            Cardinality::for_kind(T::KIND),
        )
    }

    /// Declares a consumption with an explicit requirement and cardinality.
    pub fn consumes_id(self, id: ItemId, requirement: Requirement, cardinality: Cardinality) -> Self {
        self.consume(id, requirement, cardinality)
    }

    /// Appends another body that runs after the current one within this step.
    pub fn and_then<F>(mut self, next: F) -> Self
    where
        F: Fn(&StepContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let current = SharedStep(self.descriptor.body);
        self.descriptor.body = Arc::new(current.and_then(next));
        self
    }

    /// Adds the step to the chain builder.
    pub fn build(self) {
        self.chain.register(self.descriptor);
    }

    fn produce(mut self, item: ItemId, kind: ItemKind, flags: ProduceFlags) -> Self {
        let produce = Produce {
            item,
            kind,
            overridable: flags.overridable,
            weak: flags.weak,
            order_only: flags.order_only,
        };
        // A repeated declaration replaces the earlier one
        match self.descriptor.produces.iter_mut().find(|p| p.item == produce.item) {
            Some(existing) => *existing = produce,
            None => self.descriptor.produces.push(produce),
        }
        self
    }

    fn consume(mut self, item: ItemId, requirement: Requirement, cardinality: Cardinality) -> Self {
        let consume = Consume {
            item,
            requirement,
            cardinality,
        };
        match self.descriptor.consumes.iter_mut().find(|c| c.item == consume.item) {
            Some(existing) => *existing = consume,
            None => self.descriptor.consumes.push(consume),
        }
        self
    }
}
