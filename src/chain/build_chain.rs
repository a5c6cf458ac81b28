// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;
use std::sync::Arc;

use crate::chain::graph::{ChainGraph, DroppedEdge, EdgeKind, StepNode};
use crate::context::{BuildResult, SeedItems};
use crate::engine::WorkQueueExecutor;
use crate::errors::BuildFailure;
use crate::items::{ItemId, ItemRegistry};
use crate::traits::{BuildExecution, ChainExecutor};

/// A validated, immutable build chain.
///
/// Cloning is cheap and clones share the same graph, so one chain can be
/// executed any number of times, concurrently if needed. Each execution gets
/// its own result store.
#[derive(Debug, Clone)]
pub struct BuildChain {
    graph: Arc<ChainGraph>,
}

impl BuildChain {
    pub(crate) fn new(graph: ChainGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }

    pub(crate) fn graph(&self) -> &ChainGraph {
        &self.graph
    }

    /// Number of steps kept in the chain.
    pub fn len(&self) -> usize {
        self.graph.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepNode] {
        &self.graph.steps
    }

    pub fn step(&self, id: &str) -> Option<&StepNode> {
        self.graph.steps.iter().find(|s| s.id() == id)
    }

    /// Step ids in registration order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.graph.steps.iter().map(|s| s.id()).collect()
    }

    /// Step ids grouped by wave. Steps in one wave only depend on earlier waves.
    pub fn waves(&self) -> Vec<Vec<&str>> {
        self.graph
            .waves
            .iter()
            .map(|wave| wave.iter().map(|&i| self.graph.steps[i].id()).collect())
            .collect()
    }

    /// A valid sequential order: wave by wave, registration order within a wave.
    pub fn execution_order(&self) -> Vec<&str> {
        self.graph
            .waves
            .iter()
            .flatten()
            .map(|&i| self.graph.steps[i].id())
            .collect()
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.graph.registry
    }

    pub fn initial_items(&self) -> &[ItemId] {
        &self.graph.initial
    }

    pub fn outputs(&self) -> &[ItemId] {
        &self.graph.outputs
    }

    /// Steps removed because they contribute to no declared output.
    pub fn pruned_steps(&self) -> &[String] {
        &self.graph.pruned
    }

    /// Ordering edges dropped because they would have closed a cycle.
    pub fn dropped_edges(&self) -> &[DroppedEdge] {
        &self.graph.dropped_edges
    }

    /// Runs the chain with the default work queue executor and fail-fast
    /// behavior.
    pub async fn execute(&self, seeds: SeedItems) -> Result<BuildResult, BuildFailure> {
        WorkQueueExecutor::default()
            .execute(self, BuildExecution::new(seeds))
            .await
    }

    /// The chain as a Graphviz digraph, rendered through [`fmt::Display`].
    ///
    /// Steps with no dependencies share the first rank, steps nothing depends
    /// on share the last one. Edges point from a consumer to the step it waits
    /// for; ordering-only edges are dashed.
    pub fn dot(&self) -> Dot<'_> {
        Dot { chain: self }
    }

    pub fn to_dot(&self) -> String {
        self.dot().to_string()
    }

    /// Writes the Graphviz rendering to `path`.
    pub fn write_dot(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut file = BufWriter::new(File::create(path)?);
        write!(file, "{}", self.dot())?;
        file.flush()
    }

    fn render_dot(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let steps = &self.graph.steps;

        writeln!(out, "digraph {{")?;
        writeln!(out, "    node [shape=rectangle];")?;
        writeln!(out, "    rankdir=LR;")?;
        writeln!(out)?;

        let starts: Vec<&StepNode> = steps.iter().filter(|s| s.dependencies.is_empty()).collect();
        let ends: Vec<&StepNode> = steps
            .iter()
            .filter(|s| s.dependents.is_empty() && !s.dependencies.is_empty())
            .collect();
        for group in [starts, ends] {
            write!(out, "    {{ rank = same; ")?;
            for step in group {
                write!(out, "{}; ", quote(step.id()))?;
            }
            writeln!(out, "}};")?;
        }
        writeln!(out)?;

        for step in steps {
            for edge in &step.dependencies {
                let style = match edge.kind {
                    EdgeKind::Hard => "",
                    EdgeKind::Soft => " [style=dashed]",
                };
                writeln!(
                    out,
                    "    {} -> {}{};",
                    quote(step.id()),
                    quote(steps[edge.step].id()),
                    style
                )?;
            }
        }
        writeln!(out, "}}")
    }
}

/// Graphviz rendering of a [`BuildChain`].
pub struct Dot<'a> {
    chain: &'a BuildChain,
}

impl fmt::Display for Dot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chain.render_dot(f)
    }
}

fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\\\""))
}
