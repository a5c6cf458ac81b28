// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns step declarations into a validated step graph.
//!
//! Assembly runs in this order:
//!
//! 1. Duplicate step ids and item-kind misuse are collected.
//! 2. Producers are indexed per item and checked for conflicts. When a simple
//!    item has both regular and overridable producers, only the regular one is
//!    kept.
//! 3. If outputs were declared, steps are pruned to those that contribute to an
//!    output. Weak productions do not pull a step in; order-only productions
//!    do, but never count as providing the item.
//! 4. Each required consumption adds a hard edge from every producer to the
//!    consumer; ordered optional consumptions add soft edges. Order-only
//!    producers are wired like real ones.
//! 5. Hard edges must be acyclic. Soft edges that would close a cycle are
//!    dropped with a warning.
//! 6. Steps are grouped into waves (Kahn levels) and ranked by the length of
//!    the longest path to a terminal step.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::chain::step::{Requirement, StepDescriptor};
use crate::chain::validation::{
    validate_acyclic, validate_item_kinds, validate_producers, validate_unique_step_ids, Producer,
};
use crate::errors::{ChainError, ChainValidationError};
use crate::items::{ItemId, ItemRegistry};
use crate::observability::messages::validation::{
    CyclicDependencyDetected, OrderingEdgeDropped, StepsPruned, ValidationCompleted,
    ValidationFailed, ValidationStarted,
};
use crate::observability::messages::StructuredLog;

/// Strength of an ordering edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    /// From an ordered optional consumption; never propagates failure
    Soft,
    /// From a required consumption
    Hard,
}

/// An incoming edge: the consumer waits for `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub step: usize,
    pub kind: EdgeKind,
    /// Items that created the edge
    pub items: Vec<ItemId>,
}

/// A step inside a frozen chain.
#[derive(Debug, Clone)]
pub struct StepNode {
    pub(crate) index: usize,
    pub(crate) descriptor: StepDescriptor,
    pub(crate) dependencies: Vec<Edge>,
    pub(crate) dependents: Vec<usize>,
    pub(crate) wave: usize,
    pub(crate) critical_path: usize,
}

impl StepNode {
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn descriptor(&self) -> &StepDescriptor {
        &self.descriptor
    }

    /// Steps this one waits for.
    pub fn dependencies(&self) -> &[Edge] {
        &self.dependencies
    }

    /// Steps waiting for this one.
    pub fn dependents(&self) -> &[usize] {
        &self.dependents
    }

    /// Zero-based wave; every dependency sits in an earlier wave.
    pub fn wave(&self) -> usize {
        self.wave
    }

    /// Number of steps on the longest path from this step to a terminal step,
    /// this step included.
    pub fn critical_path(&self) -> usize {
        self.critical_path
    }
}

/// A soft edge removed because it would have closed a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    pub producer: String,
    pub consumer: String,
    pub items: Vec<ItemId>,
}

/// The validated, immutable step graph.
#[derive(Debug, Clone)]
pub struct ChainGraph {
    pub(crate) steps: Vec<StepNode>,
    pub(crate) registry: ItemRegistry,
    pub(crate) initial: Vec<ItemId>,
    pub(crate) outputs: Vec<ItemId>,
    pub(crate) waves: Vec<Vec<usize>>,
    pub(crate) pruned: Vec<String>,
    pub(crate) dropped_edges: Vec<DroppedEdge>,
    /// Items whose overridable productions are discarded in favour of a regular producer
    pub(crate) overridden: HashSet<ItemId>,
}

impl ChainGraph {
    /// Validates declarations and builds the graph, collecting every error.
    pub(crate) fn assemble(
        steps: &[StepDescriptor],
        initial: &[ItemId],
        outputs: &[ItemId],
    ) -> Result<Self, ChainValidationError> {
        ValidationStarted {
            step_count: steps.len(),
        }
        .log();

        let mut errors = Vec::new();
        let mut registry = ItemRegistry::new();
        for id in initial.iter().chain(outputs) {
            registry.insert(id.clone());
        }

        collect(&mut errors, validate_unique_step_ids(steps));
        collect(&mut errors, validate_item_kinds(steps, &mut registry));

        let initial_set: HashSet<&ItemId> = initial.iter().collect();
        let producers = ProducerIndex::new(steps);
        for (item, list) in producers.iter() {
            collect(
                &mut errors,
                validate_producers(item, list, initial_set.contains(item), steps),
            );
        }
        let effective = producers.effective();
        let overridden = producers.overridden();

        let included = include_steps(steps, outputs, &effective, &initial_set, &mut errors);
        let mut wiring = wire(steps, &included, &effective, &initial_set, &mut errors);

        // Hard edges only: producer -> consumer
        let mut adjacency = vec![Vec::new(); steps.len()];
        for (consumer, deps) in wiring.iter().enumerate() {
            for (&producer, (kind, _)) in deps {
                if *kind == EdgeKind::Hard {
                    adjacency[producer].push(consumer);
                }
            }
        }

        let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
        collect(&mut errors, validate_acyclic(&adjacency, &ids));

        if !errors.is_empty() {
            for error in &errors {
                if let ChainError::CyclicDependency { cycle } = error {
                    let cycle: Vec<&str> = cycle.iter().map(String::as_str).collect();
                    CyclicDependencyDetected { cycle: &cycle }.log();
                }
            }
            ValidationFailed {
                error_count: errors.len(),
            }
            .log();
            return Err(ChainValidationError::new(errors));
        }

        let dropped_edges = add_soft_edges(steps, &mut wiring, &mut adjacency);
        for dropped in &dropped_edges {
            OrderingEdgeDropped {
                producer: &dropped.producer,
                consumer: &dropped.consumer,
            }
            .log();
        }

        let pruned: Vec<String> = steps
            .iter()
            .zip(&included)
            .filter(|(_, keep)| !**keep)
            .map(|(step, _)| step.id.clone())
            .collect();
        if !pruned.is_empty() {
            StepsPruned {
                pruned_count: pruned.len(),
                kept_count: steps.len() - pruned.len(),
            }
            .log();
        }

        let mut nodes = renumber(steps, &included, &wiring);
        let waves = rank(&mut nodes);

        ValidationCompleted {
            step_count: nodes.len(),
            edge_count: nodes.iter().map(|n| n.dependencies.len()).sum(),
            wave_count: waves.len(),
        }
        .log();

        Ok(Self {
            steps: nodes,
            registry,
            initial: initial.to_vec(),
            outputs: outputs.to_vec(),
            waves,
            pruned,
            dropped_edges,
            overridden,
        })
    }
}

/// Producers per item, in the order items were first produced.
struct ProducerIndex {
    order: Vec<ItemId>,
    by_item: HashMap<ItemId, Vec<Producer>>,
}

impl ProducerIndex {
    fn new(steps: &[StepDescriptor]) -> Self {
        let mut order = Vec::new();
        let mut by_item: HashMap<ItemId, Vec<Producer>> = HashMap::new();

        for (index, step) in steps.iter().enumerate() {
            for produce in &step.produces {
                let list = by_item.entry(produce.item.clone()).or_insert_with(|| {
                    order.push(produce.item.clone());
                    Vec::new()
                });
                list.push(Producer {
                    step: index,
                    overridable: produce.overridable,
                    weak: produce.weak,
                    order_only: produce.order_only,
                });
            }
        }

        Self { order, by_item }
    }

    fn iter(&self) -> impl Iterator<Item = (&ItemId, &[Producer])> {
        self.order
            .iter()
            .filter_map(|item| self.by_item.get(item).map(|list| (item, list.as_slice())))
    }

    /// Items with both regular and overridable producers.
    fn overridden(&self) -> HashSet<ItemId> {
        self.by_item
            .iter()
            .filter(|(_, list)| {
                let mut real = list.iter().filter(|p| !p.order_only);
                real.clone().any(|p| p.overridable) && real.any(|p| !p.overridable)
            })
            .map(|(item, _)| item.clone())
            .collect()
    }

    /// Producers that actually contribute: regular producers win over
    /// overridable ones. Order-only producers are always kept.
    fn effective(&self) -> HashMap<ItemId, Vec<Producer>> {
        self.by_item
            .iter()
            .map(|(item, list)| {
                let has_regular = list.iter().any(|p| !p.order_only && !p.overridable);
                let chosen = list
                    .iter()
                    .copied()
                    .filter(|p| p.order_only || !has_regular || !p.overridable)
                    .collect();
                (item.clone(), chosen)
            })
            .collect()
    }
}

/// Marks the steps that contribute to a declared output. Without outputs every
/// step is kept.
fn include_steps(
    steps: &[StepDescriptor],
    outputs: &[ItemId],
    effective: &HashMap<ItemId, Vec<Producer>>,
    initial: &HashSet<&ItemId>,
    errors: &mut Vec<ChainError>,
) -> Vec<bool> {
    if outputs.is_empty() {
        return vec![true; steps.len()];
    }

    let mut included = vec![false; steps.len()];
    let mut queue = VecDeque::new();

    for output in outputs {
        let pulled = pull_producers(output, effective, &mut included, &mut queue);
        if !pulled && !initial.contains(output) {
            errors.push(ChainError::MissingOutputProducer {
                item: output.clone(),
            });
        }
    }

    while let Some(index) = queue.pop_front() {
        for consume in &steps[index].consumes {
            pull_producers(&consume.item, effective, &mut included, &mut queue);
        }
    }

    included
}

/// Includes every non-weak producer of `item`; returns whether one that
/// really produces the item exists.
fn pull_producers(
    item: &ItemId,
    effective: &HashMap<ItemId, Vec<Producer>>,
    included: &mut [bool],
    queue: &mut VecDeque<usize>,
) -> bool {
    let mut found = false;
    for producer in effective.get(item).into_iter().flatten() {
        if producer.weak {
            continue;
        }
        found |= !producer.order_only;
        if !included[producer.step] {
            included[producer.step] = true;
            queue.push_back(producer.step);
        }
    }
    found
}

type Wiring = Vec<BTreeMap<usize, (EdgeKind, Vec<ItemId>)>>;

/// Builds the incoming edges of every included step, keyed by producer, and
/// reports required items nobody provides.
fn wire(
    steps: &[StepDescriptor],
    included: &[bool],
    effective: &HashMap<ItemId, Vec<Producer>>,
    initial: &HashSet<&ItemId>,
    errors: &mut Vec<ChainError>,
) -> Wiring {
    let mut wiring: Wiring = vec![BTreeMap::new(); steps.len()];

    for (consumer, step) in steps.iter().enumerate() {
        if !included[consumer] {
            continue;
        }
        for consume in &step.consumes {
            let sources: Vec<&Producer> = effective
                .get(&consume.item)
                .into_iter()
                .flatten()
                .filter(|p| included[p.step])
                .collect();

            if consume.requirement.is_required()
                && sources.iter().all(|p| p.order_only)
                && !initial.contains(&consume.item)
            {
                errors.push(ChainError::MissingProducer {
                    step: step.id.clone(),
                    item: consume.item.clone(),
                });
            }

            let kind = match consume.requirement {
                Requirement::Required => EdgeKind::Hard,
                Requirement::OptionalOrdered => EdgeKind::Soft,
                Requirement::Optional => continue,
            };

            for producer in sources.into_iter().map(|p| p.step) {
                // A step may read what it wrote itself when that is optional
                if producer == consumer && kind == EdgeKind::Soft {
                    continue;
                }
                let entry = wiring[consumer]
                    .entry(producer)
                    .or_insert((kind, Vec::new()));
                entry.0 = entry.0.max(kind);
                if !entry.1.contains(&consume.item) {
                    entry.1.push(consume.item.clone());
                }
            }
        }
    }

    wiring
}

/// Adds soft edges one at a time, dropping each one that would close a cycle
/// with the edges already accepted.
fn add_soft_edges(
    steps: &[StepDescriptor],
    wiring: &mut Wiring,
    adjacency: &mut [Vec<usize>],
) -> Vec<DroppedEdge> {
    let mut dropped = Vec::new();

    for consumer in 0..wiring.len() {
        let soft: Vec<usize> = wiring[consumer]
            .iter()
            .filter(|(_, (kind, _))| *kind == EdgeKind::Soft)
            .map(|(&producer, _)| producer)
            .collect();

        for producer in soft {
            if reaches(adjacency, consumer, producer) {
                if let Some((_, items)) = wiring[consumer].remove(&producer) {
                    dropped.push(DroppedEdge {
                        producer: steps[producer].id.clone(),
                        consumer: steps[consumer].id.clone(),
                        items,
                    });
                }
            } else {
                adjacency[producer].push(consumer);
            }
        }
    }

    dropped
}

fn reaches(adjacency: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; adjacency.len()];
    let mut queue = VecDeque::from([from]);
    seen[from] = true;

    while let Some(node) = queue.pop_front() {
        if node == to {
            return true;
        }
        for &next in &adjacency[node] {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    false
}

/// Drops pruned steps and rewrites edges to the compacted indices.
fn renumber(steps: &[StepDescriptor], included: &[bool], wiring: &Wiring) -> Vec<StepNode> {
    let mut new_index = vec![None; steps.len()];
    let mut kept = Vec::new();
    for (old, _) in included.iter().enumerate().filter(|(_, keep)| **keep) {
        new_index[old] = Some(kept.len());
        kept.push(old);
    }

    let mut nodes: Vec<StepNode> = kept
        .iter()
        .enumerate()
        .map(|(index, &old)| StepNode {
            index,
            descriptor: steps[old].clone(),
            dependencies: wiring[old]
                .iter()
                .filter_map(|(&producer, (kind, items))| {
                    new_index[producer].map(|step| Edge {
                        step,
                        kind: *kind,
                        items: items.clone(),
                    })
                })
                .collect(),
            dependents: Vec::new(),
            wave: 0,
            critical_path: 1,
        })
        .collect();

    let links: Vec<(usize, usize)> = nodes
        .iter()
        .flat_map(|node| node.dependencies.iter().map(move |edge| (edge.step, node.index)))
        .collect();
    for (producer, consumer) in links {
        nodes[producer].dependents.push(consumer);
    }
    for node in &mut nodes {
        node.dependents.sort_unstable();
    }

    nodes
}

/// Assigns waves and critical-path ranks; returns the waves.
fn rank(nodes: &mut [StepNode]) -> Vec<Vec<usize>> {
    let order = topological_order(nodes);

    for &index in &order {
        let wave = nodes[index]
            .dependencies
            .iter()
            .map(|edge| nodes[edge.step].wave + 1)
            .max()
            .unwrap_or(0);
        nodes[index].wave = wave;
    }

    for &index in order.iter().rev() {
        let longest = nodes[index]
            .dependents
            .iter()
            .map(|&d| nodes[d].critical_path)
            .max()
            .unwrap_or(0);
        nodes[index].critical_path = longest + 1;
    }

    let wave_count = nodes.iter().map(|n| n.wave + 1).max().unwrap_or(0);
    let mut waves = vec![Vec::new(); wave_count];
    for node in nodes.iter() {
        waves[node.wave].push(node.index);
    }
    waves
}

/// Kahn's algorithm, lowest index first among ready steps.
fn topological_order(nodes: &[StepNode]) -> Vec<usize> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.dependencies.len()).collect();
    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &dependent in &nodes[index].dependents {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push_back(dependent);
            }
        }
    }

    order
}

fn collect(errors: &mut Vec<ChainError>, result: Result<(), Vec<ChainError>>) {
    if let Err(found) = result {
        errors.extend(found);
    }
}
