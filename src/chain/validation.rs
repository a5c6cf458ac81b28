// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural checks run while a chain is being frozen.
//!
//! Every check returns `Err(Vec<ChainError>)` with all the problems it found,
//! so [`ChainGraph::assemble`](crate::chain::graph::ChainGraph::assemble) can
//! report everything in a single [`ChainValidationError`](crate::errors::ChainValidationError).
//!
//! # Cycle Detection
//!
//! Cycles are found with a three-color depth-first search over the required
//! edges (producer -> consumer):
//! - **White**: not visited yet
//! - **Gray**: on the current DFS path
//! - **Black**: fully explored
//!
//! Reaching a gray node closes a cycle; the path from that node to the current
//! one, plus the node again, is the reported cycle. Every back edge is reported,
//! with cycles over the same set of steps collapsed into one error.
//! **Time Complexity**: O(V + E).

use std::collections::{BTreeSet, HashSet};

use crate::chain::step::{Cardinality, StepDescriptor};
use crate::errors::ChainError;
use crate::items::{ItemId, ItemKind, ItemRegistry};

/// Rejects step ids registered more than once.
pub(crate) fn validate_unique_step_ids(steps: &[StepDescriptor]) -> Result<(), Vec<ChainError>> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for step in steps {
        if !seen.insert(step.id.as_str()) {
            errors.push(ChainError::DuplicateStepId {
                step: step.id.clone(),
            });
        }
    }

    into_result(errors)
}

/// Registers every declared item and checks each declaration against the
/// item's kind.
///
/// Every id ends up in `registry`, even when its declaration is rejected, so
/// later checks can still reason about it.
pub(crate) fn validate_item_kinds(
    steps: &[StepDescriptor],
    registry: &mut ItemRegistry,
) -> Result<(), Vec<ChainError>> {
    let mut errors = Vec::new();

    for step in steps {
        for produce in &step.produces {
            if let Err(error) = registry.declare(&produce.item, produce.kind) {
                errors.push(in_step(error, &step.id));
                registry.insert(produce.item.clone());
            }
            if produce.overridable && produce.item.kind() == ItemKind::Final {
                errors.push(ChainError::InvalidItemKind {
                    item: produce.item.clone(),
                    step: Some(step.id.clone()),
                    reason: "final items can not be produced as overridable".to_string(),
                });
            }
        }

        for consume in &step.consumes {
            registry.insert(consume.item.clone());
            let expected = Cardinality::for_kind(consume.item.kind());
            if consume.cardinality != expected {
                errors.push(ChainError::InvalidItemKind {
                    item: consume.item.clone(),
                    step: Some(step.id.clone()),
                    reason: format!(
                        "consumed as {} but {} items are consumed as {}",
                        cardinality_name(consume.cardinality),
                        consume.item.kind(),
                        cardinality_name(expected)
                    ),
                });
            }
        }
    }

    into_result(errors)
}

/// A single declared production, as seen by the producer checks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Producer {
    pub step: usize,
    pub overridable: bool,
    pub weak: bool,
    pub order_only: bool,
}

/// Checks the producers of one item: simple and final items may have a single
/// producer (simple items once per overridability), and a simple initial item
/// may not be produced at all. Order-only producers never write the item and
/// are not checked.
pub(crate) fn validate_producers(
    item: &ItemId,
    producers: &[Producer],
    is_initial: bool,
    steps: &[StepDescriptor],
) -> Result<(), Vec<ChainError>> {
    let mut errors = Vec::new();
    let step_id = |producer: &Producer| steps[producer.step].id.clone();
    let producers: Vec<&Producer> = producers.iter().filter(|p| !p.order_only).collect();

    match item.kind() {
        ItemKind::Multi => {}
        ItemKind::Simple | ItemKind::Final => {
            if is_initial {
                for producer in &producers {
                    errors.push(ChainError::ProducesInitialItem {
                        item: item.clone(),
                        step: step_id(producer),
                    });
                }
            }

            let groups: Vec<Vec<&Producer>> = if item.kind() == ItemKind::Final {
                vec![producers.clone()]
            } else {
                [false, true]
                    .iter()
                    .map(|flag| {
                        producers
                            .iter()
                            .copied()
                            .filter(|p| p.overridable == *flag)
                            .collect()
                    })
                    .collect()
            };

            for group in groups {
                if let Some((first, rest)) = group.split_first() {
                    for second in rest {
                        errors.push(ChainError::DuplicateProducer {
                            item: item.clone(),
                            first: step_id(first),
                            second: step_id(second),
                        });
                    }
                }
            }
        }
    }

    into_result(errors)
}

/// Validates that the required-edge graph is acyclic.
///
/// `adjacency[i]` lists the steps that must run after step `i`. A step listed
/// in its own adjacency is a one-step cycle.
pub(crate) fn validate_acyclic(
    adjacency: &[Vec<usize>],
    step_ids: &[&str],
) -> Result<(), Vec<ChainError>> {
    let mut color = vec![Color::White; adjacency.len()];
    let mut path = Vec::new();
    let mut cycles: Vec<Vec<usize>> = Vec::new();

    for node in 0..adjacency.len() {
        if color[node] == Color::White {
            dfs_cycle_detection(node, adjacency, &mut color, &mut path, &mut cycles);
        }
    }

    let mut seen_members = HashSet::new();
    let errors: Vec<ChainError> = cycles
        .into_iter()
        .filter(|cycle| seen_members.insert(cycle.iter().copied().collect::<BTreeSet<_>>()))
        .map(|cycle| ChainError::CyclicDependency {
            cycle: cycle.iter().map(|&i| step_ids[i].to_string()).collect(),
        })
        .collect();

    into_result(errors)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Recursive DFS; every gray neighbor closes a cycle.
fn dfs_cycle_detection(
    node: usize,
    adjacency: &[Vec<usize>],
    color: &mut [Color],
    path: &mut Vec<usize>,
    cycles: &mut Vec<Vec<usize>>,
) {
    color[node] = Color::Gray;
    path.push(node);

    for &next in &adjacency[node] {
        match color[next] {
            Color::White => dfs_cycle_detection(next, adjacency, color, path, cycles),
            Color::Gray => {
                if let Some(start) = path.iter().position(|&n| n == next) {
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    cycles.push(cycle);
                }
            }
            Color::Black => {}
        }
    }

    path.pop();
    color[node] = Color::Black;
}

fn in_step(error: ChainError, step: &str) -> ChainError {
    match error {
        ChainError::InvalidItemKind { item, reason, .. } => ChainError::InvalidItemKind {
            item,
            step: Some(step.to_string()),
            reason,
        },
        other => other,
    }
}

fn cardinality_name(cardinality: Cardinality) -> &'static str {
    match cardinality {
        Cardinality::Single => "a single value",
        Cardinality::Multi => "a list",
    }
}

fn into_result(errors: Vec<ChainError>) -> Result<(), Vec<ChainError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
