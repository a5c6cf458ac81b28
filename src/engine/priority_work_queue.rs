// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ready-step queue for the work queue executor.
//!
//! Steps on the longest remaining path run first, so the chain's critical path
//! is never starved by short side branches. Ties go to the step registered
//! first, which keeps scheduling deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrioritizedTask {
    pub step_index: usize,
    /// Steps on the longest path from this step to a terminal step
    pub critical_path: usize,
}

impl PrioritizedTask {
    pub fn new(step_index: usize, critical_path: usize) -> Self {
        Self {
            step_index,
            critical_path,
        }
    }
}

impl PartialOrd for PrioritizedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PrioritizedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: longer critical path first, then lower registration index
        self.critical_path
            .cmp(&other.critical_path)
            .then_with(|| Reverse(self.step_index).cmp(&Reverse(other.step_index)))
    }
}

#[derive(Debug, Default)]
pub struct PriorityWorkQueue {
    heap: BinaryHeap<PrioritizedTask>,
}

impl PriorityWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: PrioritizedTask) {
        self.heap.push(task);
    }

    pub fn extend<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = PrioritizedTask>,
    {
        self.heap.extend(tasks);
    }

    /// Removes and returns the highest-priority step index.
    pub fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|task| task.step_index)
    }

    pub fn peek(&self) -> Option<&PrioritizedTask> {
        self.heap.peek()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Empties the queue, returning the remaining step indices.
    pub fn drain(&mut self) -> Vec<usize> {
        self.heap.drain().map(|task| task.step_index).collect()
    }
}
