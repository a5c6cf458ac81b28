// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Work queue executor with dependency counting.
//!
//! Each step starts with a count of unfinished dependencies (hard and soft
//! edges). Steps whose count is zero sit in a [`PriorityWorkQueue`] ordered by
//! critical-path length. A coordinating task keeps up to `max_concurrency`
//! bodies running on blocking worker threads; as each one finishes, its
//! dependents' counts drop and newly ready steps join the queue.
//!
//! When a step fails, dependents reached through a required edge are skipped
//! and the skip propagates downstream without running anything. Under
//! [`FailureStrategy::FailFast`] nothing new is started after the first
//! failure, but bodies already running are allowed to finish.
//!
//! # Performance Characteristics
//!
//! - **Best for**: uneven graphs where long chains should start early
//! - **Time Complexity**: O((V + E) log V) scheduling overhead
//! - **Concurrency**: a new step starts as soon as any running step finishes
//!
//! # Example
//!
//! ```rust
//! use stepchain::chain::ChainBuilder;
//! use stepchain::context::SeedItems;
//! use stepchain::engine::WorkQueueExecutor;
//! use stepchain::items::{BuildItem, ItemKind};
//! use stepchain::traits::{BuildExecution, ChainExecutor};
//!
//! struct Greeting(String);
//! impl BuildItem for Greeting {
//!     const KIND: ItemKind = ItemKind::Simple;
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ChainBuilder::new();
//! builder
//!     .add_step("greet", |ctx| {
//!         ctx.produce(Greeting("hello".into()))?;
//!         Ok(())
//!     })
//!     .produces::<Greeting>()
//!     .build();
//! let chain = builder.build()?;
//!
//! let executor = WorkQueueExecutor::new(4);
//! let result = executor.execute(&chain, BuildExecution::new(SeedItems::new())).await?;
//! assert_eq!(result.require::<Greeting>()?.0, "hello");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::chain::graph::ChainGraph;
use crate::chain::BuildChain;
use crate::context::BuildResult;
use crate::engine::execution::{internal_failure, prepare_store, run_step, RunState};
use crate::engine::priority_work_queue::{PrioritizedTask, PriorityWorkQueue};
use crate::errors::{BuildFailure, FailureStrategy};
use crate::observability::messages::engine::{ExecutionCompleted, ExecutionFailed, ExecutionStarted};
use crate::observability::messages::StructuredLog;
use crate::traits::{BuildExecution, ChainExecutor, StepListener};

/// Dependency-counting executor with a critical-path priority queue.
#[derive(Debug, Clone)]
pub struct WorkQueueExecutor {
    max_concurrency: usize,
}

impl WorkQueueExecutor {
    /// Creates an executor running at most `max_concurrency` steps at once.
    /// Zero is raised to one.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for WorkQueueExecutor {
    /// One slot per available core, or four when that can not be determined.
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(concurrency)
    }
}

fn task(graph: &ChainGraph, index: usize) -> PrioritizedTask {
    PrioritizedTask::new(index, graph.steps[index].critical_path())
}

#[async_trait]
impl ChainExecutor for WorkQueueExecutor {
    fn name(&self) -> &'static str {
        "WorkQueue"
    }

    async fn execute_with_strategy(
        &self,
        chain: &BuildChain,
        execution: BuildExecution,
        failure_strategy: FailureStrategy,
    ) -> Result<BuildResult, BuildFailure> {
        ExecutionStarted {
            strategy: self.name(),
            step_count: chain.len(),
            max_concurrency: self.max_concurrency,
        }
        .log();
        let started = Instant::now();

        let store = Arc::new(prepare_store(chain, &execution.seeds)?);
        let listeners: Arc<[Arc<dyn StepListener>]> = execution.listeners.into();

        let graph = chain.graph();
        let mut state = RunState::new(graph, failure_strategy);
        let mut queue = PriorityWorkQueue::new();
        queue.extend(state.initial_ready().into_iter().map(|i| task(graph, i)));

        let mut running = JoinSet::new();
        loop {
            while running.len() < self.max_concurrency && !state.is_halted() {
                let Some(index) = queue.pop() else {
                    break;
                };
                state.mark_running(index);

                let chain = chain.clone();
                let store = Arc::clone(&store);
                let listeners = Arc::clone(&listeners);
                running.spawn_blocking(move || run_step(&chain, index, &store, &listeners));
            }

            // Nothing running means nothing can become ready any more
            let Some(joined) = running.join_next().await else {
                break;
            };
            match joined {
                Ok(outcome) => {
                    let ready = state.complete(outcome);
                    queue.extend(ready.into_iter().map(|i| task(graph, i)));
                }
                Err(join_error) => {
                    let failure = internal_failure(format!("Step task failed to join: {}", join_error));
                    ExecutionFailed {
                        strategy: self.name(),
                        error_count: failure.len(),
                    }
                    .log();
                    return Err(failure);
                }
            }
        }

        let result = state.finish(&store, started);
        match &result {
            Ok(build) => ExecutionCompleted {
                strategy: self.name(),
                step_count: build.step_records().len(),
                duration: build.duration(),
            }
            .log(),
            Err(failure) => ExecutionFailed {
                strategy: self.name(),
                error_count: failure.len(),
            }
            .log(),
        }
        result
    }
}
