// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wave-by-wave executor.
//!
//! The chain's steps are already partitioned into waves (Kahn levels): every
//! dependency of a step sits in an earlier wave. This executor runs one wave
//! at a time; the runnable steps of a wave execute concurrently, bounded by a
//! semaphore, and the next wave starts only after the whole wave has finished.
//!
//! ```text
//! Wave 0: [config, sources]      <- no dependencies
//! Wave 1: [compile]              <- needs config and sources
//! Wave 2: [package, docs]        <- need compile
//! ```
//!
//! # Performance Characteristics
//!
//! - **Best for**: wide, balanced graphs
//! - **Time Complexity**: O(V + E)
//! - **Trade-off**: a slow step holds back the whole next wave
//!
//! Failure handling matches the work queue executor: steps downstream of a
//! failure through a required edge are skipped, and under fail-fast no wave
//! starts after the one containing the first failure.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::chain::BuildChain;
use crate::context::BuildResult;
use crate::engine::execution::{internal_failure, prepare_store, run_step, RunState};
use crate::errors::{BuildFailure, FailureStrategy};
use crate::observability::messages::engine::{
    ExecutionCompleted, ExecutionFailed, ExecutionStarted, LevelComputationCompleted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{BuildExecution, ChainExecutor, StepListener};

/// Runs each wave of the chain concurrently, one wave after another.
#[derive(Debug, Clone)]
pub struct LevelByLevelExecutor {
    max_concurrency: usize,
}

impl LevelByLevelExecutor {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for LevelByLevelExecutor {
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(concurrency)
    }
}

#[async_trait]
impl ChainExecutor for LevelByLevelExecutor {
    fn name(&self) -> &'static str {
        "Level"
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
        LevelComputationCompleted {
            wave_count: graph.waves.len(),
            step_count: graph.steps.len(),
        }
        .log();

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut state = RunState::new(graph, failure_strategy);

        for (wave_index, wave) in graph.waves.iter().enumerate() {
            if state.is_halted() {
                break;
            }

            // Skipped steps are no longer ready
            let runnable: Vec<usize> = wave.iter().copied().filter(|&i| state.is_ready(i)).collect();
            tracing::debug!(wave = wave_index, steps = runnable.len(), "executing wave");

            let mut join_set = JoinSet::new();
            for index in runnable {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| internal_failure(format!("Concurrency limiter closed: {}", e)))?;
                state.mark_running(index);

                let chain = chain.clone();
                let store = Arc::clone(&store);
                let listeners = Arc::clone(&listeners);
                join_set.spawn_blocking(move || {
                    let _permit = permit;
                    run_step(&chain, index, &store, &listeners)
                });
            }

            while let Some(joined) = join_set.join_next().await {
                let outcome = joined
                    .map_err(|e| internal_failure(format!("Step task failed to join: {}", e)))?;
                // Readiness is decided by the wave order, not the returned list
                state.complete(outcome);
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
