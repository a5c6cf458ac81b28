// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::chain::BuildChain;
use crate::context::{BuildResult, SeedItems};
use crate::errors::{BuildFailure, FailureStrategy};
use crate::traits::StepListener;

/// Everything one execution of a chain needs besides the chain itself.
#[derive(Clone, Default)]
pub struct BuildExecution {
    pub seeds: SeedItems,
    pub failure_strategy: FailureStrategy,
    pub listeners: Vec<Arc<dyn StepListener>>,
}

impl BuildExecution {
    pub fn new(seeds: SeedItems) -> Self {
        Self {
            seeds,
            ..Self::default()
        }
    }

    pub fn with_failure_strategy(mut self, failure_strategy: FailureStrategy) -> Self {
        self.failure_strategy = failure_strategy;
        self
    }

    /// Registers a listener notified around every step.
    pub fn with_listener(mut self, listener: Arc<dyn StepListener>) -> Self {
        self.listeners.push(listener);
        self
    }
}

impl fmt::Debug for BuildExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildExecution")
            .field("seeds", &self.seeds.len())
            .field("failure_strategy", &self.failure_strategy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Runs a [`BuildChain`] against a fresh result store.
///
/// Implementations differ only in how they schedule steps; every executor
/// honors the chain's ordering edges and reports failures the same way.
#[async_trait]
pub trait ChainExecutor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Executes the chain with the failure strategy carried by `execution`.
    async fn execute(
        &self,
        chain: &BuildChain,
        execution: BuildExecution,
    ) -> Result<BuildResult, BuildFailure> {
        let failure_strategy = execution.failure_strategy;
        self.execute_with_strategy(chain, execution, failure_strategy)
            .await
    }

    async fn execute_with_strategy(
        &self,
        chain: &BuildChain,
        execution: BuildExecution,
        failure_strategy: FailureStrategy,
    ) -> Result<BuildResult, BuildFailure>;
}
