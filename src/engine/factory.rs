// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{EngineConfig, Strategy};
use crate::engine::level_by_level::LevelByLevelExecutor;
use crate::engine::work_queue::WorkQueueExecutor;
use crate::observability::messages::engine::ExecutorSelected;
use crate::observability::messages::StructuredLog;
use crate::traits::ChainExecutor;

/// Factory for creating chain executors from configuration
pub struct ExecutorFactory;

impl ExecutorFactory {
    /// Create the executor named by the configuration strategy
    pub fn from_config(cfg: &EngineConfig) -> Box<dyn ChainExecutor> {
        let max_concurrency = cfg.executor_options.resolved_concurrency();

        let executor: Box<dyn ChainExecutor> = match cfg.strategy {
            Strategy::WorkQueue => Box::new(WorkQueueExecutor::new(max_concurrency)),
            Strategy::Level => Box::new(LevelByLevelExecutor::new(max_concurrency)),
        };

        ExecutorSelected {
            strategy: executor.name(),
            max_concurrency,
        }
        .log();
        executor
    }
}
