// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::context::SeedItems;
use crate::engine::factory::ExecutorFactory;
use crate::metrics::BuildMetrics;
use crate::traits::{BuildExecution, ChainExecutor};

/// Turns an [`EngineConfig`] into what a run needs: the executor and the
/// per-execution settings.
///
/// When the config names a metrics output, a [`BuildMetrics`] listener is
/// attached to every execution built by [`RuntimeBuilder::execution`].
///
/// # Examples
/// ```
/// use stepchain::config::{EngineConfig, RuntimeBuilder, Strategy};
///
/// let config = EngineConfig {
///     strategy: Strategy::Level,
///     ..EngineConfig::default()
/// };
///
/// let runtime = RuntimeBuilder::from_config(&config);
/// assert_eq!(runtime.executor().name(), "Level");
/// assert!(runtime.metrics().is_none());
/// ```
pub struct RuntimeBuilder {
    config: EngineConfig,
    executor: Box<dyn ChainExecutor>,
    metrics: Option<Arc<BuildMetrics>>,
}

impl RuntimeBuilder {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        let metrics = cfg
            .metrics
            .output
            .as_ref()
            .map(|_| Arc::new(BuildMetrics::new()));
        Self {
            config: cfg.clone(),
            executor: ExecutorFactory::from_config(cfg),
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &dyn ChainExecutor {
        self.executor.as_ref()
    }

    /// Collector shared by every execution, present when a report is configured.
    pub fn metrics(&self) -> Option<&Arc<BuildMetrics>> {
        self.metrics.as_ref()
    }

    /// Execution settings for one run with the given seeds.
    pub fn execution(&self, seeds: SeedItems) -> BuildExecution {
        let execution =
            BuildExecution::new(seeds).with_failure_strategy(self.config.failure_strategy);
        match &self.metrics {
            Some(metrics) => execution.with_listener(metrics.clone()),
            None => execution,
        }
    }
}
