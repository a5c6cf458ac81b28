// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub(crate) mod execution;
pub mod factory;
pub mod level_by_level;
pub mod priority_work_queue;
pub mod work_queue;
#[cfg(test)]
mod integration_tests;

pub use factory::ExecutorFactory;
pub use level_by_level::LevelByLevelExecutor;
pub use work_queue::WorkQueueExecutor;
