// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod runtime;

pub mod consts;

pub use loader::{
    load_config, parse_config, ConfigFormat, EngineConfig, ExecutorOptions, MetricsOptions,
    Strategy,
};
pub use runtime::RuntimeBuilder;
