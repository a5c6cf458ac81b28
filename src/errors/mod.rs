// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod chain;
mod config;
mod context;
mod execution;

pub use chain::{ChainError, ChainValidationError};
pub use config::ConfigError;
pub use context::ContextError;
pub use execution::{BuildFailure, ExecutionError, FailureStrategy};
