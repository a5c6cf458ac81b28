// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod executor;
pub mod listener;

pub use executor::{BuildExecution, ChainExecutor};
pub use listener::StepListener;
