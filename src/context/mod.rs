// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-execution item storage and the scoped view steps use to reach it.
//!
//! A fresh [`ResultStore`] is created for every execution of a chain. Steps
//! never touch it directly: each body receives a [`StepContext`] limited to the
//! items the step declared. When the execution succeeds the store is closed and
//! its contents are handed back as a [`BuildResult`].

mod result;
mod seeds;
mod step_context;
mod store;

pub use result::BuildResult;
pub use seeds::SeedItems;
pub use step_context::StepContext;
pub use store::ResultStore;
