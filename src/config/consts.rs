// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Overrides `metrics.output` when set to a non-empty path
pub const ENV_METRICS_OUTPUT: &str = "STEPCHAIN_METRICS_OUTPUT";
/// Overrides `graph_output` when set to a non-empty path
pub const ENV_GRAPH_OUTPUT: &str = "STEPCHAIN_GRAPH_OUTPUT";
/// Concurrency used when neither the config nor the platform provides one
pub const FALLBACK_MAX_CONCURRENCY: usize = 4;
