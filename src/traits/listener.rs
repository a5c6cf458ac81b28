// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::metrics::StepRecord;

/// Observer notified as steps run.
///
/// Callbacks are invoked from worker threads, possibly concurrently, and must
/// not block for long.
pub trait StepListener: Send + Sync {
    fn step_started(&self, _step_id: &str) {}

    /// Called once per executed step, whether it succeeded or failed.
    fn step_finished(&self, record: &StepRecord);
}
