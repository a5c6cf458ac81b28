// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-step timing records and the build metrics report.
//!
//! Every executor produces one [`StepRecord`] per step it ran and hands it to
//! the registered [`StepListener`]s. [`BuildMetrics`] is the listener that
//! collects them and renders the report: records sorted by duration, longest
//! first, serialized as JSON.
//!
//! ```json
//! {
//!   "records": [
//!     { "stepId": "compile", "thread": "tokio-runtime-worker", "started": "14:03:07.219", "duration": 50 }
//!   ]
//! }
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::traits::StepListener;

/// Timing of one executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_id: String,
    /// Name of the worker thread that ran the body
    pub thread: String,
    /// Wall-clock start time
    pub started: DateTime<Local>,
    pub duration: Duration,
    pub succeeded: bool,
}

impl StepRecord {
    /// Captures the calling thread's name, falling back to its id.
    pub fn current_thread_name() -> String {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => name.to_string(),
            None => format!("{:?}", thread.id()),
        }
    }
}

/// Collects step records from one or more executions.
#[derive(Debug, Default)]
pub struct BuildMetrics {
    records: Mutex<Vec<StepRecord>>,
}

#[derive(Serialize)]
struct MetricsReport<'a> {
    records: Vec<ReportEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportEntry<'a> {
    step_id: &'a str,
    thread: &'a str,
    started: String,
    /// Milliseconds
    duration: u64,
}

impl BuildMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: StepRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    /// Records in arrival order.
    pub fn records(&self) -> Vec<StepRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records sorted by duration, longest first. Ties keep arrival order.
    pub fn sorted_records(&self) -> Vec<StepRecord> {
        let mut records = self.records();
        records.sort_by(|a, b| b.duration.cmp(&a.duration));
        records
    }

    /// Sum of every recorded step duration.
    pub fn total_step_time(&self) -> Duration {
        self.records().iter().map(|r| r.duration).sum()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let records = self.sorted_records();
        serde_json::to_string_pretty(&report(&records))
    }

    /// Writes the JSON report to `path`, replacing any existing file.
    pub fn write_report(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let records = self.sorted_records();
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, &report(&records))?;
        Ok(())
    }
}

impl StepListener for BuildMetrics {
    fn step_finished(&self, record: &StepRecord) {
        self.record(record.clone());
    }
}

fn report(records: &[StepRecord]) -> MetricsReport<'_> {
    MetricsReport {
        records: records
            .iter()
            .map(|r| ReportEntry {
                step_id: &r.step_id,
                thread: &r.thread,
                started: r.started.format("%H:%M:%S%.3f").to_string(),
                duration: u64::try_from(r.duration.as_millis()).unwrap_or(u64::MAX),
            })
            .collect(),
    }
}
