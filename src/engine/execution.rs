// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! State shared by the executors: seeding, running one step, and the
//! bookkeeping that decides which steps become ready, which are skipped and
//! how the final result is assembled.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;

use crate::chain::graph::{ChainGraph, EdgeKind};
use crate::chain::BuildChain;
use crate::context::{BuildResult, ResultStore, SeedItems, StepContext};
use crate::errors::{BuildFailure, ExecutionError, FailureStrategy};
use crate::metrics::StepRecord;
use crate::observability::messages::engine::SchedulerDeadlockDetected;
use crate::observability::messages::step::{
    StepExecutionCompleted, StepExecutionFailed, StepExecutionStarted, StepSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::StepListener;

/// Checks the seeds against the chain's initial items and loads them into a
/// fresh store.
pub(crate) fn prepare_store(chain: &BuildChain, seeds: &SeedItems) -> Result<ResultStore, BuildFailure> {
    let graph = chain.graph();
    let mut errors = Vec::new();

    for (id, _) in seeds.iter() {
        if !graph.initial.contains(id) {
            errors.push(ExecutionError::UndeclaredInitialItem { item: id.clone() });
        }
    }

    for id in &graph.initial {
        let required = graph.steps.iter().any(|s| {
            s.descriptor
                .consume_of(id)
                .is_some_and(|c| c.requirement.is_required())
        });
        let produced = graph.steps.iter().any(|s| {
            s.descriptor
                .produce_of(id)
                .is_some_and(|p| !p.order_only)
        });
        if required && !produced && !seeds.contains(id) {
            errors.push(ExecutionError::MissingInitialItem { item: id.clone() });
        }
    }

    if !errors.is_empty() {
        return Err(BuildFailure::new(errors));
    }

    let store = ResultStore::new(&graph.registry).with_overridden(graph.overridden.iter().cloned());
    for (id, value) in seeds.iter() {
        store
            .produce(id, Arc::clone(value))
            .map_err(|e| internal_failure(format!("Failed to seed {}: {}", id, e)))?;
    }
    Ok(store)
}

/// What a worker reports back for one step.
#[derive(Debug)]
pub(crate) struct StepOutcome {
    pub index: usize,
    pub record: StepRecord,
    pub error: Option<anyhow::Error>,
}

/// Runs one step body on the current thread and times it.
///
/// A panicking body is reported as a failure of that step.
pub(crate) fn run_step(
    chain: &BuildChain,
    index: usize,
    store: &ResultStore,
    listeners: &[Arc<dyn StepListener>],
) -> StepOutcome {
    let descriptor = &chain.graph().steps[index].descriptor;
    let step_id = descriptor.id.as_str();

    for listener in listeners {
        listener.step_started(step_id);
    }
    StepExecutionStarted { step_id }.log();

    let started = Local::now();
    let clock = Instant::now();
    let thread = StepRecord::current_thread_name();

    let context = StepContext::new(descriptor, store);
    let result = panic::catch_unwind(AssertUnwindSafe(|| descriptor.body.execute(&context)));
    let duration = clock.elapsed();

    let error = match result {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error),
        Err(payload) => Some(anyhow::anyhow!(
            "step panicked: {}",
            panic_message(payload.as_ref())
        )),
    };

    match &error {
        None => StepExecutionCompleted { step_id, duration }.log(),
        Some(error) => StepExecutionFailed { step_id, error }.log(),
    }

    let record = StepRecord {
        step_id: step_id.to_string(),
        thread,
        started,
        duration,
        succeeded: error.is_none(),
    };
    for listener in listeners {
        listener.step_finished(&record);
    }

    StepOutcome {
        index,
        record,
        error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) fn internal_failure(message: String) -> BuildFailure {
    BuildFailure::new(vec![ExecutionError::InternalError { message }])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

/// Dependency counting for one execution.
///
/// Owned by the executor's coordinating task; workers only report
/// [`StepOutcome`]s back to it.
pub(crate) struct RunState<'c> {
    graph: &'c ChainGraph,
    failure_strategy: FailureStrategy,
    status: Vec<Status>,
    /// Unfinished dependencies per step
    remaining: Vec<usize>,
    /// Root failed step upstream of each step, through hard edges
    poisoned_by: Vec<Option<usize>>,
    halted: bool,
    failures: Vec<ExecutionError>,
    skipped: Vec<ExecutionError>,
    records: Vec<StepRecord>,
}

impl<'c> RunState<'c> {
    pub fn new(graph: &'c ChainGraph, failure_strategy: FailureStrategy) -> Self {
        let count = graph.steps.len();
        Self {
            graph,
            failure_strategy,
            status: vec![Status::Pending; count],
            remaining: graph.steps.iter().map(|s| s.dependencies.len()).collect(),
            poisoned_by: vec![None; count],
            halted: false,
            failures: Vec::new(),
            skipped: Vec::new(),
            records: Vec::with_capacity(count),
        }
    }

    /// Steps with no dependencies, in index order.
    pub fn initial_ready(&self) -> Vec<usize> {
        (0..self.graph.steps.len())
            .filter(|&i| self.remaining[i] == 0)
            .collect()
    }

    /// True when a step has no unfinished dependency and has not run yet.
    pub fn is_ready(&self, index: usize) -> bool {
        self.status[index] == Status::Pending && self.remaining[index] == 0
    }

    /// True once fail-fast has stopped scheduling.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn mark_running(&mut self, index: usize) {
        self.status[index] = Status::Running;
    }

    /// Records a finished step and returns the steps that became ready.
    ///
    /// Dependents reached through a hard edge from a failure are skipped
    /// instead of being returned, transitively.
    pub fn complete(&mut self, outcome: StepOutcome) -> Vec<usize> {
        let index = outcome.index;
        self.records.push(outcome.record);

        match outcome.error {
            None => self.status[index] = Status::Succeeded,
            Some(cause) => {
                self.status[index] = Status::Failed;
                self.failures.push(ExecutionError::StepFailed {
                    step: self.graph.steps[index].id().to_string(),
                    cause: Arc::new(cause),
                });
                if self.failure_strategy == FailureStrategy::FailFast {
                    self.halted = true;
                }
            }
        }

        self.release(index)
    }

    fn release(&mut self, finished: usize) -> Vec<usize> {
        let mut ready = Vec::new();
        let mut resolved = vec![finished];

        while let Some(done) = resolved.pop() {
            let root = match self.status[done] {
                Status::Failed => Some(done),
                Status::Skipped => self.poisoned_by[done],
                _ => None,
            };

            for &dependent in &self.graph.steps[done].dependents {
                let hard = self.graph.steps[dependent]
                    .dependencies
                    .iter()
                    .any(|e| e.step == done && e.kind == EdgeKind::Hard);
                if hard && self.poisoned_by[dependent].is_none() {
                    self.poisoned_by[dependent] = root;
                }

                self.remaining[dependent] -= 1;
                if self.remaining[dependent] > 0 {
                    continue;
                }
                match self.poisoned_by[dependent] {
                    Some(upstream) => {
                        self.skip(dependent, upstream);
                        resolved.push(dependent);
                    }
                    None => ready.push(dependent),
                }
            }
        }

        ready
    }

    fn skip(&mut self, index: usize, upstream: usize) {
        self.status[index] = Status::Skipped;
        let step = self.graph.steps[index].id();
        let upstream = self.graph.steps[upstream].id();
        StepSkipped {
            step_id: step,
            upstream,
        }
        .log();
        self.skipped.push(ExecutionError::SkippedDueToUpstreamFailure {
            step: step.to_string(),
            upstream: upstream.to_string(),
        });
    }

    /// Closes the run: classifies steps that never ran and either snapshots the
    /// store or returns every recorded error.
    pub fn finish(mut self, store: &ResultStore, started: Instant) -> Result<BuildResult, BuildFailure> {
        let mut not_scheduled = Vec::new();
        let mut engine_errors = Vec::new();

        let pending: Vec<usize> = self
            .graph
            .waves
            .iter()
            .flatten()
            .copied()
            .filter(|&i| self.status[i] == Status::Pending)
            .collect();

        if self.halted {
            // Wave order visits dependencies first, so poison flows downstream
            for &index in &pending {
                let inherited = self.graph.steps[index]
                    .dependencies
                    .iter()
                    .filter(|e| e.kind == EdgeKind::Hard)
                    .find_map(|e| match self.status[e.step] {
                        Status::Failed => Some(e.step),
                        _ => self.poisoned_by[e.step],
                    });
                if self.poisoned_by[index].is_none() {
                    self.poisoned_by[index] = inherited;
                }
                match self.poisoned_by[index] {
                    Some(upstream) => self.skip(index, upstream),
                    None => not_scheduled.push(ExecutionError::NotScheduled {
                        step: self.graph.steps[index].id().to_string(),
                    }),
                }
            }
        } else if !pending.is_empty() {
            let stuck: Vec<String> = pending
                .iter()
                .map(|&i| self.graph.steps[i].id().to_string())
                .collect();
            SchedulerDeadlockDetected {
                stuck_count: stuck.len(),
            }
            .log();
            engine_errors.push(ExecutionError::SchedulerDeadlock { stuck });
        }

        let mut errors = self.failures;
        errors.append(&mut self.skipped);
        errors.append(&mut not_scheduled);
        errors.append(&mut engine_errors);
        if !errors.is_empty() {
            return Err(BuildFailure::new(errors));
        }

        store
            .finalize_result()
            .map(|result| result.with_timing(started.elapsed(), self.records))
            .map_err(|e| internal_failure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::chain::ChainBuilder;
    use crate::items::{BuildItem, ItemKind};

    struct Raw;
    impl BuildItem for Raw {
        const KIND: ItemKind = ItemKind::Simple;
    }

    struct Cooked;
    impl BuildItem for Cooked {
        const KIND: ItemKind = ItemKind::Simple;
    }

    struct Note;
    impl BuildItem for Note {
        const KIND: ItemKind = ItemKind::Multi;
    }

    // raw -> cook -> serve, with `annotate` ordered before serve through a soft edge
    fn chain() -> BuildChain {
        let mut builder = ChainBuilder::new();
        builder.add_step("raw", |_ctx| Ok(())).produces::<Raw>().build();
        builder
            .add_step("cook", |_ctx| Ok(()))
            .consumes::<Raw>()
            .produces::<Cooked>()
            .build();
        builder
            .add_step("serve", |_ctx| Ok(()))
            .consumes::<Cooked>()
            .consumes_ordered::<Note>()
            .build();
        builder.add_step("annotate", |_ctx| Ok(())).produces::<Note>().build();
        builder.build().unwrap()
    }

    fn outcome(index: usize, failed: bool) -> StepOutcome {
        StepOutcome {
            index,
            record: StepRecord {
                step_id: format!("step-{index}"),
                thread: "test".into(),
                started: Local::now(),
                duration: Duration::from_millis(1),
                succeeded: !failed,
            },
            error: failed.then(|| anyhow::anyhow!("boom")),
        }
    }

    fn index_of(chain: &BuildChain, id: &str) -> usize {
        chain.step(id).unwrap().index()
    }

    #[test]
    fn test_successful_run_releases_dependents() {
        let chain = chain();
        let store = prepare_store(&chain, &SeedItems::new()).unwrap();
        let mut state = RunState::new(chain.graph(), FailureStrategy::FailFast);
        let (raw, cook, serve, annotate) = (
            index_of(&chain, "raw"),
            index_of(&chain, "cook"),
            index_of(&chain, "serve"),
            index_of(&chain, "annotate"),
        );

        assert_eq!(state.initial_ready(), vec![raw, annotate]);
        assert_eq!(state.complete(outcome(raw, false)), vec![cook]);
        assert!(state.complete(outcome(annotate, false)).is_empty());
        assert_eq!(state.complete(outcome(cook, false)), vec![serve]);
        assert!(state.complete(outcome(serve, false)).is_empty());

        let result = state.finish(&store, Instant::now()).unwrap();
        assert_eq!(result.step_records().len(), 4);
    }

    #[test]
    fn test_failure_skips_hard_dependents_transitively() {
        let chain = chain();
        let store = prepare_store(&chain, &SeedItems::new()).unwrap();
        let mut state = RunState::new(chain.graph(), FailureStrategy::ContinueOnError);

        assert!(state.complete(outcome(index_of(&chain, "raw"), true)).is_empty());
        assert!(state.complete(outcome(index_of(&chain, "annotate"), false)).is_empty());

        let failure = state.finish(&store, Instant::now()).unwrap_err();
        assert_eq!(failure.failed_steps(), vec!["raw"]);
        assert_eq!(failure.skipped_steps(), vec!["cook", "serve"]);
        assert!(failure.iter().all(|e| match e {
            ExecutionError::SkippedDueToUpstreamFailure { upstream, .. } => upstream == "raw",
            _ => true,
        }));
    }

    #[test]
    fn test_soft_edge_failure_does_not_skip() {
        let chain = chain();
        let mut state = RunState::new(chain.graph(), FailureStrategy::ContinueOnError);

        state.complete(outcome(index_of(&chain, "annotate"), true));
        state.complete(outcome(index_of(&chain, "raw"), false));
        let ready = state.complete(outcome(index_of(&chain, "cook"), false));

        assert_eq!(ready, vec![index_of(&chain, "serve")]);
    }

    #[test]
    fn test_fail_fast_classifies_pending_steps() {
        let chain = chain();
        let store = prepare_store(&chain, &SeedItems::new()).unwrap();
        let mut state = RunState::new(chain.graph(), FailureStrategy::FailFast);

        state.mark_running(index_of(&chain, "annotate"));
        state.complete(outcome(index_of(&chain, "annotate"), true));
        assert!(state.is_halted());

        let failure = state.finish(&store, Instant::now()).unwrap_err();
        assert_eq!(failure.failed_steps(), vec!["annotate"]);
        let not_scheduled: Vec<&str> = failure
            .iter()
            .filter_map(|e| match e {
                ExecutionError::NotScheduled { step } => Some(step.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(not_scheduled, vec!["raw", "cook", "serve"]);
    }

    #[test]
    fn test_unfinished_run_is_a_deadlock() {
        let chain = chain();
        let store = prepare_store(&chain, &SeedItems::new()).unwrap();
        let state = RunState::new(chain.graph(), FailureStrategy::ContinueOnError);

        let failure = state.finish(&store, Instant::now()).unwrap_err();
        match &failure.errors[..] {
            [ExecutionError::SchedulerDeadlock { stuck }] => assert_eq!(stuck.len(), 4),
            other => panic!("Expected a deadlock, got {other:?}"),
        }
    }

    #[test]
    fn test_seed_validation() {
        let mut builder = ChainBuilder::new();
        builder.add_initial::<Raw>();
        builder.add_step("cook", |_ctx| Ok(())).consumes::<Raw>().build();
        let chain = builder.build().unwrap();

        let missing = prepare_store(&chain, &SeedItems::new()).unwrap_err();
        assert!(matches!(missing.errors[0], ExecutionError::MissingInitialItem { .. }));

        let undeclared = prepare_store(&chain, &SeedItems::new().with(Raw).with(Cooked)).unwrap_err();
        assert!(matches!(
            undeclared.errors[..],
            [ExecutionError::UndeclaredInitialItem { .. }]
        ));

        let store = prepare_store(&chain, &SeedItems::new().with(Raw)).unwrap();
        assert!(store.get_single(&crate::items::ItemId::of::<Raw>()).unwrap().is_some());
    }

    #[test]
    fn test_order_only_step_does_not_supply_an_initial_item() {
        let mut builder = ChainBuilder::new();
        builder.add_initial::<Raw>();
        builder.add_step("wash", |_ctx| Ok(())).before_consume::<Raw>().build();
        builder.add_step("cook", |_ctx| Ok(())).consumes::<Raw>().build();
        let chain = builder.build().unwrap();

        let missing = prepare_store(&chain, &SeedItems::new()).unwrap_err();
        assert!(matches!(
            missing.errors[..],
            [ExecutionError::MissingInitialItem { .. }]
        ));
    }

    #[test]
    fn test_panicking_step_is_reported_as_failure() {
        let mut builder = ChainBuilder::new();
        builder
            .add_step("explode", |_ctx| panic!("kaboom"))
            .build();
        let chain = builder.build().unwrap();
        let store = prepare_store(&chain, &SeedItems::new()).unwrap();

        let outcome = run_step(&chain, 0, &store, &[]);
        let error = outcome.error.unwrap();
        assert!(error.to_string().contains("kaboom"));
        assert!(!outcome.record.succeeded);
    }
}
