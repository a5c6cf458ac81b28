// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end behaviour of the executors on realistic chains.
//!
//! Most scenarios run on both executors; they must agree on what is produced
//! and on how failures are reported.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::chain::{BuildChain, ChainBuilder, Requirement};
use crate::context::SeedItems;
use crate::engine::{LevelByLevelExecutor, WorkQueueExecutor};
use crate::errors::{ChainError, ExecutionError, FailureStrategy};
use crate::items::{BuildItem, ItemKind};
use crate::metrics::BuildMetrics;
use crate::traits::{BuildExecution, ChainExecutor};

struct SourceRoot(String);
impl BuildItem for SourceRoot {
    const KIND: ItemKind = ItemKind::Simple;
}

struct ParsedModule(String);
impl BuildItem for ParsedModule {
    const KIND: ItemKind = ItemKind::Multi;
}

struct Classpath(Vec<String>);
impl BuildItem for Classpath {
    const KIND: ItemKind = ItemKind::Simple;
}

struct Banner(String);
impl BuildItem for Banner {
    const KIND: ItemKind = ItemKind::Simple;
}

struct Archive(String);
impl BuildItem for Archive {
    const KIND: ItemKind = ItemKind::Final;
}

struct Feature(&'static str);
impl BuildItem for Feature {
    const KIND: ItemKind = ItemKind::Multi;
}

fn executors() -> Vec<Box<dyn ChainExecutor>> {
    vec![
        Box::new(WorkQueueExecutor::new(4)),
        Box::new(LevelByLevelExecutor::new(4)),
    ]
}

/// Start and finish events, in the order they happened.
#[derive(Default)]
struct Timeline {
    events: Mutex<Vec<(String, bool)>>,
    runs: Mutex<HashMap<String, usize>>,
}

impl Timeline {
    fn start(&self, step: &str) {
        self.events.lock().unwrap().push((step.to_string(), true));
        *self.runs.lock().unwrap().entry(step.to_string()).or_default() += 1;
    }

    fn finish(&self, step: &str) {
        self.events.lock().unwrap().push((step.to_string(), false));
    }

    fn position(&self, step: &str, started: bool) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .position(|(s, st)| s == step && *st == started)
            .unwrap()
    }

    /// `before` finished before `after` started.
    fn happened_before(&self, before: &str, after: &str) -> bool {
        self.position(before, false) < self.position(after, true)
    }

    fn runs(&self) -> HashMap<String, usize> {
        self.runs.lock().unwrap().clone()
    }
}

/// resolve -> parse-{a,b,c} -> package, seeded with a source root
fn compile_chain(timeline: Arc<Timeline>) -> BuildChain {
    let mut builder = ChainBuilder::new();
    builder.add_initial::<SourceRoot>();

    let t = Arc::clone(&timeline);
    builder
        .add_step("resolve", move |ctx| {
            t.start("resolve");
            let root = ctx.consume::<SourceRoot>()?;
            ctx.produce(Classpath(vec![format!("{}/lib", root.0)]))?;
            t.finish("resolve");
            Ok(())
        })
        .consumes::<SourceRoot>()
        .produces::<Classpath>()
        .build();

    for name in ["a", "b", "c"] {
        let t = Arc::clone(&timeline);
        let id = format!("parse-{name}");
        builder
            .add_step(id.clone(), move |ctx| {
                t.start(&id);
                let classpath = ctx.consume::<Classpath>()?;
                ctx.produce(ParsedModule(format!("{name}:{}", classpath.0.len())))?;
                t.finish(&id);
                Ok(())
            })
            .consumes::<Classpath>()
            .produces::<ParsedModule>()
            .build();
    }

    let t = Arc::clone(&timeline);
    builder
        .add_step("package", move |ctx| {
            t.start("package");
            let mut modules: Vec<String> = ctx
                .consume_multi::<ParsedModule>()?
                .iter()
                .map(|m| m.0.clone())
                .collect();
            modules.sort();
            ctx.produce(Archive(modules.join(",")))?;
            t.finish("package");
            Ok(())
        })
        .consumes::<ParsedModule>()
        .produces::<Archive>()
        .build();

    builder.build().unwrap()
}

fn seeds() -> SeedItems {
    SeedItems::new().with(SourceRoot("src".to_string()))
}

#[tokio::test]
async fn test_every_step_runs_exactly_once() {
    for executor in executors() {
        let timeline = Arc::new(Timeline::default());
        let chain = compile_chain(Arc::clone(&timeline));

        let result = executor
            .execute(&chain, BuildExecution::new(seeds()))
            .await
            .unwrap();

        let runs = timeline.runs();
        assert_eq!(runs.len(), 5, "{}", executor.name());
        assert!(runs.values().all(|&n| n == 1), "{}", executor.name());
        assert_eq!(result.step_records().len(), 5);
        assert_eq!(result.require::<Archive>().unwrap().0, "a:1,b:1,c:1");
    }
}

#[tokio::test]
async fn test_producers_finish_before_consumers_start() {
    for executor in executors() {
        let timeline = Arc::new(Timeline::default());
        let chain = compile_chain(Arc::clone(&timeline));

        executor
            .execute(&chain, BuildExecution::new(seeds()))
            .await
            .unwrap();

        for parse in ["parse-a", "parse-b", "parse-c"] {
            assert!(timeline.happened_before("resolve", parse), "{}", executor.name());
            assert!(timeline.happened_before(parse, "package"), "{}", executor.name());
        }
    }
}

#[tokio::test]
async fn test_executors_agree_on_results() {
    let mut archives = Vec::new();
    for executor in executors() {
        let chain = compile_chain(Arc::new(Timeline::default()));
        let result = executor
            .execute(&chain, BuildExecution::new(seeds()))
            .await
            .unwrap();
        archives.push(result.require::<Archive>().unwrap().0.clone());
        assert!(result.get::<Classpath>().is_some());
        assert_eq!(result.get_multi::<ParsedModule>().len(), 3);
    }

    assert_eq!(archives[0], archives[1]);
}

#[test]
fn test_duplicate_producer_is_rejected() {
    let mut builder = ChainBuilder::new();
    builder
        .add_step("banner-one", |_ctx| Ok(()))
        .produces::<Banner>()
        .build();
    builder
        .add_step("banner-two", |_ctx| Ok(()))
        .produces::<Banner>()
        .build();

    let err = builder.build().unwrap_err();

    assert!(err.iter().any(|e| matches!(
        e,
        ChainError::DuplicateProducer { first, second, .. }
            if first == "banner-one" && second == "banner-two"
    )));
}

#[test]
fn test_three_step_cycle_is_reported_once() {
    struct X;
    impl BuildItem for X {
        const KIND: ItemKind = ItemKind::Simple;
    }
    struct Y;
    impl BuildItem for Y {
        const KIND: ItemKind = ItemKind::Simple;
    }
    struct Z;
    impl BuildItem for Z {
        const KIND: ItemKind = ItemKind::Simple;
    }

    let mut builder = ChainBuilder::new();
    builder.add_step("x", |_ctx| Ok(())).consumes::<Z>().produces::<X>().build();
    builder.add_step("y", |_ctx| Ok(())).consumes::<X>().produces::<Y>().build();
    builder.add_step("z", |_ctx| Ok(())).consumes::<Y>().produces::<Z>().build();

    let err = builder.build().unwrap_err();
    let cycles = err.cycles();

    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].len(), 4);
    assert_eq!(cycles[0].first(), cycles[0].last());
}

#[tokio::test]
async fn test_continue_on_error_isolates_failure() {
    for executor in executors() {
        let independent = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&independent);

        let mut builder = ChainBuilder::new();
        builder
            .add_step("resolve", |_ctx| anyhow::bail!("repository unreachable"))
            .produces::<Classpath>()
            .build();
        builder
            .add_step("compile", |_ctx| Ok(()))
            .consumes::<Classpath>()
            .produces::<ParsedModule>()
            .build();
        builder
            .add_step("package", |_ctx| Ok(()))
            .consumes::<ParsedModule>()
            .build();
        builder
            .add_step("banner", move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.produce(Banner("v1".into()))?;
                Ok(())
            })
            .produces::<Banner>()
            .build();
        let chain = builder.build().unwrap();

        let failure = executor
            .execute(
                &chain,
                BuildExecution::new(SeedItems::new())
                    .with_failure_strategy(FailureStrategy::ContinueOnError),
            )
            .await
            .unwrap_err();

        assert_eq!(independent.load(Ordering::SeqCst), 1, "{}", executor.name());
        assert_eq!(failure.failed_steps(), vec!["resolve"]);
        assert_eq!(failure.skipped_steps(), vec!["compile", "package"]);
        assert!(failure
            .cause_of("resolve")
            .unwrap()
            .to_string()
            .contains("repository unreachable"));
        assert!(!failure
            .iter()
            .any(|e| matches!(e, ExecutionError::NotScheduled { .. })));
    }
}

#[tokio::test]
async fn test_panicking_step_is_reported_as_failure() {
    for executor in executors() {
        let mut builder = ChainBuilder::new();
        builder
            .add_step("explode", |_ctx| panic!("index out of bounds"))
            .produces::<Banner>()
            .build();
        let chain = builder.build().unwrap();

        let failure = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap_err();

        let cause = failure.cause_of("explode").unwrap().to_string();
        assert!(cause.contains("panicked"), "{cause}");
        assert!(cause.contains("index out of bounds"), "{cause}");
    }
}

#[tokio::test]
async fn test_missing_and_undeclared_seeds() {
    let chain = compile_chain(Arc::new(Timeline::default()));

    for executor in executors() {
        let missing = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap_err();
        assert!(matches!(
            &missing.errors[..],
            [ExecutionError::MissingInitialItem { .. }]
        ));

        let undeclared = executor
            .execute(
                &chain,
                BuildExecution::new(seeds().with(Banner("extra".into()))),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            &undeclared.errors[..],
            [ExecutionError::UndeclaredInitialItem { .. }]
        ));
    }
}

#[tokio::test]
async fn test_seeded_item_is_visible_in_result() {
    let chain = compile_chain(Arc::new(Timeline::default()));
    let result = WorkQueueExecutor::new(2)
        .execute(&chain, BuildExecution::new(seeds()))
        .await
        .unwrap();

    assert_eq!(result.require::<SourceRoot>().unwrap().0, "src");
}

#[tokio::test]
async fn test_ordered_optional_sees_every_multi_value() {
    for executor in executors() {
        let seen = Arc::new(AtomicUsize::new(usize::MAX));
        let observed = Arc::clone(&seen);

        let mut builder = ChainBuilder::new();
        for name in ["web", "db", "cache", "metrics"] {
            builder
                .add_step(format!("feature-{name}"), move |ctx| {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    ctx.produce(Feature(name))?;
                    Ok(())
                })
                .produces::<Feature>()
                .build();
        }
        builder
            .add_step("report", move |ctx| {
                observed.store(ctx.consume_multi::<Feature>()?.len(), Ordering::SeqCst);
                Ok(())
            })
            .consumes_ordered::<Feature>()
            .build();
        let chain = builder.build().unwrap();

        executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 4, "{}", executor.name());
    }
}

#[tokio::test]
async fn test_optional_consumer_runs_without_producer() {
    for executor in executors() {
        let mut builder = ChainBuilder::new();
        builder
            .add_step("greet", |ctx| {
                let banner = ctx.consume_optional::<Banner>()?;
                let features = ctx.consume_multi::<Feature>()?;
                assert!(banner.is_none());
                assert!(features.is_empty());
                ctx.produce(Archive("plain".into()))?;
                Ok(())
            })
            .consumes_ordered::<Banner>()
            .consumes_optional::<Feature>()
            .produces::<Archive>()
            .build();
        let chain = builder.build().unwrap();

        let result = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap();

        assert_eq!(result.require::<Archive>().unwrap().0, "plain");
    }
}

#[tokio::test]
async fn test_regular_producer_replaces_overridable_one() {
    for executor in executors() {
        let mut builder = ChainBuilder::new();
        builder
            .add_step("default-banner", |ctx| {
                ctx.produce(Banner("default".into()))?;
                Ok(())
            })
            .produces_overridable::<Banner>()
            .build();
        builder
            .add_step("custom-banner", |ctx| {
                ctx.produce(Banner("custom".into()))?;
                Ok(())
            })
            .produces::<Banner>()
            .build();
        builder
            .add_step("print", |ctx| {
                let banner = ctx.consume::<Banner>()?;
                ctx.produce(Archive(banner.0.clone()))?;
                Ok(())
            })
            .consumes::<Banner>()
            .produces::<Archive>()
            .build();
        let chain = builder.build().unwrap();

        let result = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap();

        assert_eq!(result.require::<Archive>().unwrap().0, "custom", "{}", executor.name());
        assert_eq!(result.require::<Banner>().unwrap().0, "custom");
    }
}

#[tokio::test]
async fn test_overridable_producer_used_alone() {
    let mut builder = ChainBuilder::new();
    builder
        .add_step("default-banner", |ctx| {
            ctx.produce(Banner("default".into()))?;
            Ok(())
        })
        .produces_overridable::<Banner>()
        .build();
    let chain = builder.build().unwrap();

    let result = LevelByLevelExecutor::new(1)
        .execute(&chain, BuildExecution::new(SeedItems::new()))
        .await
        .unwrap();

    assert_eq!(result.require::<Banner>().unwrap().0, "default");
}

#[tokio::test]
async fn test_outputs_prune_unrelated_and_weak_steps() {
    let ran = Arc::new(Mutex::new(Vec::new()));
    let mut builder = ChainBuilder::new();

    let log = Arc::clone(&ran);
    builder
        .add_step("banner", move |ctx| {
            log.lock().unwrap().push("banner");
            ctx.produce(Banner("b".into()))?;
            Ok(())
        })
        .produces::<Banner>()
        .build();
    let log = Arc::clone(&ran);
    builder
        .add_step("feature-extra", move |ctx| {
            log.lock().unwrap().push("feature-extra");
            ctx.produce(Feature("extra"))?;
            Ok(())
        })
        .produces_weak::<Feature>()
        .build();
    let log = Arc::clone(&ran);
    builder
        .add_step("package", move |ctx| {
            log.lock().unwrap().push("package");
            let banner = ctx.consume::<Banner>()?;
            let features = ctx.consume_multi::<Feature>()?;
            ctx.produce(Archive(format!("{}+{}", banner.0, features.len())))?;
            Ok(())
        })
        .consumes::<Banner>()
        .consumes_ordered::<Feature>()
        .produces::<Archive>()
        .build();
    let log = Arc::clone(&ran);
    builder
        .add_step("docs", move |_ctx| {
            log.lock().unwrap().push("docs");
            Ok(())
        })
        .produces::<Classpath>()
        .build();
    builder.add_output::<Archive>();
    let chain = builder.build().unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.pruned_steps(), ["feature-extra", "docs"]);

    for executor in executors() {
        ran.lock().unwrap().clear();
        let result = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap();

        assert_eq!(result.require::<Archive>().unwrap().0, "b+0");
        assert_eq!(*ran.lock().unwrap(), vec!["banner", "package"]);
    }
}

#[tokio::test]
async fn test_metrics_listener_records_every_step() {
    for executor in executors() {
        let metrics = Arc::new(BuildMetrics::new());
        let chain = compile_chain(Arc::new(Timeline::default()));

        executor
            .execute(
                &chain,
                BuildExecution::new(seeds()).with_listener(metrics.clone()),
            )
            .await
            .unwrap();

        let mut ids: Vec<String> = metrics.records().into_iter().map(|r| r.step_id).collect();
        ids.sort();
        assert_eq!(ids, vec!["package", "parse-a", "parse-b", "parse-c", "resolve"]);
        assert!(metrics.records().iter().all(|r| r.succeeded));
    }
}

#[tokio::test]
async fn test_chain_is_reusable_across_executions() {
    let chain = compile_chain(Arc::new(Timeline::default()));
    let executor = WorkQueueExecutor::new(3);

    let first = executor
        .execute(&chain, BuildExecution::new(seeds()))
        .await
        .unwrap();
    let second = executor
        .execute(
            &chain,
            BuildExecution::new(SeedItems::new().with(SourceRoot("other".into()))),
        )
        .await
        .unwrap();

    assert_eq!(first.require::<Classpath>().unwrap().0, vec!["src/lib"]);
    assert_eq!(second.require::<Classpath>().unwrap().0, vec!["other/lib"]);
}

#[tokio::test]
async fn test_plain_optional_consumer_does_not_wait_for_producers() {
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    let observed = Arc::clone(&seen);

    let mut builder = ChainBuilder::new();
    builder
        .add_step("early-report", move |ctx| {
            observed.store(ctx.consume_multi::<Feature>()?.len(), Ordering::SeqCst);
            Ok(())
        })
        .consumes_optional::<Feature>()
        .build();
    builder
        .add_step("feature-web", |ctx| {
            ctx.produce(Feature("web"))?;
            Ok(())
        })
        .produces::<Feature>()
        .build();
    let chain = builder.build().unwrap();

    assert!(chain.step("early-report").unwrap().dependencies().is_empty());

    // One slot: registration order decides, so the report runs first
    WorkQueueExecutor::new(1)
        .execute(&chain, BuildExecution::new(SeedItems::new()))
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_order_only_step_runs_before_consumers() {
    for executor in executors() {
        let timeline = Arc::new(Timeline::default());
        let mut builder = ChainBuilder::new();

        let t = Arc::clone(&timeline);
        builder
            .add_step("print", move |ctx| {
                t.start("print");
                ctx.consume::<Banner>()?;
                t.finish("print");
                Ok(())
            })
            .consumes::<Banner>()
            .build();
        let t = Arc::clone(&timeline);
        builder
            .add_step("write-banner", move |ctx| {
                t.start("write-banner");
                ctx.produce(Banner("== demo ==".into()))?;
                t.finish("write-banner");
                Ok(())
            })
            .produces::<Banner>()
            .build();
        let t = Arc::clone(&timeline);
        builder
            .add_step("clear-screen", move |_ctx| {
                t.start("clear-screen");
                t.finish("clear-screen");
                Ok(())
            })
            .before_consume::<Banner>()
            .build();
        let chain = builder.build().unwrap();

        assert_eq!(
            chain.waves(),
            vec![vec!["write-banner", "clear-screen"], vec!["print"]]
        );

        let result = executor
            .execute(&chain, BuildExecution::new(SeedItems::new()))
            .await
            .unwrap();

        assert!(timeline.happened_before("clear-screen", "print"), "{}", executor.name());
        assert!(timeline.happened_before("write-banner", "print"), "{}", executor.name());
        assert_eq!(result.require::<Banner>().unwrap().0, "== demo ==");
    }
}

#[tokio::test]
async fn test_qualified_items_stay_separate() {
    for executor in executors() {
        let mut builder = ChainBuilder::new();
        builder.add_initial_qualified::<Banner>("env");

        builder
            .add_step("web", |ctx| {
                ctx.consume_qualified::<Banner>("env")?;
                ctx.produce_qualified("web", Feature("routes"))?;
                ctx.produce_qualified("web", Feature("assets"))?;
                ctx.produce(Feature("plain"))?;
                Ok(())
            })
            .consumes_qualified::<Banner>("env", Requirement::Required)
            .produces_qualified::<Feature>("web")
            .produces::<Feature>()
            .build();
        builder
            .add_step("admin", |ctx| {
                let env = ctx.consume_qualified::<Banner>("env")?;
                let web = ctx.consume_multi_qualified::<Feature>("web")?;
                ctx.produce(Banner(format!("{} web={}", env.0, web.len())))?;
                Ok(())
            })
            .consumes_qualified::<Banner>("env", Requirement::Required)
            .consumes_qualified::<Feature>("web", Requirement::Required)
            .produces::<Banner>()
            .build();
        let chain = builder.build().unwrap();

        assert_eq!(chain.waves(), vec![vec!["web"], vec!["admin"]]);

        let seeds = SeedItems::new().with_qualified("env", Banner("staging".into()));
        let result = executor
            .execute(&chain, BuildExecution::new(seeds))
            .await
            .unwrap();

        assert_eq!(result.get_qualified::<Banner>("env").unwrap().0, "staging");
        assert_eq!(result.get::<Banner>().unwrap().0, "staging web=2");

        let mut web: Vec<&str> = result
            .get_multi_qualified::<Feature>("web")
            .iter()
            .map(|f| f.0)
            .collect();
        web.sort();
        assert_eq!(web, vec!["assets", "routes"], "{}", executor.name());

        let plain: Vec<&str> = result.get_multi::<Feature>().iter().map(|f| f.0).collect();
        assert_eq!(plain, vec!["plain"]);
        assert!(result.get_qualified::<Banner>("web").is_none());
    }
}
