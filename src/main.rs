// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::env;
use std::time::Duration;

use anyhow::Context;
use stepchain::chain::{BuildChain, ChainBuilder};
use stepchain::config::{load_config, EngineConfig, RuntimeBuilder};
use stepchain::context::SeedItems;
use stepchain::items::{BuildItem, ItemKind};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROJECT: &str = "demo-app";

struct ProjectName(String);
impl BuildItem for ProjectName {
    const KIND: ItemKind = ItemKind::Simple;
}

struct SourceFile(String);
impl BuildItem for SourceFile {
    const KIND: ItemKind = ItemKind::Multi;
}

struct Dependencies(Vec<&'static str>);
impl BuildItem for Dependencies {
    const KIND: ItemKind = ItemKind::Simple;
}

struct CompiledUnit(String);
impl BuildItem for CompiledUnit {
    const KIND: ItemKind = ItemKind::Multi;
}

struct Banner(String);
impl BuildItem for Banner {
    const KIND: ItemKind = ItemKind::Simple;
}

struct Package(String);
impl BuildItem for Package {
    const KIND: ItemKind = ItemKind::Final;
}

/// A small project build: scan and resolve in parallel, compile, then package.
fn demo_chain() -> anyhow::Result<BuildChain> {
    let mut builder = ChainBuilder::new();
    builder.add_initial::<ProjectName>();

    builder
        .add_step("scan-sources", |ctx| {
            for file in ["main.rs", "config.rs", "routes.rs"] {
                ctx.produce(SourceFile(file.to_string()))?;
            }
            Ok(())
        })
        .produces::<SourceFile>()
        .build();

    builder
        .add_step("resolve-dependencies", |ctx| {
            std::thread::sleep(Duration::from_millis(40));
            ctx.produce(Dependencies(vec!["serde", "tokio"]))?;
            Ok(())
        })
        .produces::<Dependencies>()
        .build();

    builder
        .add_step("compile", |ctx| {
            let deps = ctx.consume::<Dependencies>()?;
            for source in ctx.consume_multi::<SourceFile>()?.iter() {
                std::thread::sleep(Duration::from_millis(10));
                ctx.produce(CompiledUnit(format!(
                    "{} (+{} deps)",
                    source.0.replace(".rs", ".o"),
                    deps.0.len()
                )))?;
            }
            Ok(())
        })
        .consumes::<Dependencies>()
        .consumes::<SourceFile>()
        .produces::<CompiledUnit>()
        .build();

    builder
        .add_step("default-banner", |ctx| {
            let name = ctx.consume::<ProjectName>()?;
            ctx.produce(Banner(format!("== {} ==", name.0)))?;
            Ok(())
        })
        .consumes::<ProjectName>()
        .produces_overridable::<Banner>()
        .build();

    builder
        .add_step("package", |ctx| {
            let name = ctx.consume::<ProjectName>()?;
            let units = ctx.consume_multi::<CompiledUnit>()?;
            let banner = ctx
                .consume_optional::<Banner>()?
                .map(|b| b.0.clone())
                .unwrap_or_default();
            ctx.produce(Package(format!(
                "{} {}.tar ({} units)",
                banner,
                name.0,
                units.len()
            )))?;
            Ok(())
        })
        .consumes::<ProjectName>()
        .consumes::<CompiledUnit>()
        .consumes_ordered::<Banner>()
        .produces::<Package>()
        .build();

    builder.add_output::<Package>();
    Ok(builder.build()?)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path))?,
        None => EngineConfig::default(),
    };
    let project = args.get(2).map(String::as_str).unwrap_or(DEFAULT_PROJECT);

    let chain = demo_chain().context("assembling the demo chain")?;
    let runtime = RuntimeBuilder::from_config(&config);

    println!("Executor: {}", runtime.executor().name());
    for (index, wave) in chain.waves().iter().enumerate() {
        println!("  wave {}: {}", index, wave.join(", "));
    }

    if let Some(path) = &config.graph_output {
        chain
            .write_dot(path)
            .with_context(|| format!("writing graph to {}", path.display()))?;
        println!("Graph written to {}", path.display());
    }

    let seeds = SeedItems::new().with(ProjectName(project.to_string()));
    let result = runtime
        .executor()
        .execute(&chain, runtime.execution(seeds))
        .await?;

    println!("Package: {}", result.require::<Package>()?.0);
    println!("Finished in {:?}", result.duration());
    for record in result.step_records() {
        println!(
            "  {:<22} {:>6.1?} on {}",
            record.step_id, record.duration, record.thread
        );
    }

    if let (Some(metrics), Some(path)) = (runtime.metrics(), &config.metrics.output) {
        metrics
            .write_report(path)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
        println!("Metrics written to {}", path.display());
    }

    Ok(())
}
