// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed publish/subscribe build chains.
//!
//! Independently written build steps declare the typed items they produce and
//! consume. A [`chain::ChainBuilder`] wires them into a validated dependency
//! graph, and an executor runs that graph concurrently, each step exactly
//! once and after every producer it depends on.
//!
//! ```rust
//! use stepchain::chain::ChainBuilder;
//! use stepchain::context::SeedItems;
//! use stepchain::engine::WorkQueueExecutor;
//! use stepchain::items::{BuildItem, ItemKind};
//! use stepchain::traits::{BuildExecution, ChainExecutor};
//!
//! struct Name(String);
//! impl BuildItem for Name {
//!     const KIND: ItemKind = ItemKind::Simple;
//! }
//!
//! struct Greeting(String);
//! impl BuildItem for Greeting {
//!     const KIND: ItemKind = ItemKind::Final;
//! }
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut builder = ChainBuilder::new();
//! builder.add_initial::<Name>();
//! builder
//!     .add_step("greet", |ctx| {
//!         let name = ctx.consume::<Name>()?;
//!         ctx.produce(Greeting(format!("Hello, {}!", name.0)))?;
//!         Ok(())
//!     })
//!     .consumes::<Name>()
//!     .produces::<Greeting>()
//!     .build();
//! let chain = builder.build()?;
//!
//! let seeds = SeedItems::new().with(Name("world".into()));
//! let result = WorkQueueExecutor::new(2)
//!     .execute(&chain, BuildExecution::new(seeds))
//!     .await?;
//!
//! assert_eq!(result.require::<Greeting>()?.0, "Hello, world!");
//! # Ok(())
//! # }
//! ```

pub mod chain;          // step registration, graph assembly, validation
pub mod config;         // engine configuration
pub mod context;        // per-execution item store
pub mod engine;         // chain executors
pub mod errors;         // error handling
pub mod items;          // typed item identities
pub mod metrics;        // per-step timing
pub mod observability;
pub mod traits;         // executor and listener abstractions
