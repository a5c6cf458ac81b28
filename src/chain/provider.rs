// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::chain::ChainBuilder;

/// A bundle of steps and item declarations installed as a unit.
///
/// Modules that know nothing about each other each implement `BuildProvider`;
/// the application installs them all into one [`ChainBuilder`] and the chain
/// wires them together through the items they exchange.
///
/// # Examples
///
/// ```rust
/// use stepchain::chain::{BuildProvider, ChainBuilder};
/// use stepchain::items::{BuildItem, ItemKind};
///
/// struct Greeting(String);
/// impl BuildItem for Greeting {
///     const KIND: ItemKind = ItemKind::Simple;
/// }
///
/// struct GreetingModule;
///
/// impl BuildProvider for GreetingModule {
///     fn install_into(&self, builder: &mut ChainBuilder) {
///         builder
///             .add_step("greet", |ctx| {
///                 ctx.produce(Greeting("hello".into()))?;
///                 Ok(())
///             })
///             .produces::<Greeting>()
///             .build();
///     }
/// }
///
/// let mut builder = ChainBuilder::new();
/// builder.add_provider(&GreetingModule);
/// assert_eq!(builder.step_count(), 1);
/// ```
pub trait BuildProvider {
    fn install_into(&self, builder: &mut ChainBuilder);
}
