// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build item identity and kind classification.
//!
//! A build item is any `'static + Send + Sync` Rust type implementing [`BuildItem`].
//! The item's kind is part of the type through the associated `KIND` constant,
//! so a type can never conform to more than one kind:
//!
//! * [`ItemKind::Simple`] - at most one producer, one value per execution
//! * [`ItemKind::Multi`] - any number of producers, values are accumulated
//! * [`ItemKind::Final`] - exactly one producer, never overridable
//!
//! # Examples
//!
//! ```rust
//! use stepchain::items::{BuildItem, ItemId, ItemKind};
//!
//! struct ApplicationName(String);
//!
//! impl BuildItem for ApplicationName {
//!     const KIND: ItemKind = ItemKind::Simple;
//! }
//!
//! let id = ItemId::of::<ApplicationName>();
//! assert_eq!(id.kind(), ItemKind::Simple);
//! assert_eq!(id, ItemId::of::<ApplicationName>());
//! ```

mod item_id;
mod registry;

pub use item_id::{BuildItem, ItemId, ItemKind, ItemValue};
pub use registry::ItemRegistry;
