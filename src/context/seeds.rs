// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::items::{BuildItem, ItemId, ItemValue};

/// Initial items supplied by the caller for one execution.
///
/// Each seeded id must be declared with
/// [`ChainBuilder::add_initial`](crate::chain::ChainBuilder::add_initial).
///
/// ```rust
/// use stepchain::context::SeedItems;
/// use stepchain::items::{BuildItem, ItemKind};
///
/// struct ProjectRoot(String);
/// impl BuildItem for ProjectRoot {
///     const KIND: ItemKind = ItemKind::Simple;
/// }
///
/// let seeds = SeedItems::new().with(ProjectRoot("/srv/app".into()));
/// assert_eq!(seeds.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SeedItems {
    values: Vec<(ItemId, ItemValue)>,
}

impl SeedItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: BuildItem>(self, item: T) -> Self {
        self.with_id(ItemId::of::<T>(), Arc::new(item))
    }

    pub fn with_qualified<T: BuildItem>(self, qualifier: &str, item: T) -> Self {
        self.with_id(ItemId::qualified::<T>(qualifier), Arc::new(item))
    }

    /// Seeds a type-erased value. Seeding a single item again replaces the
    /// earlier value; multi items accumulate.
    pub fn with_id(mut self, id: ItemId, value: ItemValue) -> Self {
        if id.kind().is_single() {
            self.values.retain(|(existing, _)| existing != &id);
        }
        self.values.push((id, value));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.values.iter().any(|(existing, _)| existing == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &(ItemId, ItemValue)> {
        self.values.iter()
    }
}
