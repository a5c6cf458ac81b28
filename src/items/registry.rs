// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use crate::errors::ChainError;
use crate::items::{BuildItem, ItemId, ItemKind};

/// Canonical mapping from item ids to their kinds.
///
/// The registry is filled while a chain is being built and is frozen into the
/// [`BuildChain`](crate::chain::BuildChain) afterwards, where it is shared
/// read-only by every execution (the result store creates one slot per id).
#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    kinds: HashMap<ItemId, ItemKind>,
    // First-registration order, used for deterministic iteration
    order: Vec<ItemId>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the unqualified item type `T`. Idempotent.
    pub fn register<T: BuildItem>(&mut self) -> ItemId {
        self.insert(ItemId::of::<T>())
    }

    /// Registers item type `T` under `qualifier`. Idempotent.
    pub fn register_qualified<T: BuildItem>(&mut self, qualifier: &str) -> ItemId {
        self.insert(ItemId::qualified::<T>(qualifier))
    }

    /// Registers an id whose kind is claimed by the caller.
    ///
    /// Fails with [`ChainError::InvalidItemKind`] when the claimed kind does not
    /// match the kind of the item type.
    pub fn declare(&mut self, id: &ItemId, claimed: ItemKind) -> Result<ItemKind, ChainError> {
        if id.kind() != claimed {
            return Err(ChainError::InvalidItemKind {
                item: id.clone(),
                step: None,
                reason: format!("declared as {} but the item type is {}", claimed, id.kind()),
            });
        }
        self.insert(id.clone());
        Ok(claimed)
    }

    /// Returns the kind of a registered id.
    pub fn classify(&self, id: &ItemId) -> Result<ItemKind, ChainError> {
        self.kinds
            .get(id)
            .copied()
            .ok_or_else(|| ChainError::InvalidItemKind {
                item: id.clone(),
                step: None,
                reason: "item is not registered in this chain".to_string(),
            })
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.kinds.contains_key(id)
    }

    /// Registered ids in first-registration order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn insert(&mut self, id: ItemId) -> ItemId {
        if !self.kinds.contains_key(&id) {
            self.kinds.insert(id.clone(), id.kind());
            self.order.push(id.clone());
        }
        id
    }
}
