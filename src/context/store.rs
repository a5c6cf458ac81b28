// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::context::BuildResult;
use crate::errors::ContextError;
use crate::items::{ItemId, ItemRegistry, ItemValue};

#[derive(Debug)]
enum Slot {
    /// Write-once; the first producer wins and later writes are rejected
    Single(OnceLock<ItemValue>),
    /// Append-only, in production order
    Multi(Mutex<Vec<ItemValue>>),
}

/// Per-execution storage for produced items.
///
/// One slot exists for every item id in the chain's registry, so the map itself
/// is never mutated while steps run. Simple and final items are written at most
/// once, multi items are appended under a short lock.
#[derive(Debug)]
pub struct ResultStore {
    slots: HashMap<ItemId, Slot>,
    overridden: HashSet<ItemId>,
    closed: AtomicBool,
}

impl ResultStore {
    pub fn new(registry: &ItemRegistry) -> Self {
        let slots = registry
            .ids()
            .map(|id| {
                let slot = if id.kind().is_multi() {
                    Slot::Multi(Mutex::new(Vec::new()))
                } else {
                    Slot::Single(OnceLock::new())
                };
                (id.clone(), slot)
            })
            .collect();

        Self {
            slots,
            overridden: HashSet::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Marks items whose overridable productions are discarded.
    pub fn with_overridden(mut self, items: impl IntoIterator<Item = ItemId>) -> Self {
        self.overridden.extend(items);
        self
    }

    /// Whether overridable productions of `id` are discarded.
    pub fn is_overridden(&self, id: &ItemId) -> bool {
        self.overridden.contains(id)
    }

    /// Stores a value: sets a single slot or appends to a multi slot.
    pub fn produce(&self, id: &ItemId, value: ItemValue) -> Result<(), ContextError> {
        if self.is_closed() {
            return Err(ContextError::ContextClosed {
                item: Some(id.clone()),
            });
        }

        match self.slot(id)? {
            Slot::Single(cell) => cell
                .set(value)
                .map_err(|_| ContextError::DuplicateProduction { item: id.clone() }),
            Slot::Multi(values) => {
                values
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(value);
                Ok(())
            }
        }
    }

    /// Current value of a simple or final item, if produced.
    pub fn get_single(&self, id: &ItemId) -> Result<Option<ItemValue>, ContextError> {
        match self.slot(id)? {
            Slot::Single(cell) => Ok(cell.get().cloned()),
            Slot::Multi(_) => Err(ContextError::TypeMismatch { item: id.clone() }),
        }
    }

    /// Snapshot of the values of a multi item produced so far.
    pub fn get_multi(&self, id: &ItemId) -> Result<Vec<ItemValue>, ContextError> {
        match self.slot(id)? {
            Slot::Multi(values) => Ok(values
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()),
            Slot::Single(_) => Err(ContextError::TypeMismatch { item: id.clone() }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the store and snapshots every produced value.
    ///
    /// Only the first call succeeds; afterwards both `produce` and
    /// `finalize_result` fail with [`ContextError::ContextClosed`].
    pub fn finalize_result(&self) -> Result<BuildResult, ContextError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ContextError::ContextClosed { item: None });
        }

        let mut singles = HashMap::new();
        let mut multis = HashMap::new();
        for (id, slot) in &self.slots {
            match slot {
                Slot::Single(cell) => {
                    if let Some(value) = cell.get() {
                        singles.insert(id.clone(), value.clone());
                    }
                }
                Slot::Multi(values) => {
                    let values = values.lock().unwrap_or_else(PoisonError::into_inner);
                    if !values.is_empty() {
                        multis.insert(id.clone(), values.clone());
                    }
                }
            }
        }

        Ok(BuildResult::new(singles, multis))
    }

    fn slot(&self, id: &ItemId) -> Result<&Slot, ContextError> {
        self.slots
            .get(id)
            .ok_or_else(|| ContextError::UnknownItem { item: id.clone() })
    }
}
