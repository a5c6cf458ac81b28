// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by the result store and by the step context while a chain runs.

use std::fmt;

use thiserror::Error;

use crate::items::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// A simple or final item was written twice in one execution
    #[error("Item {item} was already produced in this execution")]
    DuplicateProduction { item: ItemId },

    /// A required single item is absent when its consumer runs
    #[error("Required item {item} has no value")]
    MissingRequiredValue { item: ItemId },

    /// The store was finalized; no more writes or snapshots are accepted
    #[error("The build context is closed{}", ItemSuffix(.item))]
    ContextClosed { item: Option<ItemId> },

    /// The item is not part of the chain this store was created for
    #[error("Item {item} is not known to this build context")]
    UnknownItem { item: ItemId },

    /// The step did not declare that it produces the item
    #[error("Step '{step}' does not declare that it produces {item}")]
    UndeclaredProduction { step: String, item: ItemId },

    /// The step did not declare that it consumes the item
    #[error("Step '{step}' does not declare that it consumes {item}")]
    UndeclaredConsumption { step: String, item: ItemId },

    /// A stored value does not have the type of its item id
    #[error("Stored value for {item} has an unexpected type")]
    TypeMismatch { item: ItemId },
}

struct ItemSuffix<'a>(&'a Option<ItemId>);

impl fmt::Display for ItemSuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(item) => write!(f, "; cannot produce {}", item),
            None => Ok(()),
        }
    }
}
