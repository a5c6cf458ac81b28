// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased item value as stored in the result store.
pub type ItemValue = Arc<dyn Any + Send + Sync>;

/// Closed classification of build items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// At most one producer per chain, at most one value per execution.
    Simple,
    /// Any number of producers; consumers see every produced value.
    Multi,
    /// A simple item with exactly one producer that can never be overridden.
    Final,
}

impl ItemKind {
    pub fn is_multi(self) -> bool {
        self == ItemKind::Multi
    }

    /// Simple and Final items hold a single value.
    pub fn is_single(self) -> bool {
        !self.is_multi()
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Simple => write!(f, "simple"),
            ItemKind::Multi => write!(f, "multi"),
            ItemKind::Final => write!(f, "final"),
        }
    }
}

/// A typed unit of data exchanged between build steps.
pub trait BuildItem: Any + Send + Sync + 'static {
    const KIND: ItemKind;
}

/// Identity of a build item: the item type plus an optional qualifier.
///
/// Equality, hashing and ordering only look at the type and the qualifier. The
/// kind and the type name are carried along for validation and diagnostics.
#[derive(Clone)]
pub struct ItemId {
    type_id: TypeId,
    type_name: &'static str,
    kind: ItemKind,
    qualifier: Option<Arc<str>>,
}

impl ItemId {
    /// Identity of the unqualified item type `T`.
    pub fn of<T: BuildItem>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            kind: T::KIND,
            qualifier: None,
        }
    }

    /// Identity of item type `T` keyed by `qualifier`.
    pub fn qualified<T: BuildItem>(qualifier: impl Into<Arc<str>>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            ..Self::of::<T>()
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified Rust type name of the item.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Type name without its module path, e.g. `ApplicationName`.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// True when `T` is the item type of this id.
    pub fn is<T: BuildItem>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Generic names keep their full path; splitting inside `<...>` would mangle them
    match full.find('<') {
        Some(_) => full,
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

impl PartialEq for ItemId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for ItemId {}

impl Hash for ItemId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl PartialOrd for ItemId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ItemId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.type_name
            .cmp(other.type_name)
            .then_with(|| self.type_id.cmp(&other.type_id))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{}[{}]", self.short_name(), qualifier),
            None => write!(f, "{}", self.short_name()),
        }
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemId")
            .field("type", &self.type_name)
            .field("kind", &self.kind)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}
