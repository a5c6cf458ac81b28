// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ContextError;
use crate::items::{BuildItem, ItemId, ItemValue};
use crate::metrics::StepRecord;

/// Immutable snapshot of everything a successful execution produced.
#[derive(Debug, Clone)]
pub struct BuildResult {
    singles: HashMap<ItemId, ItemValue>,
    multis: HashMap<ItemId, Vec<ItemValue>>,
    duration: Duration,
    step_records: Vec<StepRecord>,
}

impl BuildResult {
    pub(crate) fn new(
        singles: HashMap<ItemId, ItemValue>,
        multis: HashMap<ItemId, Vec<ItemValue>>,
    ) -> Self {
        Self {
            singles,
            multis,
            duration: Duration::ZERO,
            step_records: Vec::new(),
        }
    }

    pub(crate) fn with_timing(mut self, duration: Duration, step_records: Vec<StepRecord>) -> Self {
        self.duration = duration;
        self.step_records = step_records;
        self
    }

    /// The value of the unqualified simple or final item `T`, if produced.
    pub fn get<T: BuildItem>(&self) -> Option<Arc<T>> {
        self.get_typed(&ItemId::of::<T>())
    }

    pub fn get_qualified<T: BuildItem>(&self, qualifier: &str) -> Option<Arc<T>> {
        self.get_typed(&ItemId::qualified::<T>(qualifier))
    }

    /// Like [`BuildResult::get`], but an absent item is an error.
    pub fn require<T: BuildItem>(&self) -> Result<Arc<T>, ContextError> {
        self.get::<T>().ok_or_else(|| ContextError::MissingRequiredValue {
            item: ItemId::of::<T>(),
        })
    }

    /// Every value of the multi item `T`, in production order.
    pub fn get_multi<T: BuildItem>(&self) -> Vec<Arc<T>> {
        self.get_multi_id(&ItemId::of::<T>())
            .iter()
            .filter_map(|value| Arc::clone(value).downcast::<T>().ok())
            .collect()
    }

    pub fn get_multi_qualified<T: BuildItem>(&self, qualifier: &str) -> Vec<Arc<T>> {
        self.get_multi_id(&ItemId::qualified::<T>(qualifier))
            .iter()
            .filter_map(|value| Arc::clone(value).downcast::<T>().ok())
            .collect()
    }

    /// The type-erased value of a single item.
    pub fn get_id(&self, id: &ItemId) -> Option<ItemValue> {
        self.singles.get(id).cloned()
    }

    /// The type-erased values of a multi item.
    pub fn get_multi_id(&self, id: &ItemId) -> &[ItemValue] {
        self.multis.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when at least one value was produced for `id`.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.singles.contains_key(id) || self.multis.contains_key(id)
    }

    /// Number of items with at least one value.
    pub fn item_count(&self) -> usize {
        self.singles.len() + self.multis.len()
    }

    /// Wall-clock time from the first step start to the last step end.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// One record per executed step, in completion order.
    pub fn step_records(&self) -> &[StepRecord] {
        &self.step_records
    }

    fn get_typed<T: BuildItem>(&self, id: &ItemId) -> Option<Arc<T>> {
        self.singles
            .get(id)
            .and_then(|value| Arc::clone(value).downcast::<T>().ok())
    }
}
