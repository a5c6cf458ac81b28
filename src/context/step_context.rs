// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::any::Any;
use std::sync::Arc;

use crate::chain::StepDescriptor;
use crate::context::ResultStore;
use crate::errors::ContextError;
use crate::items::{BuildItem, ItemId, ItemValue};

/// The view of the result store handed to a running step.
///
/// A step may only produce the items it declared as produced and read the
/// items it declared as consumed; anything else fails with
/// [`ContextError::UndeclaredProduction`] or
/// [`ContextError::UndeclaredConsumption`].
pub struct StepContext<'a> {
    step: &'a StepDescriptor,
    store: &'a ResultStore,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(step: &'a StepDescriptor, store: &'a ResultStore) -> Self {
        Self { step, store }
    }

    /// Id of the running step.
    pub fn step_id(&self) -> &str {
        &self.step.id
    }

    pub fn produce<T: BuildItem>(&self, item: T) -> Result<(), ContextError> {
        self.produce_id(&ItemId::of::<T>(), Arc::new(item))
    }

    pub fn produce_qualified<T: BuildItem>(&self, qualifier: &str, item: T) -> Result<(), ContextError> {
        self.produce_id(&ItemId::qualified::<T>(qualifier), Arc::new(item))
    }

    /// Produces a type-erased value; it must have the item type of `id`.
    ///
    /// An order-only declaration grants no write access.
    pub fn produce_id(&self, id: &ItemId, value: ItemValue) -> Result<(), ContextError> {
        let Some(declared) = self.step.produce_of(id).filter(|p| !p.order_only) else {
            return Err(ContextError::UndeclaredProduction {
                step: self.step.id.clone(),
                item: id.clone(),
            });
        };
        let erased: &dyn Any = &*value;
        if erased.type_id() != id.type_id() {
            return Err(ContextError::TypeMismatch { item: id.clone() });
        }
        if declared.overridable && self.store.is_overridden(id) {
            tracing::debug!(step_id = %self.step.id, item = %id, "overridden production discarded");
            return Ok(());
        }
        self.store.produce(id, value)
    }

    /// Reads a required single item; absence is an error.
    pub fn consume<T: BuildItem>(&self) -> Result<Arc<T>, ContextError> {
        let id = ItemId::of::<T>();
        self.consume_optional_typed(&id)?
            .ok_or(ContextError::MissingRequiredValue { item: id })
    }

    pub fn consume_qualified<T: BuildItem>(&self, qualifier: &str) -> Result<Arc<T>, ContextError> {
        let id = ItemId::qualified::<T>(qualifier);
        self.consume_optional_typed(&id)?
            .ok_or(ContextError::MissingRequiredValue { item: id })
    }

    /// Reads a single item that may be absent.
    pub fn consume_optional<T: BuildItem>(&self) -> Result<Option<Arc<T>>, ContextError> {
        self.consume_optional_typed(&ItemId::of::<T>())
    }

    /// Reads every value produced so far for a multi item.
    pub fn consume_multi<T: BuildItem>(&self) -> Result<Vec<Arc<T>>, ContextError> {
        self.consume_multi_typed(&ItemId::of::<T>())
    }

    pub fn consume_multi_qualified<T: BuildItem>(
        &self,
        qualifier: &str,
    ) -> Result<Vec<Arc<T>>, ContextError> {
        self.consume_multi_typed(&ItemId::qualified::<T>(qualifier))
    }

    /// Type-erased read of a single item.
    pub fn consume_id(&self, id: &ItemId) -> Result<Option<ItemValue>, ContextError> {
        self.check_consumes(id)?;
        self.store.get_single(id)
    }

    /// Type-erased read of a multi item.
    pub fn consume_multi_id(&self, id: &ItemId) -> Result<Vec<ItemValue>, ContextError> {
        self.check_consumes(id)?;
        self.store.get_multi(id)
    }

    fn consume_optional_typed<T: BuildItem>(&self, id: &ItemId) -> Result<Option<Arc<T>>, ContextError> {
        self.consume_id(id)?
            .map(|value| downcast::<T>(value, id))
            .transpose()
    }

    fn consume_multi_typed<T: BuildItem>(&self, id: &ItemId) -> Result<Vec<Arc<T>>, ContextError> {
        self.consume_multi_id(id)?
            .into_iter()
            .map(|value| downcast::<T>(value, id))
            .collect()
    }

    fn check_consumes(&self, id: &ItemId) -> Result<(), ContextError> {
        match self.step.consume_of(id) {
            Some(_) => Ok(()),
            None => Err(ContextError::UndeclaredConsumption {
                step: self.step.id.clone(),
                item: id.clone(),
            }),
        }
    }
}

fn downcast<T: BuildItem>(value: ItemValue, id: &ItemId) -> Result<Arc<T>, ContextError> {
    value
        .downcast::<T>()
        .map_err(|_| ContextError::TypeMismatch { item: id.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{Cardinality, Consume, Produce, Requirement};
    use crate::items::{ItemKind, ItemRegistry};

    #[derive(Debug)]
    struct Version(u32);
    impl BuildItem for Version {
        const KIND: ItemKind = ItemKind::Simple;
    }

    struct Flag(&'static str);
    impl BuildItem for Flag {
        const KIND: ItemKind = ItemKind::Multi;
    }

    struct Secret;
    impl BuildItem for Secret {
        const KIND: ItemKind = ItemKind::Simple;
    }

    fn noop(_ctx: &StepContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn fixture() -> (StepDescriptor, ResultStore) {
        let step = StepDescriptor {
            id: "stamp-version".to_string(),
            produces: vec![Produce {
                item: ItemId::of::<Version>(),
                kind: ItemKind::Simple,
                overridable: false,
                weak: false,
                order_only: false,
            }],
            consumes: vec![
                Consume {
                    item: ItemId::of::<Version>(),
                    requirement: Requirement::Optional,
                    cardinality: Cardinality::Single,
                },
                Consume {
                    item: ItemId::of::<Flag>(),
                    requirement: Requirement::Optional,
                    cardinality: Cardinality::Multi,
                },
            ],
            body: Arc::new(noop),
        };
        let mut registry = ItemRegistry::new();
        registry.register::<Version>();
        registry.register::<Flag>();
        registry.register::<Secret>();
        (step, ResultStore::new(&registry))
    }

    #[test]
    fn test_produce_then_consume() {
        let (step, store) = fixture();
        let ctx = StepContext::new(&step, &store);

        assert!(ctx.consume_optional::<Version>().unwrap().is_none());
        ctx.produce(Version(3)).unwrap();
        assert_eq!(ctx.consume::<Version>().unwrap().0, 3);
    }

    #[test]
    fn test_required_consume_of_absent_value() {
        let (step, store) = fixture();
        let ctx = StepContext::new(&step, &store);

        assert_eq!(
            ctx.consume::<Version>().unwrap_err(),
            ContextError::MissingRequiredValue {
                item: ItemId::of::<Version>()
            }
        );
    }

    #[test]
    fn test_undeclared_access_is_rejected() {
        let (step, store) = fixture();
        let ctx = StepContext::new(&step, &store);

        assert!(matches!(
            ctx.produce(Secret),
            Err(ContextError::UndeclaredProduction { .. })
        ));
        assert!(matches!(
            ctx.consume_optional::<Secret>(),
            Err(ContextError::UndeclaredConsumption { .. })
        ));
    }

    #[test]
    fn test_produce_id_checks_value_type() {
        let (step, store) = fixture();
        let ctx = StepContext::new(&step, &store);

        let err = ctx
            .produce_id(&ItemId::of::<Version>(), Arc::new(Flag("wrong")))
            .unwrap_err();
        assert_eq!(
            err,
            ContextError::TypeMismatch {
                item: ItemId::of::<Version>()
            }
        );
    }

    #[test]
    fn test_consume_multi_sees_store_values() {
        let (step, store) = fixture();
        store.produce(&ItemId::of::<Flag>(), Arc::new(Flag("x"))).unwrap();
        store.produce(&ItemId::of::<Flag>(), Arc::new(Flag("y"))).unwrap();
        let ctx = StepContext::new(&step, &store);

        let flags: Vec<&str> = ctx
            .consume_multi::<Flag>()
            .unwrap()
            .iter()
            .map(|f| f.0)
            .collect();
        assert_eq!(flags, vec!["x", "y"]);
    }

    #[test]
    fn test_overridden_production_is_discarded() {
        let (mut step, store) = fixture();
        step.produces[0].overridable = true;
        let store = store.with_overridden([ItemId::of::<Version>()]);
        let ctx = StepContext::new(&step, &store);

        ctx.produce(Version(1)).unwrap();

        assert!(store.get_single(&ItemId::of::<Version>()).unwrap().is_none());
    }

    #[test]
    fn test_order_only_declaration_grants_no_write() {
        let (mut step, store) = fixture();
        step.produces[0].order_only = true;
        let ctx = StepContext::new(&step, &store);

        assert_eq!(
            ctx.produce(Version(2)),
            Err(ContextError::UndeclaredProduction {
                step: "stamp-version".to_string(),
                item: ItemId::of::<Version>(),
            })
        );
        assert!(store.get_single(&ItemId::of::<Version>()).unwrap().is_none());
    }
}
