//! 已注入对象登记表
//!
//! 按主对象提供者分桶，只保存对象的弱引用，回收的对象在访问时清理

use di_abstractions::{
    object_id, supplier_id, weak_object_id, ObjectRef, SupplierRef, WeakObject, WeakSupplier,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

struct Bucket {
    supplier: WeakSupplier,
    objects: Vec<WeakObject>,
}

impl Bucket {
    fn new(supplier: &SupplierRef) -> Self {
        Self {
            supplier: Arc::downgrade(supplier),
            objects: Vec::new(),
        }
    }

    /// 地址可能被新的提供者复用，需要确认原提供者仍然存活
    fn belongs_to(&self, supplier: &SupplierRef) -> bool {
        self.supplier
            .upgrade()
            .is_some_and(|current| supplier_id(&current) == supplier_id(supplier))
    }

    fn prune(&mut self) {
        self.objects.retain(|object| object.strong_count() > 0);
    }

    fn position(&self, object: &ObjectRef) -> Option<usize> {
        let id = object_id(object);
        self.objects
            .iter()
            .position(|candidate| weak_object_id(candidate) == id && candidate.strong_count() > 0)
    }
}

#[derive(Default)]
pub(crate) struct InjectedObjects {
    buckets: Mutex<HashMap<usize, Bucket>>,
}

impl InjectedObjects {
    pub(crate) fn remember(&self, supplier: &SupplierRef, object: &ObjectRef) {
        let reference = supplier.make_reference(object);
        let mut buckets = self.buckets.lock();
        // 提供者已释放的桶不会再被访问
        buckets.retain(|_, bucket| bucket.supplier.strong_count() > 0);
        let bucket = buckets
            .entry(supplier_id(supplier))
            .or_insert_with(|| Bucket::new(supplier));
        if !bucket.belongs_to(supplier) {
            *bucket = Bucket::new(supplier);
        }
        bucket.prune();
        if bucket.position(object).is_none() {
            bucket.objects.push(reference);
        }
    }

    /// 移除对象，返回对象是否在该提供者名下
    pub(crate) fn forget(&self, supplier: &SupplierRef, object: &ObjectRef) -> bool {
        let mut buckets = self.buckets.lock();
        let Some(bucket) = buckets.get_mut(&supplier_id(supplier)) else {
            return false;
        };
        if !bucket.belongs_to(supplier) {
            return false;
        }
        bucket.prune();
        match bucket.position(object) {
            Some(index) => {
                bucket.objects.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// 移除整个桶，返回其中仍然存活的对象
    pub(crate) fn take(&self, supplier: &SupplierRef) -> Vec<ObjectRef> {
        let bucket = self.buckets.lock().remove(&supplier_id(supplier));
        match bucket {
            Some(bucket) if bucket.belongs_to(supplier) => {
                bucket.objects.iter().filter_map(|o| o.upgrade()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub(crate) fn contains(&self, supplier: &SupplierRef, object: &ObjectRef) -> bool {
        let buckets = self.buckets.lock();
        buckets
            .get(&supplier_id(supplier))
            .is_some_and(|bucket| bucket.belongs_to(supplier) && bucket.position(object).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::MapObjectSupplier;
    use di_abstractions::{instance, object_ref, ClassBuilder, Injectable};

    #[derive(Default)]
    struct Item;

    impl Injectable for Item {
        fn describe(class: &mut ClassBuilder<Self>) {
            class.default_constructor();
        }
    }

    #[test]
    fn objects_are_remembered_once_and_forgotten() {
        let registry = InjectedObjects::default();
        let supplier: SupplierRef = MapObjectSupplier::new();
        let item = instance(Item);
        let object = object_ref(&item);

        registry.remember(&supplier, &object);
        registry.remember(&supplier, &object);
        assert!(registry.contains(&supplier, &object));
        assert_eq!(registry.take(&supplier).len(), 1);

        registry.remember(&supplier, &object);
        assert!(registry.forget(&supplier, &object));
        assert!(!registry.forget(&supplier, &object));
    }

    #[test]
    fn dropped_objects_are_not_returned() {
        let registry = InjectedObjects::default();
        let supplier: SupplierRef = MapObjectSupplier::new();
        {
            let object = object_ref(&instance(Item));
            registry.remember(&supplier, &object);
        }
        assert!(registry.take(&supplier).is_empty());
    }

    #[test]
    fn buckets_of_dropped_suppliers_are_discarded() {
        let registry = InjectedObjects::default();
        let item = instance(Item);
        let object = object_ref(&item);
        {
            let gone: SupplierRef = MapObjectSupplier::new();
            registry.remember(&gone, &object);
        }
        let supplier: SupplierRef = MapObjectSupplier::new();
        registry.remember(&supplier, &object);
        assert_eq!(registry.buckets.lock().len(), 1);
        assert!(registry.contains(&supplier, &object));
    }
}
