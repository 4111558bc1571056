//! 扩展对象提供者
//!
//! 扩展提供者按限定符名称注册在进程级注册表中。注册表中找不到时，
//! 向注入器的默认提供者请求以限定符名称命名的 [`ExtendedSupplierRef`]，
//! 找到的结果按注入器缓存。

use di_abstractions::{Arg, ExtendedSupplierRef, ObjectDescriptor, SupplierRef};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::{debug, info};

static EXTENDED_SUPPLIERS: Lazy<RwLock<HashMap<String, ExtendedSupplierRef>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 注册扩展提供者，替换同名的旧提供者
pub fn register_extended_supplier(qualifier: impl Into<String>, supplier: ExtendedSupplierRef) {
    let qualifier = qualifier.into();
    info!("注册扩展对象提供者: @{}", qualifier);
    EXTENDED_SUPPLIERS.write().insert(qualifier, supplier);
}

pub fn unregister_extended_supplier(qualifier: &str) -> Option<ExtendedSupplierRef> {
    EXTENDED_SUPPLIERS.write().remove(qualifier)
}

#[derive(Default)]
pub(crate) struct ExtendedSuppliers {
    default_supplier: RwLock<Option<SupplierRef>>,
    discovered: Mutex<HashMap<String, ExtendedSupplierRef>>,
}

impl ExtendedSuppliers {
    pub(crate) fn set_default(&self, supplier: Option<SupplierRef>) {
        *self.default_supplier.write() = supplier;
        self.discovered.lock().clear();
    }

    /// 第一个有对应扩展提供者的限定符。`@Named` 和 `@Optional` 不参与查找
    pub(crate) fn find(&self, descriptor: &ObjectDescriptor) -> Option<ExtendedSupplierRef> {
        descriptor
            .qualifiers()?
            .iter()
            .filter(|q| !q.is_named() && !q.is_optional())
            .find_map(|q| self.lookup(&q.name))
    }

    fn lookup(&self, qualifier: &str) -> Option<ExtendedSupplierRef> {
        if let Some(supplier) = EXTENDED_SUPPLIERS.read().get(qualifier) {
            return Some(supplier.clone());
        }
        if let Some(supplier) = self.discovered.lock().get(qualifier) {
            return Some(supplier.clone());
        }

        let default_supplier = self.default_supplier.read().clone()?;
        let descriptor = ObjectDescriptor::of::<ExtendedSupplierRef>().named(qualifier);
        let mut values = [Arg::NotAValue];
        default_supplier.get(&[Some(descriptor)], &mut values, None, false, false, false);
        let [found] = values;
        let supplier = found
            .into_option()?
            .downcast_ref::<ExtendedSupplierRef>()
            .cloned()?;
        debug!("从默认提供者找到扩展对象提供者: @{}", qualifier);
        self.discovered
            .lock()
            .insert(qualifier.to_string(), supplier.clone());
        Some(supplier)
    }
}
