//! 延迟构造的提供者

use crate::descriptor::ObjectDescriptor;
use crate::object::Instance;
use crate::supplier::SupplierRef;
use infrastructure_common::{InjectionError, InjectionResult, Value};
use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 按描述符构造对象，由注入器实现
pub trait ObjectFactory: Send + Sync {
    fn make_value(
        &self,
        descriptor: &ObjectDescriptor,
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<Value>;
}

/// 提供者保存的构造上下文
pub struct ProviderContext {
    pub factory: Arc<dyn ObjectFactory>,
    pub descriptor: ObjectDescriptor,
    pub supplier: Option<SupplierRef>,
}

/// `Provider<T>` 注入点收到的值，每次 [`Provider::get`] 时才构造对象
pub struct Provider<T> {
    context: Arc<ProviderContext>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Provider<T> {
    pub fn new(context: ProviderContext) -> Self {
        Self {
            context: Arc::new(context),
            _marker: PhantomData,
        }
    }

    pub fn descriptor(&self) -> &ObjectDescriptor {
        &self.context.descriptor
    }

    /// 构造（或从单例缓存取出）对象
    pub fn get(&self) -> InjectionResult<Instance<T>> {
        let value = self
            .context
            .factory
            .make_value(&self.context.descriptor, self.context.supplier.as_ref())?;
        value
            .downcast_ref::<Instance<T>>()
            .cloned()
            .ok_or_else(|| InjectionError::type_mismatch(type_name::<Instance<T>>(), "提供者构造的值"))
    }
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Provider<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Provider<{}>", type_name::<T>())
    }
}
