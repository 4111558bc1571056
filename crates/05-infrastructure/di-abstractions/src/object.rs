//! 被注入对象的句柄

use crate::class::{ClassRef, Injectable};
use infrastructure_common::Value;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::{Arc, Weak};

/// 由注入器构造或注入的对象实例
pub type Instance<T> = Arc<RwLock<T>>;

/// 类型擦除后的对象句柄
pub type ObjectRef = Arc<dyn Managed>;

/// 对象的弱引用，注入器和请求者只持有这种引用
pub type WeakObject = Weak<dyn Managed>;

/// 可由注入器管理的对象
///
/// 为 `RwLock<T>` 自动实现，注入器只在执行注入点时短暂持有写锁
pub trait Managed: Send + Sync + 'static {
    /// 对象的类型
    fn class(&self) -> ClassRef;

    /// 在写锁内访问对象
    fn with_target(&self, f: &mut dyn FnMut(&mut dyn Any));

    /// 转换为负载为 `Instance<T>` 的注入值
    fn into_value(self: Arc<Self>) -> Value;
}

impl<T: Injectable> Managed for RwLock<T> {
    fn class(&self) -> ClassRef {
        ClassRef::of::<T>()
    }

    fn with_target(&self, f: &mut dyn FnMut(&mut dyn Any)) {
        let mut guard = self.write();
        f(&mut *guard);
    }

    fn into_value(self: Arc<Self>) -> Value {
        Arc::new(self)
    }
}

/// 创建新的对象实例
pub fn instance<T>(value: T) -> Instance<T> {
    Arc::new(RwLock::new(value))
}

/// 获取对象句柄
pub fn object_ref<T: Injectable>(instance: &Instance<T>) -> ObjectRef {
    instance.clone()
}

/// 对象的身份标识（地址）
pub fn object_id(object: &ObjectRef) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

/// 弱引用指向对象的身份标识
pub fn weak_object_id(object: &WeakObject) -> usize {
    Weak::as_ptr(object).cast::<()>() as usize
}
