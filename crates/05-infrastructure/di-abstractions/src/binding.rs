//! 类型绑定
//!
//! 绑定把一个期望类型（可加名称）映射到实现类型。绑定值不可变，
//! `named` 和 `implemented_by` 返回修改后的副本并把副本注册到来源注入器。

use crate::class::{ClassRef, Injectable};
use crate::object::Instance;
use infrastructure_common::{TypeKey, Value};
use std::fmt;
use std::sync::{Arc, Weak};

/// 接受绑定注册的注入器
pub trait BindingRegistry: Send + Sync {
    /// 注册绑定，相同期望类型和名称的旧绑定会被替换
    fn add_binding_value(&self, binding: Binding) -> Binding;
}

type Convert = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

#[derive(Clone)]
struct Implementation {
    class: ClassRef,
    convert: Option<Convert>,
}

#[derive(Clone)]
pub struct Binding {
    described: TypeKey,
    described_class: Option<ClassRef>,
    implementation: Option<Implementation>,
    qualifier_name: Option<String>,
    registry: Weak<dyn BindingRegistry>,
}

impl Binding {
    pub fn new(
        described: TypeKey,
        described_class: Option<ClassRef>,
        registry: Weak<dyn BindingRegistry>,
    ) -> Self {
        Self {
            described,
            described_class,
            implementation: None,
            qualifier_name: None,
            registry,
        }
    }

    /// 返回带名称的副本并注册
    #[must_use]
    pub fn named(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.qualifier_name = Some(name.into());
        copy.register()
    }

    /// 返回以 `U` 为实现的副本并注册。
    /// 构造出的值为 `Instance<U>`，期望类型应当就是它
    #[must_use]
    pub fn implemented_by<U: Injectable>(&self) -> Self {
        self.with_implementation(Implementation {
            class: ClassRef::of::<U>(),
            convert: None,
        })
    }

    /// 返回以 `U` 为实现、经过 `convert` 转换为期望类型的副本并注册，
    /// 用于把具体类型绑定到 trait 对象
    #[must_use]
    pub fn implemented_as<U, S, F>(&self, convert: F) -> Self
    where
        U: Injectable,
        S: Send + Sync + 'static,
        F: Fn(Instance<U>) -> S + Send + Sync + 'static,
    {
        let convert: Convert = Arc::new(move |value: Value| {
            value
                .downcast_ref::<Instance<U>>()
                .cloned()
                .map(|instance| Arc::new(convert(instance)) as Value)
        });
        self.with_implementation(Implementation {
            class: ClassRef::of::<U>(),
            convert: Some(convert),
        })
    }

    fn with_implementation(&self, implementation: Implementation) -> Self {
        let mut copy = self.clone();
        copy.implementation = Some(implementation);
        copy.register()
    }

    fn register(self) -> Self {
        match self.registry.upgrade() {
            Some(registry) => registry.add_binding_value(self),
            None => self,
        }
    }

    pub fn described_type(&self) -> TypeKey {
        self.described
    }

    pub fn qualifier_name(&self) -> Option<&str> {
        self.qualifier_name.as_deref()
    }

    /// 实现类型，未指定时为期望类型本身
    pub fn implementation_class(&self) -> Option<ClassRef> {
        self.implementation
            .as_ref()
            .map(|i| i.class)
            .or(self.described_class)
    }

    /// 把实现类型构造出的值转换为期望类型的值
    pub fn convert(&self, value: Value) -> Option<Value> {
        match self.implementation.as_ref().and_then(|i| i.convert.as_ref()) {
            Some(convert) => convert(value),
            None => Some(value),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("described", &self.described)
            .field("qualifier", &self.qualifier_name)
            .field("implementation", &self.implementation_class())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        registered: Mutex<Vec<Binding>>,
    }

    impl BindingRegistry for Recorder {
        fn add_binding_value(&self, binding: Binding) -> Binding {
            self.registered.lock().push(binding.clone());
            binding
        }
    }

    #[derive(Default)]
    struct Impl;

    impl Injectable for Impl {
        fn describe(class: &mut ClassBuilder<Self>) {
            class.default_constructor();
        }
    }

    #[test]
    fn modifiers_copy_and_register() {
        let recorder = Arc::new(Recorder::default());
        let registry: Arc<dyn BindingRegistry> = recorder.clone();
        let original = Binding::new(TypeKey::of::<String>(), None, Arc::downgrade(&registry));

        let named = original.named("x");
        let implemented = original.implemented_by::<Impl>();

        assert!(original.qualifier_name().is_none());
        assert!(original.implementation_class().is_none());
        assert_eq!(named.qualifier_name(), Some("x"));
        assert!(named.implementation_class().is_none());
        assert!(implemented.qualifier_name().is_none());
        assert_eq!(implemented.implementation_class(), Some(ClassRef::of::<Impl>()));
        assert_eq!(recorder.registered.lock().len(), 2);
    }

    #[test]
    fn described_class_is_default_implementation() {
        let binding = Binding::new(
            TypeKey::of::<Instance<Impl>>(),
            Some(ClassRef::of::<Impl>()),
            Weak::<Recorder>::new(),
        );
        assert_eq!(binding.implementation_class(), Some(ClassRef::of::<Impl>()));
    }
}
