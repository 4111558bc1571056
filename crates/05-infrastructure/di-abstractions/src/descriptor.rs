//! 依赖描述符

use crate::class::{ClassRef, Injectable, Param};
use infrastructure_common::{Annotation, Qualifier, TypeKey};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 描述一个注入点需要的值：期望类型加上可选的限定符集合
///
/// 没有限定符时 `qualifiers` 为 `None`，不会保存空集合
#[derive(Clone)]
pub struct ObjectDescriptor {
    key: TypeKey,
    qualifiers: Option<Arc<[Qualifier]>>,
    class: Option<ClassRef>,
    provider: Option<ClassRef>,
}

impl ObjectDescriptor {
    /// 从期望类型和注解创建描述符，只保留限定符注解
    pub fn new(key: TypeKey, annotations: &[Annotation]) -> Self {
        let qualifiers: Vec<Qualifier> = annotations
            .iter()
            .filter_map(Annotation::as_qualifier)
            .cloned()
            .collect();
        Self {
            key,
            qualifiers: (!qualifiers.is_empty()).then(|| qualifiers.into()),
            class: None,
            provider: None,
        }
    }

    /// 从参数槽位创建描述符
    pub fn from_param(param: &Param) -> Self {
        Self {
            class: param.class,
            provider: param.provider,
            ..Self::new(param.key, &param.annotations)
        }
    }

    pub fn of<S: Send + Sync + 'static>() -> Self {
        Self::from_param(&Param::of::<S>())
    }

    /// 期望类型为 `Instance<U>` 的描述符
    pub fn object<U: Injectable>() -> Self {
        Self::from_param(&Param::object::<U>())
    }

    /// 期望类型为 `Provider<U>` 的描述符
    pub fn provider<U: Injectable>() -> Self {
        Self::from_param(&Param::provider::<U>())
    }

    /// 追加一个限定符
    #[must_use]
    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        let mut qualifiers: Vec<Qualifier> = self.qualifiers.as_deref().unwrap_or_default().to_vec();
        qualifiers.push(qualifier);
        self.qualifiers = Some(qualifiers.into());
        self
    }

    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.with_qualifier(Qualifier::named(name))
    }

    /// 期望的值类型
    pub fn desired_type(&self) -> TypeKey {
        self.key
    }

    /// 查找绑定时使用的类型：提供者槽位取其元素类型
    pub fn element_type(&self) -> TypeKey {
        self.provider.map_or(self.key, |p| p.instance_key())
    }

    pub fn qualifiers(&self) -> Option<&[Qualifier]> {
        self.qualifiers.as_deref()
    }

    pub fn qualifier(&self, name: &str) -> Option<&Qualifier> {
        self.qualifiers
            .as_deref()
            .and_then(|qs| qs.iter().find(|q| q.name == name))
    }

    pub fn has_qualifier(&self, name: &str) -> bool {
        self.qualifier(name).is_some()
    }

    /// `@Named` 的值
    pub fn name(&self) -> Option<&str> {
        self.qualifier(Qualifier::NAMED)
            .and_then(|q| q.value.as_deref())
    }

    pub fn is_optional(&self) -> bool {
        self.has_qualifier(Qualifier::OPTIONAL)
    }

    /// 期望类型为 `Instance<U>` 时的 `U`
    pub fn object_class(&self) -> Option<ClassRef> {
        self.class
    }

    /// 期望类型为 `Provider<U>` 时的 `U`
    pub fn provider_class(&self) -> Option<ClassRef> {
        self.provider
    }
}

impl PartialEq for ObjectDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.qualifiers() == other.qualifiers()
    }
}

impl Eq for ObjectDescriptor {}

impl Hash for ObjectDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.qualifiers().hash(state);
    }
}

impl fmt::Display for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifiers) = self.qualifiers() {
            for qualifier in qualifiers {
                write!(f, "{qualifier} ")?;
            }
        }
        f.write_str(self.key.name)
    }
}

impl fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
