//! 元数据缓存
//!
//! 进程级缓存，所有注入器共享，条目只增不减

use crate::hierarchy::ClassPlan;
use dashmap::DashMap;
use di_abstractions::{ClassMeta, ClassRef, ObjectDescriptor};
use infrastructure_common::{Annotation, AnnotationKind, InjectionResult, Location};
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::sync::Arc;

static METADATA: Lazy<MetadataCache> = Lazy::new(MetadataCache::default);

#[derive(Default)]
pub(crate) struct MetadataCache {
    classes: DashMap<TypeId, Arc<ClassMeta>>,
    plans: DashMap<TypeId, Arc<ClassPlan>>,
    descriptors: DashMap<Location, Arc<[ObjectDescriptor]>>,
    constructors: DashMap<TypeId, Arc<[usize]>>,
    methods: DashMap<TypeId, Arc<[usize]>>,
    annotations: DashMap<(AnnotationKind, Location), bool>,
    overrides: DashMap<(TypeId, Location), bool>,
}

impl MetadataCache {
    pub(crate) fn global() -> &'static Self {
        &METADATA
    }

    /// 类型元数据
    pub(crate) fn class_meta(&self, class: ClassRef) -> Arc<ClassMeta> {
        let id = class.key().id;
        if let Some(meta) = self.classes.get(&id) {
            return meta.value().clone();
        }
        let meta = Arc::new(class.describe());
        self.classes.entry(id).or_insert(meta).value().clone()
    }

    /// 注入计划，构建失败不缓存
    pub(crate) fn plan(
        &self,
        class: ClassRef,
        build: impl FnOnce() -> InjectionResult<ClassPlan>,
    ) -> InjectionResult<Arc<ClassPlan>> {
        let id = class.key().id;
        if let Some(plan) = self.plans.get(&id) {
            return Ok(plan.value().clone());
        }
        let plan = Arc::new(build()?);
        Ok(self.plans.entry(id).or_insert(plan).value().clone())
    }

    /// 注入点的依赖描述符
    pub(crate) fn dependent_objects(
        &self,
        location: Location,
        compute: impl FnOnce() -> Vec<ObjectDescriptor>,
    ) -> Arc<[ObjectDescriptor]> {
        if let Some(descriptors) = self.descriptors.get(&location) {
            return descriptors.value().clone();
        }
        let descriptors: Arc<[ObjectDescriptor]> = compute().into();
        self.descriptors
            .entry(location)
            .or_insert(descriptors)
            .value()
            .clone()
    }

    /// 构造函数序号，按参数个数降序，个数相同时保持声明顺序
    pub(crate) fn constructors(&self, meta: &ClassMeta) -> Arc<[usize]> {
        let id = meta.key.id;
        if let Some(order) = self.constructors.get(&id) {
            return order.value().clone();
        }
        let mut order: Vec<usize> = (0..meta.constructors.len()).collect();
        order.sort_by(|a, b| meta.constructors[*b].arity().cmp(&meta.constructors[*a].arity()));
        let order: Arc<[usize]> = order.into();
        self.constructors.entry(id).or_insert(order).value().clone()
    }

    /// 方法序号，不包括桥接方法
    pub(crate) fn methods(&self, meta: &ClassMeta) -> Arc<[usize]> {
        let id = meta.key.id;
        if let Some(methods) = self.methods.get(&id) {
            return methods.value().clone();
        }
        let methods: Arc<[usize]> = meta
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.synthetic)
            .map(|(i, _)| i)
            .collect();
        self.methods.entry(id).or_insert(methods).value().clone()
    }

    /// 注入点上是否存在某种注解
    pub(crate) fn has_annotation(
        &self,
        location: Location,
        kind: AnnotationKind,
        annotations: &[Annotation],
    ) -> bool {
        let key = (kind, location);
        if let Some(present) = self.annotations.get(&key) {
            return *present.value();
        }
        let present = annotations.iter().any(|a| a.kind() == key.0);
        *self.annotations.entry(key).or_insert(present).value()
    }

    /// 方法在某个具体类型中是否被重写
    pub(crate) fn is_overridden(
        &self,
        root: TypeId,
        method: Location,
        compute: impl FnOnce() -> bool,
    ) -> bool {
        let key = (root, method);
        if let Some(overridden) = self.overrides.get(&key) {
            return *overridden.value();
        }
        let overridden = compute();
        *self.overrides.entry(key).or_insert(overridden).value()
    }
}
