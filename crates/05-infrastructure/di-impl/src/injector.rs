//! 注入器实现

use crate::bindings::BindingTable;
use crate::cache::MetadataCache;
use crate::extended::ExtendedSuppliers;
use crate::hierarchy::{ClassPlan, Level};
use crate::registry::InjectedObjects;
use crate::requestor::{first_unresolved, Flags, InjectionRequestor, Outcome, Site};
use crate::resolver::Pass;
use di_abstractions::{
    Binding, BindingRegistry, ClassRef, Injectable, Injector, Instance, ObjectDescriptor,
    ObjectFactory, ObjectRef, Requestor, SupplierRef,
};
use infrastructure_common::{
    Annotation, AnnotationKind, InjectionError, InjectionResult, InjectorConfig, Location,
    MemberKind, Qualifier, TypeKey, Value, Visibility,
};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// 注入点的执行顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    /// 父类型在前，先字段后方法
    Inject,
    /// 派生类型在前，先方法后字段
    Uninject,
}

/// 依赖注入器
///
/// 总是通过 `Arc` 持有。请求者和提供者持有注入器的强引用，
/// 注入器只以弱引用登记已注入的对象。
pub struct InjectorImpl {
    self_ref: Weak<InjectorImpl>,
    config: InjectorConfig,
    cache: &'static MetadataCache,
    objects: InjectedObjects,
    singletons: Mutex<HashMap<TypeId, ObjectRef>>,
    bindings: BindingTable,
    extended: ExtendedSuppliers,
    constructing: Mutex<HashSet<TypeId>>,
}

/// 调试模式下记录正在构造的类型，离开作用域时移除
struct ConstructionGuard<'a> {
    constructing: Option<&'a Mutex<HashSet<TypeId>>>,
    id: TypeId,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if let Some(constructing) = self.constructing {
            constructing.lock().remove(&self.id);
        }
    }
}

impl InjectorImpl {
    /// 使用默认配置创建注入器
    pub fn new() -> Arc<Self> {
        Self::with_config(InjectorConfig::default())
    }

    pub fn with_config(config: InjectorConfig) -> Arc<Self> {
        info!("创建注入器 (debug: {})", config.debug);
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            config,
            cache: MetadataCache::global(),
            objects: InjectedObjects::default(),
            singletons: Mutex::new(HashMap::new()),
            bindings: BindingTable::default(),
            extended: ExtendedSuppliers::default(),
            constructing: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &InjectorConfig {
        &self.config
    }

    /// 注入器的身份标识
    pub fn id(&self) -> usize {
        self.self_ref.as_ptr() as usize
    }

    /// 对象是否以该提供者注入且尚未拆除
    pub fn is_injected(&self, object: &ObjectRef, supplier: &SupplierRef) -> bool {
        self.objects.contains(supplier, object)
    }

    /// 查找描述符对应的绑定
    pub fn find_binding(&self, descriptor: &ObjectDescriptor) -> Option<Binding> {
        self.bindings.find(descriptor)
    }

    pub(crate) fn cache(&self) -> &'static MetadataCache {
        self.cache
    }

    pub(crate) fn extended(&self) -> &ExtendedSuppliers {
        &self.extended
    }

    pub(crate) fn arc(&self) -> InjectionResult<Arc<Self>> {
        self.self_ref
            .upgrade()
            .ok_or_else(|| InjectionError::incompatible("InjectorImpl", "注入器已释放"))
    }

    fn plan(&self, class: ClassRef) -> InjectionResult<Arc<ClassPlan>> {
        let max_depth = self.config.max_hierarchy_depth;
        let plan = self
            .cache
            .plan(class, || ClassPlan::build(self.cache, class, max_depth))?;
        plan.check_depth(max_depth)?;
        Ok(plan)
    }

    fn has(&self, location: Location, kind: AnnotationKind, annotations: &[Annotation]) -> bool {
        self.cache.has_annotation(location, kind, annotations)
    }

    fn requestor(
        &self,
        site: Site,
        object: Option<&ObjectRef>,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
        flags: Flags,
    ) -> InjectionResult<Arc<InjectionRequestor>> {
        Ok(InjectionRequestor::new(
            self.arc()?,
            site,
            object,
            supplier,
            temp,
            flags,
        ))
    }

    fn flags(&self, location: Location, annotations: &[Annotation], track: bool) -> Flags {
        Flags {
            track,
            group_updates: self.has(location, AnnotationKind::GroupUpdates, annotations),
            optional: self.has(
                location,
                AnnotationKind::Qualifier(Qualifier::OPTIONAL.into()),
                annotations,
            ),
        }
    }

    // ---- 注入 ----

    pub(crate) fn inject_object(
        &self,
        object: &ObjectRef,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<()> {
        let plan = self.plan(object.class())?;
        let mut requestors =
            self.collect_requestors(&plan, Some(object), supplier, temp, Order::Inject, false)?;
        if !requestors.iter().any(|r| r.should_track()) {
            let site = Site::Class {
                class: plan.class.key(),
            };
            let flags = Flags {
                track: true,
                ..Flags::default()
            };
            requestors.push(self.requestor(site, Some(object), supplier, temp, flags)?);
        }

        let result = self.run_injection(object, &plan, &requestors, supplier, temp);
        for requestor in &requestors {
            requestor.clear_temp_supplier();
        }
        result
    }

    fn run_injection(
        &self,
        object: &ObjectRef,
        plan: &ClassPlan,
        requestors: &[Arc<InjectionRequestor>],
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<()> {
        self.resolve_requestors(requestors, supplier, temp, Pass::INJECT)?;
        for requestor in requestors {
            requestor.execute_outcome()?;
        }
        self.post_construct(object, plan, supplier, temp)?;
        if let Some(supplier) = supplier {
            self.objects.remember(supplier, object);
        }
        Ok(())
    }

    /// 解析一组请求者。初次注入时非可选请求者无法解析会返回错误，
    /// 拆除时只记录日志
    fn resolve_requestors(
        &self,
        requestors: &[Arc<InjectionRequestor>],
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
        pass: Pass,
    ) -> InjectionResult<()> {
        for requestor in requestors {
            let args = self.resolve_args(requestor, supplier, temp, pass)?;
            let Some(index) = first_unresolved(&args) else {
                requestor.set_resolved(Some(args));
                continue;
            };
            requestor.set_resolved(None);
            if requestor.is_optional() {
                debug!("跳过可选的注入点 {}", requestor.location());
                continue;
            }
            let dependency = requestor.dependent_objects()[index].to_string();
            if pass.uninject {
                warn!("拆除时无法解析 {} 的依赖 {}", requestor.location(), dependency);
                continue;
            }
            if self.config.debug {
                error!("注入失败: {} 缺少依赖 {}", requestor.location(), dependency);
            }
            return Err(InjectionError::Unsatisfied {
                requestor: requestor.location().to_string(),
                dependency,
            });
        }
        Ok(())
    }

    fn collect_requestors(
        &self,
        plan: &ClassPlan,
        object: Option<&ObjectRef>,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
        order: Order,
        statics: bool,
    ) -> InjectionResult<Vec<Arc<InjectionRequestor>>> {
        let levels: Vec<(usize, &Level)> = match order {
            Order::Inject => plan.ancestors_first().collect(),
            Order::Uninject => plan.derived_first().collect(),
        };

        let mut requestors = Vec::new();
        for (depth, level) in levels {
            let mut fields = Vec::new();
            for (index, field) in level.meta.fields.iter().enumerate() {
                let location = level.field_location(index);
                if field.is_static != statics
                    || !self.has(location, AnnotationKind::Inject, field.annotations())
                {
                    continue;
                }
                let site = Site::Field {
                    meta: level.meta.clone(),
                    index,
                    project: level.project.clone(),
                };
                let flags = self.flags(location, field.annotations(), true);
                fields.push(self.requestor(site, object, supplier, temp, flags)?);
            }

            let mut methods = Vec::new();
            for &index in self.cache.methods(&level.meta).iter() {
                let method = &level.meta.methods[index];
                let location = level.method_location(index);
                if method.is_static != statics
                    || plan.is_overridden(depth, index)
                    || !self.has(location, AnnotationKind::Inject, &method.annotations)
                {
                    continue;
                }
                let site = Site::Method {
                    meta: level.meta.clone(),
                    index,
                    project: level.project.clone(),
                };
                let flags = self.flags(location, &method.annotations, true);
                methods.push(self.requestor(site, object, supplier, temp, flags)?);
            }

            match order {
                Order::Inject => {
                    requestors.extend(fields);
                    requestors.extend(methods);
                }
                Order::Uninject => {
                    requestors.extend(methods);
                    requestors.extend(fields);
                }
            }
        }
        Ok(requestors)
    }

    /// 父类型在前调用 post-construct 方法。参数无法解析时返回错误
    fn post_construct(
        &self,
        object: &ObjectRef,
        plan: &ClassPlan,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<()> {
        for requestor in self.lifecycle_requestors(object, plan, AnnotationKind::PostConstruct, supplier, temp)? {
            let args = self.resolve_args(&requestor, supplier, temp, Pass::CALL)?;
            if let Some(index) = first_unresolved(&args) {
                if requestor.is_optional() {
                    continue;
                }
                return Err(InjectionError::Unsatisfied {
                    requestor: requestor.location().to_string(),
                    dependency: requestor.dependent_objects()[index].to_string(),
                });
            }
            requestor.set_resolved(Some(args));
            requestor.execute_outcome()?;
            requestor.clear_temp_supplier();
        }
        Ok(())
    }

    /// 父类型在前调用 pre-destroy 方法，失败只记录日志
    fn pre_destroy(&self, object: &ObjectRef, plan: &ClassPlan, supplier: Option<&SupplierRef>) {
        let requestors =
            match self.lifecycle_requestors(object, plan, AnnotationKind::PreDestroy, supplier, None) {
                Ok(requestors) => requestors,
                Err(e) => {
                    warn!("无法准备 {} 的 pre-destroy 方法: {}", plan.class.name(), e);
                    return;
                }
            };
        for requestor in requestors {
            let outcome = self
                .resolve_args(&requestor, supplier, None, Pass { initial: false, ..Pass::CALL })
                .and_then(|args| match first_unresolved(&args) {
                    Some(index) => Err(InjectionError::Unsatisfied {
                        requestor: requestor.location().to_string(),
                        dependency: requestor.dependent_objects()[index].to_string(),
                    }),
                    None => {
                        requestor.set_resolved(Some(args));
                        requestor.execute_outcome()
                    }
                });
            if let Err(e) = outcome {
                warn!("pre-destroy 方法 {} 执行失败: {}", requestor.location(), e);
            }
        }
    }

    fn lifecycle_requestors(
        &self,
        object: &ObjectRef,
        plan: &ClassPlan,
        kind: AnnotationKind,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Vec<Arc<InjectionRequestor>>> {
        let mut requestors = Vec::new();
        for (depth, level) in plan.ancestors_first() {
            for &index in self.cache.methods(&level.meta).iter() {
                let method = &level.meta.methods[index];
                let location = level.method_location(index);
                if method.is_static
                    || plan.is_overridden(depth, index)
                    || !self.has(location, kind.clone(), &method.annotations)
                {
                    continue;
                }
                let site = Site::Method {
                    meta: level.meta.clone(),
                    index,
                    project: level.project.clone(),
                };
                let flags = Flags {
                    track: false,
                    group_updates: false,
                    optional: self.flags(location, &method.annotations, false).optional,
                };
                requestors.push(self.requestor(site, Some(object), supplier, temp, flags)?);
            }
        }
        Ok(requestors)
    }

    // ---- 拆除 ----

    pub(crate) fn uninject_object(
        &self,
        object: &ObjectRef,
        supplier: &SupplierRef,
    ) -> InjectionResult<bool> {
        if !self.objects.forget(supplier, object) {
            return Ok(false);
        }
        let plan = self.plan(object.class())?;
        self.pre_destroy(object, &plan, Some(supplier));

        let requestors =
            self.collect_requestors(&plan, Some(object), Some(supplier), None, Order::Uninject, false)?;
        // 不再向提供者取值，注入点收到零值或空值
        self.resolve_requestors(&requestors, None, None, Pass::UNINJECT)?;
        for requestor in &requestors {
            if let Err(e) = requestor.execute_outcome() {
                warn!("拆除 {} 失败: {}", requestor.location(), e);
            }
        }
        debug!("已拆除 {}", plan.class.name());
        Ok(true)
    }

    /// 提供者释放：pre-destroy、释放回调，然后丢弃该提供者名下的登记。
    /// 重复调用时登记已为空，不会再次执行回调
    pub(crate) fn dispose_supplier(&self, supplier: &SupplierRef) -> InjectionResult<()> {
        let objects = self.objects.take(supplier);
        if !objects.is_empty() {
            debug!("对象提供者释放，处理 {} 个对象", objects.len());
        }
        for object in objects {
            let plan = match self.plan(object.class()) {
                Ok(plan) => plan,
                Err(e) => {
                    warn!("无法释放对象: {}", e);
                    continue;
                }
            };
            self.pre_destroy(&object, &plan, Some(supplier));
            if let Some(hook) = plan.root().meta.dispose.clone() {
                object.with_target(&mut |target| hook(target));
            }
        }
        Ok(())
    }

    // ---- 调用 ----

    fn invoke_marker(
        &self,
        object: &ObjectRef,
        marker: &str,
        supplier: Option<&SupplierRef>,
        local: Option<&SupplierRef>,
    ) -> InjectionResult<Option<Option<Value>>> {
        let plan = self.plan(object.class())?;
        for (_, level) in plan.derived_first() {
            for &index in self.cache.methods(&level.meta).iter() {
                let method = &level.meta.methods[index];
                let tagged = method
                    .annotations
                    .iter()
                    .any(|a| matches!(a, Annotation::Marker(name) if *name == marker));
                if !tagged {
                    continue;
                }
                let site = Site::Method {
                    meta: level.meta.clone(),
                    index,
                    project: level.project.clone(),
                };
                let requestor = self.requestor(site, Some(object), supplier, local, Flags::default())?;
                let args = self.resolve_args(&requestor, supplier, local, Pass::CALL)?;
                if let Some(missing) = first_unresolved(&args) {
                    debug!(
                        "{} 的参数 #{} 无法解析，继续查找",
                        requestor.location(),
                        missing
                    );
                    continue;
                }
                requestor.set_resolved(Some(args));
                let outcome = requestor.execute_outcome();
                requestor.clear_temp_supplier();
                return Ok(Some(outcome?.into_value()));
            }
        }
        Ok(None)
    }

    // ---- 构造 ----

    fn enter_construction(&self, class: ClassRef) -> ConstructionGuard<'_> {
        let id = class.key().id;
        if !self.config.debug {
            return ConstructionGuard {
                constructing: None,
                id,
            };
        }
        if !self.constructing.lock().insert(id) {
            warn!("构造 {} 时可能存在递归引用", class.name());
        }
        ConstructionGuard {
            constructing: Some(&self.constructing),
            id,
        }
    }

    pub(crate) fn internal_make(
        &self,
        class: ClassRef,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<ObjectRef> {
        let meta = self.cache.class_meta(class);
        let class_location = Location::new(meta.key, MemberKind::Class, 0, meta.key.short_name());
        let singleton = self.has(class_location, AnnotationKind::Singleton, &meta.annotations);
        if singleton {
            if let Some(existing) = self.singletons.lock().get(&meta.key.id) {
                return Ok(existing.clone());
            }
        }

        let _guard = self.enter_construction(class);
        for &index in self.cache.constructors(&meta).iter() {
            let constructor = &meta.constructors[index];
            if matches!(constructor.visibility, Visibility::Private | Visibility::Protected) {
                continue;
            }
            let location = Location::new(meta.key, MemberKind::Constructor, index, "new");
            let inject = self.has(location, AnnotationKind::Inject, &constructor.annotations);
            if !inject && constructor.arity() != 0 {
                continue;
            }

            let site = Site::Constructor {
                meta: meta.clone(),
                index,
            };
            let requestor = self.requestor(site, None, supplier, temp, Flags::default())?;
            let args = self.resolve_args(&requestor, supplier, temp, Pass::CALL)?;
            if let Some(missing) = first_unresolved(&args) {
                debug!(
                    "{} 的构造函数 #{} 参数 #{} 无法解析",
                    class.name(),
                    index,
                    missing
                );
                continue;
            }
            requestor.set_resolved(Some(args));
            let outcome = requestor.execute_outcome();
            requestor.clear_temp_supplier();
            let Outcome::Object(object) = outcome? else {
                continue;
            };

            self.inject_object(&object, supplier, temp)?;
            if singleton {
                let mut singletons = self.singletons.lock();
                return Ok(singletons.entry(meta.key.id).or_insert(object).clone());
            }
            return Ok(object);
        }

        if self.config.debug {
            error!("无法在 {} 中找到可满足的构造函数", class.name());
        }
        Err(InjectionError::NoSatisfiableConstructor {
            class: class.name().to_string(),
        })
    }

    pub(crate) fn make_from_binding(
        &self,
        binding: &Binding,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Value> {
        let class = binding.implementation_class().ok_or_else(|| InjectionError::NotConstructible {
            type_name: binding.described_type().name.to_string(),
        })?;
        let object = self.internal_make(class, supplier, temp)?;
        binding.convert(object.into_value()).ok_or_else(|| {
            InjectionError::type_mismatch(binding.described_type().name, class.name())
        })
    }

    fn make_value_with(
        &self,
        descriptor: &ObjectDescriptor,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Value> {
        if let Some(binding) = self.find_binding(descriptor) {
            return self.make_from_binding(&binding, supplier, temp);
        }
        let class = descriptor
            .provider_class()
            .or_else(|| descriptor.object_class())
            .ok_or_else(|| InjectionError::NotConstructible {
                type_name: descriptor.desired_type().name.to_string(),
            })?;
        Ok(self.internal_make(class, supplier, temp)?.into_value())
    }

    fn new_binding(&self, described: TypeKey, class: Option<ClassRef>) -> Binding {
        let registry: Weak<dyn BindingRegistry> = self.self_ref.clone();
        self.bindings.add(Binding::new(described, class, registry))
    }
}

impl BindingRegistry for InjectorImpl {
    fn add_binding_value(&self, binding: Binding) -> Binding {
        self.bindings.add(binding)
    }
}

impl ObjectFactory for InjectorImpl {
    fn make_value(
        &self,
        descriptor: &ObjectDescriptor,
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<Value> {
        self.make_value_with(descriptor, supplier, None)
    }
}

impl Injector for InjectorImpl {
    fn inject<T: Injectable>(
        &self,
        object: &Instance<T>,
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<()> {
        let object: ObjectRef = object.clone();
        self.inject_object(&object, supplier, None)
    }

    fn inject_with(
        &self,
        object: &ObjectRef,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<()> {
        self.inject_object(object, supplier, temp)
    }

    fn inject_static<T: Injectable>(&self, supplier: Option<&SupplierRef>) -> InjectionResult<()> {
        let plan = self.plan(ClassRef::of::<T>())?;
        let requestors = self.collect_requestors(&plan, None, supplier, None, Order::Inject, true)?;
        self.resolve_requestors(&requestors, supplier, None, Pass::INJECT)?;
        for requestor in &requestors {
            requestor.execute_outcome()?;
        }
        Ok(())
    }

    fn uninject<T: Injectable>(
        &self,
        object: &Instance<T>,
        supplier: &SupplierRef,
    ) -> InjectionResult<bool> {
        let object: ObjectRef = object.clone();
        self.uninject_object(&object, supplier)
    }

    fn invoke(
        &self,
        object: &ObjectRef,
        marker: &str,
        supplier: Option<&SupplierRef>,
        local: Option<&SupplierRef>,
    ) -> InjectionResult<Option<Value>> {
        match self.invoke_marker(object, marker, supplier, local)? {
            Some(result) => Ok(result),
            None => {
                let class = object.class();
                if self.config.debug {
                    error!("无法在 {} 中找到带有 @{} 的可调用方法", class.name(), marker);
                }
                Err(InjectionError::NoMatchingMethod {
                    class: class.name().to_string(),
                    annotation: marker.to_string(),
                })
            }
        }
    }

    fn invoke_or(
        &self,
        object: &ObjectRef,
        marker: &str,
        default: Option<Value>,
        supplier: Option<&SupplierRef>,
        local: Option<&SupplierRef>,
    ) -> InjectionResult<Option<Value>> {
        Ok(self
            .invoke_marker(object, marker, supplier, local)?
            .unwrap_or(default))
    }

    fn make<T: Injectable>(
        &self,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Instance<T>> {
        let value = self.make_value_with(&ObjectDescriptor::object::<T>(), supplier, temp)?;
        value
            .downcast_ref::<Instance<T>>()
            .cloned()
            .ok_or_else(|| InjectionError::type_mismatch(std::any::type_name::<Instance<T>>(), "绑定构造的值"))
    }

    fn make_descriptor(
        &self,
        descriptor: &ObjectDescriptor,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Value> {
        self.make_value_with(descriptor, supplier, temp)
    }

    fn add_binding<S: Send + Sync + 'static>(&self) -> Binding {
        self.new_binding(TypeKey::sized::<S>(), None)
    }

    fn add_class_binding<U: Injectable>(&self) -> Binding {
        let class = ClassRef::of::<U>();
        self.new_binding(class.instance_key(), Some(class))
    }

    fn disposed(&self, supplier: &SupplierRef) -> InjectionResult<()> {
        self.dispose_supplier(supplier)
    }

    fn update(
        &self,
        requestors: &[Arc<dyn Requestor>],
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<bool> {
        let mut own = Vec::with_capacity(requestors.len());
        for requestor in requestors {
            let concrete = requestor
                .as_any()
                .downcast_ref::<InjectionRequestor>()
                .ok_or_else(|| {
                    InjectionError::type_mismatch("InjectionRequestor", format!("{requestor:?}"))
                })?;
            own.push(concrete.this()?);
        }
        self.resolve_requestors(&own, supplier, None, Pass::UPDATE)?;
        for requestor in &own {
            if let Err(e) = requestor.execute_outcome() {
                error!("更新 {} 失败: {}", requestor.location(), e);
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn set_default_supplier(&self, supplier: Option<SupplierRef>) {
        self.extended.set_default(supplier);
    }
}
