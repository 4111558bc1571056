//! 类型元数据
//!
//! 注入器不依赖运行时反射。每个可注入类型通过 [`Injectable::describe`]
//! 声明自己的构造函数、字段、方法、父类型以及它们上面的注解，
//! 声明中的闭包负责在类型擦除的对象上完成实际的赋值和调用。

use crate::args::Args;
use crate::object::{Instance, ObjectRef};
use crate::provider::{Provider, ProviderContext};
use infrastructure_common::{
    Annotation, AnnotationKind, Disposable, InjectionError, Qualifier, TypeKey, Value, Visibility,
};
use parking_lot::RwLock;
use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 可注入类型
///
/// ```ignore
/// impl Injectable for Foo {
///     fn describe(class: &mut ClassBuilder<Self>) {
///         class.default_constructor();
///         class
///             .object_field::<Bar, _>("bar", |foo, bar| foo.bar = bar)
///             .inject();
///     }
/// }
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    fn describe(class: &mut ClassBuilder<Self>);
}

/// 从派生类型对象中取出父类型部分
pub type Projection = Arc<dyn Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync>;

/// 字段赋值，静态字段的目标为 `None`
pub type FieldSetter =
    Arc<dyn Fn(Option<&mut dyn Any>, Option<Value>) -> Result<(), InjectionError> + Send + Sync>;

/// 方法调用，静态方法的目标为 `None`
pub type MethodBody = Arc<
    dyn Fn(Option<&mut dyn Any>, &Args) -> Result<Option<Value>, InjectionError> + Send + Sync,
>;

/// 构造函数调用
pub type ConstructorBody = Arc<dyn Fn(&Args) -> Result<ObjectRef, InjectionError> + Send + Sync>;

/// 释放回调
pub type DisposeHook = Arc<dyn Fn(&mut dyn Any) + Send + Sync>;

/// 创建投影
pub fn projection<F>(f: F) -> Projection
where
    F: Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 组合两级投影：先取 `outer`，再在结果上取 `inner`
pub fn compose(outer: Projection, inner: Projection) -> Projection {
    projection(move |target| outer(target).and_then(|part| inner(part)))
}

fn field_setter<F>(f: F) -> FieldSetter
where
    F: Fn(Option<&mut dyn Any>, Option<Value>) -> Result<(), InjectionError> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn method_body<F>(f: F) -> MethodBody
where
    F: Fn(Option<&mut dyn Any>, &Args) -> Result<Option<Value>, InjectionError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

fn target_of<'a, T: 'static>(
    target: Option<&'a mut dyn Any>,
    member: &str,
) -> Result<&'a mut T, InjectionError> {
    target
        .and_then(|target| target.downcast_mut::<T>())
        .ok_or_else(|| InjectionError::type_mismatch(type_name::<T>(), format!("{member} 的目标对象")))
}

fn typed_value<S: Clone + 'static>(value: Option<Value>) -> Result<Option<S>, InjectionError> {
    match value {
        None => Ok(None),
        Some(value) => value
            .downcast_ref::<S>()
            .cloned()
            .map(Some)
            .ok_or_else(|| InjectionError::type_mismatch(type_name::<S>(), "不兼容的注入值")),
    }
}

/// 注入点的一个参数槽位
#[derive(Clone)]
pub struct Param {
    /// 槽位声明的类型
    pub key: TypeKey,
    /// 槽位类型为 `Instance<U>` 时对应的可构造类型
    pub class: Option<ClassRef>,
    /// 槽位类型为 `Provider<U>` 时对应的元素类型
    pub provider: Option<ClassRef>,
    pub annotations: Vec<Annotation>,
}

impl Param {
    /// 普通值槽位
    pub fn of<S: Send + Sync + 'static>() -> Self {
        Self {
            key: TypeKey::sized::<S>(),
            class: None,
            provider: None,
            annotations: Vec::new(),
        }
    }

    /// 可注入对象槽位，缺少值时允许隐式构造
    pub fn object<U: Injectable>() -> Self {
        Self {
            class: Some(ClassRef::of::<U>()),
            ..Self::of::<Instance<U>>()
        }
    }

    /// 延迟构造的提供者槽位
    pub fn provider<U: Injectable>() -> Self {
        Self {
            provider: Some(ClassRef::of::<U>()),
            ..Self::of::<Provider<U>>()
        }
    }

    #[must_use]
    pub fn named(self, name: impl Into<String>) -> Self {
        self.annotate(Annotation::named(name))
    }

    #[must_use]
    pub fn optional(self) -> Self {
        self.annotate(Annotation::optional())
    }

    #[must_use]
    pub fn qualifier(self, qualifier: Qualifier) -> Self {
        self.annotate(Annotation::Qualifier(qualifier))
    }

    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// 字段声明
pub struct FieldDecl {
    pub name: &'static str,
    pub visibility: Visibility,
    pub is_static: bool,
    /// 字段类型及字段上的全部注解
    pub slot: Param,
    pub setter: FieldSetter,
}

impl FieldDecl {
    pub fn inject(&mut self) -> &mut Self {
        self.annotate(Annotation::Inject)
    }

    pub fn optional(&mut self) -> &mut Self {
        self.annotate(Annotation::optional())
    }

    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.annotate(Annotation::named(name))
    }

    pub fn qualifier(&mut self, qualifier: Qualifier) -> &mut Self {
        self.annotate(Annotation::Qualifier(qualifier))
    }

    pub fn group_updates(&mut self) -> &mut Self {
        self.annotate(Annotation::GroupUpdates)
    }

    pub fn annotate(&mut self, annotation: Annotation) -> &mut Self {
        self.slot.annotations.push(annotation);
        self
    }

    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.slot.annotations
    }
}

/// 方法声明
pub struct MethodDecl {
    pub name: &'static str,
    pub visibility: Visibility,
    pub is_static: bool,
    /// 编译器生成的桥接方法，注入时跳过
    pub synthetic: bool,
    pub annotations: Vec<Annotation>,
    pub params: Vec<Param>,
    pub body: MethodBody,
}

impl MethodDecl {
    pub fn inject(&mut self) -> &mut Self {
        self.annotate(Annotation::Inject)
    }

    /// 方法整体可选：任一参数无法解析时跳过调用
    pub fn optional(&mut self) -> &mut Self {
        self.annotate(Annotation::optional())
    }

    pub fn group_updates(&mut self) -> &mut Self {
        self.annotate(Annotation::GroupUpdates)
    }

    pub fn post_construct(&mut self) -> &mut Self {
        self.annotate(Annotation::PostConstruct)
    }

    pub fn pre_destroy(&mut self) -> &mut Self {
        self.annotate(Annotation::PreDestroy)
    }

    /// 供 `invoke` 查找的方法标签
    pub fn marker(&mut self, name: &'static str) -> &mut Self {
        self.annotate(Annotation::Marker(name))
    }

    pub fn annotate(&mut self, annotation: Annotation) -> &mut Self {
        self.annotations.push(annotation);
        self
    }

    pub fn arg(&mut self, param: Param) -> &mut Self {
        self.params.push(param);
        self
    }

    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    pub fn synthetic(&mut self) -> &mut Self {
        self.synthetic = true;
        self
    }

    /// 参数签名是否相同
    pub fn same_signature(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.key == b.key)
    }
}

/// 构造函数声明
pub struct ConstructorDecl {
    pub visibility: Visibility,
    pub annotations: Vec<Annotation>,
    /// 实际的参数类型，包括前置的合成参数
    pub raw: Vec<TypeKey>,
    /// 带注解的参数，不包括合成参数
    pub params: Vec<Param>,
    pub body: ConstructorBody,
    synthetic: usize,
}

impl ConstructorDecl {
    fn new(body: ConstructorBody) -> Self {
        Self {
            visibility: Visibility::Public,
            annotations: Vec::new(),
            raw: Vec::new(),
            params: Vec::new(),
            body,
            synthetic: 0,
        }
    }

    pub fn inject(&mut self) -> &mut Self {
        self.annotate(Annotation::Inject)
    }

    pub fn annotate(&mut self, annotation: Annotation) -> &mut Self {
        self.annotations.push(annotation);
        self
    }

    pub fn arg(&mut self, param: Param) -> &mut Self {
        self.raw.push(param.key);
        self.params.push(param);
        self
    }

    /// 声明一个没有注解信息的合成参数，例如内部类型的外部实例。
    /// 合成参数总是排在普通参数之前，构造函数收到的实参也按此顺序排列。
    pub fn synthetic<S: Send + Sync + 'static>(&mut self) -> &mut Self {
        self.raw.insert(self.synthetic, TypeKey::sized::<S>());
        self.synthetic += 1;
        self
    }

    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.visibility = visibility;
        self
    }

    /// 实际参数个数
    pub fn arity(&self) -> usize {
        self.raw.len()
    }
}

/// 父类型声明
pub struct ParentDecl {
    pub class: ClassRef,
    pub project: Projection,
}

/// 一个类型的完整元数据
pub struct ClassMeta {
    pub key: TypeKey,
    /// 声明模块，用于判断包可见方法的重写
    pub module: &'static str,
    pub annotations: Vec<Annotation>,
    pub parent: Option<ParentDecl>,
    pub constructors: Vec<ConstructorDecl>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub dispose: Option<DisposeHook>,
}

impl ClassMeta {
    fn empty(key: TypeKey) -> Self {
        Self {
            key,
            module: key.module_path(),
            annotations: Vec::new(),
            parent: None,
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            dispose: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    pub fn has_annotation(&self, kind: &AnnotationKind) -> bool {
        self.annotations.iter().any(|a| &a.kind() == kind)
    }
}

impl fmt::Debug for ClassMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMeta")
            .field("key", &self.key)
            .field("parent", &self.parent.as_ref().map(|p| p.class.key()))
            .field("constructors", &self.constructors.len())
            .field("fields", &self.fields.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// 类型引用
///
/// 保存描述函数，元数据由注入器按需生成并缓存
#[derive(Clone, Copy)]
pub struct ClassRef {
    key: TypeKey,
    instance_key: TypeKey,
    describe: fn() -> ClassMeta,
    provider: fn(ProviderContext) -> Value,
}

fn describe_class<T: Injectable>() -> ClassMeta {
    let mut builder = ClassBuilder::<T>::new();
    T::describe(&mut builder);
    builder.build()
}

fn provider_value<T: Injectable>(context: ProviderContext) -> Value {
    Arc::new(Provider::<T>::new(context))
}

impl ClassRef {
    pub fn of<T: Injectable>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            instance_key: TypeKey::sized::<Instance<T>>(),
            describe: describe_class::<T>,
            provider: provider_value::<T>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// `Instance<T>` 的类型标识
    pub fn instance_key(&self) -> TypeKey {
        self.instance_key
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    /// 生成元数据
    pub fn describe(&self) -> ClassMeta {
        (self.describe)()
    }

    /// 创建 `Provider<T>` 注入值
    pub fn provider_value(&self, context: ProviderContext) -> Value {
        (self.provider)(context)
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ClassRef {}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassRef({})", self.key.name)
    }
}

/// 元数据构建器
pub struct ClassBuilder<T> {
    meta: ClassMeta,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Injectable> ClassBuilder<T> {
    pub fn new() -> Self {
        Self {
            meta: ClassMeta::empty(TypeKey::of::<T>()),
            _marker: PhantomData,
        }
    }

    pub fn build(self) -> ClassMeta {
        self.meta
    }

    /// 每个注入器只构造一次
    pub fn singleton(&mut self) -> &mut Self {
        self.annotate(Annotation::Singleton)
    }

    /// 允许在没有其它来源时隐式构造
    pub fn creatable(&mut self) -> &mut Self {
        self.annotate(Annotation::Creatable)
    }

    pub fn annotate(&mut self, annotation: Annotation) -> &mut Self {
        self.meta.annotations.push(annotation);
        self
    }

    /// 覆盖声明模块
    pub fn module(&mut self, path: &'static str) -> &mut Self {
        self.meta.module = path;
        self
    }

    /// 声明父类型。父类型的注入点先于本类型的注入点执行
    pub fn extends<P, F>(&mut self, parent: F) -> &mut Self
    where
        P: Injectable,
        F: Fn(&mut T) -> &mut P + Send + Sync + 'static,
    {
        let project = projection(move |target| {
            target
                .downcast_mut::<T>()
                .map(|this| parent(this) as &mut dyn Any)
        });
        self.meta.parent = Some(ParentDecl {
            class: ClassRef::of::<P>(),
            project,
        });
        self
    }

    /// 提供者释放时调用 [`Disposable::dispose`]
    pub fn disposable(&mut self) -> &mut Self
    where
        T: Disposable,
    {
        let hook: DisposeHook = Arc::new(|target: &mut dyn Any| {
            if let Some(this) = target.downcast_mut::<T>() {
                this.dispose();
            }
        });
        self.meta.dispose = Some(hook);
        self
    }

    pub fn constructor<F>(&mut self, make: F) -> &mut ConstructorDecl
    where
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let member = format!("{}::new", self.meta.key.short_name());
        let body: ConstructorBody = Arc::new(move |args: &Args| {
            make(args)
                .map(|object| Arc::new(RwLock::new(object)) as ObjectRef)
                .map_err(|e| InjectionError::invocation(member.clone(), e))
        });
        let index = self.meta.constructors.len();
        self.meta.constructors.push(ConstructorDecl::new(body));
        &mut self.meta.constructors[index]
    }

    pub fn default_constructor(&mut self) -> &mut ConstructorDecl
    where
        T: Default,
    {
        self.constructor(|_| Ok(T::default()))
    }

    /// 普通值字段
    pub fn field<S, F>(&mut self, name: &'static str, set: F) -> &mut FieldDecl
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&mut T, Option<S>) + Send + Sync + 'static,
    {
        self.typed_field(name, Param::of::<S>(), set)
    }

    /// 可注入对象字段
    pub fn object_field<U, F>(&mut self, name: &'static str, set: F) -> &mut FieldDecl
    where
        U: Injectable,
        F: Fn(&mut T, Option<Instance<U>>) + Send + Sync + 'static,
    {
        self.typed_field(name, Param::object::<U>(), set)
    }

    /// 提供者字段
    pub fn provider_field<U, F>(&mut self, name: &'static str, set: F) -> &mut FieldDecl
    where
        U: Injectable,
        F: Fn(&mut T, Option<Provider<U>>) + Send + Sync + 'static,
    {
        self.typed_field(name, Param::provider::<U>(), set)
    }

    /// 静态字段，由 `inject_static` 注入
    pub fn static_field<S, F>(&mut self, name: &'static str, set: F) -> &mut FieldDecl
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(Option<S>) + Send + Sync + 'static,
    {
        let setter = field_setter(move |_, value| {
            set(typed_value::<S>(value)?);
            Ok(())
        });
        self.push_field(name, Param::of::<S>(), true, setter)
    }

    fn typed_field<S, F>(&mut self, name: &'static str, slot: Param, set: F) -> &mut FieldDecl
    where
        S: Clone + Send + Sync + 'static,
        F: Fn(&mut T, Option<S>) + Send + Sync + 'static,
    {
        let member = format!("{}.{}", self.meta.key.short_name(), name);
        let setter = field_setter(move |target, value| {
            let target = target_of::<T>(target, &member)?;
            set(target, typed_value::<S>(value)?);
            Ok(())
        });
        self.push_field(name, slot, false, setter)
    }

    fn push_field(
        &mut self,
        name: &'static str,
        slot: Param,
        is_static: bool,
        setter: FieldSetter,
    ) -> &mut FieldDecl {
        let index = self.meta.fields.len();
        self.meta.fields.push(FieldDecl {
            name,
            visibility: Visibility::Public,
            is_static,
            slot,
            setter,
        });
        &mut self.meta.fields[index]
    }

    pub fn method<F>(&mut self, name: &'static str, body: F) -> &mut MethodDecl
    where
        F: Fn(&mut T, &Args) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        let member = format!("{}::{}", self.meta.key.short_name(), name);
        let body = method_body(move |target, args| {
            let target = target_of::<T>(target, &member)?;
            body(target, args).map_err(|e| InjectionError::invocation(member.clone(), e))
        });
        self.push_method(name, false, body)
    }

    pub fn static_method<F>(&mut self, name: &'static str, body: F) -> &mut MethodDecl
    where
        F: Fn(&Args) -> anyhow::Result<Option<Value>> + Send + Sync + 'static,
    {
        let member = format!("{}::{}", self.meta.key.short_name(), name);
        let body = method_body(move |_, args| {
            body(args).map_err(|e| InjectionError::invocation(member.clone(), e))
        });
        self.push_method(name, true, body)
    }

    fn push_method(&mut self, name: &'static str, is_static: bool, body: MethodBody) -> &mut MethodDecl {
        let index = self.meta.methods.len();
        self.meta.methods.push(MethodDecl {
            name,
            visibility: Visibility::Public,
            is_static,
            synthetic: false,
            annotations: Vec::new(),
            params: Vec::new(),
            body,
        });
        &mut self.meta.methods[index]
    }
}
