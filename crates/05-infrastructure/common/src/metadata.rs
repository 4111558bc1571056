//! 元数据定义
//!
//! 注入点的类型标识、注解与限定符模型

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// 类型擦除后的注入值
pub type Value = Arc<dyn Any + Send + Sync>;

/// 将任意值包装为注入值
pub fn value<V: Any + Send + Sync>(value: V) -> Value {
    Arc::new(value)
}

/// 返回注入值内部负载的类型ID
pub fn payload_type(value: &Value) -> TypeId {
    (**value).type_id()
}

/// 类型标识
///
/// 注入点所需类型的身份。基本类型额外携带零值构造函数，
/// 用于可选注入点和拆除阶段的默认值。
#[derive(Clone, Copy)]
pub struct TypeKey {
    /// 类型ID
    pub id: TypeId,
    /// 完整类型名称
    pub name: &'static str,
    zero: Option<fn() -> Value>,
}

macro_rules! primitive_zero {
    ($id:expr, $($ty:ty),* $(,)?) => {
        $(
            if $id == TypeId::of::<$ty>() {
                return Some((|| Arc::new(<$ty>::default()) as Value) as fn() -> Value);
            }
        )*
    };
}

fn zero_of<T: 'static>() -> Option<fn() -> Value> {
    let id = TypeId::of::<T>();
    primitive_zero!(id, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);
    None
}

impl TypeKey {
    /// 从类型获取类型标识
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            zero: None,
        }
    }

    /// 从具体类型获取类型标识，基本类型会带上零值
    pub fn sized<T: 'static>() -> Self {
        Self {
            zero: zero_of::<T>(),
            ..Self::of::<T>()
        }
    }

    /// 是否为基本类型
    pub fn is_primitive(&self) -> bool {
        self.zero.is_some()
    }

    /// 基本类型的零值，引用类型返回 `None`
    pub fn zero_value(&self) -> Option<Value> {
        self.zero.map(|zero| zero())
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        let start = base.rfind("::").map_or(0, |i| i + 2);
        &self.name[start..]
    }

    /// 声明该类型的模块路径
    pub fn module_path(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        base.rfind("::").map_or("", |i| &self.name[..i])
    }

    /// 值是否符合该类型
    pub fn accepts(&self, value: &Value) -> bool {
        payload_type(value) == self.id
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// 限定符
///
/// 附加在注入点上、参与值匹配的注解
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    /// 限定符注解的类型名称
    pub name: Cow<'static, str>,
    /// 限定符的值
    pub value: Option<String>,
}

impl Qualifier {
    /// `@Named` 限定符名称
    pub const NAMED: &'static str = "named";
    /// `@Optional` 限定符名称
    pub const OPTIONAL: &'static str = "optional";

    /// 创建自定义限定符
    pub fn new(name: impl Into<Cow<'static, str>>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// 创建 `@Named(value)` 限定符
    pub fn named(value: impl Into<String>) -> Self {
        Self::new(Self::NAMED, Some(value.into()))
    }

    /// 创建 `@Optional` 限定符
    pub fn optional() -> Self {
        Self::new(Self::OPTIONAL, None)
    }

    pub fn is_named(&self) -> bool {
        self.name == Self::NAMED
    }

    pub fn is_optional(&self) -> bool {
        self.name == Self::OPTIONAL
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "@{}(\"{}\")", self.name, value),
            None => write!(f, "@{}", self.name),
        }
    }
}

/// 注解
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Annotation {
    /// 标记注入点
    Inject,
    /// 构造并注入完成后调用
    PostConstruct,
    /// 对象销毁前调用
    PreDestroy,
    /// 合并批量更新
    GroupUpdates,
    /// 单例类型
    Singleton,
    /// 可在缺少其它来源时隐式构造
    Creatable,
    /// 限定符
    Qualifier(Qualifier),
    /// 不参与匹配的自定义标记，例如供 `invoke` 查找的方法标签
    Marker(&'static str),
}

/// 注解种类，作为注解存在性缓存的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Inject,
    PostConstruct,
    PreDestroy,
    GroupUpdates,
    Singleton,
    Creatable,
    Qualifier(Cow<'static, str>),
    Marker(&'static str),
}

impl Annotation {
    pub fn named(value: impl Into<String>) -> Self {
        Self::Qualifier(Qualifier::named(value))
    }

    pub fn optional() -> Self {
        Self::Qualifier(Qualifier::optional())
    }

    /// 注解的种类
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Inject => AnnotationKind::Inject,
            Self::PostConstruct => AnnotationKind::PostConstruct,
            Self::PreDestroy => AnnotationKind::PreDestroy,
            Self::GroupUpdates => AnnotationKind::GroupUpdates,
            Self::Singleton => AnnotationKind::Singleton,
            Self::Creatable => AnnotationKind::Creatable,
            Self::Qualifier(q) => AnnotationKind::Qualifier(q.name.clone()),
            Self::Marker(name) => AnnotationKind::Marker(name),
        }
    }

    /// 注解名称
    pub fn name(&self) -> &str {
        match self {
            Self::Inject => "inject",
            Self::PostConstruct => "post_construct",
            Self::PreDestroy => "pre_destroy",
            Self::GroupUpdates => "group_updates",
            Self::Singleton => "singleton",
            Self::Creatable => "creatable",
            Self::Qualifier(q) => &q.name,
            Self::Marker(name) => name,
        }
    }

    pub fn as_qualifier(&self) -> Option<&Qualifier> {
        match self {
            Self::Qualifier(q) => Some(q),
            _ => None,
        }
    }
}

impl From<Qualifier> for Annotation {
    fn from(qualifier: Qualifier) -> Self {
        Self::Qualifier(qualifier)
    }
}

/// 成员可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    /// 仅在声明类型所在的模块内可见
    Package,
    Private,
}

/// 注入点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
    /// 没有任何注入点的对象使用的伪注入点
    Class,
}

/// 注入点位置
///
/// 注入点的稳定标识，用作依赖描述符缓存和注解缓存的键
#[derive(Debug, Clone, Copy)]
pub struct Location {
    /// 声明该成员的类型
    pub class: TypeKey,
    pub kind: MemberKind,
    /// 成员在声明类型中的序号
    pub index: usize,
    pub name: &'static str,
}

impl Location {
    pub fn new(class: TypeKey, kind: MemberKind, index: usize, name: &'static str) -> Self {
        Self {
            class,
            kind,
            index,
            name,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.kind == other.kind && self.index == other.index
    }
}

impl Eq for Location {}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.kind.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MemberKind::Field => write!(f, "{}.{}", self.class.short_name(), self.name),
            MemberKind::Method => write!(f, "{}::{}()", self.class.short_name(), self.name),
            MemberKind::Constructor => write!(f, "{}::new#{}", self.class.short_name(), self.index),
            MemberKind::Class => write!(f, "{}", self.class.short_name()),
        }
    }
}
