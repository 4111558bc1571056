//! 注入请求者
//!
//! 请求者代表一个注入点（字段、方法、构造函数或类本身），
//! 对象提供者记录请求者，在值变化时重新解析并执行它。

use crate::object::ObjectRef;
use crate::supplier::SupplierRef;
use infrastructure_common::{InjectionResult, Location, Value};
use std::any::Any;
use std::fmt;

/// 请求者的相等性键
///
/// 两个请求者在注入点、分组标志、注入器、可选标志、主提供者
/// 以及请求对象都相同时视为同一个请求者
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub location: Location,
    pub group_updates: bool,
    pub injector: usize,
    pub optional: bool,
    pub supplier: Option<usize>,
    pub object: Option<usize>,
}

pub trait Requestor: Send + Sync + fmt::Debug {
    /// 注入点位置
    fn location(&self) -> Location;

    fn key(&self) -> RequestKey;

    /// 请求对象，已被回收或为静态注入时返回 `None`
    fn requesting_object(&self) -> Option<ObjectRef>;

    /// 请求对象仍然存活
    fn is_valid(&self) -> bool;

    fn is_optional(&self) -> bool;

    fn should_track(&self) -> bool;

    fn should_group_updates(&self) -> bool;

    /// 重新解析参数。非可选请求者无法解析时返回错误
    fn resolve_arguments(&self, initial: bool) -> InjectionResult<()>;

    /// 注入器借此取回自己创建的具体请求者
    fn as_any(&self) -> &dyn Any;

    /// 使用最近一次解析的参数执行注入点，执行后清除参数
    fn execute(&self) -> InjectionResult<Option<Value>>;

    /// 提供者已释放
    fn disposed(&self, supplier: &SupplierRef) -> InjectionResult<()>;

    /// 将对象从提供者上拆除
    fn uninject(&self, object: &ObjectRef, supplier: &SupplierRef) -> InjectionResult<bool>;
}
