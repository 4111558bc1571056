//! 注入器接口

use crate::binding::Binding;
use crate::class::Injectable;
use crate::descriptor::ObjectDescriptor;
use crate::object::{Instance, ObjectRef};
use crate::requestor::Requestor;
use crate::supplier::SupplierRef;
use infrastructure_common::{InjectionResult, Value};
use std::sync::Arc;

/// 依赖注入器
///
/// - `supplier` 是主对象提供者，注入会被它记录并在值变化时重放
/// - `temp` 是临时提供者，只在本次注入中优先使用，不会被记录
pub trait Injector: Send + Sync {
    /// 注入已存在的对象：字段和方法，然后调用 post-construct 方法
    fn inject<T: Injectable>(
        &self,
        object: &Instance<T>,
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<()>;

    /// 类型擦除的注入，可以附带临时提供者
    fn inject_with(
        &self,
        object: &ObjectRef,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<()>;

    /// 注入 `T` 及其父类型声明的静态字段和静态方法
    fn inject_static<T: Injectable>(&self, supplier: Option<&SupplierRef>) -> InjectionResult<()>;

    /// 从提供者上拆除对象。对象不在该提供者名下时返回 `false`
    fn uninject<T: Injectable>(
        &self,
        object: &Instance<T>,
        supplier: &SupplierRef,
    ) -> InjectionResult<bool>;

    /// 调用带有 `marker` 标签、参数可解析的方法。
    /// 派生类型优先，在第一个提供可解析方法的类型层级停止
    fn invoke(
        &self,
        object: &ObjectRef,
        marker: &str,
        supplier: Option<&SupplierRef>,
        local: Option<&SupplierRef>,
    ) -> InjectionResult<Option<Value>>;

    /// 同 [`Injector::invoke`]，找不到方法时返回 `default`
    fn invoke_or(
        &self,
        object: &ObjectRef,
        marker: &str,
        default: Option<Value>,
        supplier: Option<&SupplierRef>,
        local: Option<&SupplierRef>,
    ) -> InjectionResult<Option<Value>>;

    /// 构造并注入 `T`
    fn make<T: Injectable>(
        &self,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Instance<T>>;

    /// 按描述符构造，优先使用绑定
    fn make_descriptor(
        &self,
        descriptor: &ObjectDescriptor,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
    ) -> InjectionResult<Value>;

    /// 为任意期望类型创建绑定并注册
    fn add_binding<S: Send + Sync + 'static>(&self) -> Binding;

    /// 为 `Instance<U>` 创建绑定并注册，默认实现为 `U` 本身
    fn add_class_binding<U: Injectable>(&self) -> Binding;

    /// 提供者释放：对其名下所有对象调用 pre-destroy 和释放回调
    fn disposed(&self, supplier: &SupplierRef) -> InjectionResult<()>;

    /// 重新解析并执行一组由本注入器创建的请求者，无法解析的参数以空值填充。
    /// 执行失败时记录日志并返回 `false`
    fn update(
        &self,
        requestors: &[Arc<dyn Requestor>],
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<bool>;

    /// 设置默认提供者，用于查找扩展提供者
    fn set_default_supplier(&self, supplier: Option<SupplierRef>);
}
