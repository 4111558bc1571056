//! 对象提供者接口

use crate::descriptor::ObjectDescriptor;
use crate::object::{ObjectRef, WeakObject};
use crate::requestor::Requestor;
use infrastructure_common::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// 单个参数槽位的解析结果
#[derive(Clone, Default)]
pub enum Arg {
    /// 尚未找到值
    #[default]
    NotAValue,
    /// 已解析为空值（可选注入点的默认值）
    Null,
    Value(Value),
}

impl Arg {
    /// 是否已经解析（包括空值）
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::NotAValue)
    }

    pub fn into_option(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::NotAValue | Self::Null => None,
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAValue => f.write_str("NotAValue"),
            Self::Null => f.write_str("Null"),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// 主对象提供者
///
/// 为一组描述符批量提供值，并可以记录请求者以便值变化时重新注入
pub trait PrimaryObjectSupplier: Send + Sync {
    /// 填充 `values` 中尚未解析且有对应描述符的槽位。
    /// `track` 为真时记录 `requestor`，值变化后重新执行它。
    fn get(
        &self,
        descriptors: &[Option<ObjectDescriptor>],
        values: &mut [Arg],
        requestor: Option<&Arc<dyn Requestor>>,
        initial: bool,
        track: bool,
        group_updates: bool,
    );

    /// 暂停记录访问，用户方法执行期间的读取不建立依赖
    fn pause_recording(&self) {}

    fn resume_recording(&self) {}

    /// 生成对象的引用，默认为弱引用
    fn make_reference(&self, object: &ObjectRef) -> WeakObject {
        Arc::downgrade(object)
    }
}

/// 扩展对象提供者
///
/// 按限定符注解的名称注册，只负责带有该限定符的描述符
pub trait ExtendedObjectSupplier: Send + Sync {
    /// 返回 [`Arg::NotAValue`] 表示没有值
    fn get(
        &self,
        descriptor: &ObjectDescriptor,
        requestor: Option<&Arc<dyn Requestor>>,
        track: bool,
        group_updates: bool,
    ) -> Arg;
}

pub type SupplierRef = Arc<dyn PrimaryObjectSupplier>;
pub type WeakSupplier = Weak<dyn PrimaryObjectSupplier>;
pub type ExtendedSupplierRef = Arc<dyn ExtendedObjectSupplier>;

/// 提供者的身份标识（地址）
pub fn supplier_id(supplier: &SupplierRef) -> usize {
    Arc::as_ptr(supplier).cast::<()>() as usize
}

/// 暂停提供者的访问记录，离开作用域时恢复
pub struct RecordingPause<'a> {
    supplier: Option<&'a SupplierRef>,
}

impl<'a> RecordingPause<'a> {
    pub fn new(supplier: Option<&'a SupplierRef>) -> Self {
        if let Some(supplier) = supplier {
            supplier.pause_recording();
        }
        Self { supplier }
    }
}

impl Drop for RecordingPause<'_> {
    fn drop(&mut self) {
        if let Some(supplier) = self.supplier {
            supplier.resume_recording();
        }
    }
}
