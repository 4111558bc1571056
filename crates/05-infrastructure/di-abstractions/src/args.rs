//! 解析后的调用参数

use infrastructure_common::{InjectionError, InjectionResult, Value};
use std::any::type_name;

/// 方法或构造函数的实参
///
/// 每个位置对应一个依赖描述符，`None` 表示可选注入点未找到值
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Option<Value>>,
}

impl Args {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 获取未类型化的参数值
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// 按类型获取参数，值缺失或类型不符时返回 `None`
    pub fn get<S: Clone + 'static>(&self, index: usize) -> Option<S> {
        self.value(index)
            .and_then(|value| value.downcast_ref::<S>())
            .cloned()
    }

    /// 按类型获取必须存在的参数
    pub fn require<S: Clone + 'static>(&self, index: usize) -> InjectionResult<S> {
        let value = self.value(index).ok_or_else(|| InjectionError::Unsatisfied {
            requestor: format!("参数 #{index}"),
            dependency: type_name::<S>().to_string(),
        })?;
        value
            .downcast_ref::<S>()
            .cloned()
            .ok_or_else(|| InjectionError::type_mismatch(type_name::<S>(), "不兼容的参数值"))
    }

    pub fn into_values(self) -> Vec<Option<Value>> {
        self.values
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args").field("len", &self.values.len()).finish()
    }
}
