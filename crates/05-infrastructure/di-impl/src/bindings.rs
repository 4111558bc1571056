//! 绑定表

use di_abstractions::{Binding, ObjectDescriptor};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::HashMap;
use tracing::debug;

#[derive(Default)]
pub(crate) struct BindingTable {
    bindings: Mutex<HashMap<TypeId, Vec<Binding>>>,
}

impl BindingTable {
    /// 注册绑定，替换期望类型和名称都相同的旧绑定
    pub(crate) fn add(&self, binding: Binding) -> Binding {
        let mut bindings = self.bindings.lock();
        let bucket = bindings.entry(binding.described_type().id).or_default();
        bucket.retain(|existing| existing.qualifier_name() != binding.qualifier_name());
        debug!(
            "注册绑定: {} (名称: {:?})",
            binding.described_type(),
            binding.qualifier_name()
        );
        bucket.push(binding.clone());
        binding
    }

    /// 查找描述符对应的绑定
    ///
    /// 名称取 `@Named` 的值，没有时取第一个非可选限定符的名称。
    /// 没有名称匹配的绑定时，退回到期望类型名称相同的第一个绑定。
    pub(crate) fn find(&self, descriptor: &ObjectDescriptor) -> Option<Binding> {
        let element = descriptor.element_type();
        let bindings = self.bindings.lock();
        let bucket = bindings.get(&element.id)?;

        let desired = descriptor.name().map(str::to_string).or_else(|| {
            descriptor
                .qualifiers()?
                .iter()
                .find(|q| !q.is_optional())
                .map(|q| q.name.to_string())
        });

        bucket
            .iter()
            .find(|binding| binding.qualifier_name() == desired.as_deref())
            .or_else(|| {
                bucket
                    .iter()
                    .find(|binding| binding.described_type().name == element.name)
            })
            .cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.bindings.lock().values().map(Vec::len).sum()
    }
}
