//! 参数解析
//!
//! 每个参数槽位按固定顺序查找值，先找到的值不会被后面的来源覆盖：
//!
//! 1. `Provider<U>` 槽位直接得到提供者
//! 2. 限定符对应的扩展提供者，一旦认领槽位，即使没有值也不再继续查找
//! 3. 临时提供者（不记录）
//! 4. 主提供者
//! 5. 绑定（拆除阶段跳过）
//! 6. 可隐式构造的类型（拆除阶段、可选请求者、可选槽位跳过）
//!
//! 最后丢弃类型不符的值，并为可选槽位以及要求补空的解析过程填入零值或空值。

use crate::injector::InjectorImpl;
use crate::requestor::InjectionRequestor;
use di_abstractions::{
    Arg, ObjectDescriptor, ObjectFactory, PrimaryObjectSupplier, ProviderContext, Requestor,
    SupplierRef,
};
use infrastructure_common::{AnnotationKind, InjectionResult, Location, MemberKind};
use std::sync::Arc;
use tracing::{debug, trace};

/// 一次参数解析的模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pass {
    /// 拆除阶段：不构造新对象，无法解析时只记录日志
    pub(crate) uninject: bool,
    /// 无法解析的槽位填入零值或空值
    pub(crate) fill_nulls: bool,
    pub(crate) initial: bool,
    pub(crate) track: bool,
}

impl Pass {
    /// 初次注入字段和方法
    pub(crate) const INJECT: Self = Self {
        uninject: false,
        fill_nulls: false,
        initial: true,
        track: true,
    };

    /// 构造函数、生命周期方法和 `invoke`，不记录
    pub(crate) const CALL: Self = Self {
        uninject: false,
        fill_nulls: false,
        initial: true,
        track: false,
    };

    pub(crate) const UNINJECT: Self = Self {
        uninject: true,
        fill_nulls: true,
        initial: false,
        track: false,
    };

    /// `update` 的重新解析
    pub(crate) const UPDATE: Self = Self {
        uninject: false,
        fill_nulls: true,
        initial: false,
        track: true,
    };

    /// 提供者通知请求者后的重新解析
    pub(crate) const fn refresh(initial: bool, track: bool) -> Self {
        Self {
            uninject: false,
            fill_nulls: false,
            initial,
            track,
        }
    }
}

impl InjectorImpl {
    pub(crate) fn resolve_args(
        &self,
        requestor: &Arc<InjectionRequestor>,
        supplier: Option<&SupplierRef>,
        temp: Option<&SupplierRef>,
        pass: Pass,
    ) -> InjectionResult<Vec<Arg>> {
        let uninject = pass.uninject;
        let initial = pass.initial;
        let descriptors = requestor.dependent_objects();
        let mut actual = vec![Arg::NotAValue; descriptors.len()];
        let mut pending = vec![true; descriptors.len()];
        let dynamic: Arc<dyn Requestor> = requestor.clone();
        let track = pass.track && requestor.should_track();
        let group_updates = requestor.should_group_updates();

        for (index, descriptor) in descriptors.iter().enumerate() {
            if let Some(element) = descriptor.provider_class() {
                let factory: Arc<dyn ObjectFactory> = self.arc()?;
                actual[index] = Arg::Value(element.provider_value(ProviderContext {
                    factory,
                    descriptor: descriptor.clone(),
                    supplier: supplier.cloned(),
                }));
                pending[index] = false;
            }
        }

        for (index, descriptor) in descriptors.iter().enumerate() {
            if !pending[index] {
                continue;
            }
            if let Some(extended) = self.extended().find(descriptor) {
                actual[index] = extended.get(descriptor, Some(&dynamic), track, group_updates);
                pending[index] = false;
            }
        }

        if let Some(temp) = temp {
            fill_from(
                &**temp,
                &descriptors,
                &mut actual,
                &mut pending,
                Some(&dynamic),
                initial,
                false,
                group_updates,
            );
        }

        if let Some(supplier) = supplier {
            fill_from(
                &**supplier,
                &descriptors,
                &mut actual,
                &mut pending,
                Some(&dynamic),
                initial,
                track,
                group_updates,
            );
        }

        if !uninject {
            for (index, descriptor) in descriptors.iter().enumerate() {
                if !pending[index] {
                    continue;
                }
                if let Some(binding) = self.find_binding(descriptor) {
                    actual[index] = Arg::Value(self.make_from_binding(&binding, supplier, temp)?);
                    pending[index] = false;
                }
            }
        }

        if !uninject && !requestor.is_optional() {
            for (index, descriptor) in descriptors.iter().enumerate() {
                if !pending[index] || descriptor.is_optional() {
                    continue;
                }
                let Some(class) = descriptor.object_class() else {
                    continue;
                };
                let meta = self.cache().class_meta(class);
                let location = Location::new(meta.key, MemberKind::Class, 0, meta.key.short_name());
                if !self
                    .cache()
                    .has_annotation(location, AnnotationKind::Creatable, &meta.annotations)
                {
                    continue;
                }
                trace!("隐式构造 {} 以满足 {}", class.name(), requestor.location());
                // 隐式构造失败时槽位保持未解析，交给调用方回退
                match self.internal_make(class, supplier, temp) {
                    Ok(object) => {
                        actual[index] = Arg::Value(object.into_value());
                        pending[index] = false;
                    }
                    Err(e) => debug!("隐式构造 {} 失败: {}", class.name(), e),
                }
            }
        }

        for (arg, descriptor) in actual.iter_mut().zip(descriptors.iter()) {
            if let Arg::Value(value) = arg {
                if !descriptor.desired_type().accepts(value) {
                    trace!("丢弃类型不符的值: 期望 {}", descriptor.desired_type());
                    *arg = Arg::NotAValue;
                }
            }
            if !arg.is_resolved() && (pass.fill_nulls || descriptor.is_optional()) {
                *arg = descriptor
                    .desired_type()
                    .zero_value()
                    .map_or(Arg::Null, Arg::Value);
            }
        }

        Ok(actual)
    }
}

/// 向提供者查询仍未解析的槽位，已解析的槽位以 `None` 屏蔽。
/// 即使没有待解析的槽位也会查询，提供者借此记录请求者
#[allow(clippy::too_many_arguments)]
fn fill_from(
    supplier: &dyn PrimaryObjectSupplier,
    descriptors: &[ObjectDescriptor],
    actual: &mut [Arg],
    pending: &mut [bool],
    requestor: Option<&Arc<dyn Requestor>>,
    initial: bool,
    track: bool,
    group_updates: bool,
) {
    let masked: Vec<Option<ObjectDescriptor>> = descriptors
        .iter()
        .zip(pending.iter())
        .map(|(descriptor, pending)| pending.then(|| descriptor.clone()))
        .collect();
    let mut scratch = vec![Arg::NotAValue; descriptors.len()];
    supplier.get(&masked, &mut scratch, requestor, initial, track, group_updates);
    for (index, found) in scratch.into_iter().enumerate() {
        if pending[index] && found.is_resolved() {
            actual[index] = found;
            pending[index] = false;
        }
    }
}
