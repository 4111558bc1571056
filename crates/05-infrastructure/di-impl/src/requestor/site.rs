//! 注入点
//!
//! 四种注入点：字段、方法、构造函数，以及没有任何注入点的对象使用的类注入点

use crate::cache::MetadataCache;
use di_abstractions::{
    Args, ClassMeta, ObjectDescriptor, ObjectRef, Projection, RecordingPause, SupplierRef,
};
use infrastructure_common::{
    InjectionError, InjectionResult, Location, MemberKind, Qualifier, TypeKey, Value,
};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类注入点请求的标记类型，提供者不应为它提供值。
/// 它让没有注入点的对象也能被提供者记录，从而收到释放通知。
pub struct ObjectMarker;

/// 执行结果
pub(crate) enum Outcome {
    Done,
    Value(Option<Value>),
    Object(ObjectRef),
}

impl Outcome {
    pub(crate) fn into_value(self) -> Option<Value> {
        match self {
            Self::Done => None,
            Self::Value(value) => value,
            Self::Object(object) => Some(object.into_value()),
        }
    }
}

pub(crate) enum Site {
    Field {
        meta: Arc<ClassMeta>,
        index: usize,
        project: Option<Projection>,
    },
    Method {
        meta: Arc<ClassMeta>,
        index: usize,
        project: Option<Projection>,
    },
    Constructor {
        meta: Arc<ClassMeta>,
        index: usize,
    },
    Class {
        class: TypeKey,
    },
}

impl Site {
    pub(crate) fn location(&self) -> Location {
        match self {
            Self::Field { meta, index, .. } => {
                Location::new(meta.key, MemberKind::Field, *index, meta.fields[*index].name)
            }
            Self::Method { meta, index, .. } => {
                Location::new(meta.key, MemberKind::Method, *index, meta.methods[*index].name)
            }
            Self::Constructor { meta, index } => {
                Location::new(meta.key, MemberKind::Constructor, *index, "new")
            }
            Self::Class { class } => Location::new(*class, MemberKind::Class, 0, class.short_name()),
        }
    }

    /// 静态成员和构造函数没有请求对象
    pub(crate) fn needs_object(&self) -> bool {
        match self {
            Self::Field { meta, index, .. } => !meta.fields[*index].is_static,
            Self::Method { meta, index, .. } => !meta.methods[*index].is_static,
            Self::Constructor { .. } => false,
            Self::Class { .. } => true,
        }
    }

    pub(crate) fn dependent_objects(&self, cache: &MetadataCache) -> Arc<[ObjectDescriptor]> {
        cache.dependent_objects(self.location(), || match self {
            Self::Field { meta, index, .. } => {
                vec![ObjectDescriptor::from_param(&meta.fields[*index].slot)]
            }
            Self::Method { meta, index, .. } => meta.methods[*index]
                .params
                .iter()
                .map(ObjectDescriptor::from_param)
                .collect(),
            Self::Constructor { meta, index } => {
                let constructor = &meta.constructors[*index];
                // 合成参数没有注解信息，补在前面与实际参数对齐
                let extra = constructor.raw.len().saturating_sub(constructor.params.len());
                constructor.raw[..extra]
                    .iter()
                    .map(|key| ObjectDescriptor::new(*key, &[]))
                    .chain(constructor.params.iter().map(ObjectDescriptor::from_param))
                    .collect()
            }
            Self::Class { .. } => {
                vec![ObjectDescriptor::of::<ObjectMarker>().with_qualifier(Qualifier::optional())]
            }
        })
    }

    pub(crate) fn execute(
        &self,
        object: Option<&ObjectRef>,
        args: Args,
        supplier: Option<&SupplierRef>,
    ) -> InjectionResult<Outcome> {
        match self {
            Self::Field {
                meta,
                index,
                project,
            } => {
                let field = &meta.fields[*index];
                let value = args.value(0).cloned();
                if field.is_static {
                    (field.setter)(None, value)?;
                } else {
                    with_target(object, project.as_ref(), meta.key, |target| {
                        (field.setter)(Some(target), value)
                    })?;
                }
                Ok(Outcome::Done)
            }
            Self::Method {
                meta,
                index,
                project,
            } => {
                let method = &meta.methods[*index];
                let _pause = RecordingPause::new(supplier);
                let result = if method.is_static {
                    (method.body)(None, &args)?
                } else {
                    with_target(object, project.as_ref(), meta.key, |target| {
                        (method.body)(Some(target), &args)
                    })?
                };
                Ok(Outcome::Value(result))
            }
            Self::Constructor { meta, index } => {
                let _pause = RecordingPause::new(supplier);
                let object = (meta.constructors[*index].body)(&args)?;
                Ok(Outcome::Object(object))
            }
            Self::Class { .. } => Ok(Outcome::Done),
        }
    }
}

/// 在对象写锁内取出声明层级的对象并执行 `f`
fn with_target<R>(
    object: Option<&ObjectRef>,
    project: Option<&Projection>,
    class: TypeKey,
    f: impl FnOnce(&mut dyn Any) -> InjectionResult<R>,
) -> InjectionResult<R> {
    let object =
        object.ok_or_else(|| InjectionError::incompatible(class.name, "缺少注入目标对象"))?;
    let mut f = Some(f);
    let mut outcome = None;
    object.with_target(&mut |root| {
        let target = match project {
            Some(project) => (**project)(root),
            None => Some(root),
        };
        if let (Some(target), Some(f)) = (target, f.take()) {
            outcome = Some(f(target));
        }
    });
    outcome.unwrap_or_else(|| {
        Err(InjectionError::incompatible(
            class.name,
            "无法从对象中取出声明类型",
        ))
    })
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location())
    }
}
