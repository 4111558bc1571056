//! 宏工具函数

use syn::{GenericArgument, PathArguments, Type};

/// 类型路径最后一段的名称
pub fn last_segment_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

/// 从类型中提取第一个泛型参数
pub fn extract_generic_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// 检查类型是否为 Option<T>
pub fn is_option_type(ty: &Type) -> bool {
    last_segment_name(ty).as_deref() == Some("Option") && extract_generic_type(ty).is_some()
}

/// 检查类型是否为具名类型（排除 `dyn Trait`、引用、元组等）
pub fn is_named_type(ty: &Type) -> bool {
    matches!(ty, Type::Path(type_path) if type_path.qself.is_none())
}

/// 字段承载的注入形态
#[derive(Clone, Copy)]
pub enum SlotShape<'a> {
    /// `Instance<U>`，`U` 为可注入类型
    Object(&'a Type),
    /// `Provider<U>`
    Provider(&'a Type),
    /// 其他值类型
    Plain(&'a Type),
}

/// 判断字段负载类型的注入形态
///
/// `Instance<dyn Trait>` 按普通值处理，只能由提供者或绑定满足
pub fn slot_shape(ty: &Type) -> SlotShape<'_> {
    let wrapped = |name: &str| {
        (last_segment_name(ty).as_deref() == Some(name))
            .then(|| extract_generic_type(ty))
            .flatten()
            .filter(|inner| is_named_type(inner))
    };
    if let Some(inner) = wrapped("Instance") {
        SlotShape::Object(inner)
    } else if let Some(inner) = wrapped("Provider") {
        SlotShape::Provider(inner)
    } else {
        SlotShape::Plain(ty)
    }
}
