//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义可注入类型的元数据模型、对象提供者协议和注入器接口。
//!
//! ## 核心接口
//!
//! - [`Injectable`] - 可注入类型，声明自己的注入点
//! - [`Injector`] - 依赖注入器接口
//! - [`PrimaryObjectSupplier`] - 主对象提供者
//! - [`ExtendedObjectSupplier`] - 按限定符注册的扩展提供者
//! - [`Requestor`] - 注入请求者
//! - [`Binding`] - 类型绑定

pub mod args;
pub mod binding;
pub mod class;
pub mod descriptor;
pub mod injector;
pub mod object;
pub mod provider;
pub mod requestor;
pub mod supplier;

pub use args::*;
pub use binding::*;
pub use class::*;
pub use descriptor::*;
pub use injector::*;
pub use object::*;
pub use provider::*;
pub use requestor::*;
pub use supplier::*;

pub use infrastructure_common::{
    value, Annotation, Disposable, InjectionError, InjectionResult, Location, MemberKind, Qualifier,
    TypeKey, Value, Visibility,
};
