//! # Infrastructure Common
//!
//! 依赖注入引擎各层共享的基础类型。
//!
//! ## 核心内容
//!
//! - [`TypeKey`] / [`Value`] - 类型标识与类型擦除后的注入值
//! - [`Annotation`] / [`Qualifier`] - 注入点上的注解模型
//! - [`Location`] - 注入点的稳定标识
//! - [`InjectionError`] - 注入错误分类
//! - [`InjectorConfig`] - 注入器配置
//! - [`Disposable`] - 释放回调
//!
//! ## 设计原则
//!
//! - 用声明式元数据代替运行时反射
//! - 注入点元数据只计算一次，可以安全共享

pub mod configuration;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use configuration::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
