//! # 依赖注入具体实现
//!
//! 提供注入器、参数解析链、请求者、元数据缓存和基于映射表的对象提供者。
//!
//! ## 参数解析顺序
//!
//! 提供者 (`Provider<T>`) → 扩展提供者 → 临时提供者 → 主提供者 → 绑定 → 隐式构造
//!
//! ## 示例
//!
//! ```ignore
//! let injector = InjectorImpl::new();
//! let supplier = MapObjectSupplier::new();
//! supplier.set("hello".to_string());
//!
//! let supplier_ref: SupplierRef = supplier.clone();
//! let foo = injector.make::<Foo>(Some(&supplier_ref), None)?;
//! ```

mod bindings;
mod cache;
mod extended;
mod hierarchy;
mod registry;
mod requestor;
mod resolver;

pub mod injector;
pub mod supplier;

pub use extended::{register_extended_supplier, unregister_extended_supplier};
pub use injector::InjectorImpl;
pub use requestor::{InjectionRequestor, ObjectMarker};
pub use supplier::MapObjectSupplier;
