//! # Component Macros
//!
//! 这个 crate 提供了用于生成注入元数据的派生宏，替代手写 `Injectable::describe`。
//!
//! ## 核心宏
//!
//! - [`Injectable`](derive@Injectable) - 字段注入元数据派生宏
//!
//! ## 使用示例
//!
//! ```ignore
//! use component_macros::Injectable;
//! use di_abstractions::Instance;
//!
//! #[derive(Default, Injectable)]
//! #[injectable(singleton, default, post_construct = "init")]
//! pub struct MyService {
//!     #[inject]
//!     repository: Option<Instance<Repository>>,
//!     #[inject(named = "endpoint", optional)]
//!     endpoint: Option<String>,
//!     ready: bool,
//! }
//!
//! impl MyService {
//!     fn init(&mut self) {
//!         self.ready = true;
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;
mod utils;

/// 注入元数据派生宏
///
/// 为结构体实现 `di_abstractions::Injectable`。调用方需要依赖 `di-abstractions`。
///
/// # 结构体参数 `#[injectable(...)]`
///
/// - `singleton` - 单例
/// - `creatable` - 可由注入器隐式构造
/// - `default` - 使用 `Default` 作为无参构造函数
/// - `disposable` - 提供者释放时调用 `Disposable::dispose`
/// - `extends = "field"` - 以该字段作为父类型
/// - `post_construct = "method"` / `pre_destroy = "method"` - 生命周期方法，签名为 `fn(&mut self)`
///
/// # 字段参数 `#[inject(...)]`
///
/// - `optional` - 可选
/// - `group_updates` - 合并更新
/// - `named = "x"` - 名称限定
/// - `qualifier = "q"` 或 `qualifier("q", "value")` - 扩展提供者限定符
///
/// `Option<T>` 字段在反注入时被清空；其他字段只在解析出值时被覆盖。
/// 字段类型为 `Instance<U>` 或 `Provider<U>` 时按对象或提供者声明，`U` 需实现 `Injectable`。
#[proc_macro_derive(Injectable, attributes(inject, injectable))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
