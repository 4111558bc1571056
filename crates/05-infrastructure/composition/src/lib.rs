//! # 注入器组合层
//!
//! 负责把注入器的各个部分组合成一个可用的注入器实例。
//!
//! ## 主要功能
//!
//! - **注入器构建器**: 使用构建者模式组装注入器
//! - **配置加载**: 配置文件与 `INJECTOR_` 前缀的环境变量
//! - **日志初始化**: 开发与生产环境的日志预设
//! - **提供者与绑定**: 默认提供者、扩展提供者和绑定注册
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use infrastructure_composition::{InjectorBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let injector = InjectorBuilder::new()
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!
//!     println!("调试模式: {}", injector.config().debug);
//!     Ok(())
//! }
//! ```

pub mod builder;

// 重新导出主要类型
pub use builder::{InjectorBuilder, LoggingConfig};
pub use di_impl::{InjectorImpl, MapObjectSupplier};

// 重新导出错误类型
pub use infrastructure_common::{ConfigError, InjectionError};
