//! 错误类型定义

use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("初始化失败: {message}")]
    InitializationFailed { message: String },
}

/// 依赖注入错误类型
///
/// 初次注入 (`inject` / `make`) 时的解析失败会直接返回错误；
/// 拆除阶段 (`uninject` / `disposed`) 的失败只记录日志。
#[derive(Error, Debug)]
pub enum InjectionError {
    /// 非可选的注入点无法解析
    #[error("注入失败: {requestor}, 无法找到依赖的值: {dependency}")]
    Unsatisfied {
        requestor: String,
        dependency: String,
    },

    /// 没有任何可用的构造函数能够被满足
    #[error("无法在类型 {class} 中找到可满足的构造函数")]
    NoSatisfiableConstructor { class: String },

    /// `invoke` 没有找到可调用的方法
    #[error("无法在类型 {class} 中找到带有 @{annotation} 且参数可解析的方法")]
    NoMatchingMethod { class: String, annotation: String },

    /// 被注入的用户代码返回了错误
    #[error("调用 {member} 失败: {source}")]
    Invocation {
        member: String,
        #[source]
        source: anyhow::Error,
    },

    /// 值的实际类型与注入点声明的类型不一致
    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// 类型的元数据无法构成合法的注入计划
    #[error("类型 {class} 与当前运行环境不兼容: {message}")]
    IncompatibleClass { class: String, message: String },

    /// 请求的类型既没有绑定也无法直接构造
    #[error("类型 {type_name} 无法被构造")]
    NotConstructible { type_name: String },

    /// 对象提供者已经被释放
    #[error("对象提供者已释放")]
    SupplierUnavailable,

    #[error("注入器配置错误: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },
}

impl InjectionError {
    /// 创建调用失败错误
    pub fn invocation(member: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Invocation {
            member: member.into(),
            source,
        }
    }

    /// 创建类型不匹配错误
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 创建环境不兼容错误
    pub fn incompatible(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IncompatibleClass {
            class: class.into(),
            message: message.into(),
        }
    }

    /// 是否为依赖无法满足的错误
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self, Self::Unsatisfied { .. })
    }
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type InjectionResult<T> = Result<T, InjectionError>;
