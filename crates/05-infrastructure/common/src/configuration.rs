//! 注入器配置定义

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ConfigResult};

/// 默认配置文件（不含扩展名）
const DEFAULT_CONFIG_FILE: &str = "config/injector";
/// 环境变量前缀
const ENV_PREFIX: &str = "INJECTOR";

/// 注入器配置
///
/// 通过配置文件或 `INJECTOR_` 前缀的环境变量加载，
/// 例如 `INJECTOR_DEBUG=true`、`INJECTOR_MAX_HIERARCHY_DEPTH=32`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectorConfig {
    /// 调试模式：记录所有无法解析的依赖并检测递归构造
    pub debug: bool,
    /// 类型层次的最大深度，超出视为元数据错误
    pub max_hierarchy_depth: usize,
}

impl InjectorConfig {
    /// 创建开启调试模式的配置
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    /// 从默认配置文件和环境变量加载
    pub fn load() -> ConfigResult<Self> {
        Self::build(None)
    }

    /// 从指定文件加载，环境变量仍然可以覆盖文件中的值
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        Self::build(Some(path))
    }

    fn build(file: Option<&Path>) -> ConfigResult<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError {
                source: Box::new(e),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验配置取值
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_hierarchy_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_hierarchy_depth 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_hierarchy_depth: 64,
        }
    }
}
