//! 注入器构建器

use di_abstractions::{ExtendedSupplierRef, Injector, SupplierRef};
use di_impl::{register_extended_supplier, InjectorImpl};
use infrastructure_common::{ConfigError, InjectionResult, InjectorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

type BindingSetup = Box<dyn FnOnce(&InjectorImpl) + Send>;

/// 注入器构建器
///
/// 使用建造者模式组装注入器：日志、配置、默认提供者、扩展提供者和绑定
pub struct InjectorBuilder {
    /// 配置文件路径
    config_file: Option<PathBuf>,
    /// 直接指定的配置，优先于配置文件和环境变量
    config: Option<InjectorConfig>,
    /// 强制开启调试模式
    force_debug: bool,
    /// 默认对象提供者，用于查找扩展提供者
    default_supplier: Option<SupplierRef>,
    /// 扩展提供者列表
    extended_suppliers: Vec<(String, ExtendedSupplierRef)>,
    /// 绑定注册回调
    bindings: Vec<BindingSetup>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl InjectorBuilder {
    /// 创建新的注入器构建器
    pub fn new() -> Self {
        Self {
            config_file: None,
            config: None,
            force_debug: false,
            default_supplier: None,
            extended_suppliers: Vec::new(),
            bindings: Vec::new(),
            logging_enabled: false, // 默认不启用日志初始化
            logging_config: LoggingConfig::default(),
        }
    }

    /// 添加 TOML 配置文件
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        info!("添加注入器配置文件: {}", path.display());
        self.config_file = Some(path.to_path_buf());
        Ok(self)
    }

    /// 直接指定配置，跳过配置文件和环境变量
    pub fn with_config(mut self, config: InjectorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 开启调试模式，不论配置来源
    pub fn debug(mut self) -> Self {
        self.force_debug = true;
        self
    }

    /// 设置默认对象提供者
    pub fn with_default_supplier(mut self, supplier: SupplierRef) -> Self {
        self.default_supplier = Some(supplier);
        self
    }

    /// 添加扩展提供者，构建时按限定符名称注册
    pub fn add_extended_supplier<S: Into<String>>(
        mut self,
        qualifier: S,
        supplier: ExtendedSupplierRef,
    ) -> Self {
        let qualifier = qualifier.into();
        debug!("添加扩展对象提供者: @{}", qualifier);
        self.extended_suppliers.push((qualifier, supplier));
        self
    }

    /// 添加绑定注册回调
    ///
    /// ```ignore
    /// InjectorBuilder::new().bind(|injector| {
    ///     let _ = injector.add_class_binding::<BarImpl>().named("x");
    /// });
    /// ```
    pub fn bind<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&InjectorImpl) + Send + 'static,
    {
        self.bindings.push(Box::new(setup));
        self
    }

    /// 自动配置开发环境：详细日志并开启调试模式
    pub fn auto_configure_development(self) -> Self {
        info!("自动配置开发环境");
        let mut builder = self.with_logging(LoggingConfig::development()).debug();
        if builder.config_file.is_none() && Path::new("./config/injector.dev.toml").exists() {
            builder.config_file = Some(PathBuf::from("./config/injector.dev.toml"));
            debug!("添加开发环境配置: config/injector.dev.toml");
        }
        builder
    }

    /// 自动配置生产环境：JSON 日志
    pub fn auto_configure_production(self) -> Self {
        info!("自动配置生产环境");
        let mut builder = self.with_logging(LoggingConfig::production());
        if builder.config_file.is_none() && Path::new("./config/injector.prod.toml").exists() {
            builder.config_file = Some(PathBuf::from("./config/injector.prod.toml"));
            debug!("添加生产环境配置: config/injector.prod.toml");
        }
        builder
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true; // 启用日志初始化
        self
    }

    /// 解析最终生效的配置
    pub fn resolve_config(&self) -> Result<InjectorConfig, ConfigError> {
        let mut config = match (&self.config, &self.config_file) {
            (Some(config), _) => {
                config.validate()?;
                config.clone()
            }
            (None, Some(path)) => InjectorConfig::load_from(path)?,
            (None, None) => InjectorConfig::load()?,
        };
        config.debug |= self.force_debug;
        Ok(config)
    }

    /// 构建注入器
    pub fn build(self) -> InjectionResult<Arc<InjectorImpl>> {
        // 只有在明确配置了日志时才初始化日志
        // 避免在测试环境中重复初始化
        if self.logging_enabled {
            self.initialize_logging()?;
        }

        info!("开始构建注入器");
        let config = self.resolve_config()?;
        let injector = InjectorImpl::with_config(config);

        for (qualifier, supplier) in self.extended_suppliers {
            register_extended_supplier(qualifier, supplier);
        }
        if let Some(supplier) = self.default_supplier {
            injector.set_default_supplier(Some(supplier));
        }

        let count = self.bindings.len();
        for setup in self.bindings {
            setup(&injector);
        }
        if count > 0 {
            debug!("已执行 {} 个绑定注册回调", count);
        }

        info!("注入器构建完成");
        Ok(injector)
    }

    /// 初始化日志系统
    fn initialize_logging(&self) -> Result<(), ConfigError> {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(self.logging_config.level)
            .with_target(self.logging_config.show_target)
            .with_thread_ids(self.logging_config.show_thread_ids)
            .with_file(self.logging_config.show_file)
            .with_line_number(self.logging_config.show_line_number);

        if self.logging_config.json_format {
            subscriber.json().try_init()
        } else {
            subscriber.try_init()
        }
        .map_err(|e| ConfigError::InitializationFailed {
            message: format!("日志初始化失败: {}", e),
        })?;

        info!("日志系统初始化完成");
        Ok(())
    }
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }
}
