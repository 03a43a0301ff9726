//! logtree - 层级 logger 注册表
//!
//! 根据层级配置为每个模块创建独立配置的 logger，配置源刷新后原地重新配置。
//!
//! ## 模块
//!
//! - **cfg**: 配置视图（点分路径访问、默认值填充、文件配置源与监听）
//! - **log**: 日志模块（logger、格式化器、输出器与注册表）

pub mod cfg;
pub mod log;

// 重新导出主要的公共 API
pub use cfg::{fill_defaults, ConfigError, ConfigView, FileSource, TreeConfig};

pub use log::{
    Fields, LogLevel, LogRecord, Logger, LoggerRegistry, LoggerSettings, ModuleLogger,
    RegistryOptions,
};
