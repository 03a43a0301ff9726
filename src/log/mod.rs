//! 日志模块
//!
//! 按配置树中的模块层级创建 logger，并在配置变化后原地重新配置。
//!
//! # 特性
//!
//! - 模块名为点分路径，大小写不敏感
//! - 每个模块独立配置级别、格式与输出
//! - 重载时按最长匹配路径取得配置，logger 实例保持不变
//! - 完全异步的输出
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use logtree::cfg::TreeConfig;
//! use logtree::log::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TreeConfig::from_json5(r#"
//!         {
//!             logging: {
//!                 server: { level: "info", format: "json" },
//!                 "server.http": { level: "debug", output: "stdout" },
//!             }
//!         }
//!     "#)?;
//!
//!     let registry = LoggerRegistry::new(config.clone().into_view(), Fields::new())?;
//!
//!     let http = registry.get("server.http").unwrap();
//!     http.info("listening").await?;
//!
//!     // 配置源刷新后
//!     registry.reload()?;
//!
//!     Ok(())
//! }
//! ```

pub mod appender;
pub mod formatter;
pub mod global;
pub mod level;
pub mod logger;
pub mod record;
pub mod registry;
pub mod settings;

// 重新导出核心类型
pub use appender::{create_appender, ConsoleAppender, FileAppender, LogAppender, Target};
pub use formatter::{create_formatter, JsonFormatter, LogFormatter, TextFormatter};
pub use level::LogLevel;
pub use logger::{Logger, ModuleLogger};
pub use record::{Fields, LogRecord};
pub use registry::{LoggerBuilder, LoggerRegistry, RegistryOptions};
pub use settings::{Format, LoggerSettings};
