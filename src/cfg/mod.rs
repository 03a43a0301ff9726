//! cfg 模块 - 配置视图
//!
//! 提供按点分路径访问的层级配置抽象，以及基于文件的配置源

// 模块声明
pub mod defaults;
pub mod error;
pub mod file_source;
pub mod view;

// 重新导出公共 API
pub use defaults::{fill_defaults, DefaultedView};
pub use error::ConfigError;
pub use file_source::{parse_config, FileSource};
pub use view::{ConfigView, TreeConfig};
