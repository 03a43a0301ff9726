use thiserror::Error;

/// 配置源错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件没有扩展名，无法判断格式
    #[error("config file has no extension: {0}")]
    MissingExtension(String),

    /// 不支持的文件格式
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// 监听中的配置文件被删除或移走
    #[error("config file removed: {0}")]
    FileRemoved(String),
}
