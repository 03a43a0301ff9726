use crate::log::record::LogRecord;
use crate::log::settings::{Format, LoggerSettings};
use anyhow::Result;
use std::sync::Arc;

use super::{JsonFormatter, TextFormatter};

/// 日志格式化器 trait
///
/// 负责将 LogRecord 格式化为字符串
pub trait LogFormatter: Send + Sync {
    /// 格式化日志记录
    fn format(&self, record: &LogRecord) -> Result<String>;
}

/// 根据 logger 配置创建格式化器
pub fn create_formatter(settings: &LoggerSettings) -> Arc<dyn LogFormatter> {
    match settings.format {
        Format::Text => Arc::new(TextFormatter::new(settings.colored)),
        Format::Json => Arc::new(JsonFormatter::new()),
    }
}
