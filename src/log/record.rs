use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::level::LogLevel;

/// 结构化字段
///
/// 使用 BTreeMap 保证输出顺序稳定
pub type Fields = BTreeMap<String, Value>;

/// 日志记录
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// 日志级别
    pub level: LogLevel,
    /// 日志消息
    pub message: String,
    /// 结构化字段
    pub fields: Fields,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// 创建新的日志记录
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Fields::new(),
            timestamp: Utc::now(),
        }
    }

    /// 添加字段
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// 批量添加字段，同名字段被覆盖
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }
}
