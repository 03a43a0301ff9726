use crate::cfg::ConfigView;
use crate::log::level::LogLevel;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use smart_default::SmartDefault;

/// 输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Json,
}

/// 单个模块 logger 的配置
///
/// 所有字段都有默认值，配置中缺失的项会自动填充
///
/// ```yaml
/// logging:
///   server:
///     level: debug
///     format: json
///     output: /var/log/server.log
///   server.http:
///     name: http
///     level: warn
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct LoggerSettings {
    /// 日志级别
    #[default = "info"]
    pub level: String,

    /// 输出格式
    pub format: Format,

    /// 输出目标：stdout、stderr 或文件路径
    #[default = "stderr"]
    pub output: String,

    /// 文本格式是否启用颜色
    pub colored: bool,

    /// 模块显示名称，覆盖日志中的 module 字段
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LoggerSettings {
    /// 从配置视图解析
    pub fn from_view(view: &dyn ConfigView) -> Result<Self> {
        serde_json::from_value(view.to_value()).context("invalid logger settings")
    }

    /// 解析日志级别
    pub fn log_level(&self) -> Result<LogLevel> {
        self.level.parse()
    }

    /// 作为模块默认值使用的 JSON 对象
    pub fn to_defaults(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or_else(|_| JsonValue::Object(Default::default()))
    }
}
