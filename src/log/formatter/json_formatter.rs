use crate::log::formatter::LogFormatter;
use crate::log::record::LogRecord;
use anyhow::Result;
use chrono::SecondsFormat;
use serde_json::{Map, Value};

const RESERVED_KEYS: [&str; 3] = ["time", "level", "msg"];

/// JSON 格式化器
///
/// 每条日志输出为一行 JSON 对象，固定包含 `time`、`level`、`msg`，
/// 与固定字段重名的自定义字段以 `fields.` 为前缀输出
#[derive(Default)]
pub struct JsonFormatter {}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogFormatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let mut object = Map::new();
        for (key, value) in &record.fields {
            if RESERVED_KEYS.contains(&key.as_str()) {
                object.insert(format!("fields.{}", key), value.clone());
            } else {
                object.insert(key.clone(), value.clone());
            }
        }
        object.insert(
            "time".to_string(),
            Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        object.insert(
            "level".to_string(),
            Value::String(record.level.as_str().to_lowercase()),
        );
        object.insert("msg".to_string(), Value::String(record.message.clone()));

        Ok(serde_json::to_string(&object)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::level::LogLevel;

    #[test]
    fn test_json_formatter_format() {
        let formatter = JsonFormatter::new();
        let record = LogRecord::new(LogLevel::Info, "test message");

        let formatted = formatter.format(&record).unwrap();
        let value: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["msg"], "test message");
        assert!(value["time"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_json_formatter_with_fields() {
        let formatter = JsonFormatter::new();
        let record = LogRecord::new(LogLevel::Debug, "user logged in")
            .with_field("module", "auth")
            .with_field("user_id", 12345)
            .with_field("success", true);

        let formatted = formatter.format(&record).unwrap();
        let value: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["module"], "auth");
        assert_eq!(value["user_id"], 12345);
        assert_eq!(value["success"], true);
    }

    #[test]
    fn test_json_formatter_reserved_field_is_prefixed() {
        let formatter = JsonFormatter::new();
        let record = LogRecord::new(LogLevel::Error, "real message").with_field("msg", "shadow");

        let formatted = formatter.format(&record).unwrap();
        let value: Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(value["msg"], "real message");
        assert_eq!(value["fields.msg"], "shadow");
    }
}
