use crate::log::formatter::LogFormatter;
use crate::log::level::LogLevel;
use crate::log::record::LogRecord;
use anyhow::Result;
use chrono::SecondsFormat;
use colored::{ColoredString, Colorize};
use serde_json::Value;
use std::fmt::Write;

/// 文本格式化器
///
/// 输出格式：`[时间戳] 级别 消息 | key=value ...`
pub struct TextFormatter {
    colored: bool,
}

impl TextFormatter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint_level(&self, level: LogLevel) -> ColoredString {
        let text = format!("{:<5}", level);
        if !self.colored {
            return text.normal();
        }
        match level {
            LogLevel::Error => text.red(),
            LogLevel::Warn => text.yellow(),
            LogLevel::Info => text.green(),
            LogLevel::Debug => text.cyan(),
            LogLevel::Trace => text.dimmed(),
        }
    }
}

impl LogFormatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let timestamp = record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut result = String::with_capacity(64 + record.message.len());

        if self.colored {
            write!(result, "[{}] ", timestamp.dimmed())?;
        } else {
            write!(result, "[{}] ", timestamp)?;
        }
        write!(result, "{} {}", self.paint_level(record.level), record.message)?;

        if !record.fields.is_empty() {
            result.push_str(" |");
            for (key, value) in &record.fields {
                result.push(' ');
                if self.colored {
                    write!(result, "{}", key.cyan())?;
                } else {
                    result.push_str(key);
                }
                result.push('=');
                write_value(&mut result, value)?;
            }
        }

        Ok(result)
    }
}

/// 字符串中含有空白或特殊字符时加引号
fn write_value(buffer: &mut String, value: &Value) -> std::fmt::Result {
    match value {
        Value::String(s) if needs_quoting(s) => write!(buffer, "{:?}", s),
        Value::String(s) => write!(buffer, "{}", s),
        other => write!(buffer, "{}", other),
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '=' || c == '"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_formatter_format() {
        let formatter = TextFormatter::new(false);
        let record = LogRecord::new(LogLevel::Info, "test message");

        let formatted = formatter.format(&record).unwrap();
        assert!(formatted.starts_with('['));
        assert!(formatted.contains("Z] INFO  test message"));
        assert!(!formatted.contains('|'));
    }

    #[test]
    fn test_text_formatter_fields() {
        let formatter = TextFormatter::new(false);
        let record = LogRecord::new(LogLevel::Warn, "slow query")
            .with_field("module", "db")
            .with_field("elapsed_ms", 1200)
            .with_field("sql", "select 1");

        let formatted = formatter.format(&record).unwrap();
        assert!(formatted.ends_with(
            r#"WARN  slow query | elapsed_ms=1200 module=db sql="select 1""#
        ));
    }

    #[test]
    fn test_text_formatter_colored() {
        let formatter = TextFormatter::new(true);
        let record = LogRecord::new(LogLevel::Error, "boom").with_field("module", "api");

        let formatted = formatter.format(&record).unwrap();
        assert!(formatted.contains("boom"));
        assert!(formatted.contains("module"));
    }

    #[test]
    fn test_needs_quoting() {
        assert!(needs_quoting(""));
        assert!(needs_quoting("a b"));
        assert!(needs_quoting("a=b"));
        assert!(!needs_quoting("plain"));
    }
}
