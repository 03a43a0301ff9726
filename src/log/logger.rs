use crate::cfg::ConfigView;
use crate::log::appender::{create_appender, LogAppender};
use crate::log::formatter::{create_formatter, LogFormatter};
use crate::log::level::LogLevel;
use crate::log::record::{Fields, LogRecord};
use crate::log::registry::LoggerRegistry;
use crate::log::settings::LoggerSettings;
use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// 可配置的日志器
///
/// 注册表只依赖此 trait：构建时创建、运行时按名字查找、重载时调用 `configure`。
/// `configure` 在注册表锁内执行，实现中不得回调同一个注册表。
#[async_trait]
pub trait Logger: Send + Sync {
    /// 注册名称
    fn name(&self) -> &str;

    /// 当前日志级别
    fn level(&self) -> LogLevel;

    /// 应用配置，可重复调用
    fn configure(&self, config: &dyn ConfigView) -> Result<()>;

    /// 记录日志
    async fn log(&self, record: LogRecord) -> Result<()>;

    /// 记录带字段的日志
    async fn logm(&self, level: LogLevel, message: &str, fields: Fields) -> Result<()> {
        self.log(LogRecord::new(level, message).with_fields(fields))
            .await
    }

    /// 记录 TRACE 级别日志
    async fn trace(&self, message: &str) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Trace, message)).await
    }

    /// 记录 DEBUG 级别日志
    async fn debug(&self, message: &str) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Debug, message)).await
    }

    /// 记录 INFO 级别日志
    async fn info(&self, message: &str) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Info, message)).await
    }

    /// 记录 WARN 级别日志
    async fn warn(&self, message: &str) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Warn, message)).await
    }

    /// 记录 ERROR 级别日志
    async fn error(&self, message: &str) -> Result<()> {
        self.log(LogRecord::new(LogLevel::Error, message)).await
    }
}

/// configure 之间不变的一组输出状态，整体替换
struct LoggerState {
    settings: LoggerSettings,
    level: LogLevel,
    formatter: Arc<dyn LogFormatter>,
    appender: Arc<dyn LogAppender>,
}

/// 按模块配置的日志器
///
/// 每个实例持有自己的一份上下文字段，以及指向所属注册表的弱引用。
/// 输出状态保存在 ArcSwap 中，`configure` 原子地替换整组状态，
/// 并发的 `log` 调用看到的要么是旧状态，要么是新状态。
pub struct ModuleLogger {
    name: String,
    fields: Fields,
    state: ArcSwap<LoggerState>,
    registry: Weak<LoggerRegistry>,
}

impl ModuleLogger {
    /// 创建日志器
    ///
    /// `registry` 为所属注册表的弱引用，独立使用时传 `Weak::new()`
    pub fn new(
        name: impl Into<String>,
        fields: Fields,
        config: &dyn ConfigView,
        registry: Weak<LoggerRegistry>,
    ) -> Result<Self> {
        let state = build_state(config, None)?;
        Ok(Self {
            name: name.into(),
            fields,
            state: ArcSwap::from_pointee(state),
            registry,
        })
    }

    /// 上下文字段
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// 当前生效的配置
    pub fn settings(&self) -> LoggerSettings {
        self.state.load().settings.clone()
    }

    /// 所属注册表，注册表已释放或未关联时返回 None
    pub fn registry(&self) -> Option<Arc<LoggerRegistry>> {
        self.registry.upgrade()
    }

    /// 刷新输出缓冲
    pub async fn flush(&self) -> Result<()> {
        let appender = Arc::clone(&self.state.load().appender);
        appender.flush().await
    }
}

#[async_trait]
impl Logger for ModuleLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn level(&self) -> LogLevel {
        self.state.load().level
    }

    fn configure(&self, config: &dyn ConfigView) -> Result<()> {
        let current = self.state.load_full();
        let state = build_state(config, Some(&current))?;
        self.state.store(Arc::new(state));
        Ok(())
    }

    async fn log(&self, record: LogRecord) -> Result<()> {
        let state = self.state.load_full();
        if record.level < state.level {
            return Ok(());
        }

        let LogRecord {
            level,
            message,
            fields: extra,
            timestamp,
        } = record;
        let mut fields = self.fields.clone();
        fields.extend(extra);
        let record = LogRecord {
            level,
            message,
            fields,
            timestamp,
        };

        let formatted = state.formatter.format(&record)?;
        state.appender.append(&formatted).await
    }
}

/// 根据配置构建输出状态
///
/// output 未变化时复用当前的 appender，避免重复打开文件
fn build_state(config: &dyn ConfigView, current: Option<&LoggerState>) -> Result<LoggerState> {
    let settings = LoggerSettings::from_view(config)?;
    let level = settings.log_level()?;
    let formatter = create_formatter(&settings);
    let appender = match current {
        Some(current) if current.settings.output == settings.output => {
            Arc::clone(&current.appender)
        }
        _ => create_appender(&settings.output)?,
    };

    Ok(LoggerState {
        settings,
        level,
        formatter,
        appender,
    })
}
