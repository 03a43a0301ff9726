use anyhow::Result;
use std::sync::Arc;

use super::{ConsoleAppender, FileAppender, Target};

/// 日志输出器 trait
///
/// 负责将格式化后的日志输出到目标介质
#[async_trait::async_trait]
pub trait LogAppender: Send + Sync {
    /// 输出日志
    async fn append(&self, formatted_message: &str) -> Result<()>;

    /// 刷新缓冲区（默认实现为空操作）
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// 根据 output 配置创建输出器
///
/// `stdout`、`stderr`（以及空字符串）输出到终端，其余值视为文件路径
pub fn create_appender(output: &str) -> Result<Arc<dyn LogAppender>> {
    match output.trim().to_lowercase().as_str() {
        "" | "stderr" => Ok(Arc::new(ConsoleAppender::new(Target::Stderr))),
        "stdout" => Ok(Arc::new(ConsoleAppender::new(Target::Stdout))),
        _ => Ok(Arc::new(FileAppender::new(output.trim())?)),
    }
}
