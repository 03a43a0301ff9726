use crate::log::appender::LogAppender;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// 文件输出器
///
/// 以追加模式写入日志文件，父目录不存在时自动创建
pub struct FileAppender {
    path: PathBuf,
    file: Mutex<tokio::fs::File>,
}

impl FileAppender {
    /// 打开日志文件
    ///
    /// 使用阻塞 I/O 打开，便于在同步的 configure 流程中调用
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;

        Ok(Self {
            path,
            file: Mutex::new(tokio::fs::File::from_std(file)),
        })
    }

    /// 日志文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl LogAppender for FileAppender {
    async fn append(&self, formatted_message: &str) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(formatted_message.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.file.lock().await.flush().await?;
        Ok(())
    }
}
