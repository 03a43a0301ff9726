//! 文件配置源
//!
//! 从本地文件加载配置，支持 JSON/JSON5/YAML/TOML 格式，
//! 支持手动刷新以及监听文件变化自动刷新

use anyhow::{anyhow, Result};
use crossbeam::channel;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::error::ConfigError;
use super::view::{ConfigView, TreeConfig};

/// 文件配置源
///
/// 文件内容被加载到一棵共享的 [`TreeConfig`] 中，`refresh` 会原地替换树的内容，
/// 之前获取的所有视图都能观察到新配置。
///
/// # 示例
/// ```no_run
/// use logtree::cfg::FileSource;
/// use logtree::log::LoggerRegistry;
///
/// let source = FileSource::open("config/app.yaml").unwrap();
/// let registry = LoggerRegistry::new(source.view(), Default::default()).unwrap();
///
/// let reg = registry.clone();
/// source.watch(move |refreshed| {
///     if refreshed.is_ok() {
///         let _ = reg.reload();
///     }
/// }).unwrap();
/// ```
pub struct FileSource {
    path: PathBuf,
    config: TreeConfig,
    /// 内部维护所有监听句柄
    watches: Mutex<Vec<WatchHandle>>,
}

impl FileSource {
    /// 打开并解析配置文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let value = read_config(&path)?;
        Ok(Self {
            path,
            config: TreeConfig::new(value),
            watches: Mutex::new(Vec::new()),
        })
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 共享同一棵配置树的 TreeConfig
    pub fn config(&self) -> TreeConfig {
        self.config.clone()
    }

    /// 以 trait object 形式返回根视图
    pub fn view(&self) -> Arc<dyn ConfigView> {
        self.config.clone().into_view()
    }

    /// 重新读取文件并替换配置树
    ///
    /// 解析失败时保留原有配置
    pub fn refresh(&self) -> Result<()> {
        let value = read_config(&self.path)?;
        self.config.replace(value);
        Ok(())
    }

    /// 监听文件变化
    ///
    /// 监听的是文件所在目录，按文件名过滤事件，因此先写临时文件再重命名覆盖的保存方式
    /// 之后仍能继续收到变化。文件被创建、修改或重命名覆盖后自动刷新配置树，
    /// 然后以刷新结果调用 `handler`；文件被删除或移走时以
    /// [`ConfigError::FileRemoved`] 调用 `handler`，配置树保持不变。
    /// 监听在 FileSource drop 时停止。
    pub fn watch<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(Result<()>) + Send + 'static,
    {
        use notify::{recommended_watcher, Event, RecursiveMode, Watcher};

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| anyhow!("invalid config file path: {}", self.path.display()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, event_rx) = channel::unbounded();
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let _ = event_tx.send(event);
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let (stop_tx, stop_rx) = channel::unbounded::<()>();
        let path = self.path.clone();
        let config = self.config.clone();

        let is_relevant = move |event: &Event| {
            (event.kind.is_create() || event.kind.is_modify() || event.kind.is_remove())
                && event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(file_name.as_os_str()))
        };

        let thread_handle = thread::spawn(move || {
            // watcher 必须与线程同生命周期
            let _watcher = watcher;
            loop {
                crossbeam::select! {
                    recv(stop_rx) -> _ => break,
                    recv(event_rx) -> event => {
                        let Ok(event) = event else { break };
                        if !is_relevant(&event) {
                            continue;
                        }

                        // 防抖：合并 100ms 内的事件，以文件的最终状态为准
                        thread::sleep(Duration::from_millis(100));
                        while event_rx.try_recv().is_ok() {}

                        if !path.exists() {
                            tracing::warn!(path = %path.display(), "config file removed");
                            handler(Err(ConfigError::FileRemoved(path.display().to_string()).into()));
                            continue;
                        }

                        let result = read_config(&path).map(|value| config.replace(value));
                        if let Err(e) = &result {
                            tracing::warn!(path = %path.display(), error = %e, "failed to refresh config file");
                        }
                        handler(result);
                    }
                }
            }
        });

        self.watches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(WatchHandle {
                stop_sender: Some(stop_tx),
                thread_handle: Some(thread_handle),
            });
        Ok(())
    }
}

/// 根据扩展名解析配置内容
pub fn parse_config(content: &str, format: &str) -> Result<JsonValue> {
    match format.to_lowercase().as_str() {
        "json" => Ok(serde_json::from_str(content)?),
        "json5" => Ok(json5::from_str(content)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(content)?),
        "toml" => Ok(toml::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string()).into()),
    }
}

fn read_config(path: &Path) -> Result<JsonValue> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| ConfigError::MissingExtension(path.display().to_string()))?
        .to_lowercase();
    let content = std::fs::read_to_string(path)?;
    let value = parse_config(&content, &format)?;
    // YAML 中的空文档解析为 null，统一视为空配置
    Ok(if value.is_null() {
        JsonValue::Object(Default::default())
    } else {
        value
    })
}

/// 监听句柄
struct WatchHandle {
    stop_sender: Option<channel::Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(sender) = self.stop_sender.take() {
            let _ = sender.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_open_yaml() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.yaml");
        fs::write(&path, "logging:\n  server:\n    level: debug\n")?;

        let source = FileSource::open(&path)?;
        assert_eq!(source.path(), path.as_path());
        assert_eq!(
            source.view().get_string("logging.server.level").as_deref(),
            Some("debug")
        );
        Ok(())
    }

    #[test]
    fn test_open_json_json5_toml() -> Result<()> {
        let dir = TempDir::new()?;

        let json = dir.path().join("a.json");
        fs::write(&json, r#"{"logging": {"db": {"level": "warn"}}}"#)?;
        assert!(FileSource::open(&json)?.view().is_set("logging.db.level"));

        let json5 = dir.path().join("b.json5");
        fs::write(&json5, "{ logging: { db: { level: 'warn', }, }, }")?;
        assert!(FileSource::open(&json5)?.view().is_set("logging.db.level"));

        let toml = dir.path().join("c.toml");
        fs::write(&toml, "[logging.db]\nlevel = \"warn\"\n")?;
        assert!(FileSource::open(&toml)?.view().is_set("logging.db.level"));
        Ok(())
    }

    #[test]
    fn test_null_yaml_is_empty_config() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("empty.yaml");
        fs::write(&path, "~\n")?;

        let source = FileSource::open(&path)?;
        assert!(source.view().all_keys().is_empty());
        Ok(())
    }

    #[test]
    fn test_unsupported_format() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.ini");
        fs::write(&path, "[logging]")?;

        let err = FileSource::open(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnsupportedFormat(_))
        ));

        let path = dir.path().join("noext");
        fs::write(&path, "")?;
        let err = FileSource::open(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingExtension(_))
        ));
        Ok(())
    }

    #[test]
    fn test_refresh_updates_existing_views() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.yaml");
        fs::write(&path, "logging:\n  server:\n    level: debug\n")?;

        let source = FileSource::open(&path)?;
        let server = source.view().sub("logging.server").unwrap();
        assert_eq!(server.get_string("level").as_deref(), Some("debug"));

        fs::write(&path, "logging:\n  server:\n    level: error\n")?;
        source.refresh()?;
        assert_eq!(server.get_string("level").as_deref(), Some("error"));
        Ok(())
    }

    #[test]
    fn test_refresh_keeps_old_config_on_parse_error() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.json");
        fs::write(&path, r#"{"logging": {"level": "info"}}"#)?;

        let source = FileSource::open(&path)?;
        fs::write(&path, "{not json")?;
        assert!(source.refresh().is_err());
        assert_eq!(
            source.view().get_string("logging.level").as_deref(),
            Some("info")
        );
        Ok(())
    }

    #[test]
    fn test_parse_config_unknown_format() {
        assert!(parse_config("a = 1", "ini").is_err());
        assert!(parse_config("a = 1", "TOML").is_ok());
    }

    #[test]
    fn test_watch_reports_removed_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.yaml");
        fs::write(&path, "logging:\n  server:\n    level: info\n")?;

        let source = FileSource::open(&path)?;
        let (tx, rx) = channel::unbounded();
        source.watch(move |result| {
            let _ = tx.send(result);
        })?;

        thread::sleep(Duration::from_millis(200));
        fs::remove_file(&path)?;

        let result = rx.recv_timeout(Duration::from_secs(5))?;
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::FileRemoved(_))
        ));
        // 删除后保留原有配置
        assert_eq!(
            source.view().get_string("logging.server.level").as_deref(),
            Some("info")
        );
        Ok(())
    }

    #[test]
    fn test_watch_ignores_sibling_files() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("app.yaml");
        fs::write(&path, "logging:\n  server:\n    level: info\n")?;

        let source = FileSource::open(&path)?;
        let (tx, rx) = channel::unbounded();
        source.watch(move |result| {
            let _ = tx.send(result);
        })?;

        thread::sleep(Duration::from_millis(200));
        fs::write(dir.path().join("other.yaml"), "level: debug\n")?;
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
        Ok(())
    }
}
