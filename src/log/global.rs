use crate::cfg::ConfigView;
use crate::log::logger::Logger;
use crate::log::record::Fields;
use crate::log::registry::LoggerRegistry;
use anyhow::{anyhow, Result};
use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};

/// 默认的根 logger 名称
pub const DEFAULT_ROOT_NAME: &str = "root";

static ROOT_NAME: Lazy<RwLock<String>> = Lazy::new(|| RwLock::new(DEFAULT_ROOT_NAME.to_string()));

/// 全局 LoggerRegistry，未初始化时为空
static GLOBAL_REGISTRY: Lazy<ArcSwapOption<LoggerRegistry>> = Lazy::new(ArcSwapOption::empty);

/// 进程级的根 logger 名称
///
/// 未指定 `root_name` 的注册表在创建根 logger 和调用 `root()` 时读取该值
pub fn root_name() -> String {
    ROOT_NAME
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// 修改进程级的根 logger 名称
///
/// 只影响之后的查找和创建，已注册的 logger 不会被重命名
pub fn set_root_name(name: impl Into<String>) {
    *ROOT_NAME.write().unwrap_or_else(PoisonError::into_inner) = name.into();
}

/// 创建并安装全局 LoggerRegistry，替换已有的注册表
///
/// # 示例
///
/// ```ignore
/// use logtree::cfg::FileSource;
/// use logtree::log::global;
///
/// fn example() -> anyhow::Result<()> {
///     let source = FileSource::open("config/app.yaml")?;
///     global::init_registry(source.view(), Default::default())?;
///     let http = global::get_logger("server.http");
///     Ok(())
/// }
/// ```
pub fn init_registry(config: Arc<dyn ConfigView>, context: Fields) -> Result<Arc<LoggerRegistry>> {
    let registry = LoggerRegistry::new(config, context)?;
    GLOBAL_REGISTRY.store(Some(Arc::clone(&registry)));
    Ok(registry)
}

/// 获取全局 LoggerRegistry
pub fn registry() -> Option<Arc<LoggerRegistry>> {
    GLOBAL_REGISTRY.load_full()
}

/// 获取指定名称的 logger（全局）
pub fn get_logger(name: &str) -> Option<Arc<dyn Logger>> {
    registry()?.get(name)
}

/// 按当前配置重新配置全局注册表中的所有 logger
pub fn reload() -> Result<()> {
    registry()
        .ok_or_else(|| anyhow!("global logger registry is not initialized"))?
        .reload()
}
