use crate::cfg::{fill_defaults, ConfigView};
use crate::log::global;
use crate::log::logger::{Logger, ModuleLogger};
use crate::log::record::Fields;
use crate::log::settings::LoggerSettings;
use anyhow::Result;
use serde_json::Value as JsonValue;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Logger 构造函数
///
/// 参数依次为：注册名、上下文字段、模块配置、所属注册表的弱引用。
/// 构造期间注册表尚未创建完成，弱引用无法 upgrade。
pub type LoggerBuilder = Arc<
    dyn Fn(&str, Fields, &dyn ConfigView, Weak<LoggerRegistry>) -> Result<Arc<dyn Logger>>
        + Send
        + Sync,
>;

/// 注册表选项
pub struct RegistryOptions {
    /// 日志配置所在的节，不存在时使用整棵配置树
    pub section: String,

    /// 根 logger 名称，为 None 时每次使用时读取 [`global::root_name`]
    pub root_name: Option<String>,

    /// 模块配置缺失项的默认值
    pub defaults: LoggerSettings,

    /// Logger 构造函数，默认创建 [`ModuleLogger`]
    pub builder: LoggerBuilder,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            section: "logging".to_string(),
            root_name: None,
            defaults: LoggerSettings::default(),
            builder: Arc::new(|name, fields, config, registry| {
                let logger = ModuleLogger::new(name, fields, config, registry)?;
                Ok(Arc::new(logger) as Arc<dyn Logger>)
            }),
        }
    }
}

/// 层级 logger 注册表
///
/// 根据配置树为每个模块创建一个 logger，模块名为点分路径（如 `server.http`），
/// 大小写不敏感。配置源刷新后调用 [`reload`](Self::reload)，
/// 每个 logger 会按最长匹配路径重新取得配置并原地更新。
///
/// # 示例
/// ```
/// use logtree::cfg::TreeConfig;
/// use logtree::log::{LogLevel, Logger, LoggerRegistry};
///
/// let config = TreeConfig::from_json5(r#"{
///     logging: {
///         server: { level: "info" },
///         "server.http": { level: "warn" },
///     },
/// }"#).unwrap();
///
/// let registry = LoggerRegistry::new(config.clone().into_view(), Default::default()).unwrap();
/// assert_eq!(registry.keys(), vec!["server", "server.http"]);
///
/// let http = registry.get("Server.HTTP").unwrap();
/// assert_eq!(http.level(), LogLevel::Warn);
/// ```
pub struct LoggerRegistry {
    config: Arc<dyn ConfigView>,
    store: Mutex<HashMap<String, Arc<dyn Logger>>>,
    root_name: Option<String>,
    defaults: JsonValue,
}

impl LoggerRegistry {
    /// 使用默认选项创建注册表
    pub fn new(config: Arc<dyn ConfigView>, context: Fields) -> Result<Arc<Self>> {
        Self::with_options(config, context, RegistryOptions::default())
    }

    /// 创建注册表
    ///
    /// 配置为空时只创建一个根 logger；logger 构造失败时返回该错误
    pub fn with_options(
        config: Arc<dyn ConfigView>,
        context: Fields,
        options: RegistryOptions,
    ) -> Result<Arc<Self>> {
        let config = match config.sub(&options.section) {
            Some(section) => section,
            None => config,
        };
        let defaults = options.defaults.to_defaults();

        let mut failure = None;
        let registry = Arc::new_cyclic(|weak: &Weak<LoggerRegistry>| {
            let store = build_store(
                &config,
                &context,
                &defaults,
                options.root_name.as_deref(),
                &options.builder,
                weak,
            )
            .unwrap_or_else(|e| {
                failure = Some(e);
                HashMap::new()
            });

            Self {
                config,
                store: Mutex::new(store),
                root_name: options.root_name,
                defaults,
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(registry),
        }
    }

    /// 按名称查找 logger，名称大小写不敏感
    pub fn get(&self, name: &str) -> Option<Arc<dyn Logger>> {
        self.lock_store().get(&name.to_lowercase()).cloned()
    }

    /// 是否存在指定名称的 logger
    pub fn contains(&self, name: &str) -> bool {
        self.lock_store().contains_key(&name.to_lowercase())
    }

    /// 根 logger
    pub fn root(&self) -> Option<Arc<dyn Logger>> {
        self.get(&self.root_name())
    }

    /// 当前使用的根 logger 名称
    pub fn root_name(&self) -> String {
        self.root_name.clone().unwrap_or_else(global::root_name)
    }

    /// 注册 logger，覆盖同名的已有 logger 并将其返回
    pub fn register(&self, path: &str, logger: Arc<dyn Logger>) -> Option<Arc<dyn Logger>> {
        self.lock_store().insert(path.to_lowercase(), logger)
    }

    /// 所有已注册的名称（已排序）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock_store().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 日志配置视图
    pub fn config(&self) -> Arc<dyn ConfigView> {
        Arc::clone(&self.config)
    }

    /// 按当前配置重新配置所有 logger
    ///
    /// 每个 logger 使用其名称最长的、在配置中存在的前缀对应的子树；
    /// 没有任何前缀存在时跳过，保留原有配置。
    /// 先为所有 logger 解析配置，再依次调用 `configure`，整个过程持有注册表锁。
    /// 某个 logger 配置失败时其余 logger 仍会被配置，返回第一个错误。
    pub fn reload(&self) -> Result<()> {
        let store = self.lock_store();

        let mut keys: Vec<&String> = store.keys().collect();
        keys.sort();

        let resolved: Vec<(&String, Arc<dyn ConfigView>)> = keys
            .into_iter()
            .filter_map(|key| find_longest_matching_path(key, &*self.config).map(|view| (key, view)))
            .collect();

        let mut first_error = None;
        for (key, view) in resolved {
            let view = fill_defaults(view, &self.defaults);
            if let Err(e) = store[key].configure(&*view) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn Logger>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_store(
    config: &Arc<dyn ConfigView>,
    context: &Fields,
    defaults: &JsonValue,
    root_name: Option<&str>,
    builder: &LoggerBuilder,
    registry: &Weak<LoggerRegistry>,
) -> Result<HashMap<String, Arc<dyn Logger>>> {
    let modules = discover_modules(&**config);
    let mut store = HashMap::with_capacity(modules.len().max(1));

    for module in modules {
        let view = match config.sub(&module) {
            Some(view) => view,
            None => Arc::clone(config),
        };
        let view = fill_defaults(view, defaults);

        // 每个 logger 持有独立的字段副本
        let mut fields = context.clone();
        let display = view.get_string("name").unwrap_or_else(|| module.clone());
        fields.insert("module".to_string(), JsonValue::String(display));

        let logger = builder(&module, fields, &*view, registry.clone())?;
        store.insert(module, logger);
    }

    if store.is_empty() {
        let root = root_name.map(String::from).unwrap_or_else(global::root_name);
        let view = fill_defaults(Arc::clone(config), defaults);

        let mut fields = context.clone();
        fields.insert("module".to_string(), JsonValue::String(root.clone()));

        let logger = builder(&root, fields, &*view, registry.clone())?;
        store.insert(root.to_lowercase(), logger);
    }

    Ok(store)
}

/// 模块为直接包含配置项的节
///
/// 每个叶子路径去掉最后一段即为其所在模块，直接位于根上的配置项不声明模块
fn discover_modules(config: &dyn ConfigView) -> BTreeSet<String> {
    config
        .all_keys()
        .iter()
        .filter_map(|key| key.rsplit_once('.').map(|(module, _)| module.to_lowercase()))
        .collect()
}

/// 查找路径最长的、在配置中存在的前缀对应的子树
///
/// 最长的已存在前缀不是子树时视为没有匹配
fn find_longest_matching_path(path: &str, config: &dyn ConfigView) -> Option<Arc<dyn ConfigView>> {
    let parts: Vec<&str> = path.split('.').collect();
    (1..=parts.len())
        .rev()
        .map(|n| parts[..n].join("."))
        .find(|prefix| config.is_set(prefix))
        .and_then(|prefix| config.sub(&prefix))
}
