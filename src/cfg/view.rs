//! 层级配置视图
//!
//! 提供按点分路径访问的只读配置树抽象，键名大小写不敏感

use anyhow::Result;
use serde_json::{Map, Value as JsonValue};
use std::sync::{Arc, PoisonError, RwLock};

/// 层级配置视图
///
/// 所有路径均为点分形式（如 `server.http`），大小写不敏感。
/// 视图是只读的，底层配置源可能在外部被刷新，
/// 因此同一视图在不同时刻的查询结果可能不同。
pub trait ConfigView: Send + Sync {
    /// 路径上是否存在非空的值或子树
    fn is_set(&self, key: &str) -> bool;

    /// 路径上是否存在子树（对象节点）
    fn has_section(&self, key: &str) -> bool;

    /// 获取以路径为根的子视图，仅当路径指向子树时返回 Some
    fn sub(&self, key: &str) -> Option<Arc<dyn ConfigView>>;

    /// 当前视图下所有叶子节点的点分路径（已排序）
    fn all_keys(&self) -> Vec<String>;

    /// 获取路径上的值
    fn get(&self, key: &str) -> Option<JsonValue>;

    /// 当前视图的完整快照，视图为空时返回空对象
    fn to_value(&self) -> JsonValue;

    /// 以字符串形式获取路径上的标量值
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            JsonValue::String(s) => Some(s),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 基于 JSON 树的配置视图
///
/// 多个视图共享同一棵配置树：`sub` 返回的子视图只记录路径前缀，
/// 每次访问时重新解析，因此 `replace` 之后所有视图都能看到新数据。
///
/// # 示例
/// ```
/// use logtree::cfg::{ConfigView, TreeConfig};
///
/// let config = TreeConfig::from_json5(r#"{ logging: { server: { level: "debug" } } }"#).unwrap();
/// let server = config.sub("logging.server").unwrap();
/// assert_eq!(server.get_string("level").as_deref(), Some("debug"));
/// ```
#[derive(Clone)]
pub struct TreeConfig {
    root: Arc<RwLock<JsonValue>>,
    prefix: Vec<String>,
}

impl TreeConfig {
    /// 从 JSON 值创建配置，对象键统一转为小写
    ///
    /// 同一对象中仅大小写不同的键会合并为一个，按键的字典序保留最后一个
    /// （如 `Level` 与 `level` 同时存在时保留 `level` 的值），并输出警告
    pub fn new(value: JsonValue) -> Self {
        Self {
            root: Arc::new(RwLock::new(normalize_keys(value))),
            prefix: Vec::new(),
        }
    }

    /// 创建空配置
    pub fn empty() -> Self {
        Self::new(JsonValue::Object(Map::new()))
    }

    /// 从 JSON5 字符串创建配置（兼容标准 JSON）
    pub fn from_json5(content: &str) -> Result<Self> {
        Ok(Self::new(json5::from_str(content)?))
    }

    /// 从 YAML 字符串创建配置
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(Self::new(serde_yaml::from_str(content)?))
    }

    /// 从 TOML 字符串创建配置
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(Self::new(toml::from_str(content)?))
    }

    /// 替换整棵配置树
    ///
    /// 影响共享同一棵树的所有视图，包括此前通过 `sub` 得到的子视图
    pub fn replace(&self, value: JsonValue) {
        let mut root = self.root.write().unwrap_or_else(PoisonError::into_inner);
        *root = normalize_keys(value);
    }

    /// 以 trait object 形式返回视图
    pub fn into_view(self) -> Arc<dyn ConfigView> {
        Arc::new(self)
    }

    fn with_node<R>(
        &self,
        key: &str,
        accept: fn(&JsonValue) -> bool,
        f: impl FnOnce(Option<&JsonValue>) -> R,
    ) -> R {
        let root = self.root.read().unwrap_or_else(PoisonError::into_inner);
        // 子视图先定位自身对应的子树，后续查找限定在该子树内
        let node = lookup_by(&root, &self.prefix, JsonValue::is_object)
            .and_then(|section| lookup_by(section, &split_path(key), accept));
        f(node)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConfigView for TreeConfig {
    fn is_set(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        self.with_node(key, is_present, |node| node.is_some())
    }

    fn has_section(&self, key: &str) -> bool {
        self.with_node(key, JsonValue::is_object, |node| node.is_some())
    }

    fn sub(&self, key: &str) -> Option<Arc<dyn ConfigView>> {
        if key.is_empty() || !self.has_section(key) {
            return None;
        }
        let mut prefix = self.prefix.clone();
        prefix.extend(split_path(key));
        Some(Arc::new(TreeConfig {
            root: Arc::clone(&self.root),
            prefix,
        }))
    }

    fn all_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.with_node("", JsonValue::is_object, |node| {
            if let Some(JsonValue::Object(map)) = node {
                flatten_keys(map, "", &mut keys);
            }
        });
        keys.sort();
        keys
    }

    fn get(&self, key: &str) -> Option<JsonValue> {
        self.with_node(key, is_present, |node| node.cloned())
    }

    fn to_value(&self) -> JsonValue {
        self.with_node("", JsonValue::is_object, |node| match node {
            Some(value @ JsonValue::Object(_)) => value.clone(),
            _ => JsonValue::Object(Map::new()),
        })
    }
}

/// 将点分路径拆分为小写片段，空路径返回空列表
pub(crate) fn split_path(key: &str) -> Vec<String> {
    if key.is_empty() {
        return Vec::new();
    }
    key.to_lowercase().split('.').map(String::from).collect()
}

/// 按路径片段查找节点
///
/// 对象的键本身可以包含 `.`，因此每一层都优先尝试最长的片段组合
pub(crate) fn lookup<'a>(node: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    lookup_by(node, path, |_| true)
}

/// 按路径片段查找第一个满足 `accept` 的节点
///
/// 最长组合命中的节点不满足条件时继续尝试更短的组合，
/// 例如 `{"a.b": "x", a: {b: {...}}}` 中按子树查找 `a.b` 会得到后者
fn lookup_by<'a>(
    node: &'a JsonValue,
    path: &[String],
    accept: fn(&JsonValue) -> bool,
) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(node).filter(|v| accept(*v));
    }
    let map = node.as_object()?;
    for n in (1..=path.len()).rev() {
        if let Some(child) = map.get(&path[..n].join(".")) {
            if let Some(found) = lookup_by(child, &path[n..], accept) {
                return Some(found);
            }
        }
    }
    None
}

fn is_present(value: &JsonValue) -> bool {
    !value.is_null()
}

fn flatten_keys(map: &Map<String, JsonValue>, prefix: &str, keys: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            JsonValue::Object(child) => flatten_keys(child, &path, keys),
            _ => keys.push(path),
        }
    }
}

fn normalize_keys(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut normalized = Map::with_capacity(map.len());
            for (key, value) in map {
                let lower = key.to_lowercase();
                if normalized.contains_key(&lower) {
                    tracing::warn!(key = %key, "config keys differ only in case, keeping the last one");
                }
                normalized.insert(lower, normalize_keys(value));
            }
            JsonValue::Object(normalized)
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TreeConfig {
        TreeConfig::from_json5(
            r#"{
                Logging: {
                    Server: { level: "debug", http: { level: "warn" } },
                    db: { level: "info", "pool.size": "small" },
                    empty: {},
                    nothing: null,
                },
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_is_set_is_case_insensitive() {
        let config = sample();
        assert!(config.is_set("logging.server.level"));
        assert!(config.is_set("LOGGING.Server.HTTP"));
        assert!(!config.is_set("logging.missing"));
        assert!(!config.is_set(""));
    }

    #[test]
    fn test_null_is_not_set() {
        let config = sample();
        assert!(!config.is_set("logging.nothing"));
        assert!(config.get("logging.nothing").is_none());
    }

    #[test]
    fn test_has_section() {
        let config = sample();
        assert!(config.has_section("logging"));
        assert!(config.has_section("logging.server"));
        assert!(!config.has_section("logging.server.level"));
    }

    #[test]
    fn test_sub_only_for_sections() {
        let config = sample();
        assert!(config.sub("logging.server").is_some());
        assert!(config.sub("logging.server.level").is_none());
        assert!(config.sub("logging.missing").is_none());
        assert!(config.sub("").is_none());
    }

    #[test]
    fn test_all_keys_flattens_leaves() {
        let config = sample();
        let logging = config.sub("logging").unwrap();
        assert_eq!(
            logging.all_keys(),
            vec![
                "db.level",
                "db.pool.size",
                "nothing",
                "server.http.level",
                "server.level",
            ]
        );
    }

    #[test]
    fn test_literal_dotted_key() {
        let config = TreeConfig::new(json!({ "a": { "b.c": { "level": "debug" } } }));
        assert!(config.is_set("a.b.c"));
        assert!(config.is_set("a.b.c.level"));
        assert!(!config.is_set("a.b"));
        assert_eq!(config.get_string("a.b.c.level").as_deref(), Some("debug"));
    }

    #[test]
    fn test_section_lookup_skips_scalar_literal_key() {
        let config = TreeConfig::new(json!({ "a.b": "x", "a": { "b": { "level": "debug" } } }));
        assert_eq!(config.get_string("a.b").as_deref(), Some("x"));
        assert!(config.has_section("a.b"));

        let section = config.sub("a.b").unwrap();
        assert_eq!(section.get_string("level").as_deref(), Some("debug"));
        assert_eq!(section.to_value(), json!({ "level": "debug" }));
    }

    #[test]
    fn test_longest_literal_section_shadows_nested() {
        let config = TreeConfig::new(json!({
            "server.http": { "level": "warn" },
            "server": { "http": { "format": "json" } },
        }));
        let http = config.sub("server.http").unwrap();
        assert_eq!(http.to_value(), json!({ "level": "warn" }));
        assert!(!http.is_set("format"));
        assert_eq!(http.all_keys(), vec!["level"]);
        // 完整路径查找仍可回退到较短的组合
        assert_eq!(config.get_string("server.http.format").as_deref(), Some("json"));
    }

    #[test]
    fn test_keys_differing_only_in_case_collapse() {
        let config = TreeConfig::new(json!({ "Level": "debug", "level": "warn" }));
        assert_eq!(config.all_keys(), vec!["level"]);
        assert_eq!(config.get_string("LEVEL").as_deref(), Some("warn"));
    }

    #[test]
    fn test_get_string_converts_scalars() {
        let config = TreeConfig::new(json!({ "n": 3, "b": true, "s": "x", "o": {} }));
        assert_eq!(config.get_string("n").as_deref(), Some("3"));
        assert_eq!(config.get_string("b").as_deref(), Some("true"));
        assert_eq!(config.get_string("s").as_deref(), Some("x"));
        assert_eq!(config.get_string("o"), None);
    }

    #[test]
    fn test_sub_view_observes_replace() {
        let config = sample();
        let server = config.sub("logging.server").unwrap();
        assert_eq!(server.get_string("level").as_deref(), Some("debug"));

        config.replace(json!({ "logging": { "server": { "level": "error" } } }));
        assert_eq!(server.get_string("level").as_deref(), Some("error"));
        assert!(!server.is_set("http"));

        config.replace(json!({}));
        assert!(!server.is_set("level"));
        assert_eq!(server.to_value(), json!({}));
        assert!(server.all_keys().is_empty());
    }

    #[test]
    fn test_to_value_snapshot() {
        let config = sample();
        let db = config.sub("logging.db").unwrap();
        assert_eq!(db.to_value(), json!({ "level": "info", "pool.size": "small" }));
    }

    #[test]
    fn test_from_yaml_and_toml() -> Result<()> {
        let yaml = TreeConfig::from_yaml("logging:\n  App:\n    Level: debug\n")?;
        assert_eq!(yaml.get_string("logging.app.level").as_deref(), Some("debug"));

        let toml = TreeConfig::from_toml("[logging.app]\nlevel = \"warn\"\n")?;
        assert_eq!(toml.get_string("logging.app.level").as_deref(), Some("warn"));
        Ok(())
    }
}
