//! 配置默认值填充
//!
//! 以装饰器的方式为视图补充缺省配置，不修改底层配置源

use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use std::sync::Arc;

use super::view::{lookup, split_path, ConfigView};

/// 带默认值的配置视图
///
/// 查询时优先使用内部视图中的值，缺失时回退到默认值。
/// 默认值只作用于当前层级，`sub` 返回的子视图不带默认值。
pub struct DefaultedView {
    inner: Arc<dyn ConfigView>,
    defaults: JsonValue,
}

/// 为视图填充默认值
///
/// `defaults` 应为对象，非对象时视为没有默认值。
/// 视图中显式存在的配置不会被覆盖。
pub fn fill_defaults(view: Arc<dyn ConfigView>, defaults: &JsonValue) -> Arc<dyn ConfigView> {
    let defaults = match defaults {
        JsonValue::Object(map) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect(),
        _ => Map::new(),
    };
    Arc::new(DefaultedView {
        inner: view,
        defaults: JsonValue::Object(defaults),
    })
}

impl DefaultedView {
    fn default_value(&self, key: &str) -> Option<&JsonValue> {
        let path = split_path(key);
        if path.is_empty() {
            return None;
        }
        lookup(&self.defaults, &path).filter(|v| !v.is_null())
    }
}

impl ConfigView for DefaultedView {
    fn is_set(&self, key: &str) -> bool {
        self.inner.is_set(key) || self.default_value(key).is_some()
    }

    fn has_section(&self, key: &str) -> bool {
        self.inner.has_section(key)
    }

    fn sub(&self, key: &str) -> Option<Arc<dyn ConfigView>> {
        self.inner.sub(key)
    }

    fn all_keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.inner.all_keys().into_iter().collect();
        if let JsonValue::Object(defaults) = &self.defaults {
            keys.extend(defaults.keys().filter(|k| !self.inner.is_set(k)).cloned());
        }
        keys.into_iter().collect()
    }

    fn get(&self, key: &str) -> Option<JsonValue> {
        self.inner
            .get(key)
            .or_else(|| self.default_value(key).cloned())
    }

    fn to_value(&self) -> JsonValue {
        let mut merged = match &self.defaults {
            JsonValue::Object(map) => map.clone(),
            _ => Map::new(),
        };
        if let JsonValue::Object(explicit) = self.inner.to_value() {
            for (key, value) in explicit {
                if !value.is_null() {
                    merged.insert(key, value);
                }
            }
        }
        JsonValue::Object(merged)
    }
}
