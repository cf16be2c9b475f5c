//! Transform - Per-field rewriting of configuration values
//!
//! A [`ResourceTransformer`] maps dotted field paths (`settings.ip_filter`)
//! to functions that may rewrite or drop the value found there. List
//! elements share their list's path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{Config, Value};

/// Rewrites a value, or drops it by returning `None`
pub type FieldTransformer = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// Dotted path to a configuration field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        FieldPath(
            path.split('.')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn child(&self, name: &str) -> Self {
        let mut parts = self.0.clone();
        parts.push(name.to_string());
        FieldPath(parts)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Field transformers for one resource type
#[derive(Clone, Default)]
pub struct ResourceTransformer {
    transformers: BTreeMap<FieldPath, FieldTransformer>,
}

impl fmt::Debug for ResourceTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.transformers.keys()).finish()
    }
}

impl ResourceTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: &str, transformer: F) -> &mut Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.transformers
            .insert(FieldPath::parse(path), Arc::new(transformer));
        self
    }

    pub fn transform(&self, config: Config) -> Config {
        config
            .into_inner()
            .into_iter()
            .filter_map(|(key, value)| {
                self.transform_value(&FieldPath::default().child(&key), value)
                    .map(|value| (key, value))
            })
            .collect()
    }

    fn transform_value(&self, path: &FieldPath, value: Value) -> Option<Value> {
        let value = match self.transformers.get(path) {
            Some(transformer) => transformer(value)?,
            None => value,
        };

        match value {
            Value::Map(map) => Some(Value::Map(
                map.into_iter()
                    .filter_map(|(key, v)| {
                        self.transform_value(&path.child(&key), v).map(|v| (key, v))
                    })
                    .collect(),
            )),
            Value::List(items) => {
                let was_empty = items.is_empty();
                let items: Vec<Value> = items
                    .into_iter()
                    .filter_map(|item| self.transform_value(path, item))
                    .collect();
                // A list whose every element was dropped is dropped too
                if items.is_empty() && !was_empty {
                    None
                } else {
                    Some(Value::List(items))
                }
            }
            other => Some(other),
        }
    }
}

/// Transformers keyed by resource type
#[derive(Debug, Clone, Default)]
pub struct TransformerRegistry {
    by_type: BTreeMap<String, ResourceTransformer>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transformer for `resource_type`, created on first access
    pub fn for_type(&mut self, resource_type: &str) -> &mut ResourceTransformer {
        self.by_type.entry(resource_type.to_string()).or_default()
    }

    pub fn get(&self, resource_type: &str) -> Option<&ResourceTransformer> {
        self.by_type.get(resource_type)
    }

    /// Apply the transformer for `resource_type`, if any
    pub fn transform(&self, resource_type: &str, config: Config) -> Config {
        match self.get(resource_type) {
            Some(transformer) => transformer.transform(config),
            None => config,
        }
    }
}

/// A transformer dropping the field when it equals `unwanted`
pub fn drop_if_equal(unwanted: Value) -> impl Fn(Value) -> Option<Value> + Send + Sync + 'static {
    move |value| (value != unwanted).then_some(value)
}
