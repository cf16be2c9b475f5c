//! Value - Configuration values consumed by templates

use std::collections::BTreeMap;

/// Key under which a configuration carries the resource's local name
pub const RESOURCE_NAME_KEY: &str = "resource_name";

/// JSON object key marking a reference (`{"$ref": "aiven_project.foo.project"}`)
const REFERENCE_TAG: &str = "$ref";
/// JSON object key marking a literal (`{"$literal": "var.not_a_ref"}`)
const LITERAL_TAG: &str = "$literal";

/// A configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Text rendered as a quoted string even when it looks like an expression
    Literal(String),
    /// Expression rendered verbatim (e.g. `aiven_project.foo.project`)
    Reference(String),
}

impl Value {
    pub fn literal(text: impl Into<String>) -> Self {
        Value::Literal(text.into())
    }

    pub fn reference(expr: impl Into<String>) -> Self {
        Value::Reference(expr.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by `if` guards: nil, false, zero and empty values are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) | Value::Literal(s) | Value::Reference(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Literal(_) => "literal",
            Value::Reference(_) => "reference",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Text printed by an output action, or `None` for values that have no plain form
    pub fn display_text(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) | Value::Literal(s) | Value::Reference(s) => Some(s.clone()),
            Value::Null | Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Recursively drop nulls from maps. List elements are kept in place.
    pub fn without_nulls(self) -> Value {
        match self {
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k, v.without_nulls()))
                    .collect(),
            ),
            Value::List(items) => {
                Value::List(items.into_iter().map(Value::without_nulls).collect())
            }
            other => other,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl From<Config> for Value {
    fn from(config: Config) -> Self {
        Value::Map(config.0)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(expr)) = map.get(REFERENCE_TAG) {
                        return Value::Reference(expr.clone());
                    }
                    if let Some(serde_json::Value::String(text)) = map.get(LITERAL_TAG) {
                        return Value::Literal(text.clone());
                    }
                }
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Error converting external data into a [`Config`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("configuration must be an object, got {0}")]
pub struct ConfigShapeError(pub &'static str);

/// Keyed configuration handed to a template as its root context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config(BTreeMap<String, Value>);

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The local resource name, when present as a string
    pub fn resource_name(&self) -> Option<&str> {
        self.get(RESOURCE_NAME_KEY).and_then(Value::as_str)
    }

    /// Drop null values at every map level
    pub fn without_nulls(self) -> Config {
        match Value::Map(self.0).without_nulls() {
            Value::Map(map) => Config(map),
            _ => Config::default(),
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Config {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Config(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Config(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl TryFrom<serde_json::Value> for Config {
    type Error = ConfigShapeError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match Value::from(json) {
            Value::Map(map) => Ok(Config(map)),
            Value::Null => Ok(Config::default()),
            other => Err(ConfigShapeError(other.type_name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(!Value::Map(BTreeMap::new()).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(3).is_truthy());
        assert!(Value::reference("a.b").is_truthy());
    }

    #[test]
    fn test_without_nulls_recurses_into_maps() {
        let config = Config::new()
            .with("name", "db")
            .with("plan", Value::Null)
            .with(
                "settings",
                Value::Map(BTreeMap::from([
                    ("a".to_string(), Value::Null),
                    ("b".to_string(), Value::Int(1)),
                ])),
            );

        let cleaned = config.without_nulls();
        assert!(!cleaned.contains_key("plan"));
        assert_eq!(
            cleaned.get("settings"),
            Some(&Value::Map(BTreeMap::from([("b".to_string(), Value::Int(1))])))
        );
    }

    #[test]
    fn test_config_from_json_with_tags() {
        let config = Config::try_from(json!({
            "resource_name": "foo",
            "project": {"$ref": "aiven_project.foo.project"},
            "pattern": {"$literal": "var.x"},
            "count": 2,
            "ratio": 0.5,
        }))
        .unwrap();

        assert_eq!(config.resource_name(), Some("foo"));
        assert_eq!(
            config.get("project"),
            Some(&Value::reference("aiven_project.foo.project"))
        );
        assert_eq!(config.get("pattern"), Some(&Value::literal("var.x")));
        assert_eq!(config.get("count"), Some(&Value::Int(2)));
        assert_eq!(config.get("ratio"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_config_from_non_object_json() {
        let err = Config::try_from(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "configuration must be an object, got list");
    }

    #[test]
    fn test_display_text() {
        assert_eq!(Value::Bool(true).display_text().as_deref(), Some("true"));
        assert_eq!(Value::Int(-4).display_text().as_deref(), Some("-4"));
        assert_eq!(Value::Null.display_text(), None);
        assert_eq!(Value::List(vec![]).display_text(), None);
    }
}
