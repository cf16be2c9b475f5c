//! Registry - Named templates and their execution
//!
//! Templates are parsed once on [`Registry::add`] and executed any number of
//! times against fresh configurations. Every registry carries the
//! `required` and `render_value` functions; more can be injected with
//! [`Registry::add_function`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::template::{
    BUILTINS, ExecError, FunctionError, Functions, Template, TemplateFunction, TemplateParseError,
};
use crate::value::{Config, Value};

/// Registration error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to parse template {key:?}: {source}")]
    Parse {
        key: String,
        source: TemplateParseError,
    },

    #[error("template {key:?} calls unknown function {function}")]
    UnknownFunction { key: String, function: String },
}

/// Rendering error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("template {key:?} does not exist. Available templates: {}", available.join(", "))]
    NotFound { key: String, available: Vec<String> },

    #[error("failed to render template {key:?} for resource {resource_name:?}: {source}")]
    Execution {
        key: String,
        resource_name: String,
        source: ExecError,
    },
}

/// Named template store
#[derive(Clone)]
pub struct Registry {
    templates: BTreeMap<String, Template>,
    functions: Functions,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut registry = Registry {
            templates: BTreeMap::new(),
            functions: Functions::new(),
        };
        registry.add_function("required", required);
        registry.add_function("render_value", |args: &[Value]| match args {
            [value] => Ok(Value::String(render_value(value))),
            _ => Err(FunctionError::Failed(format!(
                "expects 1 argument, got {}",
                args.len()
            ))),
        });
        registry
    }

    /// Make `function` callable from templates added afterwards
    pub fn add_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        let function: TemplateFunction = Arc::new(function);
        self.functions.insert(name.into(), function);
    }

    /// Parse and store a template, replacing any previous one under `key`
    pub fn add(&mut self, key: impl Into<String>, source: &str) -> Result<(), RegistryError> {
        let key = key.into();
        let template = Template::parse(source).map_err(|source| RegistryError::Parse {
            key: key.clone(),
            source,
        })?;

        if let Some(function) = template
            .called_functions()
            .into_iter()
            .find(|name| !BUILTINS.contains(name) && !self.functions.contains_key(*name))
        {
            return Err(RegistryError::UnknownFunction {
                key,
                function: function.to_string(),
            });
        }

        log::debug!("Registered template {}", key);
        log::trace!("Template {} source:\n{}", key, source);
        self.templates.insert(key, template);
        Ok(())
    }

    pub fn has(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.templates.remove(key).is_some()
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Source text of a registered template
    pub fn source(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(Template::source)
    }

    /// Execute the template under `key` against `config`
    pub fn render(&self, key: &str, config: &Config) -> Result<String, RenderError> {
        let template = self.templates.get(key).ok_or_else(|| RenderError::NotFound {
            key: key.to_string(),
            available: self.templates.keys().cloned().collect(),
        })?;

        template
            .execute(config, &self.functions)
            .map_err(|source| RenderError::Execution {
                key: key.to_string(),
                resource_name: config.resource_name().unwrap_or("unknown").to_string(),
                source,
            })
    }
}

fn required(args: &[Value]) -> Result<Value, FunctionError> {
    match args {
        [Value::Null] => Err(FunctionError::MissingValue),
        [value] => Ok(value.clone()),
        _ => Err(FunctionError::Failed(format!(
            "expects 1 argument, got {}",
            args.len()
        ))),
    }
}

/// Format a value as configuration syntax.
///
/// Literals and strings are quoted, references pass through verbatim,
/// lists render as `[a, b]` and maps as `{"k" = v}` in key order.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format_float(*f),
        Value::String(s) | Value::Literal(s) => quote(s),
        Value::Reference(expr) => expr.clone(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Map(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} = {}", quote(k), render_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Magnitude from which floats are written with an exponent
const EXPONENT_THRESHOLD: f64 = 1e15;

/// Non-finite floats have no literal form and render as `null`
fn format_float(f: f64) -> String {
    if !f.is_finite() {
        "null".to_string()
    } else if f != 0.0 && f.abs() >= EXPONENT_THRESHOLD {
        format!("{:e}", f)
    } else {
        f.to_string()
    }
}

/// Quote text as a string literal, escaping template sequences
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_floats_use_exponent() {
        assert_eq!(render_value(&Value::Float(1e21)), "1e21");
        assert_eq!(render_value(&Value::Float(-2.5e16)), "-2.5e16");
        assert_eq!(render_value(&Value::Float(1234.5)), "1234.5");
        assert_eq!(render_value(&Value::Float(f64::NAN)), "null");

        let text = format!("x = {}\n", render_value(&Value::Float(1e21)));
        assert!(crate::normalizer::validate(&text).is_ok());
    }

    #[test]
    fn test_render_value_shapes() {
        assert_eq!(render_value(&Value::Null), "null");
        assert_eq!(render_value(&Value::from("db")), "\"db\"");
        assert_eq!(render_value(&Value::Int(5)), "5");
        assert_eq!(render_value(&Value::Float(2.5)), "2.5");
        assert_eq!(render_value(&Value::Bool(false)), "false");
        assert_eq!(
            render_value(&Value::from(vec![Value::from("a"), Value::Int(1)])),
            "[\"a\", 1]"
        );
        assert_eq!(
            render_value(&Value::Map(BTreeMap::from([
                ("z".to_string(), Value::Int(1)),
                ("a".to_string(), Value::from("x")),
            ]))),
            "{\"a\" = \"x\", \"z\" = 1}"
        );
    }

    #[test]
    fn test_render_value_branches_on_tag() {
        assert_eq!(
            render_value(&Value::reference("aiven_project.foo.project")),
            "aiven_project.foo.project"
        );
        assert_eq!(
            render_value(&Value::literal("aiven_project.foo.project")),
            "\"aiven_project.foo.project\""
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
        assert_eq!(quote("${var.x}"), "\"$${var.x}\"");
        assert_eq!(quote("100%{x}"), "\"100%%{x}\"");
        assert_eq!(quote("$5"), "\"$5\"");
    }

    #[test]
    fn test_add_and_render() {
        let mut registry = Registry::new();
        registry
            .add("resource.x", "name = {{ render_value(required(name)) }}")
            .unwrap();
        assert!(registry.has("resource.x"));

        let out = registry
            .render("resource.x", &Config::new().with("name", "db"))
            .unwrap();
        assert_eq!(out, "name = \"db\"");
    }

    #[test]
    fn test_render_missing_required() {
        let mut registry = Registry::new();
        registry
            .add("resource.x", "name = {{ render_value(required(name)) }}")
            .unwrap();

        let err = registry
            .render("resource.x", &Config::new().with("resource_name", "foo"))
            .unwrap_err();
        match err {
            RenderError::Execution {
                key,
                resource_name,
                source,
            } => {
                assert_eq!(key, "resource.x");
                assert_eq!(resource_name, "foo");
                assert!(source.is_missing_required());
                assert_eq!(source.action, "required(name)");
            }
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_unknown_key_lists_available() {
        let mut registry = Registry::new();
        registry.add("resource.b", "b").unwrap();
        registry.add("resource.a", "a").unwrap();

        let err = registry.render("resource.c", &Config::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "template \"resource.c\" does not exist. Available templates: resource.a, resource.b"
        );
    }

    #[test]
    fn test_add_rejects_malformed_template() {
        let mut registry = Registry::new();
        let err = registry.add("bad", "{{ if x }}").unwrap_err();
        assert!(matches!(err, RegistryError::Parse { key, .. } if key == "bad"));
        assert!(!registry.has("bad"));
    }

    #[test]
    fn test_add_rejects_unknown_function() {
        let mut registry = Registry::new();
        let err = registry.add("x", "{{ shout(name) }}").unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnknownFunction {
                key: "x".to_string(),
                function: "shout".to_string(),
            }
        );

        registry.add_function("shout", |args: &[Value]| {
            Ok(Value::String(
                args.first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_uppercase(),
            ))
        });
        registry.add("x", "{{ shout(name) }}").unwrap();
        assert_eq!(
            registry.render("x", &Config::new().with("name", "db")).unwrap(),
            "DB"
        );
    }

    #[test]
    fn test_remove_and_keys() {
        let mut registry = Registry::new();
        registry.add("b", "b").unwrap();
        registry.add("a", "a").unwrap();
        assert_eq!(registry.keys(), vec!["a", "b"]);
        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_render_does_not_retain_state() {
        let mut registry = Registry::new();
        registry
            .add("x", "{{ if present(flag) }}flag={{ flag }}{{ end }}")
            .unwrap();
        assert_eq!(
            registry.render("x", &Config::new().with("flag", true)).unwrap(),
            "flag=true"
        );
        assert_eq!(registry.render("x", &Config::new()).unwrap(), "");
    }
}
