//! Tree-walking evaluation of parsed templates

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::ast::{Expr, Node};
use crate::value::{Config, Value};

/// Functions built into the language, always available
pub const BUILTINS: &[&str] = &["index", "present", "not"];

/// A function callable from template expressions
pub type TemplateFunction = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// Named function table handed to the evaluator
pub type Functions = BTreeMap<String, TemplateFunction>;

/// Failure reported by a template function
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FunctionError {
    #[error("required value is missing")]
    MissingValue,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecErrorKind {
    #[error("{name}: {source}")]
    Function { name: String, source: FunctionError },
    #[error("function {0} panicked")]
    Panicked(String),
    #[error("unknown function {0}")]
    UnknownFunction(String),
    #[error("undefined variable ${0}")]
    UndefinedVariable(String),
    #[error("cannot print value of type {0}")]
    NotPrintable(&'static str),
    #[error("cannot iterate over value of type {0}")]
    NotIterable(&'static str),
    #[error("cannot index {target} with {key}")]
    InvalidIndex {
        target: &'static str,
        key: &'static str,
    },
    #[error("index {index} out of range for list of length {len}")]
    OutOfRange { index: i64, len: usize },
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },
}

/// Error raised while executing a template, tagged with the failing action
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("error calling {action}: {kind}")]
pub struct ExecError {
    pub action: String,
    pub kind: ExecErrorKind,
}

impl ExecError {
    /// True when a `required` guard rejected an absent value
    pub fn is_missing_required(&self) -> bool {
        matches!(
            self.kind,
            ExecErrorKind::Function {
                source: FunctionError::MissingValue,
                ..
            }
        )
    }
}

/// Execute `nodes` against `context`
pub fn execute(nodes: &[Node], context: &Config, functions: &Functions) -> Result<String, ExecError> {
    let mut evaluator = Evaluator {
        context,
        functions,
        scopes: Vec::new(),
    };
    let mut out = String::new();
    evaluator.render(nodes, &mut out)?;
    Ok(out)
}

struct Evaluator<'a> {
    context: &'a Config,
    functions: &'a Functions,
    scopes: Vec<(&'a str, Value)>,
}

impl<'a> Evaluator<'a> {
    fn render(&mut self, nodes: &'a [Node], out: &mut String) -> Result<(), ExecError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Output { expr, source } => {
                    let value = self.eval(expr, source)?;
                    let text = value.display_text().ok_or_else(|| ExecError {
                        action: source.clone(),
                        kind: ExecErrorKind::NotPrintable(value.type_name()),
                    })?;
                    out.push_str(&text);
                }
                Node::If {
                    cond,
                    source,
                    then_branch,
                    else_branch,
                } => {
                    let branch = if self.eval(cond, source)?.is_truthy() {
                        then_branch
                    } else {
                        else_branch
                    };
                    self.render(branch, out)?;
                }
                Node::For {
                    key_var,
                    value_var,
                    iterable,
                    source,
                    body,
                } => {
                    let entries: Vec<(Value, Value)> = match self.eval(iterable, source)? {
                        Value::Null => Vec::new(),
                        Value::List(items) => items
                            .into_iter()
                            .enumerate()
                            .map(|(i, v)| (Value::Int(i as i64), v))
                            .collect(),
                        Value::Map(map) => map
                            .into_iter()
                            .map(|(k, v)| (Value::String(k), v))
                            .collect(),
                        other => {
                            return Err(ExecError {
                                action: source.clone(),
                                kind: ExecErrorKind::NotIterable(other.type_name()),
                            });
                        }
                    };

                    for (key, value) in entries {
                        let depth = self.scopes.len();
                        if let Some(key_var) = key_var {
                            self.scopes.push((key_var.as_str(), key));
                        }
                        self.scopes.push((value_var.as_str(), value));
                        let result = self.render(body, out);
                        self.scopes.truncate(depth);
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&self, expr: &Expr, action: &str) -> Result<Value, ExecError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            // Absent keys evaluate to nil so guards can test presence
            Expr::Lookup(name) => Ok(self.context.get(name).cloned().unwrap_or(Value::Null)),
            Expr::Root => Ok(Value::from(self.context.clone())),
            Expr::Variable(name) => self
                .scopes
                .iter()
                .rev()
                .find(|(var, _)| *var == name.as_str())
                .map(|(_, value)| value.clone())
                .ok_or_else(|| ExecError {
                    action: action.to_string(),
                    kind: ExecErrorKind::UndefinedVariable(name.clone()),
                }),
            Expr::Call { name, args, source } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, action))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &args).map_err(|kind| ExecError {
                    action: source.clone(),
                    kind,
                })
            }
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExecErrorKind> {
        match name {
            "index" => index(args),
            "present" => match args {
                [value] => Ok(Value::Bool(!value.is_null())),
                _ => Err(arity("present", "1", args.len())),
            },
            "not" => match args {
                [value] => Ok(Value::Bool(!value.is_truthy())),
                _ => Err(arity("not", "1", args.len())),
            },
            _ => {
                let function = self
                    .functions
                    .get(name)
                    .ok_or_else(|| ExecErrorKind::UnknownFunction(name.to_string()))?;
                match panic::catch_unwind(AssertUnwindSafe(|| function(args))) {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(source)) => Err(ExecErrorKind::Function {
                        name: name.to_string(),
                        source,
                    }),
                    Err(_) => Err(ExecErrorKind::Panicked(name.to_string())),
                }
            }
        }
    }
}

fn arity(name: &'static str, expected: &'static str, got: usize) -> ExecErrorKind {
    ExecErrorKind::Arity {
        name,
        expected,
        got,
    }
}

/// `index(target, key...)`: walk maps by string key and lists by integer
/// position. Indexing through nil yields nil.
fn index(args: &[Value]) -> Result<Value, ExecErrorKind> {
    let (target, keys) = args
        .split_first()
        .ok_or_else(|| arity("index", "at least 1", 0))?;

    let mut current = target.clone();
    for key in keys {
        current = match (current, key) {
            (Value::Null, _) => return Ok(Value::Null),
            (Value::Map(mut map), Value::String(k)) => map.remove(k).unwrap_or(Value::Null),
            (Value::List(mut items), Value::Int(i)) => {
                let len = items.len();
                match usize::try_from(*i) {
                    Ok(pos) if pos < len => items.swap_remove(pos),
                    _ => return Err(ExecErrorKind::OutOfRange { index: *i, len }),
                }
            }
            (target, key) => {
                return Err(ExecErrorKind::InvalidIndex {
                    target: target.type_name(),
                    key: key.type_name(),
                });
            }
        };
    }
    Ok(current)
}
