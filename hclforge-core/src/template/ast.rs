//! Template syntax tree

use crate::value::Value;

/// A template node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{ expr }}`
    Output { expr: Expr, source: String },
    /// `{{ if cond }} ... {{ else }} ... {{ end }}`
    If {
        cond: Expr,
        source: String,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    /// `{{ for $v in expr }}` or `{{ for $k, $v in expr }}`
    For {
        key_var: Option<String>,
        value_var: String,
        iterable: Expr,
        source: String,
        body: Vec<Node>,
    },
}

/// A template expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Bare identifier resolved against the root context
    Lookup(String),
    /// `$name` resolved against loop scopes
    Variable(String),
    /// `.`, the whole root context
    Root,
    Call {
        name: String,
        args: Vec<Expr>,
        source: String,
    },
}

impl Expr {
    /// Visit every function name called by this expression
    pub fn collect_calls<'a>(&'a self, names: &mut Vec<&'a str>) {
        if let Expr::Call { name, args, .. } = self {
            names.push(name);
            for arg in args {
                arg.collect_calls(names);
            }
        }
    }
}

/// Visit every function name called anywhere in `nodes`
pub fn collect_calls<'a>(nodes: &'a [Node], names: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Output { expr, .. } => expr.collect_calls(names),
            Node::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                cond.collect_calls(names);
                collect_calls(then_branch, names);
                collect_calls(else_branch, names);
            }
            Node::For { iterable, body, .. } => {
                iterable.collect_calls(names);
                collect_calls(body, names);
            }
        }
    }
}
