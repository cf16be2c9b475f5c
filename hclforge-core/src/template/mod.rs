//! Text template language
//!
//! Templates interleave verbatim text with `{{ ... }}` actions:
//!
//! - `{{ expr }}` prints a scalar value
//! - `{{ if expr }} ... {{ else }} ... {{ end }}` renders a branch by truthiness
//! - `{{ for $v in expr }}` / `{{ for $k, $v in expr }}` iterates lists and maps
//! - `{{-` and `-}}` trim adjacent whitespace
//!
//! Expressions are literals, bare identifiers (looked up in the root
//! configuration, absent keys are `nil`), `.` for the root configuration
//! itself, `$variables` bound by loops, and function calls such as
//! `index(settings, "ip_filter", 0)`. Keys that are reserved words or not
//! identifiers are read with `index(., "end")`.
//!
//! # Example
//!
//! ```
//! use hclforge_core::template::{Functions, Template};
//! use hclforge_core::value::Config;
//!
//! let template = Template::parse("name = \"{{ name }}\"").unwrap();
//! let config = Config::new().with("name", "db");
//! let out = template.execute(&config, &Functions::new()).unwrap();
//!
//! assert_eq!(out, "name = \"db\"");
//! ```

mod ast;
mod eval;
mod parser;

pub use ast::{Expr, Node};
pub use eval::{
    BUILTINS, ExecError, ExecErrorKind, FunctionError, Functions, TemplateFunction, execute,
};
pub use parser::TemplateParseError;

/// Words that never parse as a bare lookup
pub const RESERVED_WORDS: &[&str] = &["if", "else", "end", "for", "in", "nil", "true", "false"];

/// Whether `name` can be written as a bare lookup of a root key
pub fn is_bare_lookup(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&name)
}

use crate::value::Config;

/// A parsed template
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateParseError> {
        let source = source.into();
        let nodes = parser::parse(&source)?;
        Ok(Template { source, nodes })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Names of all functions the template calls, sorted and deduplicated
    pub fn called_functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        ast::collect_calls(&self.nodes, &mut names);
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn execute(&self, context: &Config, functions: &Functions) -> Result<String, ExecError> {
        eval::execute(&self.nodes, context, functions)
    }
}
