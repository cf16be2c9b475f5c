//! Pest parser for the template grammar

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use super::ast::{Expr, Node};
use crate::value::Value;

#[derive(Parser)]
#[grammar = "template/template.pest"]
struct TemplateParser;

/// Error type for template parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at {line}:{column}: {message}")]
pub struct TemplateParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl TemplateParseError {
    fn at(pair: &Pair<'_, Rule>, message: impl Into<String>) -> Self {
        let (line, column) = pair.as_span().start_pos().line_col();
        TemplateParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

impl From<pest::error::Error<Rule>> for TemplateParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            pest::error::LineColLocation::Pos((l, c)) => (l, c),
            pest::error::LineColLocation::Span((l, c), _) => (l, c),
        };
        TemplateParseError {
            message: err.variant.message().to_string(),
            line,
            column,
        }
    }
}

enum Directive {
    If(Expr),
    Else,
    End,
    For {
        key_var: Option<String>,
        value_var: String,
        iterable: Expr,
    },
    Output(Expr),
}

struct Tag {
    directive: Directive,
    source: String,
    trim_left: bool,
    trim_right: bool,
    line: usize,
    column: usize,
}

enum Item {
    Text(String),
    Tag(Tag),
}

/// Parse template source into a node tree
pub fn parse(source: &str) -> Result<Vec<Node>, TemplateParseError> {
    let pairs = TemplateParser::parse(Rule::template, source)?;

    let mut items = Vec::new();
    for pair in pairs {
        if pair.as_rule() != Rule::template {
            continue;
        }
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::text => items.push(Item::Text(inner.as_str().to_string())),
                Rule::action => items.push(Item::Tag(parse_action(inner)?)),
                _ => {}
            }
        }
    }

    apply_trim_markers(&mut items);
    build_tree(items)
}

fn parse_action(pair: Pair<'_, Rule>) -> Result<Tag, TemplateParseError> {
    let (line, column) = pair.as_span().start_pos().line_col();
    let source = pair.as_str().to_string();
    let mut trim_left = false;
    let mut trim_right = false;
    let mut directive = None;

    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::open => trim_left = inner.into_inner().next().is_some(),
            Rule::close => trim_right = inner.into_inner().next().is_some(),
            Rule::if_tag => directive = Some(Directive::If(parse_child_expr(inner)?)),
            Rule::else_tag => directive = Some(Directive::Else),
            Rule::end_tag => directive = Some(Directive::End),
            Rule::for_tag => directive = Some(parse_for(inner)?),
            Rule::output_tag => directive = Some(Directive::Output(parse_child_expr(inner)?)),
            _ => {}
        }
    }

    let directive =
        directive.ok_or_else(|| TemplateParseError::at(&pair, "action has no directive"))?;
    Ok(Tag {
        directive,
        source,
        trim_left,
        trim_right,
        line,
        column,
    })
}

fn parse_for(pair: Pair<'_, Rule>) -> Result<Directive, TemplateParseError> {
    let mut vars = Vec::new();
    let mut iterable = None;
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::variable => vars.push(variable_name(&inner)),
            Rule::expr => iterable = Some(parse_expr(inner)?),
            _ => {}
        }
    }

    let iterable =
        iterable.ok_or_else(|| TemplateParseError::at(&pair, "for loop has no iterable"))?;
    let mut vars = vars.into_iter();
    match (vars.next(), vars.next()) {
        (Some(value_var), None) => Ok(Directive::For {
            key_var: None,
            value_var,
            iterable,
        }),
        (Some(key_var), Some(value_var)) => Ok(Directive::For {
            key_var: Some(key_var),
            value_var,
            iterable,
        }),
        _ => Err(TemplateParseError::at(&pair, "for loop has no variable")),
    }
}

fn parse_child_expr(pair: Pair<'_, Rule>) -> Result<Expr, TemplateParseError> {
    let expr = pair
        .clone()
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| TemplateParseError::at(&pair, "expected an expression"))?;
    parse_expr(expr)
}

fn parse_expr(pair: Pair<'_, Rule>) -> Result<Expr, TemplateParseError> {
    let inner = pair
        .clone()
        .into_inner()
        .next()
        .ok_or_else(|| TemplateParseError::at(&pair, "empty expression"))?;

    match inner.as_rule() {
        Rule::call => {
            let source = inner.as_str().to_string();
            let mut parts = inner.into_inner();
            let name = parts
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            let args = parts.map(parse_expr).collect::<Result<Vec<_>, _>>()?;
            Ok(Expr::Call { name, args, source })
        }
        Rule::string => {
            let raw = inner.into_inner().next().map_or("", |p| p.as_str());
            Ok(Expr::Literal(Value::String(unescape(raw))))
        }
        Rule::float => inner
            .as_str()
            .parse::<f64>()
            .map(|f| Expr::Literal(Value::Float(f)))
            .map_err(|e| TemplateParseError::at(&inner, format!("invalid number: {}", e))),
        Rule::int => inner
            .as_str()
            .parse::<i64>()
            .map(|n| Expr::Literal(Value::Int(n)))
            .map_err(|e| TemplateParseError::at(&inner, format!("invalid integer: {}", e))),
        Rule::boolean => Ok(Expr::Literal(Value::Bool(inner.as_str() == "true"))),
        Rule::nil => Ok(Expr::Literal(Value::Null)),
        Rule::variable => Ok(Expr::Variable(variable_name(&inner))),
        Rule::lookup => Ok(Expr::Lookup(inner.as_str().to_string())),
        Rule::root => Ok(Expr::Root),
        rule => Err(TemplateParseError::at(
            &inner,
            format!("unexpected {:?} in expression", rule),
        )),
    }
}

fn variable_name(pair: &Pair<'_, Rule>) -> String {
    pair.as_str().trim_start_matches('$').to_string()
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// `{{-` trims trailing whitespace of the preceding text, `-}}` leading
/// whitespace of the following text.
fn apply_trim_markers(items: &mut [Item]) {
    for i in 0..items.len() {
        let (trim_left, trim_right) = match &items[i] {
            Item::Tag(tag) => (tag.trim_left, tag.trim_right),
            Item::Text(_) => continue,
        };
        if trim_left
            && i > 0
            && let Item::Text(text) = &mut items[i - 1]
        {
            text.truncate(text.trim_end().len());
        }
        if trim_right
            && let Some(Item::Text(text)) = items.get_mut(i + 1)
        {
            *text = text.trim_start().to_string();
        }
    }
}

enum BlockKind {
    If {
        cond: Expr,
    },
    For {
        key_var: Option<String>,
        value_var: String,
        iterable: Expr,
    },
}

struct OpenBlock {
    kind: BlockKind,
    source: String,
    nodes: Vec<Node>,
    else_nodes: Option<Vec<Node>>,
    line: usize,
    column: usize,
}

impl OpenBlock {
    fn target(&mut self) -> &mut Vec<Node> {
        match &mut self.else_nodes {
            Some(nodes) => nodes,
            None => &mut self.nodes,
        }
    }

    fn close(self) -> Node {
        match self.kind {
            BlockKind::If { cond } => Node::If {
                cond,
                source: self.source,
                then_branch: self.nodes,
                else_branch: self.else_nodes.unwrap_or_default(),
            },
            BlockKind::For {
                key_var,
                value_var,
                iterable,
            } => Node::For {
                key_var,
                value_var,
                iterable,
                source: self.source,
                body: self.nodes,
            },
        }
    }
}

fn target<'a>(root: &'a mut Vec<Node>, open: &'a mut [OpenBlock]) -> &'a mut Vec<Node> {
    match open.last_mut() {
        Some(block) => block.target(),
        None => root,
    }
}

fn build_tree(items: Vec<Item>) -> Result<Vec<Node>, TemplateParseError> {
    let mut root = Vec::new();
    let mut open: Vec<OpenBlock> = Vec::new();

    for item in items {
        let tag = match item {
            Item::Text(text) => {
                if !text.is_empty() {
                    target(&mut root, &mut open).push(Node::Text(text));
                }
                continue;
            }
            Item::Tag(tag) => tag,
        };

        let (line, column) = (tag.line, tag.column);
        let misplaced = |what: &str| TemplateParseError {
            message: format!("unexpected {} without matching opening action", what),
            line,
            column,
        };

        match tag.directive {
            Directive::Output(expr) => {
                target(&mut root, &mut open).push(Node::Output {
                    expr,
                    source: tag.source,
                });
            }
            Directive::If(cond) => open.push(OpenBlock {
                kind: BlockKind::If { cond },
                source: tag.source,
                nodes: Vec::new(),
                else_nodes: None,
                line: tag.line,
                column: tag.column,
            }),
            Directive::For {
                key_var,
                value_var,
                iterable,
            } => open.push(OpenBlock {
                kind: BlockKind::For {
                    key_var,
                    value_var,
                    iterable,
                },
                source: tag.source,
                nodes: Vec::new(),
                else_nodes: None,
                line: tag.line,
                column: tag.column,
            }),
            Directive::Else => match open.last_mut() {
                Some(block)
                    if matches!(block.kind, BlockKind::If { .. })
                        && block.else_nodes.is_none() =>
                {
                    block.else_nodes = Some(Vec::new());
                }
                _ => return Err(misplaced("else")),
            },
            Directive::End => {
                let block = open.pop().ok_or_else(|| misplaced("end"))?;
                let node = block.close();
                target(&mut root, &mut open).push(node);
            }
        }
    }

    if let Some(block) = open.pop() {
        return Err(TemplateParseError {
            message: format!("unclosed action {}", block.source),
            line: block.line,
            column: block.column,
        });
    }

    Ok(root)
}
