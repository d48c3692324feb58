/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.
//!
//! Both template languages parse into the same node tree. Nodes carry the
//! 1-based line they start on for error reporting.

use crate::context::{RenderContext, TemplateValue};
use crate::tag::SassSrcTag;

/// A template-level expression naming a path: a string literal or a
/// variable looked up in the render context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    Literal(String),
    Variable(Vec<String>),
}

impl PathExpr {
    /// Parse `"text"`, `'text'` or a dotted variable name.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        for quote in ['"', '\''] {
            if let Some(inner) = text
                .strip_prefix(quote)
                .and_then(|t| t.strip_suffix(quote))
            {
                if inner.contains(quote) {
                    return None;
                }
                return Some(PathExpr::Literal(inner.to_string()));
            }
        }
        parse_variable_path(text).map(PathExpr::Variable)
    }

    /// Evaluate against `ctx`. Unbound or non-string variables give `None`.
    pub fn resolve(&self, ctx: &RenderContext) -> Option<String> {
        match self {
            PathExpr::Literal(s) => Some(s.clone()),
            PathExpr::Variable(path) => {
                let path: Vec<&str> = path.iter().map(String::as_str).collect();
                ctx.get_path(&path)
                    .and_then(TemplateValue::as_str)
                    .map(str::to_string)
            }
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            PathExpr::Literal(s) => Some(s),
            PathExpr::Variable(_) => None,
        }
    }
}

/// Parse `name` or `name.field.sub` into its segments.
pub fn parse_variable_path(text: &str) -> Option<Vec<String>> {
    let segments: Vec<String> = text.split('.').map(str::to_string).collect();
    let valid = segments.iter().enumerate().all(|(i, s)| {
        let mut chars = s.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            Some(c) if i > 0 && c.is_ascii_digit() => chars.all(|c| c.is_ascii_digit()),
            _ => false,
        }
    });
    valid.then_some(segments)
}

/// A condition in an `if` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub negated: bool,
    pub path: Vec<String>,
}

impl Condition {
    pub fn evaluate(&self, ctx: &RenderContext) -> bool {
        let path: Vec<&str> = self.path.iter().map(String::as_str).collect();
        let truthy = ctx.get_path(&path).is_some_and(TemplateValue::is_truthy);
        truthy != self.negated
    }
}

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Text(String),

    /// Output expression: `{{ value }}`
    Output { expr: PathExpr, line: usize },

    /// Stylesheet reference, compiled and replaced by its URL at render time.
    SassSrc(SassSrcTag),

    /// Overridable section: `{% block name %}...{% endblock %}`
    Block {
        name: String,
        body: Vec<TemplateNode>,
        line: usize,
    },

    /// Parent template: `{% extends "base.html" %}`
    Extends { parent: PathExpr, line: usize },

    /// Inline sub-template: `{% include "part.html" %}`
    Include { name: PathExpr, line: usize },

    /// Conditional: `{% if var %}...{% else %}...{% endif %}`
    If {
        condition: Condition,
        then_branch: Vec<TemplateNode>,
        else_branch: Vec<TemplateNode>,
        line: usize,
    },

    /// Tag library import (tag language only): `{% load sass_tags %}`
    Load { libraries: Vec<String>, line: usize },
}

impl TemplateNode {
    /// Direct children, in document order.
    pub fn children(&self) -> Vec<&TemplateNode> {
        match self {
            TemplateNode::Block { body, .. } => body.iter().collect(),
            TemplateNode::If {
                then_branch,
                else_branch,
                ..
            } => then_branch.iter().chain(else_branch.iter()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Visit every node of `nodes` depth-first, parents before children.
pub fn walk<'a>(nodes: &'a [TemplateNode], visit: &mut impl FnMut(&'a TemplateNode)) {
    for node in nodes {
        visit(node);
        for child in node.children() {
            walk(std::slice::from_ref(child), visit);
        }
    }
}
