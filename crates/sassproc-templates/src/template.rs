/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Parsed templates and their evaluation.

use std::collections::HashMap;

use crate::ast::{PathExpr, TemplateNode, walk};
use crate::context::RenderContext;
use crate::engine::Engine;
use crate::environment::{Environment, MAX_DEPTH};
use crate::error::{TemplateError, TemplateResult};
use crate::parser;
use crate::tag::SassSrcTag;

/// A parsed template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub engine: Engine,
    pub nodes: Vec<TemplateNode>,
}

/// Block overrides collected from a child chain: block name to the defining
/// template and its body. The child-most definition wins.
type BlockOverrides = HashMap<String, (String, Vec<TemplateNode>)>;

impl Template {
    pub fn parse(engine: Engine, name: &str, source: &str) -> TemplateResult<Self> {
        Ok(Self {
            name: name.to_string(),
            engine,
            nodes: parser::parse(engine, name, source)?,
        })
    }

    /// The parent named by a top-level `extends`, if any.
    pub fn extends(&self) -> Option<&PathExpr> {
        self.extends_with_line().map(|(parent, _)| parent)
    }

    fn extends_with_line(&self) -> Option<(&PathExpr, usize)> {
        self.nodes.iter().find_map(|node| match node {
            TemplateNode::Extends { parent, line } => Some((parent, *line)),
            _ => None,
        })
    }

    /// Templates pulled in by `include`, anywhere in the tree.
    pub fn includes(&self) -> Vec<&PathExpr> {
        let mut found = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let TemplateNode::Include { name, .. } = node {
                found.push(name);
            }
        });
        found
    }

    /// Every `sass_src` occurrence, in document order.
    pub fn sass_references(&self) -> Vec<&SassSrcTag> {
        let mut found = Vec::new();
        walk(&self.nodes, &mut |node| {
            if let TemplateNode::SassSrc(tag) = node {
                found.push(tag);
            }
        });
        found
    }

    pub fn render(&self, ctx: &RenderContext, env: &Environment) -> TemplateResult<String> {
        self.render_at_depth(ctx, env, 0)
    }

    pub(crate) fn render_at_depth(
        &self,
        ctx: &RenderContext,
        env: &Environment,
        depth: usize,
    ) -> TemplateResult<String> {
        let mut overrides = BlockOverrides::new();
        let mut depth = depth;
        let mut current = self.clone();

        while let Some((parent, line)) = current.extends_with_line() {
            collect_blocks(&current, &mut overrides);
            let parent_name = resolve_target(&current.name, line, parent, ctx, "extends")?;
            depth += 1;
            if depth > MAX_DEPTH {
                return Err(TemplateError::RecursiveTemplate {
                    name: parent_name,
                    max_depth: MAX_DEPTH,
                });
            }
            current = env.get_template(&parent_name)?;
        }

        let renderer = Renderer {
            env,
            ctx,
            overrides: &overrides,
            depth,
        };
        let mut out = String::new();
        renderer.render_nodes(&current.name, &current.nodes, &mut out)?;
        Ok(out)
    }
}

fn collect_blocks(template: &Template, overrides: &mut BlockOverrides) {
    walk(&template.nodes, &mut |node| {
        if let TemplateNode::Block { name, body, .. } = node {
            overrides
                .entry(name.clone())
                .or_insert_with(|| (template.name.clone(), body.clone()));
        }
    });
}

fn resolve_target(
    template: &str,
    line: usize,
    expr: &PathExpr,
    ctx: &RenderContext,
    statement: &str,
) -> TemplateResult<String> {
    expr.resolve(ctx).ok_or_else(|| {
        TemplateError::syntax(
            template,
            line,
            format!("'{}' target {:?} did not resolve to a template name", statement, expr),
        )
    })
}

struct Renderer<'a> {
    env: &'a Environment,
    ctx: &'a RenderContext,
    overrides: &'a BlockOverrides,
    depth: usize,
}

impl Renderer<'_> {
    fn render_nodes(
        &self,
        template: &str,
        nodes: &[TemplateNode],
        out: &mut String,
    ) -> TemplateResult<()> {
        for node in nodes {
            match node {
                TemplateNode::Text(text) => out.push_str(text),
                TemplateNode::Output { expr, .. } => match expr {
                    PathExpr::Literal(s) => out.push_str(s),
                    PathExpr::Variable(path) => {
                        let path: Vec<&str> = path.iter().map(String::as_str).collect();
                        if let Some(value) = self.ctx.get_path(&path) {
                            out.push_str(&value.render());
                        }
                    }
                },
                TemplateNode::SassSrc(tag) => {
                    out.push_str(&tag.render(template, self.ctx, self.env.processor())?);
                }
                TemplateNode::Block { name, body, .. } => match self.overrides.get(name) {
                    Some((owner, body)) => self.render_nodes(owner, body, out)?,
                    None => self.render_nodes(template, body, out)?,
                },
                TemplateNode::Include { name, line } => {
                    let included = resolve_target(template, *line, name, self.ctx, "include")?;
                    if self.depth + 1 > MAX_DEPTH {
                        return Err(TemplateError::RecursiveTemplate {
                            name: included,
                            max_depth: MAX_DEPTH,
                        });
                    }
                    let child = self.env.get_template(&included)?;
                    out.push_str(&child.render_at_depth(self.ctx, self.env, self.depth + 1)?);
                }
                TemplateNode::If {
                    condition,
                    then_branch,
                    else_branch,
                    ..
                } => {
                    let branch = if condition.evaluate(self.ctx) {
                        then_branch
                    } else {
                        else_branch
                    };
                    self.render_nodes(template, branch, out)?;
                }
                TemplateNode::Extends { .. } | TemplateNode::Load { .. } => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tree_queries() {
        let template = Template::parse(
            Engine::Expressions,
            "page.html",
            "{% extends 'base.html' %}{% block head %}{{ sass_src('a.scss') }}\
             {% if dark %}{% include 'dark.html' %}{{ sass_src(theme) }}{% endif %}{% endblock %}",
        )
        .unwrap();

        assert_eq!(
            template.extends(),
            Some(&PathExpr::Literal("base.html".to_string()))
        );
        assert_eq!(
            template.includes(),
            vec![&PathExpr::Literal("dark.html".to_string())]
        );
        let paths: Vec<&PathExpr> = template.sass_references().into_iter().map(|t| &t.path).collect();
        assert_eq!(
            paths,
            vec![
                &PathExpr::Literal("a.scss".to_string()),
                &PathExpr::Variable(vec!["theme".to_string()])
            ]
        );
    }
}
