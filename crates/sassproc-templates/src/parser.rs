/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Token stream to node tree.

use std::collections::HashSet;

use crate::ast::{Condition, PathExpr, TemplateNode, parse_variable_path};
use crate::engine::Engine;
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Token, TokenKind, split_words, tokenize};
use crate::tag::{SASS_SRC, SASS_TAG_LIBRARY, SassSrcTag};

/// Parse `source` written in `engine`'s language.
pub fn parse(engine: Engine, template: &str, source: &str) -> TemplateResult<Vec<TemplateNode>> {
    let tokens = tokenize(template, source, engine.trim_markers())?;
    let mut parser = Parser {
        engine,
        template,
        tokens,
        pos: 0,
        loaded: HashSet::new(),
        seen_extends: false,
    };
    let (nodes, end) = parser.parse_until(&[])?;
    debug_assert!(end.is_none());
    Ok(nodes)
}

/// A closing statement that ended a nested parse.
struct End {
    name: String,
    words: Vec<String>,
    line: usize,
}

struct Parser<'a> {
    engine: Engine,
    template: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    loaded: HashSet<String>,
    seen_extends: bool,
}

impl Parser<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::syntax(self.template, line, message)
    }

    fn parse_until(&mut self, until: &[&str]) -> TemplateResult<(Vec<TemplateNode>, Option<End>)> {
        let mut nodes = Vec::new();
        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();
            self.pos += 1;
            match token.kind {
                TokenKind::Text => nodes.push(TemplateNode::Text(token.content)),
                TokenKind::Comment => {}
                TokenKind::Expression => nodes.push(self.parse_expression(&token)?),
                TokenKind::Statement => {
                    let words = split_words(&token.content);
                    let Some(name) = words.first().cloned() else {
                        return Err(self.error(token.line, "Empty statement"));
                    };
                    if until.contains(&name.as_str()) {
                        return Ok((
                            nodes,
                            Some(End {
                                name,
                                words,
                                line: token.line,
                            }),
                        ));
                    }
                    nodes.push(self.parse_statement(&name, &words, token.line)?);
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_statement(
        &mut self,
        name: &str,
        words: &[String],
        line: usize,
    ) -> TemplateResult<TemplateNode> {
        let node = match name {
            "block" => {
                let [_, block_name] = words else {
                    return Err(self.error(line, "'block' takes one argument"));
                };
                let (body, end) = self.parse_until(&["endblock"])?;
                let end = end.ok_or_else(|| self.error(line, "Unclosed tag 'block'"))?;
                if let Some(end_name) = end.words.get(1)
                    && end_name != block_name
                {
                    return Err(self.error(
                        end.line,
                        format!("Expected 'endblock {}', found 'endblock {}'", block_name, end_name),
                    ));
                }
                TemplateNode::Block {
                    name: block_name.clone(),
                    body,
                    line,
                }
            }
            "if" => {
                let condition = match &words[1..] {
                    [var] => self.condition(false, var, line)?,
                    [not, var] if not == "not" => self.condition(true, var, line)?,
                    _ => return Err(self.error(line, "'if' expects a variable or 'not' variable")),
                };
                let (then_branch, end) = self.parse_until(&["else", "endif"])?;
                let end = end.ok_or_else(|| self.error(line, "Unclosed tag 'if'"))?;
                let else_branch = if end.name == "else" {
                    let (else_branch, end) = self.parse_until(&["endif"])?;
                    end.ok_or_else(|| self.error(line, "Unclosed tag 'if'"))?;
                    else_branch
                } else {
                    Vec::new()
                };
                TemplateNode::If {
                    condition,
                    then_branch,
                    else_branch,
                    line,
                }
            }
            "extends" => {
                if self.seen_extends {
                    return Err(self.error(line, "'extends' may appear only once"));
                }
                self.seen_extends = true;
                TemplateNode::Extends {
                    parent: self.single_path_arg(name, words, line)?,
                    line,
                }
            }
            "include" => TemplateNode::Include {
                name: self.single_path_arg(name, words, line)?,
                line,
            },
            "load" if self.engine == Engine::Tags => {
                // `load a b` or `load tag from library`
                let libraries: Vec<String> = match words.iter().position(|w| w == "from") {
                    Some(from) => words[from + 1..].to_vec(),
                    None => words[1..].to_vec(),
                };
                if libraries.is_empty() {
                    return Err(self.error(line, "'load' expects at least one library"));
                }
                self.loaded.extend(libraries.iter().cloned());
                TemplateNode::Load { libraries, line }
            }
            SASS_SRC if self.engine == Engine::Tags => {
                if !self.loaded.contains(SASS_TAG_LIBRARY) {
                    return Err(self.error(
                        line,
                        format!(
                            "Invalid statement '{}'. Did you forget to '{{% load {} %}}'?",
                            SASS_SRC, SASS_TAG_LIBRARY
                        ),
                    ));
                }
                TemplateNode::SassSrc(SassSrcTag::new(
                    self.single_path_arg(name, words, line)?,
                    line,
                ))
            }
            "endblock" | "endif" | "else" => {
                return Err(self.error(line, format!("Unexpected '{}'", name)));
            }
            other => {
                return Err(self.error(line, format!("Invalid statement '{}'", other)));
            }
        };
        Ok(node)
    }

    fn condition(&self, negated: bool, var: &str, line: usize) -> TemplateResult<Condition> {
        let path = parse_variable_path(var)
            .ok_or_else(|| self.error(line, format!("Invalid condition '{}'", var)))?;
        Ok(Condition { negated, path })
    }

    fn single_path_arg(&self, name: &str, words: &[String], line: usize) -> TemplateResult<PathExpr> {
        let [_, arg] = words else {
            return Err(self.error(line, format!("'{}' takes exactly one argument", name)));
        };
        PathExpr::parse(arg)
            .ok_or_else(|| self.error(line, format!("Invalid argument to '{}': {}", name, arg)))
    }

    fn parse_expression(&self, token: &Token) -> TemplateResult<TemplateNode> {
        let content = token.content.as_str();
        if self.engine == Engine::Expressions
            && let Some(call) = content.strip_prefix(SASS_SRC)
        {
            let call = call.trim_start();
            if let Some(arg) = call.strip_prefix('(').and_then(|c| c.strip_suffix(')')) {
                let path = PathExpr::parse(arg).ok_or_else(|| {
                    self.error(token.line, format!("Invalid argument to '{}': {}", SASS_SRC, arg.trim()))
                })?;
                return Ok(TemplateNode::SassSrc(SassSrcTag::new(path, token.line)));
            }
        }

        match PathExpr::parse(content) {
            Some(expr) => Ok(TemplateNode::Output {
                expr,
                line: token.line,
            }),
            None => Err(self.error(
                token.line,
                format!("Could not parse expression '{}'", content),
            )),
        }
    }
}
