/*
 * lexer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tokenizer shared by both template languages.
//!
//! Splits source text into literal text, `{% statement %}`,
//! `{{ expression }}` and `{# comment #}` tokens.

use crate::error::{TemplateError, TemplateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Statement,
    Expression,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Text between the delimiters, trimmed; raw text for `Text` tokens.
    pub content: String,
    /// 1-based line the token starts on.
    pub line: usize,
}

/// Tokenize `source`.
///
/// With `trim_markers`, a `-` just inside a delimiter (`{%-`, `-%}`) strips
/// the whitespace of the neighbouring text.
pub fn tokenize(template: &str, source: &str, trim_markers: bool) -> TemplateResult<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut rest = source;
    let mut line = 1;
    let mut trim_next_text = false;

    while !rest.is_empty() {
        let next = ["{%", "{{", "{#"]
            .iter()
            .filter_map(|open| rest.find(open))
            .min();

        let Some(start) = next else {
            push_text(&mut tokens, rest, line, trim_next_text);
            break;
        };

        if start > 0 {
            push_text(&mut tokens, &rest[..start], line, trim_next_text);
            line += rest[..start].matches('\n').count();
        }
        trim_next_text = false;

        let (kind, close) = match &rest[start..start + 2] {
            "{%" => (TokenKind::Statement, "%}"),
            "{{" => (TokenKind::Expression, "}}"),
            _ => (TokenKind::Comment, "#}"),
        };
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find(close) else {
            return Err(TemplateError::syntax(
                template,
                line,
                format!("Unclosed tag, expected '{}'", close),
            ));
        };

        let mut inner = &after_open[..end];
        if trim_markers && kind != TokenKind::Comment {
            if let Some(stripped) = inner.strip_prefix('-') {
                inner = stripped;
                if let Some(prev) = tokens.last_mut()
                    && prev.kind == TokenKind::Text
                {
                    let trimmed = prev.content.trim_end().to_string();
                    prev.content = trimmed;
                }
            }
            if let Some(stripped) = inner.strip_suffix('-') {
                inner = stripped;
                trim_next_text = true;
            }
        }

        tokens.push(Token {
            kind,
            content: inner.trim().to_string(),
            line,
        });
        line += after_open[..end].matches('\n').count();
        rest = &after_open[end + close.len()..];
    }

    tokens.retain(|t| t.kind != TokenKind::Text || !t.content.is_empty());
    Ok(tokens)
}

fn push_text(tokens: &mut Vec<Token>, text: &str, line: usize, trim_start: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    tokens.push(Token {
        kind: TokenKind::Text,
        content: text.to_string(),
        line,
    });
}

/// Split statement content into words, keeping quoted strings intact.
pub fn split_words(content: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in content.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tokens: &[Token]) -> Vec<(TokenKind, &str, usize)> {
        tokens
            .iter()
            .map(|t| (t.kind, t.content.as_str(), t.line))
            .collect()
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize(
            "t.html",
            "<link href=\"{% sass_src 'a.scss' %}\">\n{# note #}\n{{ title }}",
            false,
        )
        .unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Text, "<link href=\"", 1),
                (TokenKind::Statement, "sass_src 'a.scss'", 1),
                (TokenKind::Text, "\">\n", 1),
                (TokenKind::Comment, "note", 2),
                (TokenKind::Text, "\n", 2),
                (TokenKind::Expression, "title", 3),
            ]
        );
    }

    #[test]
    fn test_multiline_tag_advances_line() {
        let tokens = tokenize("t.html", "{#\n\n#}\n{{ x }}", false).unwrap();
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_unclosed_tag() {
        let err = tokenize("t.html", "a\n{% block x", false).unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_trim_markers() {
        let tokens = tokenize("t.html", "a  {%- if x -%}  b", true).unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Text, "a", 1),
                (TokenKind::Statement, "if x", 1),
                (TokenKind::Text, "b", 1),
            ]
        );
    }

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words("sass_src \"with space.scss\""),
            vec!["sass_src", "\"with space.scss\""]
        );
        assert_eq!(split_words("  load  a b "), vec!["load", "a", "b"]);
    }
}
