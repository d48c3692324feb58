/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The two supported template languages.

use std::fmt;
use std::str::FromStr;

/// Template language a template is written in.
///
/// - `Tags`: statement-oriented. Stylesheets are referenced with
///   `{% sass_src "path" %}` after `{% load sass_tags %}`.
/// - `Expressions`: expression-oriented. Stylesheets are referenced with
///   `{{ sass_src("path") }}`; `{%- ... -%}` trims surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Tags,
    Expressions,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::Tags, Engine::Expressions];

    pub fn name(&self) -> &'static str {
        match self {
            Engine::Tags => "tags",
            Engine::Expressions => "expressions",
        }
    }

    /// Whether `{%-`/`-%}` whitespace markers are recognised.
    pub(crate) fn trim_markers(&self) -> bool {
        matches!(self, Engine::Expressions)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tags" => Ok(Engine::Tags),
            "expressions" => Ok(Engine::Expressions),
            _ => Err(format!(
                "Unknown template engine '{}' (expected 'tags' or 'expressions')",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_names_roundtrip() {
        for engine in Engine::ALL {
            assert_eq!(engine.name().parse::<Engine>(), Ok(engine));
        }
        assert!("jinja".parse::<Engine>().is_err());
    }
}
