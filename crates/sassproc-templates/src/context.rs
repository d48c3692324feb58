/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value and context types.

use std::collections::HashMap;

/// A value that can be bound in a render context.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TemplateValue {
    String(String),
    Bool(bool),
    List(Vec<TemplateValue>),
    Map(HashMap<String, TemplateValue>),
    #[default]
    Null,
}

impl TemplateValue {
    /// Truthiness for `if`: empty strings, empty collections, false and null
    /// are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Bool(b) => *b,
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::List(items) => !items.is_empty(),
            TemplateValue::Map(m) => !m.is_empty(),
            TemplateValue::Null => false,
        }
    }

    /// Get a nested field by path.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            TemplateValue::Map(m) => m.get(*first).and_then(|v| v.get_path(rest)),
            TemplateValue::List(items) => first
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .and_then(|v| v.get_path(rest)),
            _ => None,
        }
    }

    /// Render this value as output text.
    pub fn render(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Bool(b) => b.to_string(),
            TemplateValue::List(items) => items
                .iter()
                .map(|v| v.render())
                .collect::<Vec<_>>()
                .join(", "),
            TemplateValue::Map(_) => String::new(),
            TemplateValue::Null => String::new(),
        }
    }

    /// The string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TemplateValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        TemplateValue::String(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        TemplateValue::String(s)
    }
}

impl From<bool> for TemplateValue {
    fn from(b: bool) -> Self {
        TemplateValue::Bool(b)
    }
}

impl From<&serde_json::Value> for TemplateValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(*b),
            serde_json::Value::Number(n) => TemplateValue::String(n.to_string()),
            serde_json::Value::String(s) => TemplateValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(map) => TemplateValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Variable bindings for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    variables: HashMap<String, TemplateValue>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TemplateValue>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.variables.get(key)
    }

    /// Look up a dotted path such as `assets.theme`.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let (first, rest) = path.split_first()?;
        self.get(first).and_then(|v| v.get_path(rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(TemplateValue::from("x").is_truthy());
        assert!(!TemplateValue::from("").is_truthy());
        assert!(!TemplateValue::Null.is_truthy());
        assert!(!TemplateValue::List(vec![]).is_truthy());
        assert!(TemplateValue::Bool(true).is_truthy());
    }

    #[test]
    fn test_nested_lookup_from_json() {
        let json = serde_json::json!({"theme": {"css": "shop/main.scss"}, "list": ["a", "b"]});
        let TemplateValue::Map(map) = TemplateValue::from(&json) else {
            panic!("expected map");
        };
        let mut ctx = RenderContext::new();
        for (k, v) in map {
            ctx.insert(k, v);
        }

        assert_eq!(
            ctx.get_path(&["theme", "css"]),
            Some(&TemplateValue::from("shop/main.scss"))
        );
        assert_eq!(ctx.get_path(&["list", "1"]), Some(&TemplateValue::from("b")));
        assert_eq!(ctx.get_path(&["theme", "missing"]), None);
        assert_eq!(ctx.get_path(&[]), None);
    }
}
