/*
 * functions.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host functions callable from stylesheets.
 */

//! Custom function table.
//!
//! Stylesheets may call host functions such as `get-setting(primary-color)`.
//! grass has no callback interface, so calls are resolved while each file is
//! read: a call whose arguments are all literals is replaced by the rendered
//! return value before grass parses the file. Calls with dynamic arguments
//! (`$var`, nested calls, interpolation) are left untouched, as is anything
//! inside a comment or a quoted string.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use sassproc_runtime::SourcePreprocessor;
use tracing::debug;

use crate::config::Settings;
use crate::error::{ProcessorError, Result};
use crate::lexical::{in_spans, inert_spans};

/// Name of the builtin setting accessor.
pub const GET_SETTING: &str = "get-setting";

/// Value returned from a host function, rendered as a Sass literal.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionValue {
    /// Unquoted identifier or raw CSS token (`red`, `#ff0000`).
    String(String),
    /// Quoted string.
    Quoted(String),
    Number { value: f64, unit: String },
    Bool(bool),
    Null,
    List(Vec<FunctionValue>),
}

impl FunctionValue {
    pub fn number(value: f64) -> Self {
        FunctionValue::Number {
            value,
            unit: String::new(),
        }
    }

    /// Render as Sass source text.
    pub fn to_sass(&self) -> String {
        match self {
            FunctionValue::String(s) => s.clone(),
            FunctionValue::Quoted(s) => {
                format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
            FunctionValue::Number { value, unit } => format!("{}{}", format_number(*value), unit),
            FunctionValue::Bool(b) => b.to_string(),
            FunctionValue::Null => "null".to_string(),
            FunctionValue::List(items) => {
                if items.is_empty() {
                    "()".to_string()
                } else {
                    let inner: Vec<_> = items.iter().map(|v| v.to_sass()).collect();
                    format!("({})", inner.join(", "))
                }
            }
        }
    }

    /// Convert a configuration value.
    ///
    /// Strings that look like a number with a unit (`12px`, `1.5em`) become
    /// numbers so they can take part in arithmetic.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FunctionValue::Null,
            serde_json::Value::Bool(b) => FunctionValue::Bool(*b),
            serde_json::Value::Number(n) => FunctionValue::number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => parse_dimension(s)
                .unwrap_or_else(|| FunctionValue::String(s.clone())),
            serde_json::Value::Array(items) => {
                FunctionValue::List(items.iter().map(FunctionValue::from_json).collect())
            }
            serde_json::Value::Object(_) => FunctionValue::Quoted(value.to_string()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn parse_dimension(s: &str) -> Option<FunctionValue> {
    let split = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == '-'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    if number.is_empty() || !unit.chars().all(|c| c.is_ascii_alphabetic() || c == '%') {
        return None;
    }
    number.parse::<f64>().ok().map(|value| FunctionValue::Number {
        value,
        unit: unit.to_string(),
    })
}

/// A host callable. Receives the literal argument texts (quotes removed).
pub type HostFunction =
    Arc<dyn Fn(&[String]) -> std::result::Result<FunctionValue, String> + Send + Sync>;

/// Host capability that turns a configured callable id into a function.
pub trait CallableLoader: Send + Sync {
    fn load(&self, id: &str) -> Option<HostFunction>;
}

/// A [`CallableLoader`] over a fixed registry.
#[derive(Default, Clone)]
pub struct RegistryLoader {
    entries: BTreeMap<String, HostFunction>,
}

impl RegistryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        id: impl Into<String>,
        function: impl Fn(&[String]) -> std::result::Result<FunctionValue, String>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.entries.insert(id.into(), Arc::new(function));
        self
    }
}

impl CallableLoader for RegistryLoader {
    fn load(&self, id: &str) -> Option<HostFunction> {
        self.entries.get(id).cloned()
    }
}

/// Registered functions, keyed by compiler-visible name.
#[derive(Clone, Default)]
pub struct FunctionTable {
    functions: BTreeMap<String, HostFunction>,
    call_site: Option<Regex>,
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTable")
            .field("functions", &self.names())
            .finish()
    }
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builtins plus every `functions:` entry resolved through `loader`.
    pub fn from_settings(settings: &Settings, loader: Option<&dyn CallableLoader>) -> Result<Self> {
        let mut table = Self::new();
        table.register(GET_SETTING, get_setting(settings));

        for (name, id) in &settings.functions {
            let loader = loader.ok_or_else(|| {
                ProcessorError::Config(format!(
                    "Function {} refers to {}, but no callable loader is available",
                    name, id
                ))
            })?;
            let function = loader.load(id).ok_or_else(|| {
                ProcessorError::Config(format!("Cannot load callable {} for function {}", id, name))
            })?;
            table.register(name.clone(), function);
        }
        Ok(table)
    }

    pub fn register(&mut self, name: impl Into<String>, function: HostFunction) {
        self.functions.insert(name.into(), function);
        self.call_site = build_call_site(self.functions.keys());
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn call(&self, name: &str, args: &[String]) -> std::result::Result<FunctionValue, String> {
        match self.functions.get(name) {
            Some(function) => function(args),
            None => Err(format!("Undefined function {}", name)),
        }
    }

    /// Replace every literal-argument call site in `source`.
    pub fn rewrite(&self, source: &str) -> std::result::Result<String, String> {
        let Some(call_site) = &self.call_site else {
            return Ok(source.to_string());
        };

        let inert = inert_spans(source, true);
        let mut out = String::with_capacity(source.len());
        let mut cursor = 0;
        for caps in call_site.captures_iter(source) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            if whole.start() < cursor || in_spans(&inert, name.start()) {
                continue;
            }
            if source[..name.start()].trim_end().ends_with("@function") {
                continue;
            }
            let args_start = whole.end();
            let Some(args_len) = find_closing_paren(&source[args_start..]) else {
                continue;
            };
            let raw_args = &source[args_start..args_start + args_len];
            let Some(args) = literal_args(raw_args) else {
                debug!(function = name.as_str(), args = raw_args, "Dynamic arguments; call left to the compiler");
                continue;
            };

            let value = self
                .call(name.as_str(), &args)
                .map_err(|e| format!("{}({}): {}", name.as_str(), raw_args, e))?;
            out.push_str(&source[cursor..name.start()]);
            out.push_str(&value.to_sass());
            cursor = args_start + args_len + 1;
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }
}

impl SourcePreprocessor for FunctionTable {
    fn preprocess(&self, path: &Path, source: Vec<u8>) -> io::Result<Vec<u8>> {
        if self.call_site.is_none() {
            return Ok(source);
        }
        let text = String::from_utf8(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let rewritten = self.rewrite(&text).map_err(|message| {
            io::Error::other(format!("{}: {}", path.display(), message))
        })?;
        Ok(rewritten.into_bytes())
    }
}

fn build_call_site<'a>(names: impl Iterator<Item = &'a String>) -> Option<Regex> {
    let alternatives: Vec<_> = names.map(|n| regex::escape(n)).collect();
    if alternatives.is_empty() {
        return None;
    }
    let pattern = format!(
        r"(?:^|[^A-Za-z0-9_$@.\-])(?P<name>{})\(",
        alternatives.join("|")
    );
    Regex::new(&pattern).ok()
}

/// Length of the argument text up to the matching `)`.
fn find_closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            ';' | '{' | '}' => return None,
            _ => {}
        }
    }
    None
}

/// Split literal arguments; `None` when any argument is dynamic.
fn literal_args(raw: &str) -> Option<Vec<String>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => {
                quote = None;
                current.push(c);
            }
            Some(_) if c == '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    current.push(c);
                }
                ',' => args.push(std::mem::take(&mut current)),
                '$' | '(' | ')' => return None,
                _ => current.push(c),
            },
        }
    }
    args.push(current);

    args.into_iter().map(|arg| literal_value(arg.trim())).collect()
}

fn literal_value(arg: &str) -> Option<String> {
    if arg.is_empty() || arg.contains("#{") {
        return None;
    }
    for q in ['"', '\''] {
        if let Some(inner) = arg.strip_prefix(q).and_then(|a| a.strip_suffix(q)) {
            return Some(inner.replace(&format!("\\{}", q), &q.to_string()).replace("\\\\", "\\"));
        }
    }
    if arg.contains(char::is_whitespace) {
        return None;
    }
    Some(arg.to_string())
}

/// Builtin `get-setting(key)`.
///
/// Looks in the free-form `settings:` map first, then falls back to a few
/// processor settings.
fn get_setting(settings: &Settings) -> HostFunction {
    let mut values: BTreeMap<String, FunctionValue> = settings
        .settings
        .iter()
        .map(|(k, v)| (k.clone(), FunctionValue::from_json(v)))
        .collect();
    values
        .entry("static-url".to_string())
        .or_insert_with(|| FunctionValue::Quoted(settings.static_url.clone()));
    values
        .entry("debug".to_string())
        .or_insert(FunctionValue::Bool(settings.debug));

    Arc::new(move |args: &[String]| {
        let key = match args {
            [key] => key,
            _ => return Err(format!("expected 1 argument, got {}", args.len())),
        };
        values
            .get(key)
            .cloned()
            .ok_or_else(|| format!("Setting {} is not defined", key))
    })
}
