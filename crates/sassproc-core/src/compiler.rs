/*
 * compiler.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The compiler seam and its grass implementation.
 */

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sassproc_runtime::{RuntimeError, SharedRuntime, compile_file};
use tracing::debug;

use crate::config::OutputStyle;
use crate::error::{ProcessorError, Result};
use crate::functions::FunctionTable;
use crate::lexical::{in_spans, inert_spans};
use crate::sourcemap::SourceMap;

/// Everything one compilation needs.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Absolute path of the entry stylesheet.
    pub source: &'a Path,
    /// Ordered include search path.
    pub include_paths: &'a [PathBuf],
    /// Logical name of the CSS artifact. A source map is produced when set.
    pub css_name: Option<&'a str>,
    pub output_style: OutputStyle,
    pub precision: Option<u32>,
    pub functions: &'a FunctionTable,
}

/// Output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCss {
    pub css: String,
    pub source_map: Option<SourceMap>,
}

/// Turns a stylesheet into CSS.
pub trait Compiler: Send + Sync {
    /// Compile `request.source`. Stylesheet errors are reported as
    /// [`ProcessorError::Compile`].
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledCss>;
}

/// Compiler backed by grass, reading files through the runtime.
#[derive(Clone)]
pub struct GrassCompiler {
    runtime: SharedRuntime,
}

impl GrassCompiler {
    pub fn new(runtime: SharedRuntime) -> Self {
        Self { runtime }
    }
}

impl std::fmt::Debug for GrassCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrassCompiler").finish_non_exhaustive()
    }
}

impl Compiler for GrassCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledCss> {
        debug!(
            source = %request.source.display(),
            style = request.output_style.as_str(),
            "Compiling stylesheet"
        );
        let preprocessor = (!request.functions.is_empty()).then_some(request.functions);
        let output = compile_file(
            self.runtime.as_ref(),
            request.source,
            request.include_paths,
            request.output_style.is_minified(),
            preprocessor.map(|f| f as &dyn sassproc_runtime::SourcePreprocessor),
        )
        .map_err(|e| match e {
            RuntimeError::SassError(message) => ProcessorError::Compile {
                path: request.source.display().to_string(),
                message,
            },
            other => ProcessorError::Runtime(other),
        })?;

        let css = match request.precision {
            Some(digits) => apply_precision(&output.css, digits),
            None => output.css,
        };
        let source_map = request
            .css_name
            .map(|name| SourceMap::for_compilation(name, request.source, &output.loaded_files));

        Ok(CompiledCss { css, source_map })
    }
}

static DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<pre>^|[^\w.#-])(?P<sign>-?)(?P<int>\d*)\.(?P<frac>\d+)")
        .expect("decimal pattern is valid")
});

/// Round every decimal literal in `css` to at most `digits` fractional digits.
///
/// Trailing zeros are trimmed; a literal written without a leading zero
/// (`.5`) keeps that form. Comments, strings and `url(...)` are untouched.
pub fn apply_precision(css: &str, digits: u32) -> String {
    let inert = inert_spans(css, false);
    DECIMAL
        .replace_all(css, |caps: &Captures| {
            let start = caps.name("sign").map_or(0, |m| m.start());
            if in_spans(&inert, start) {
                return caps[0].to_string();
            }
            let pre = &caps["pre"];
            let sign = &caps["sign"];
            let int = &caps["int"];
            let frac = &caps["frac"];
            if frac.len() <= digits as usize {
                return caps[0].to_string();
            }

            let literal = format!("{}.{}", if int.is_empty() { "0" } else { int }, frac);
            let Ok(value) = literal.parse::<f64>() else {
                return caps[0].to_string();
            };
            let factor = 10f64.powi(digits as i32);
            let rounded = (value * factor).round() / factor;
            let mut text = format!("{:.*}", digits as usize, rounded);
            if text.contains('.') {
                text = text.trim_end_matches('0').trim_end_matches('.').to_string();
            }
            if int.is_empty()
                && let Some(stripped) = text.strip_prefix("0.")
            {
                text = format!(".{}", stripped);
            }
            let sign = if text == "0" { "" } else { sign };
            format!("{}{}{}", pre, sign, text)
        })
        .into_owned()
}
