/*
 * sources.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source scan: stylesheet paths passed to the trigger function in Rust code.
//!
//! Finds calls such as `sass_processor("app/css/main.scss")`,
//! `assets::sass_processor(MAIN_CSS)` or `ctx.sass_processor("x.scss")`,
//! where the first argument is a string literal or a `const`/`static`
//! string declared in the same file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use proc_macro2::Span;
use sassproc_core::paths::is_sass_path;
use sassproc_runtime::SystemRuntime;
use syn::visit::Visit;
use syn::{Expr, ExprCall, ExprMethodCall, ImplItemConst, ItemConst, ItemStatic, Lit};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::reference::{BatchFailure, Reference};

/// Result of scanning a set of source directories.
#[derive(Debug, Default)]
pub struct SourceScan {
    pub files: usize,
    pub references: Vec<Reference>,
    pub failures: Vec<BatchFailure>,
}

/// Scan every `.rs` file under `dirs` for calls to `trigger`.
///
/// Hidden directories and `target` are skipped. Files that cannot be read
/// or parsed are logged and recorded.
pub fn scan_sources(runtime: &dyn SystemRuntime, dirs: &[PathBuf], trigger: &str) -> SourceScan {
    let mut scan = SourceScan::default();
    for dir in dirs {
        let files = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "rs"));

        for entry in files {
            scan.files += 1;
            let path = entry.path();
            let result = runtime
                .file_read_string(path)
                .map_err(|e| e.to_string())
                .and_then(|content| scan_source(path, &content, trigger).map_err(|e| e.to_string()));
            match result {
                Ok(found) => scan.references.extend(found),
                Err(message) => {
                    warn!(file = %path.display(), error = %message, "Skipping source file");
                    scan.failures.push(BatchFailure {
                        origin: path.display().to_string(),
                        message,
                    });
                }
            }
        }
    }
    debug!(
        files = scan.files,
        references = scan.references.len(),
        "Source scan finished"
    );
    scan
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "target")
}

/// Find stylesheet references in one Rust source file.
pub fn scan_source(path: &Path, content: &str, trigger: &str) -> syn::Result<Vec<Reference>> {
    let file = syn::parse_file(content)?;

    let mut constants = ConstantCollector::default();
    constants.visit_file(&file);

    let mut calls = CallVisitor {
        trigger,
        origin: path.display().to_string(),
        constants: &constants.values,
        references: Vec::new(),
    };
    calls.visit_file(&file);
    Ok(calls.references)
}

/// Collects `const`/`static` items initialised with a string literal.
#[derive(Default)]
struct ConstantCollector {
    values: HashMap<String, String>,
}

impl ConstantCollector {
    fn record(&mut self, name: String, expr: &Expr) {
        if let Some(value) = string_literal(expr) {
            self.values.insert(name, value);
        }
    }
}

impl<'ast> Visit<'ast> for ConstantCollector {
    fn visit_item_const(&mut self, item: &'ast ItemConst) {
        self.record(item.ident.to_string(), &item.expr);
        syn::visit::visit_item_const(self, item);
    }

    fn visit_item_static(&mut self, item: &'ast ItemStatic) {
        self.record(item.ident.to_string(), &item.expr);
        syn::visit::visit_item_static(self, item);
    }

    fn visit_impl_item_const(&mut self, item: &'ast ImplItemConst) {
        self.record(item.ident.to_string(), &item.expr);
        syn::visit::visit_impl_item_const(self, item);
    }
}

/// `"text"` or `&"text"`.
fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::Reference(r) => string_literal(&r.expr),
        Expr::Paren(p) => string_literal(&p.expr),
        Expr::Group(g) => string_literal(&g.expr),
        _ => None,
    }
}

struct CallVisitor<'a> {
    trigger: &'a str,
    origin: String,
    constants: &'a HashMap<String, String>,
    references: Vec<Reference>,
}

impl CallVisitor<'_> {
    /// Value of the first argument: a literal, or a constant named by a
    /// path whose last segment is declared in this file.
    fn argument_value(&self, arg: &Expr) -> Option<String> {
        if let Some(value) = string_literal(arg) {
            return Some(value);
        }
        let path = match arg {
            Expr::Path(p) => &p.path,
            Expr::Reference(r) => match r.expr.as_ref() {
                Expr::Path(p) => &p.path,
                _ => return None,
            },
            _ => return None,
        };
        let name = path.segments.last()?.ident.to_string();
        self.constants.get(&name).cloned()
    }

    fn record<'e>(&mut self, mut args: impl Iterator<Item = &'e Expr>, span: Span) {
        let Some(first) = args.next() else {
            return;
        };
        match self.argument_value(first) {
            Some(path) if is_sass_path(&path) => self.references.push(Reference {
                path,
                origin: self.origin.clone(),
                line: span.start().line,
            }),
            Some(_) => {}
            None => debug!(
                file = %self.origin,
                line = span.start().line,
                "Ignoring call with a non-constant argument"
            ),
        }
    }
}

impl<'ast> Visit<'ast> for CallVisitor<'_> {
    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if let Expr::Path(func) = call.func.as_ref()
            && let Some(segment) = func.path.segments.last()
            && segment.ident == self.trigger
        {
            self.record(call.args.iter(), segment.ident.span());
        }
        syn::visit::visit_expr_call(self, call);
    }

    fn visit_expr_method_call(&mut self, call: &'ast ExprMethodCall) {
        if call.method == self.trigger {
            self.record(call.args.iter(), call.method.span());
        }
        syn::visit::visit_expr_method_call(self, call);
    }
}
