//! sassproc-templates: stylesheet references in rendered templates.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Two small template languages share one node tree:
//!
//! - the tag language, where a stylesheet is referenced with
//!   `{% load sass_tags %}` and `{% sass_src "app/css/main.scss" %}`
//! - the expression language, where it is `{{ sass_src("app/css/main.scss") }}`
//!
//! At render time every `sass_src` is handed to the
//! [`SassProcessor`](sassproc_core::SassProcessor), which compiles the
//! stylesheet when needed and returns the URL written into the output. A
//! stylesheet that cannot be located becomes a [`TemplateError::Syntax`]
//! naming the template and line.
//!
//! The parsed tree is also what the offline driver walks to discover every
//! stylesheet a project references.

pub mod ast;
pub mod context;
pub mod engine;
pub mod environment;
pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod tag;
pub mod template;

pub use ast::{Condition, PathExpr, TemplateNode, walk};
pub use context::{RenderContext, TemplateValue};
pub use engine::Engine;
pub use environment::{Environment, MAX_DEPTH};
pub use error::{TemplateError, TemplateResult};
pub use loader::{LoadedTemplate, TemplateLoader};
pub use tag::{SASS_SRC, SASS_TAG_LIBRARY, SassSrcTag};
pub use template::Template;
