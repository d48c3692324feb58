/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rendering templates that reference stylesheets.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sassproc_core::{SassProcessor, Settings};
use sassproc_templates::{Engine, Environment, RenderContext, TemplateError};
use tempfile::TempDir;

const MAIN_SCSS: &str = "#main { p { color: #00ff00; } }\n";

struct Site {
    temp: TempDir,
}

impl Site {
    fn new(debug: bool) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(&root.join("static/tests/css/main.scss"), MAIN_SCSS);
        write(
            &root.join("sassproc.yml"),
            &format!(
                "debug: {}\nstatic-root: out\nstaticfiles-dirs: [static]\ntemplate-dirs: [templates]\n",
                debug
            ),
        );
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn template(&self, name: &str, source: &str) -> &Self {
        write(&self.root().join("templates").join(name), source);
        self
    }

    fn environment(&self, engine: Engine) -> Environment {
        let settings = Settings::load(&self.root().join("sassproc.yml")).unwrap();
        let processor = SassProcessor::from_settings(settings).unwrap();
        Environment::from_processor(engine, Arc::new(processor))
    }

    fn out(&self, name: &str) -> PathBuf {
        self.root().join("out").join(name)
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_tag_language_compiles_and_links() {
    let site = Site::new(true);
    site.template(
        "base.html",
        "<html>{% block head %}default{% endblock %}<body>{% include \"footer.html\" %}</body></html>",
    )
    .template("footer.html", "footer")
    .template(
        "page.html",
        "{% extends \"base.html\" %}\n{% load sass_tags %}\n\
         {% block head %}<link href=\"{% sass_src \"tests/css/main.scss\" %}\">{% endblock %}",
    );

    let env = site.environment(Engine::Tags);
    let html = env.render("page.html", &RenderContext::new()).unwrap();

    assert_eq!(
        html,
        "<html><link href=\"/static/tests/css/main.css\"><body>footer</body></html>"
    );
    assert!(site.out("tests/css/main.css").is_file());
    assert!(site.out("tests/css/main.css.map").is_file());
}

#[test]
fn test_expression_language_resolves_variables() {
    let site = Site::new(true);
    site.template(
        "page.html",
        "{%- if css -%}\n  <link href=\"{{ sass_src(css) }}\">\n{%- endif -%}\n",
    );

    let env = site.environment(Engine::Expressions);
    let ctx = RenderContext::new().with("css", "tests/css/main.scss");
    let html = env.render("page.html", &ctx).unwrap();

    assert_eq!(html, "<link href=\"/static/tests/css/main.css\">");
    assert!(site.out("tests/css/main.css").is_file());

    let empty = env.render("page.html", &RenderContext::new()).unwrap();
    assert_eq!(empty, "");
}

#[test]
fn test_missing_stylesheet_names_template_and_line() {
    let site = Site::new(true);
    site.template(
        "page.html",
        "<head>\n{% load sass_tags %}\n<link href=\"{% sass_src \"tests/css/nope.scss\" %}\">",
    );

    let env = site.environment(Engine::Tags);
    let err = env.render("page.html", &RenderContext::new()).unwrap_err();
    match err {
        TemplateError::Syntax {
            template, line, message,
        } => {
            assert_eq!(template, "page.html");
            assert_eq!(line, 3);
            assert!(message.contains("tests/css/nope.scss"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_child_most_block_wins() {
    let site = Site::new(true);
    site.template("base.html", "[{% block title %}base{% endblock %}]")
        .template(
            "middle.html",
            "{% extends 'base.html' %}{% block title %}middle{% endblock %}",
        )
        .template(
            "leaf.html",
            "{% extends 'middle.html' %}{% block title %}{{ name }}{% endblock %}",
        );

    let env = site.environment(Engine::Expressions);
    let ctx = RenderContext::new().with("name", "leaf");
    assert_eq!(env.render("leaf.html", &ctx).unwrap(), "[leaf]");
    assert_eq!(env.render("middle.html", &ctx).unwrap(), "[middle]");
}

#[test]
fn test_recursive_include_is_reported() {
    let site = Site::new(true);
    site.template("loop.html", "x{% include 'loop.html' %}");

    let env = site.environment(Engine::Expressions);
    let err = env.render("loop.html", &RenderContext::new()).unwrap_err();
    assert!(matches!(err, TemplateError::RecursiveTemplate { .. }));
}

#[test]
fn test_missing_parent_template() {
    let site = Site::new(true);
    site.template("page.html", "{% extends 'gone.html' %}");

    let env = site.environment(Engine::Tags);
    let err = env.render("page.html", &RenderContext::new()).unwrap_err();
    assert!(matches!(err, TemplateError::TemplateNotFound { name } if name == "gone.html"));
}

#[test]
fn test_disabled_processor_links_without_compiling() {
    let site = Site::new(false);
    site.template("page.html", "{{ sass_src('tests/css/main.scss') }}");

    let env = site.environment(Engine::Expressions);
    let html = env.render("page.html", &RenderContext::new()).unwrap();

    assert_eq!(html, "/static/tests/css/main.css");
    assert!(!site.out("tests/css/main.css").exists());
}
