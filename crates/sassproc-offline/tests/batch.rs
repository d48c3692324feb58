/*
 * batch.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Batch compilation across templates and source files.
 */

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use sassproc_core::{SassProcessor, Settings};
use sassproc_offline::{BatchDriver, BatchError, BatchOptions, Destination};
use sassproc_templates::Engine;
use tempfile::TempDir;

struct Project {
    temp: TempDir,
}

impl Project {
    /// Two stylesheets referenced from templates of both languages and from
    /// Rust code, plus one dangling reference.
    fn new() -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        write(&root.join("static/site/css/main.scss"), "@import 'colors';\nbody { color: $ink; }\n");
        write(&root.join("static/site/css/_colors.scss"), "$ink: #333;\n");
        write(&root.join("static/site/css/admin.scss"), ".admin { .bar { width: 10px; } }\n");

        write(
            &root.join("templates/base.html"),
            "{% load sass_tags %}<link href=\"{% sass_src 'site/css/main.scss' %}\">",
        );
        write(
            &root.join("templates/page.html"),
            "{% extends 'base.html' %}{% load sass_tags %}{% sass_src 'site/css/gone.scss' %}",
        );
        write(
            &root.join("templates/admin.html"),
            "{{ sass_src('site/css/admin.scss') }}{{ sass_src('site/css/main.scss') }}",
        );
        write(
            &root.join("src/views.rs"),
            "const MAIN: &str = \"site/css/main.scss\";\nfn head() { sass_processor(MAIN); }\n",
        );
        write(
            &root.join("sassproc.yml"),
            "static-root: out\n\
             staticfiles-dirs: [static]\n\
             template-dirs: [templates]\n\
             source-dirs: [src]\n",
        );
        Self { temp }
    }

    fn root(&self) -> &Path {
        self.temp.path()
    }

    fn processor(&self) -> SassProcessor {
        let settings = Settings::load(&self.root().join("sassproc.yml")).unwrap();
        SassProcessor::from_settings(settings).unwrap()
    }

    fn css(&self, name: &str) -> PathBuf {
        self.root().join("static/site/css").join(name)
    }

    fn out(&self, name: &str) -> PathBuf {
        self.root().join("out/site/css").join(name)
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_default_scans_tag_language_only() {
    let project = Project::new();
    let processor = project.processor();

    let report = BatchDriver::new(&processor, BatchOptions::default())
        .run()
        .unwrap();

    // base.html and views.rs both name main.scss; page.html names a
    // stylesheet that does not exist.
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    let origins: Vec<&str> = report.failures.iter().map(|f| f.origin.as_str()).collect();
    assert_eq!(origins, vec!["admin.html"]);

    let main = fs::read_to_string(project.css("main.css")).unwrap();
    assert!(main.contains("#333"), "{main}");
    assert!(!main.contains("sourceMappingURL"));
    assert!(!project.css("admin.css").exists());
    assert!(!project.css("_colors.css").exists());
    assert!(!project.root().join("out").exists());
}

#[test]
fn test_both_languages_compile_each_stylesheet_once() {
    let project = Project::new();
    let processor = project.processor();
    let options = BatchOptions {
        engines: Engine::ALL.to_vec(),
        ..BatchOptions::default()
    };

    let report = BatchDriver::new(&processor, options).run().unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.skipped, 1);
    assert!(project.css("main.css").is_file());
    assert!(project.css("admin.css").is_file());
}

#[test]
fn test_storage_destination_writes_maps() {
    let project = Project::new();
    let processor = project.processor();
    let options = BatchOptions {
        engines: vec![Engine::Expressions],
        destination: Destination::Storage,
        ..BatchOptions::default()
    };

    let report = BatchDriver::new(&processor, options).run().unwrap();

    // admin.html names both stylesheets; the Rust source names main again.
    assert_eq!(report.processed, 2);
    assert!(project.out("main.css").is_file());
    assert!(project.out("main.css.map").is_file());
    assert!(project.out("admin.css").is_file());
    assert!(!project.css("main.css").exists());
}

#[test]
fn test_delete_mode_counts_stylesheets_with_artifacts() {
    let project = Project::new();
    let processor = project.processor();
    let storage = BatchOptions {
        engines: vec![Engine::Expressions],
        destination: Destination::Storage,
        ..BatchOptions::default()
    };
    BatchDriver::new(&processor, storage.clone()).run().unwrap();
    fs::remove_file(project.out("admin.css.map")).unwrap();

    let delete = BatchOptions {
        delete: true,
        ..storage
    };
    // main.css with its map, and admin.css alone, count once each.
    let report = BatchDriver::new(&processor, delete.clone()).run().unwrap();
    assert_eq!(report.processed, 2);
    assert!(!project.out("main.css").exists());
    assert!(!project.out("main.css.map").exists());
    assert!(!project.out("admin.css").exists());

    let again = BatchDriver::new(&processor, delete).run().unwrap();
    assert_eq!(again.processed, 0);
}

#[test]
fn test_side_by_side_delete() {
    let project = Project::new();
    let processor = project.processor();
    let options = BatchOptions {
        engines: vec![Engine::Tags],
        ..BatchOptions::default()
    };
    BatchDriver::new(&processor, options.clone()).run().unwrap();
    assert!(project.css("main.css").is_file());

    let report = BatchDriver::new(
        &processor,
        BatchOptions {
            delete: true,
            ..options
        },
    )
    .run()
    .unwrap();
    assert_eq!(report.processed, 1);
    assert!(!project.css("main.css").exists());
}

#[test]
fn test_no_templates_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp.path().join("templates")).unwrap();
    let settings = Settings::from_yaml(
        "static-root: out\ntemplate-dirs: [templates]",
        temp.path(),
    )
    .unwrap();
    let processor = SassProcessor::from_settings(settings).unwrap();

    let err = BatchDriver::new(&processor, BatchOptions::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, BatchError::NoTemplates { .. }));

    let bare = Settings::from_yaml("static-root: out", temp.path()).unwrap();
    let processor = SassProcessor::from_settings(bare).unwrap();
    let err = BatchDriver::new(&processor, BatchOptions::default())
        .run()
        .unwrap_err();
    assert!(matches!(err, BatchError::NoTemplatePaths));
}
