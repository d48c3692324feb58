/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sassproc_templates::{Engine, Environment, RenderContext, TemplateValue};

use super::{build_processor, load_settings};

pub fn execute(config: Option<&Path>, template: &str, engine: Engine, vars: &[String]) -> Result<()> {
    let processor = build_processor(load_settings(config)?)?;
    let env = Environment::from_processor(engine, Arc::new(processor));
    let ctx = parse_vars(vars)?;

    let output = env
        .render(template, &ctx)
        .with_context(|| format!("Failed to render {}", template))?;
    print!("{}", output);
    Ok(())
}

/// Build a context from `KEY=VALUE` pairs. Values that parse as a JSON
/// object, array or boolean are bound as such; anything else is a string.
fn parse_vars(vars: &[String]) -> Result<RenderContext> {
    let mut ctx = RenderContext::new();
    for var in vars {
        let Some((key, value)) = var.split_once('=') else {
            anyhow::bail!("Invalid --var '{}', expected KEY=VALUE", var);
        };
        let value = match serde_json::from_str::<serde_json::Value>(value) {
            Ok(json @ (serde_json::Value::Object(_)
            | serde_json::Value::Array(_)
            | serde_json::Value::Bool(_))) => TemplateValue::from(&json),
            _ => TemplateValue::from(value),
        };
        ctx.insert(key.trim(), value);
    }
    Ok(ctx)
}
