//! Prompt rendering for the research and review passes.
//!
//! Templates are embedded at build time; a file with the same name in the
//! configured prompts directory replaces the embedded one.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::period::PeriodDescriptor;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");
const REVIEW_TEMPLATE: &str = include_str!("prompts/review.md");

const SYSTEM_NAME: &str = "system.md";
const REVIEW_NAME: &str = "review.md";

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
    system: String,
    review: String,
}

impl PromptEngine {
    /// Engine with only the embedded templates.
    pub fn embedded() -> Result<Self> {
        Self::build(SYSTEM_TEMPLATE.to_string(), REVIEW_TEMPLATE.to_string())
    }

    /// Engine preferring templates found in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let system =
            read_override(dir, SYSTEM_NAME)?.unwrap_or_else(|| SYSTEM_TEMPLATE.to_string());
        let review =
            read_override(dir, REVIEW_NAME)?.unwrap_or_else(|| REVIEW_TEMPLATE.to_string());
        Self::build(system, review)
    }

    fn build(system: String, review: String) -> Result<Self> {
        let env = Environment::new();
        env.template_from_str(&system)
            .context("parse system prompt template")?;
        env.template_from_str(&review)
            .context("parse review prompt template")?;
        Ok(Self {
            env,
            system,
            review,
        })
    }

    /// System instruction for the research pass.
    pub fn render_system(&self, period: &PeriodDescriptor) -> Result<String> {
        let rendered = self
            .env
            .render_str(
                &self.system,
                context! {
                    week_number => period.week_number,
                    year => period.year,
                    pub_date => period.pub_date.to_string(),
                    date_range => period.date_range.as_str(),
                },
            )
            .context("render system prompt")?;
        Ok(rendered)
    }

    /// Single user message for the review pass, with the document embedded.
    pub fn render_review(&self, document: &str) -> Result<String> {
        let rendered = self
            .env
            .render_str(&self.review, context! { document => document })
            .context("render review prompt")?;
        Ok(rendered)
    }
}

fn read_override(dir: &Path, name: &str) -> Result<Option<String>> {
    let path = dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    debug!(path = %path.display(), "using prompt override");
    let contents =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    Ok(Some(contents))
}
