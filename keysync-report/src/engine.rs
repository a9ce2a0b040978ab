//! Tera rendering of the run report into a mail subject and body.
//!
//! Embedded templates are baked in with `include_str!`. A user directory of
//! `*.tera` files may override them by name (`subject.tera`, `body.tera`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::{Context, Tera};

use crate::context::ReportContext;
use crate::error::RenderError;

pub const SUBJECT_TEMPLATE: &str = "subject.tera";
pub const BODY_TEMPLATE: &str = "body.tera";

const TPLS: &[(&str, &str)] = &[
    (SUBJECT_TEMPLATE, include_str!("templates/subject.tera")),
    (BODY_TEMPLATE, include_str!("templates/body.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_string(), (*content).to_string()))
        .collect();
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Subject and body ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub subject: String,
    pub body: String,
}

pub struct ReportRenderer {
    tera: Tera,
}

impl ReportRenderer {
    /// Renderer with the embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Renderer whose templates may be replaced from `template_dir`.
    pub fn with_overrides(template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Self {
            tera: build_tera(template_dir)?,
        })
    }

    pub fn render(&self, ctx: &ReportContext) -> Result<RenderedReport, RenderError> {
        let context = Context::from_serialize(ctx)?;
        let subject = self.tera.render(SUBJECT_TEMPLATE, &context)?;
        let body = self.tera.render(BODY_TEMPLATE, &context)?;
        Ok(RenderedReport {
            // A subject is one line, whatever the template did with whitespace.
            subject: subject.split_whitespace().collect::<Vec<_>>().join(" "),
            body: body.trim_end().to_string(),
        })
    }
}
