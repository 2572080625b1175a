//! HTML rendering of shaped records through a minijinja template.
//!
//! The renderer owns its template environment; callers build one per run and
//! hand it to the pipeline. Undefined variables are errors, so a template
//! that references something the context does not provide fails loudly
//! instead of printing blanks.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use minijinja::{context, Environment, ErrorKind, UndefinedBehavior, Value};
use tracing::{error, info};

use crate::contract::ArtworkRecord;
use crate::error::RenderError;

pub const HTML_FILE: &str = "report.html";
pub const DEFAULT_TEMPLATE: &str = "report.html";

const BUILTIN_TEMPLATE: &str = include_str!("../templates/report.html");

pub struct ReportRenderer {
    env: Environment<'static>,
    template_name: String,
}

impl ReportRenderer {
    /// Renderer using the template compiled into the binary.
    pub fn builtin() -> Result<Self, RenderError> {
        let mut env = strict_environment();
        env.add_template(DEFAULT_TEMPLATE, BUILTIN_TEMPLATE)
            .map_err(|e| template_error(DEFAULT_TEMPLATE, e))?;
        Ok(Self {
            env,
            template_name: DEFAULT_TEMPLATE.to_string(),
        })
    }

    /// Renderer loading `template_name` from `dir` on first use.
    pub fn from_dir(dir: impl AsRef<Path>, template_name: impl Into<String>) -> Self {
        let mut env = strict_environment();
        env.set_loader(minijinja::path_loader(dir.as_ref()));
        Self {
            env,
            template_name: template_name.into(),
        }
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Renders the report body. `fields` drives the column headers.
    pub fn render(
        &self,
        records: &[ArtworkRecord],
        fields: &[String],
        report_name: &str,
        created_at: DateTime<Utc>,
    ) -> Result<String, RenderError> {
        let template = self
            .env
            .get_template(&self.template_name)
            .map_err(|e| template_error(&self.template_name, e))?;

        let ctx = context! {
            data => Value::from_serialize(records),
            fields => Value::from_serialize(fields),
            name => report_name,
            created_at => format_timestamp(created_at),
        };

        template
            .render(ctx)
            .map_err(|e| template_error(&self.template_name, e))
    }

    /// Renders and writes `report.html` into `output_dir`, creating it if needed.
    pub fn render_to_file(
        &self,
        records: &[ArtworkRecord],
        fields: &[String],
        report_name: &str,
        created_at: DateTime<Utc>,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        let html = self.render(records, fields, report_name, created_at)?;
        let path = output_dir.join(HTML_FILE);
        let io_err = |source: std::io::Error| {
            error!(error = ?source, path = %path.display(), "Failed to write rendered report");
            RenderError::Io {
                path: path.clone(),
                source,
            }
        };
        fs::create_dir_all(output_dir).map_err(io_err)?;
        fs::write(&path, html.as_bytes()).map_err(io_err)?;
        info!(
            path = %path.display(),
            template = %self.template_name,
            records = records.len(),
            bytes = html.len(),
            "Rendered HTML report"
        );
        Ok(path)
    }
}

fn strict_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

fn template_error(name: &str, e: minijinja::Error) -> RenderError {
    if e.kind() == ErrorKind::TemplateNotFound {
        error!(template = %name, "Report template not found");
        RenderError::TemplateMissing(name.to_string())
    } else {
        error!(template = %name, error = %e, "Report template failed to render");
        RenderError::Template(e.to_string())
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_is_human_readable_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-03-09 14:05:00 UTC");
    }
}
