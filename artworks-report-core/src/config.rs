use std::path::PathBuf;
use tracing::{debug, info};

/// One report to generate, as validated by [`crate::load_config::load_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDefinition {
    pub name: String,
    pub search: String,
    /// Requested fields, in output column order. Never empty.
    pub fields: Vec<String>,
    /// Upper bound on records in the report. Always at least 1.
    pub max_items: usize,
    pub recipients: Vec<String>,
}

impl ReportDefinition {
    pub fn trace_loaded(&self) {
        info!(
            report = %self.name,
            search = %self.search,
            fields = self.fields.len(),
            max_items = self.max_items,
            recipients = self.recipients.len(),
            "Loaded report definition"
        );
        debug!(?self, "Report definition loaded (full debug)");
    }
}

/// Per-run settings chosen by the operator rather than the report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub output_directory: PathBuf,
    pub dry_run: bool,
}

impl RunContext {
    pub fn new(output_directory: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            output_directory: output_directory.into(),
            dry_run,
        }
    }

    pub fn query_path(&self) -> PathBuf {
        self.output_directory.join(crate::query::RAW_RESPONSE_FILE)
    }

    pub fn html_path(&self) -> PathBuf {
        self.output_directory.join(crate::render::HTML_FILE)
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.output_directory.join(crate::convert::PDF_FILE)
    }
}
