//! Error taxonomy for the report pipeline.
//!
//! Every stage owns one error enum. [`PipelineError`] wraps them so the
//! orchestrator can report which stage failed and the CLI can map the
//! failure to an exit code.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Bad or missing report definition. Raised before any network or disk write.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config has no entries under `reports`")]
    NoReports,

    #[error("report definition is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("`fields` must be a non-empty list of field names")]
    InvalidFields,

    #[error("field `{0}` is listed more than once in `fields`")]
    DuplicateField(String),

    #[error("`max_items` must be a positive integer, got {0}")]
    InvalidMaxItems(String),

    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("delivery requested but the report has no recipients")]
    NoRecipients,
}

/// Failure talking to the artwork search API.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("search API returned HTTP status {status}")]
    Status { status: u16 },

    #[error("search API response is malformed: {0}")]
    Malformed(String),

    #[error("search API request timed out")]
    Timeout,

    #[error("search API request failed: {0}")]
    Transport(String),

    #[error("failed to persist raw response to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Template lookup or evaluation failure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    TemplateMissing(String),

    #[error("template evaluation failed: {0}")]
    Template(String),

    #[error("failed to write rendered report to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// HTML to PDF conversion failure.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDF engine `{0}` not found")]
    EngineMissing(String),

    #[error("HTML input {0:?} does not exist")]
    MissingInput(PathBuf),

    #[error("PDF engine exited with {status}: {stderr}")]
    EngineFailed { status: String, stderr: String },

    #[error("PDF engine did not finish within {0:?}")]
    Timeout(std::time::Duration),

    #[error("PDF engine reported success but {0:?} was not written")]
    MissingOutput(PathBuf),

    #[error("I/O error during PDF conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Email delivery failure. Never affects artifacts already on disk.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("report artifact {0:?} is missing, refusing to send")]
    MissingArtifact(PathBuf),

    #[error("failed to read report artifact {path:?}: {source}")]
    ReadArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notifier is not configured")]
    NotConfigured,

    #[error("environment variable {0} is not set")]
    MissingSetting(&'static str),

    #[error("environment variable {var} is invalid: {reason}")]
    InvalidSetting { var: &'static str, reason: String },

    #[error("invalid email address `{0}`")]
    InvalidAddress(String),

    #[error("failed to build email: {0}")]
    Build(String),

    #[error("mail transport timed out")]
    Timeout,

    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Pipeline stage, used to label failures and pick exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Query,
    Render,
    Convert,
    Notify,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Query => "query",
            Stage::Render => "render",
            Stage::Convert => "convert",
            Stage::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First fatal failure of a run, labelled with its stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[config] {0}")]
    Config(#[from] ConfigError),

    #[error("[query] {0}")]
    Query(#[from] QueryError),

    #[error("[render] {0}")]
    Render(#[from] RenderError),

    #[error("[convert] {0}")]
    Conversion(#[from] ConversionError),

    #[error("[notify] {0}")]
    Notify(#[from] NotifyError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Query(_) => Stage::Query,
            PipelineError::Render(_) => Stage::Render,
            PipelineError::Conversion(_) => Stage::Convert,
            PipelineError::Notify(_) => Stage::Notify,
        }
    }

    /// Process exit code for this failure. 1 is left for errors outside the pipeline.
    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Stage::Config => 2,
            Stage::Query => 3,
            Stage::Render => 4,
            Stage::Convert => 5,
            Stage::Notify => 6,
        }
    }
}
