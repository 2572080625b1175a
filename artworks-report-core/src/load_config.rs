//! `load_config`: reads a YAML report file and validates the first report in it.
//!
//! The file is parsed into a loosely typed intermediate struct first so each
//! missing or malformed key gets its own [`ConfigError`] instead of a generic
//! serde message. Secrets never live in this file; mail settings come from
//! the environment (see [`crate::notify::SmtpSettings`]).

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{error, info};

use crate::config::ReportDefinition;
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    reports: Option<Vec<RawReport>>,
}

#[derive(Debug, Deserialize)]
struct RawReport {
    name: Option<String>,
    search: Option<String>,
    fields: Option<serde_yaml::Value>,
    max_items: Option<serde_yaml::Value>,
    #[serde(default)]
    recipients: Option<Vec<String>>,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s,<>]+@[^@\s,<>]+\.[^@\s,<>]+$").expect("email pattern is valid")
    })
}

/// Loads the first report definition from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReportDefinition, ConfigError> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading report definition from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        ConfigError::Read {
            path: path_ref.to_path_buf(),
            source: e,
        }
    })?;

    let definition = parse_config(&content)?;
    definition.trace_loaded();
    Ok(definition)
}

/// Parses and validates YAML text. Split out of [`load_config`] for reuse in tests.
pub fn parse_config(content: &str) -> Result<ReportDefinition, ConfigError> {
    let raw: RawConfig = serde_yaml::from_str(content).map_err(|e| {
        error!(error = %e, "Failed to parse config YAML");
        ConfigError::Parse(e)
    })?;

    let report = raw
        .reports
        .and_then(|reports| reports.into_iter().next())
        .ok_or(ConfigError::NoReports)?;

    let name = required_text(report.name, "name")?;
    let search = required_text(report.search, "search")?;
    let fields = parse_fields(report.fields.ok_or(ConfigError::MissingField("fields"))?)?;
    let max_items = parse_max_items(
        report
            .max_items
            .ok_or(ConfigError::MissingField("max_items"))?,
    )?;

    let recipients: Vec<String> = report
        .recipients
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.trim().to_string())
        .collect();
    if let Some(bad) = recipients.iter().find(|r| !email_pattern().is_match(r)) {
        error!(recipient = %bad, "Invalid recipient address in config");
        return Err(ConfigError::InvalidRecipient(bad.clone()));
    }

    Ok(ReportDefinition {
        name,
        search,
        fields,
        max_items,
        recipients,
    })
}

fn required_text(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => {
            error!(field = key, "Required field missing in report definition");
            Err(ConfigError::MissingField(key))
        }
    }
}

fn parse_fields(value: serde_yaml::Value) -> Result<Vec<String>, ConfigError> {
    let seq = match value {
        serde_yaml::Value::Sequence(seq) if !seq.is_empty() => seq,
        _ => return Err(ConfigError::InvalidFields),
    };
    let mut fields: Vec<String> = Vec::with_capacity(seq.len());
    for item in seq {
        let field = match item {
            serde_yaml::Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => return Err(ConfigError::InvalidFields),
        };
        // Shaped records are keyed by field name, so a repeat would silently collapse.
        if fields.contains(&field) {
            error!(field = %field, "Field listed more than once in report definition");
            return Err(ConfigError::DuplicateField(field));
        }
        fields.push(field);
    }
    Ok(fields)
}

fn parse_max_items(value: serde_yaml::Value) -> Result<usize, ConfigError> {
    match value.as_u64() {
        Some(n) if n >= 1 => {
            usize::try_from(n).map_err(|_| ConfigError::InvalidMaxItems(n.to_string()))
        }
        _ => {
            let shown = serde_yaml::to_string(&value)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "<unprintable>".to_string());
            Err(ConfigError::InvalidMaxItems(shown))
        }
    }
}
