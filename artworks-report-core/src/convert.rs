//! HTML to PDF conversion.
//!
//! [`DocumentConverter`] guards the engine call: it checks the input exists,
//! clears any PDF left by an earlier run, and verifies the engine actually
//! produced output. [`WkhtmltopdfEngine`] is the production engine and runs
//! the `wkhtmltopdf` binary as a subprocess.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::contract::{ConversionOptions, PdfEngine};
use crate::error::ConversionError;

pub const PDF_FILE: &str = "report.pdf";
pub const DEFAULT_ENGINE_BINARY: &str = "wkhtmltopdf";
pub const ENGINE_PATH_ENV: &str = "WKHTMLTOPDF_PATH";
pub const DEFAULT_CONVERSION_TIMEOUT: Duration = Duration::from_secs(120);

pub struct WkhtmltopdfEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl WkhtmltopdfEngine {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Uses `WKHTMLTOPDF_PATH` when set, otherwise looks `wkhtmltopdf` up on `PATH`.
    pub fn from_env() -> Self {
        let binary = std::env::var_os(ENGINE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENGINE_BINARY));
        debug!(binary = %binary.display(), "Selected PDF engine binary");
        Self::new(binary, DEFAULT_CONVERSION_TIMEOUT)
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Command-line arguments for one conversion.
    pub fn args(html_path: &Path, pdf_path: &Path, options: &ConversionOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--quiet".into()];
        if options.enable_local_file_access {
            args.push("--enable-local-file-access".into());
        }
        args.push(html_path.as_os_str().to_owned());
        args.push(pdf_path.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl PdfEngine for WkhtmltopdfEngine {
    async fn convert(
        &self,
        html_path: &Path,
        pdf_path: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConversionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::args(html_path, pdf_path, options))
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                error!(binary = %self.binary.display(), timeout = ?self.timeout, "PDF engine timed out");
                return Err(ConversionError::Timeout(self.timeout));
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(binary = %self.binary.display(), "PDF engine binary not found");
                return Err(ConversionError::EngineMissing(
                    self.binary.display().to_string(),
                ));
            }
            Ok(Err(e)) => {
                error!(error = ?e, binary = %self.binary.display(), "Failed to launch PDF engine");
                return Err(ConversionError::Io(e));
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(
                status = %output.status,
                binary = %self.binary.display(),
                "PDF engine exited with non-zero code: {stderr}"
            );
            return Err(ConversionError::EngineFailed {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(())
    }
}

pub struct DocumentConverter<E> {
    engine: E,
}

impl<E: PdfEngine> DocumentConverter<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// Converts `html_path` into `pdf_path` with local file access enabled.
    pub async fn convert(&self, html_path: &Path, pdf_path: &Path) -> Result<(), ConversionError> {
        if !html_path.is_file() {
            error!(path = %html_path.display(), "HTML input for conversion is missing");
            return Err(ConversionError::MissingInput(html_path.to_path_buf()));
        }
        if let Some(parent) = pdf_path.parent() {
            fs::create_dir_all(parent)?;
        }
        // A PDF from an earlier run must not pass for this run's output.
        if pdf_path.exists() {
            debug!(path = %pdf_path.display(), "Removing stale PDF before conversion");
            fs::remove_file(pdf_path)?;
        }

        let options = ConversionOptions {
            enable_local_file_access: true,
        };
        self.engine.convert(html_path, pdf_path, &options).await?;

        if !pdf_path.is_file() {
            error!(path = %pdf_path.display(), "PDF engine reported success but wrote no file");
            return Err(ConversionError::MissingOutput(pdf_path.to_path_buf()));
        }
        info!(
            html = %html_path.display(),
            pdf = %pdf_path.display(),
            "Converted HTML report to PDF"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_enable_local_file_access_before_paths() {
        let args = WkhtmltopdfEngine::args(
            Path::new("/tmp/out/report.html"),
            Path::new("/tmp/out/report.pdf"),
            &ConversionOptions {
                enable_local_file_access: true,
            },
        );
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--quiet",
                "--enable-local-file-access",
                "/tmp/out/report.html",
                "/tmp/out/report.pdf",
            ]
        );
    }

    #[test]
    fn args_omit_local_access_flag_when_disabled() {
        let args = WkhtmltopdfEngine::args(
            Path::new("a.html"),
            Path::new("a.pdf"),
            &ConversionOptions::default(),
        );
        assert!(!args.iter().any(|a| a == "--enable-local-file-access"));
    }
}
