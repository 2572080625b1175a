//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to three external capabilities: the artwork search
//! API, an HTML to PDF engine, and a mail transport. Each is a trait here so
//! production clients and test mocks plug in the same way.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks (`MockSearchFetcher`,
//!   `MockPdfEngine`, `MockMailer`) are exported with the `test-export-mocks`
//!   feature so integration tests and downstream crates can use them.
//!
//! ## Production implementations
//! - [`crate::query::ReqwestFetcher`] for [`SearchFetcher`]
//! - [`crate::convert::WkhtmltopdfEngine`] for [`PdfEngine`]
//! - [`crate::notify::SmtpMailer`] for [`Mailer`]

use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{ConversionError, NotifyError, QueryError};

/// A record exactly as returned by the search API.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A record projected onto the requested fields, in requested order.
pub type ArtworkRecord = serde_json::Map<String, serde_json::Value>;

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// Performs the search HTTP request.
///
/// Implementors report transport problems as [`QueryError::Timeout`] or
/// [`QueryError::Transport`]. Any HTTP status, including errors, is a
/// successful fetch; interpreting it is the query client's job.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SearchFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchResponse, QueryError>;
}

/// Options handed to the PDF engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionOptions {
    /// Allow the HTML document to reference local files (stylesheets, images).
    pub enable_local_file_access: bool,
}

/// Converts an HTML file on disk into a PDF file on disk.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PdfEngine: Send + Sync {
    async fn convert(
        &self,
        html_path: &Path,
        pdf_path: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConversionError>;
}

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// A fully composed message, independent of any transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    /// Rendered as a single `To` header, comma separated.
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}

/// Delivers a composed email.
///
/// The transport owns host, port and credentials; the message carries only
/// what to send.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError>;
}
