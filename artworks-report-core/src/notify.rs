//! # notify: emailing the finished report
//!
//! [`Notifier`] composes the message (subject, recipients, body, PDF
//! attachment) and hands it to a [`Mailer`]. It refuses to send anything if
//! the PDF is not on disk.
//!
//! [`SmtpMailer`] is the production [`Mailer`], built on lettre's async SMTP
//! transport. Host, port and credentials come from the environment only:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `SMTP_HOST` | Yes | SMTP server hostname |
//! | `SMTP_PORT` | No | Port (default: 587). 465 uses implicit TLS, anything else STARTTLS |
//! | `SMTP_USER` | Yes | Username for authentication |
//! | `SMTP_PASS` | Yes | Password for authentication |
//! | `SMTP_FROM` | No | Sender address (default: `SMTP_USER`) |

use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::contract::{EmailAttachment, Mailer, OutgoingEmail};
use crate::error::NotifyError;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);
const PDF_CONTENT_TYPE: &str = "application/pdf";

pub fn subject_for(report_name: &str) -> String {
    format!("Artworks Report: {report_name}")
}

pub fn attachment_name_for(report_name: &str) -> String {
    format!("artworks_report_{report_name}.pdf")
}

fn body_for(report_name: &str, search_term: &str) -> String {
    format!(
        "Hello,\n\n\
         Attached is the artworks report \"{report_name}\" for the search term \"{search_term}\".\n\n\
         This message was generated automatically.\n"
    )
}

pub struct Notifier<M> {
    mailer: M,
    sender: String,
}

impl<M: Mailer> Notifier<M> {
    pub fn new(mailer: M, sender: impl Into<String>) -> Self {
        Self {
            mailer,
            sender: sender.into(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Builds the outgoing message, reading the PDF from disk.
    pub fn compose(
        &self,
        recipients: &[String],
        report_name: &str,
        search_term: &str,
        pdf_path: &Path,
    ) -> Result<OutgoingEmail, NotifyError> {
        let content = fs::read(pdf_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                error!(path = %pdf_path.display(), "Report PDF missing, not sending email");
                NotifyError::MissingArtifact(pdf_path.to_path_buf())
            } else {
                error!(error = ?e, path = %pdf_path.display(), "Failed to read report PDF");
                NotifyError::ReadArtifact {
                    path: pdf_path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if recipients.is_empty() {
            return Err(NotifyError::Build("no recipients".to_string()));
        }

        Ok(OutgoingEmail {
            from: self.sender.clone(),
            to: recipients.to_vec(),
            subject: subject_for(report_name),
            body: body_for(report_name, search_term),
            attachments: vec![EmailAttachment {
                filename: attachment_name_for(report_name),
                content_type: PDF_CONTENT_TYPE.to_string(),
                content,
            }],
        })
    }

    /// Emails the PDF at `pdf_path` to every recipient in one message.
    pub async fn notify(
        &self,
        recipients: &[String],
        report_name: &str,
        search_term: &str,
        pdf_path: &Path,
    ) -> Result<(), NotifyError> {
        let email = self.compose(recipients, report_name, search_term, pdf_path)?;
        info!(
            report = %report_name,
            to = %email.to.join(", "),
            attachment = %email.attachments[0].filename,
            "Sending report email"
        );
        self.mailer.send(&email).await.map_err(|e| {
            error!(error = %e, report = %report_name, "Failed to send report email");
            e
        })?;
        info!(report = %report_name, recipients = recipients.len(), "Report email sent");
        Ok(())
    }
}

/// SMTP connection settings. Never read from the report definition.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

impl SmtpSettings {
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from any key lookup, so tests need not touch the process env.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, NotifyError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    error!(var, "SMTP environment variable not set");
                    NotifyError::MissingSetting(var)
                })
        };
        let host = required("SMTP_HOST")?;
        let user = required("SMTP_USER")?;
        let pass = required("SMTP_PASS")?;
        let port = match lookup("SMTP_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                error!(error = ?e, raw = %raw, "SMTP_PORT must be a valid port number");
                NotifyError::InvalidSetting {
                    var: "SMTP_PORT",
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_SMTP_PORT,
        };
        let from = lookup("SMTP_FROM")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| user.clone());

        info!(host = %host, port, user = %user, from = %from, "Loaded SMTP settings from environment");
        Ok(Self {
            host,
            port,
            user,
            pass,
            from,
        })
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self, NotifyError> {
        let builder = if settings.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| {
            error!(error = ?e, host = %settings.host, "Failed to configure SMTP transport");
            NotifyError::Transport(e.to_string())
        })?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.pass.clone(),
            ))
            .timeout(Some(timeout))
            .build();
        Ok(Self { transport, timeout })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|_| NotifyError::InvalidAddress(address.to_string()))
}

/// Converts a transport-neutral email into a MIME message.
pub fn build_message(email: &OutgoingEmail) -> Result<Message, NotifyError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(&email.from)?)
        .subject(email.subject.clone());
    for to in &email.to {
        builder = builder.to(parse_mailbox(to)?);
    }

    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for attachment in &email.attachments {
        let content_type = ContentType::parse(&attachment.content_type)
            .map_err(|e| NotifyError::Build(e.to_string()))?;
        parts = parts.singlepart(
            Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type),
        );
    }

    builder
        .multipart(parts)
        .map_err(|e| NotifyError::Build(e.to_string()))
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotifyError> {
        let message = build_message(email)?;
        // The transport timeout covers individual commands only, not connect and greeting.
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Err(_) => {
                error!(timeout = ?self.timeout, "SMTP session did not complete in time");
                Err(NotifyError::Timeout)
            }
            Ok(Ok(response)) => {
                info!(code = %response.code(), "SMTP server accepted message");
                Ok(())
            }
            Ok(Err(e)) if e.is_timeout() => Err(NotifyError::Timeout),
            Ok(Err(e)) => Err(NotifyError::Transport(e.to_string())),
        }
    }
}
