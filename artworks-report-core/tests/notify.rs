mod common;

use std::fs;

use std::net::TcpListener;
use std::time::{Duration, Instant};

use artworks_report_core::contract::{Mailer, MockMailer, OutgoingEmail};
use artworks_report_core::error::NotifyError;
use artworks_report_core::notify::{Notifier, SmtpMailer, SmtpSettings};
use tempfile::tempdir;

fn recipients(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn sends_one_message_with_pdf_attached() {
    let dir = tempdir().unwrap();
    let pdf = dir.path().join("report.pdf");
    fs::write(&pdf, b"%PDF-1.4 body").unwrap();

    let (mailer, sent) = common::recording_mailer(1);
    let notifier = Notifier::new(mailer, "reports@example.com");
    notifier
        .notify(&recipients(&["a@x.com", "b@y.com"]), "war-art", "war", &pdf)
        .await
        .unwrap();

    let sent = sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email.from, "reports@example.com");
    assert_eq!(email.to, vec!["a@x.com", "b@y.com"]);
    assert_eq!(email.subject, "Artworks Report: war-art");
    assert!(email.body.contains("\"war\""));
    assert_eq!(email.attachments.len(), 1);
    assert_eq!(email.attachments[0].filename, "artworks_report_war-art.pdf");
    assert_eq!(email.attachments[0].content_type, "application/pdf");
    assert_eq!(email.attachments[0].content, b"%PDF-1.4 body");
}

#[tokio::test]
async fn missing_pdf_sends_nothing() {
    let dir = tempdir().unwrap();
    let mut mailer = MockMailer::new();
    mailer.expect_send().times(0);

    let notifier = Notifier::new(mailer, "reports@example.com");
    let err = notifier
        .notify(
            &recipients(&["a@x.com"]),
            "war-art",
            "war",
            &dir.path().join("report.pdf"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::MissingArtifact(_)), "got {err:?}");
}

#[tokio::test]
async fn transport_failure_is_returned() {
    let dir = tempdir().unwrap();
    let pdf = dir.path().join("report.pdf");
    fs::write(&pdf, b"%PDF").unwrap();

    let mut mailer = MockMailer::new();
    mailer
        .expect_send()
        .times(1)
        .returning(|_| Err(NotifyError::Transport("535 authentication failed".into())));

    let notifier = Notifier::new(mailer, "reports@example.com");
    let err = notifier
        .notify(&recipients(&["a@x.com"]), "war-art", "war", &pdf)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("535"));
}

#[tokio::test]
async fn unreadable_pdf_reports_read_failure() {
    let dir = tempdir().unwrap();
    // A directory where the PDF should be: present, but not readable as a file.
    let pdf = dir.path().join("report.pdf");
    fs::create_dir(&pdf).unwrap();

    let mut mailer = MockMailer::new();
    mailer.expect_send().times(0);

    let notifier = Notifier::new(mailer, "reports@example.com");
    let err = notifier
        .notify(&recipients(&["a@x.com"]), "war-art", "war", &pdf)
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::ReadArtifact { .. }), "got {err:?}");
}

#[tokio::test]
async fn silent_smtp_server_times_out() {
    // Accepts connections (via the backlog) but never sends a greeting.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let settings = SmtpSettings {
        host: "127.0.0.1".into(),
        port,
        user: "reports@example.com".into(),
        pass: "secret".into(),
        from: "reports@example.com".into(),
    };
    let mailer = SmtpMailer::new(&settings, Duration::from_millis(300)).unwrap();
    let email = OutgoingEmail {
        from: "reports@example.com".into(),
        to: recipients(&["a@x.com"]),
        subject: "Artworks Report: war-art".into(),
        body: "body".into(),
        attachments: vec![],
    };

    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(10), mailer.send(&email))
        .await
        .expect("send must give up on its own");
    assert!(matches!(result, Err(NotifyError::Timeout)), "got {result:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}
