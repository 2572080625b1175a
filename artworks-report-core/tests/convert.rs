mod common;

use std::fs;

use artworks_report_core::contract::MockPdfEngine;
use artworks_report_core::convert::{DocumentConverter, WkhtmltopdfEngine};
use artworks_report_core::error::ConversionError;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test]
async fn converts_existing_html() {
    let dir = tempdir().unwrap();
    let html = dir.path().join("report.html");
    let pdf = dir.path().join("pdf").join("report.pdf");
    fs::write(&html, "<html><body>ok</body></html>").unwrap();

    let converter = DocumentConverter::new(common::writing_engine());
    converter.convert(&html, &pdf).await.unwrap();

    assert!(fs::read(&pdf).unwrap().starts_with(b"%PDF"));
}

#[tokio::test]
async fn missing_html_never_reaches_engine() {
    let dir = tempdir().unwrap();
    let mut engine = MockPdfEngine::new();
    engine.expect_convert().times(0);

    let converter = DocumentConverter::new(engine);
    let err = converter
        .convert(&dir.path().join("absent.html"), &dir.path().join("report.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::MissingInput(_)), "got {err:?}");
}

#[tokio::test]
async fn engine_success_without_output_is_an_error() {
    let dir = tempdir().unwrap();
    let html = dir.path().join("report.html");
    let pdf = dir.path().join("report.pdf");
    fs::write(&html, "<p>x</p>").unwrap();
    // Left over from an earlier run; must not count as this run's output.
    fs::write(&pdf, b"%PDF-old").unwrap();

    let mut engine = MockPdfEngine::new();
    engine.expect_convert().times(1).returning(|_, _, _| Ok(()));

    let converter = DocumentConverter::new(engine);
    let err = converter.convert(&html, &pdf).await.unwrap_err();
    assert!(matches!(err, ConversionError::MissingOutput(_)), "got {err:?}");
    assert!(!pdf.exists());
}

#[tokio::test]
async fn engine_failure_propagates() {
    let dir = tempdir().unwrap();
    let html = dir.path().join("report.html");
    fs::write(&html, "<p>x</p>").unwrap();

    let mut engine = MockPdfEngine::new();
    engine.expect_convert().returning(|_, _, _| {
        Err(ConversionError::EngineFailed {
            status: "exit status: 1".into(),
            stderr: "Exit with code 1 due to network error".into(),
        })
    });

    let converter = DocumentConverter::new(engine);
    let err = converter
        .convert(&html, &dir.path().join("report.pdf"))
        .await
        .unwrap_err();
    match err {
        ConversionError::EngineFailed { stderr, .. } => assert!(stderr.contains("network error")),
        other => panic!("expected EngineFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_engine_binary_is_reported() {
    let dir = tempdir().unwrap();
    let html = dir.path().join("report.html");
    fs::write(&html, "<p>x</p>").unwrap();

    let engine = WkhtmltopdfEngine::new(
        dir.path().join("no-such-wkhtmltopdf"),
        Duration::from_secs(5),
    );
    let converter = DocumentConverter::new(engine);
    let err = converter
        .convert(&html, &dir.path().join("report.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::EngineMissing(_)), "got {err:?}");
}

#[test]
#[serial_test::serial]
fn engine_binary_can_be_overridden_from_env() {
    std::env::set_var("WKHTMLTOPDF_PATH", "/opt/wkhtmltox/bin/wkhtmltopdf");
    let engine = WkhtmltopdfEngine::from_env();
    assert_eq!(
        engine.binary(),
        std::path::Path::new("/opt/wkhtmltox/bin/wkhtmltopdf")
    );

    std::env::remove_var("WKHTMLTOPDF_PATH");
    let engine = WkhtmltopdfEngine::from_env();
    assert_eq!(engine.binary(), std::path::Path::new("wkhtmltopdf"));
}
