#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use artworks_report_core::contract::{
    FetchResponse, MockMailer, MockPdfEngine, MockSearchFetcher, OutgoingEmail,
};
use artworks_report_core::error::ConversionError;
use serde_json::json;

pub const WAR_ART_YAML: &str = r#"
reports:
  - name: "war-art"
    search: "war"
    fields: ["id", "title"]
    max_items: 2
    recipients: ["a@x.com"]
"#;

pub fn write_config(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("queries.yml");
    fs::write(&path, yaml).expect("write config");
    path
}

/// Search API body with `n` records, each carrying more fields than any report asks for.
pub fn search_body(n: usize) -> String {
    let data: Vec<_> = (1..=n)
        .map(|i| {
            json!({
                "_score": 100.0 - i as f64,
                "id": i,
                "title": format!("Artwork {i}"),
                "artist_title": format!("Artist {i}"),
                "date_display": "1937"
            })
        })
        .collect();
    json!({ "preference": null, "pagination": { "total": n }, "data": data }).to_string()
}

pub fn fetcher_returning(status: u16, body: String) -> MockSearchFetcher {
    let mut fetcher = MockSearchFetcher::new();
    fetcher.expect_fetch().returning(move |_, _| {
        Ok(FetchResponse {
            status,
            body: body.clone(),
        })
    });
    fetcher
}

/// Engine that writes a tiny fake PDF to the requested path.
pub fn writing_engine() -> MockPdfEngine {
    let mut engine = MockPdfEngine::new();
    engine.expect_convert().returning(|_, pdf, opts| {
        assert!(opts.enable_local_file_access);
        fs::write(pdf, b"%PDF-1.4\n% stub\n").map_err(ConversionError::Io)?;
        Ok(())
    });
    engine
}

/// Mailer that records every message it is asked to send.
pub fn recording_mailer(times: usize) -> (MockMailer, Arc<Mutex<Vec<OutgoingEmail>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let sink = sent.clone();
    let mut mailer = MockMailer::new();
    mailer.expect_send().times(times).returning(move |email| {
        sink.lock().unwrap().push(email.clone());
        Ok(())
    });
    (mailer, sent)
}
