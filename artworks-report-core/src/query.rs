//! Artwork search: one GET against the search API, validated once at the boundary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::{FetchResponse, RawRecord, SearchFetcher};
use crate::error::QueryError;

pub const DEFAULT_SEARCH_URL: &str = "https://api.artic.edu/api/v1/artworks/search";
pub const RAW_RESPONSE_FILE: &str = "query.json";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("artworks-report/", env!("CARGO_PKG_VERSION"));

/// [`SearchFetcher`] backed by a shared `reqwest::Client` with a request timeout.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                error!(error = ?e, "Failed to build HTTP client");
                QueryError::Transport(e.to_string())
            })?;
        Ok(Self { client })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout
    } else {
        QueryError::Transport(e.to_string())
    }
}

#[async_trait]
impl SearchFetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchResponse, QueryError> {
        info!(url = %url, ?query, "Fetching artwork search API");
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, url = %url, "Failed to reach artwork search API");
                map_reqwest_error(e)
            })?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            error!(error = ?e, url = %url, "Failed to read artwork search response body");
            map_reqwest_error(e)
        })?;
        Ok(FetchResponse { status, body })
    }
}

/// Shape the search API promises: `{"data": [{...}, ...]}`. Extra keys are ignored.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<RawRecord>,
}

/// Records returned by a search, already limited to the requested count.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub records: Vec<RawRecord>,
    /// Number of records the API sent before local limiting.
    pub total_received: usize,
    /// Where the unmodified response body was written.
    pub raw_response_path: PathBuf,
}

pub struct ArtworkQueryClient<F> {
    fetcher: F,
    base_url: String,
}

impl<F: SearchFetcher> ArtworkQueryClient<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, DEFAULT_SEARCH_URL)
    }

    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query parameters for a search: `q`, comma-joined `fields`, and `size`.
    pub fn search_params(term: &str, fields: &[String], limit: usize) -> Vec<(String, String)> {
        vec![
            ("q".to_string(), term.to_string()),
            ("fields".to_string(), fields.join(",")),
            ("size".to_string(), limit.to_string()),
        ]
    }

    /// Runs the search and writes the raw body to `query.json` in `output_dir`.
    ///
    /// Nothing is written unless the API answered 200 with a well-formed body.
    pub async fn search(
        &self,
        term: &str,
        fields: &[String],
        limit: usize,
        output_dir: &Path,
    ) -> Result<QueryResult, QueryError> {
        let params = Self::search_params(term, fields, limit);
        let response = self.fetcher.fetch(&self.base_url, &params).await?;

        if response.status != 200 {
            error!(
                status = response.status,
                url = %self.base_url,
                "Artwork search API returned error. Response body: {}",
                response.body
            );
            return Err(QueryError::Status {
                status: response.status,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&response.body).map_err(|e| {
            error!(error = %e, "Artwork search response did not match expected schema");
            QueryError::Malformed(e.to_string())
        })?;

        let raw_response_path = persist_raw_response(output_dir, &response.body)?;

        let total_received = parsed.data.len();
        let mut records = parsed.data;
        // Enforce the limit even if the server ignores `size`.
        records.truncate(limit);

        info!(
            received = total_received,
            kept = records.len(),
            limit,
            path = %raw_response_path.display(),
            "Artwork search succeeded"
        );

        Ok(QueryResult {
            records,
            total_received,
            raw_response_path,
        })
    }
}

fn persist_raw_response(output_dir: &Path, body: &str) -> Result<PathBuf, QueryError> {
    let path = output_dir.join(RAW_RESPONSE_FILE);
    let persist_err = |source: std::io::Error| {
        error!(error = ?source, path = %path.display(), "Failed to persist raw search response");
        QueryError::Persist {
            path: path.clone(),
            source,
        }
    };
    fs::create_dir_all(output_dir).map_err(persist_err)?;
    fs::write(&path, body).map_err(persist_err)?;
    debug!(path = %path.display(), bytes = body.len(), "Wrote raw search response");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_join_fields_in_order() {
        let fields = vec!["id".to_string(), "title".to_string(), "artist_title".to_string()];
        let params = ArtworkQueryClient::<crate::contract::MockSearchFetcher>::search_params(
            "war", &fields, 25,
        );
        assert_eq!(
            params,
            vec![
                ("q".to_string(), "war".to_string()),
                ("fields".to_string(), "id,title,artist_title".to_string()),
                ("size".to_string(), "25".to_string()),
            ]
        );
    }
}
