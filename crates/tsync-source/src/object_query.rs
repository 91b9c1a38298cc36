//! Paginated object-query source.
//!
//! `GET {base_url}/rest/assets/latest/aql/objects?resultPerPage=&page=&qlQuery=`
//!
//! Response shape (only the fields read here):
//!
//! ```json
//! {
//!   "pageNumber": 1,
//!   "pageSize": 3,
//!   "objectEntries": [ { "label": "web-1", "objectType": { "name": "Server" } } ]
//! }
//! ```
//!
//! `pageSize` is the *total number of pages*, not the page length.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use tsync_reconcile::SourceRecord;

use crate::fetcher::{SourceBatch, SourceError, SourceFetcher};

pub const OBJECT_QUERY_PATH: &str = "/rest/assets/latest/aql/objects";

/// Connection settings. The token is passed in already resolved; never log it.
#[derive(Clone)]
pub struct ObjectQueryConfig {
    pub base_url: String,
    pub query: String,
    pub page_size: u32,
    pub token: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for ObjectQueryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectQueryConfig")
            .field("base_url", &self.base_url)
            .field("query", &self.query)
            .field("page_size", &self.page_size)
            .field("token", &"<REDACTED>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectQuerySource {
    cfg: ObjectQueryConfig,
    http: reqwest::Client,
}

impl ObjectQuerySource {
    pub fn new(cfg: ObjectQueryConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| SourceError::Transport(format!("client build failed: {e}")))?;
        Ok(Self { cfg, http })
    }

    fn objects_url(&self) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), OBJECT_QUERY_PATH)
    }

    async fn fetch_page(&self, page: u32) -> Result<ObjectPage, SourceError> {
        let page_s = page.to_string();
        let per_page = self.cfg.page_size.to_string();

        debug!(page, "fetching object page");
        let resp = self
            .http
            .get(self.objects_url())
            .bearer_auth(&self.cfg.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("resultPerPage", per_page.as_str()),
                ("page", page_s.as_str()),
                ("qlQuery", self.cfg.query.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<ObjectPage>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl SourceFetcher for ObjectQuerySource {
    fn name(&self) -> &'static str {
        "object_query"
    }

    /// Walk pages from 1 until the last page, an empty page, or the first
    /// failure. Stopping anywhere but the last page truncates the batch; a
    /// failure on page 1 is still a (truncated, empty) batch.
    async fn fetch(&self) -> Result<SourceBatch, SourceError> {
        let mut batch = SourceBatch::default();
        let mut page: u32 = 1;

        loop {
            let body = match self.fetch_page(page).await {
                Ok(b) => b,
                Err(e) => {
                    warn!(page, error = %e, "object query stopped early; keeping partial result");
                    batch.truncation = Some(format!("page {page}: {e}"));
                    break;
                }
            };

            batch.pages += 1;
            let n = body.object_entries.len();
            batch
                .records
                .extend(body.object_entries.iter().map(record_from_entry));

            // The local counter also bounds the walk, so a server that keeps
            // echoing the same page number cannot loop forever.
            let current = body.page_number.unwrap_or(1).max(u64::from(page));
            let total = body.total_pages.unwrap_or(1);
            debug!(page, entries = n, current, total, "object page received");

            if current >= total {
                break;
            }
            if n == 0 {
                warn!(page, total, "object query returned an empty page before the last one");
                batch.truncation = Some(format!("page {page}: empty page before page {total}"));
                break;
            }
            page = page.saturating_add(1);
        }

        info!(
            records = batch.records.len(),
            pages = batch.pages,
            truncated = batch.is_truncated(),
            "object query fetch finished"
        );
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ObjectPage {
    #[serde(rename = "objectEntries", default)]
    object_entries: Vec<Value>,
    #[serde(rename = "pageNumber", default)]
    page_number: Option<u64>,
    #[serde(rename = "pageSize", default)]
    total_pages: Option<u64>,
}

/// Entries are read leniently: a field of the wrong shape becomes an absent
/// field, which the aggregator reports per record.
fn record_from_entry(entry: &Value) -> SourceRecord {
    let text = |ptr: &str| {
        entry
            .pointer(ptr)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    SourceRecord {
        type_name: text("/objectType/name"),
        label: text("/label"),
    }
}
