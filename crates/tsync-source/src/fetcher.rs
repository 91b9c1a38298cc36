//! Source fetcher trait and its result/error types.

use std::fmt;

use serde::Serialize;
use tsync_reconcile::SourceRecord;

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Everything one fetch produced.
///
/// A fetch that stopped early is still a batch: `truncation` carries the
/// reason and `records` holds whatever arrived before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceBatch {
    pub records: Vec<SourceRecord>,
    /// Pages (or files) read successfully.
    pub pages: u32,
    pub truncation: Option<String>,
}

impl SourceBatch {
    pub fn complete(records: Vec<SourceRecord>, pages: u32) -> Self {
        Self {
            records,
            pages,
            truncation: None,
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }
}

/// Loggable summary of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub records: usize,
    pub pages: u32,
    pub truncation: Option<String>,
}

impl SourceSummary {
    pub fn of(source: &str, batch: &SourceBatch) -> Self {
        Self {
            source: source.to_string(),
            records: batch.records.len(),
            pages: batch.pages,
            truncation: batch.truncation.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors a [`SourceFetcher`] may return.
///
/// Only failures that leave *nothing* usable are errors. Mid-pagination
/// failures truncate the batch instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Network or transport failure.
    Transport(String),
    /// Non-success HTTP status.
    Http { status: u16, body: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// Local file could not be read or parsed.
    Io(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Transport(msg) => write!(f, "source transport error: {msg}"),
            SourceError::Http { status, body } => {
                write!(f, "source http error status={status}: {body}")
            }
            SourceError::Decode(msg) => write!(f, "source decode error: {msg}"),
            SourceError::Io(msg) => write!(f, "source io error: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Fetcher trait
// ---------------------------------------------------------------------------

/// Upstream inventory contract.
///
/// Object safe and `Send + Sync` so the runtime can hold a
/// `Box<dyn SourceFetcher>` across await points.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Short name used in logs and reports (e.g. `"object_query"`).
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<SourceBatch, SourceError>;
}
