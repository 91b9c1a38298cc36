use std::fmt;

use serde::Serialize;
use tsync_reconcile::snapshot_adapter::RawDestinationList;
use tsync_reconcile::{Entry, WriteIntent};

// ----- Outcome -----

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteOutcome {
    Applied,
    Rejected { status: u16, body: String },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

// ----- Errors -----

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    /// Network or transport failure.
    Transport(String),
    /// Non-success status on the read endpoint.
    Http { status: u16, body: String },
    /// Read response could not be decoded.
    Decode(String),
}

impl fmt::Display for DestinationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationError::Transport(msg) => write!(f, "destination transport error: {msg}"),
            DestinationError::Http { status, body } => {
                write!(f, "destination http error status={status}: {body}")
            }
            DestinationError::Decode(msg) => write!(f, "destination decode error: {msg}"),
        }
    }
}

impl std::error::Error for DestinationError {}

// ----- Traits -----

/// Single fetch of every list with its entries. No pagination contract.
#[async_trait::async_trait]
pub trait DestinationReader: Send + Sync {
    async fn fetch_lists(&self) -> Result<Vec<RawDestinationList>, DestinationError>;
}

/// Applies planned writes.
///
/// `update` is a full replace of the list's entries and must be idempotent.
/// `create` lets the destination assign the id.
#[async_trait::async_trait]
pub trait DestinationWriter: Send + Sync {
    async fn update(
        &self,
        id: &str,
        label: &str,
        entries: &[Entry],
    ) -> Result<WriteOutcome, DestinationError>;

    async fn create(&self, label: &str, entries: &[Entry])
        -> Result<WriteOutcome, DestinationError>;
}

/// Dispatch one intent to the matching writer call.
pub async fn apply(
    writer: &dyn DestinationWriter,
    intent: &WriteIntent,
) -> Result<WriteOutcome, DestinationError> {
    match intent {
        WriteIntent::UpdateList { id, label, entries } => writer.update(id, label, entries).await,
        WriteIntent::CreateList { label, entries } => writer.create(label, entries).await,
    }
}
