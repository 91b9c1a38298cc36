//! tsync-destination
//!
//! Destination tag-list boundary: the read/write traits the runtime drives,
//! the HTTP client that implements them, and the JSON payloads it sends.
//!
//! Success on write is exactly `204 No Content`. Any other status is a
//! [`WriteOutcome::Rejected`], which is data for the run report, not an
//! error. Only transport-level failures are [`DestinationError`]s.

pub mod client;
pub mod payload;
pub mod writer;

pub use client::{TopicListClient, TopicListConfig};
pub use payload::{render, ListPayload};
pub use writer::{apply, DestinationError, DestinationReader, DestinationWriter, WriteOutcome};
