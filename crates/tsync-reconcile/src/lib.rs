//! tsync-reconcile
//!
//! Tag-list reconciliation engine.
//!
//! - Source labels are grouped by type ([`aggregate`]).
//! - Destination lists are normalized from their wire shape ([`snapshot_adapter`]).
//! - Every label missing from its type's lists is packed into existing lists
//!   up to capacity; overflow goes into newly named lists ([`reconcile`]).
//!
//! Deterministic, pure logic. No IO. No destination calls. Problems with
//! individual records or lists are returned as data, never raised.

mod aggregate;
mod engine;
mod membership;
mod naming;
pub mod snapshot_adapter;
mod types;

pub use aggregate::{aggregate, Aggregation, RecordIssue};
pub use engine::{reconcile, ReconcilePlan, ReconcilePolicy, Reconciler, TypePlan};
pub use membership::{MembershipRule, UnknownMembershipRule};
pub use naming::{list_suffix, ListCounts};
pub use snapshot_adapter::{normalize, DestinationSnapshot, SnapshotIssue};
pub use types::*;
