//! tsync-runtime
//!
//! One reconciliation pass, start to finish:
//!
//! 1. fetch source records, aggregate by type;
//! 2. fetch and normalize destination lists;
//! 3. for each type in first-seen order, plan against the live in-memory
//!    snapshot, then dispatch that type's intents (or render them in dry-run);
//! 4. return a [`RunReport`].
//!
//! The pass is strictly sequential. Nothing but the pass touches the
//! snapshot while it runs.

mod pass;
mod report;

pub use pass::{PassError, PassOptions, SyncPass};
pub use report::{DispatchStatus, IntentRecord, RunReport, TypeSummary};
