//! tsync-source
//!
//! Source inventory boundary. Everything here produces a flat sequence of
//! [`SourceRecord`]s; grouping and validation happen in `tsync-reconcile`.
//!
//! - [`ObjectQuerySource`]: paginated object-query HTTP API.
//! - [`CsvColumnSource`]: local CSV file, one column per type.

pub mod csv_column;
pub mod fetcher;
pub mod object_query;

pub use csv_column::{parse_csv_records, CsvColumnSource};
pub use fetcher::{SourceBatch, SourceError, SourceFetcher, SourceSummary};
pub use object_query::{ObjectQueryConfig, ObjectQuerySource, OBJECT_QUERY_PATH};

pub use tsync_reconcile::SourceRecord;
