//! CSV column source reading real files.

use std::io::Write;

use tsync_reconcile::aggregate;
use tsync_source::{CsvColumnSource, SourceError, SourceFetcher, SourceRecord};

#[tokio::test]
async fn reads_file_and_feeds_the_aggregator() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "Server,Laptop,\nweb-1,lt-1,stray\nweb-2,,\n").unwrap();

    let batch = CsvColumnSource::new(file.path()).fetch().await.unwrap();
    assert_eq!(batch.pages, 1);
    assert_eq!(batch.records[0], SourceRecord::new("Server", "web-1"));

    let agg = aggregate(batch.records);
    assert_eq!(agg.group.type_names().collect::<Vec<_>>(), vec!["Server", "Laptop"]);
    assert_eq!(agg.group.label_count(), 3);
    assert_eq!(agg.issues.len(), 1, "stray cell under a blank header is reported");
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let err = CsvColumnSource::new("/no/such/dir/assets.csv")
        .fetch()
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Io(_)), "{err}");
}

#[tokio::test]
async fn malformed_utf8_is_an_io_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"Server\n\xff\xfe\n").unwrap();
    let err = CsvColumnSource::new(file.path()).fetch().await.unwrap_err();
    assert!(matches!(err, SourceError::Io(_)), "{err}");
}
