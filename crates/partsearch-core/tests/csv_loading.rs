//! Loading spreadsheet exports from disk into a session

use std::io::Write;

use partsearch_core::loader::{CsvSource, RecordSource};
use partsearch_core::{DataStatus, Error, Lookup, LookupSession, Record, RecordStore};
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

const EXPORT: &str = "\
ID,Part Number,Description,Make/Buy
1,WX-100,Widget,Make
2,WX-200,\"Widget, XL\",Buy
,HB-7,Hex bolt,
4,,Orphan row,Buy

5,  M8 X 20  ,Machine screw,Buy
";

/// Helper to write an export to a temp file
fn export_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_export_from_file() {
    let file = export_file(EXPORT.as_bytes());
    let records = CsvSource::from_path(file.path()).load_records().unwrap();

    assert_eq!(
        records,
        vec![
            Record::new("1", "WX-100", "Widget", "Make"),
            Record::new("2", "WX-200", "Widget, XL", "Buy"),
            Record::new("3", "HB-7", "Hex bolt", "No result available"),
            Record::new("5", "M8 X 20", "Machine screw", "Buy"),
        ]
    );
}

#[test]
fn test_loaded_records_are_searchable() {
    let file = export_file(EXPORT.as_bytes());
    let store = RecordStore::new();
    store
        .load(CsvSource::from_path(file.path()).load_records().unwrap())
        .unwrap();

    assert_eq!(store.len(), 4);
    assert_eq!(store.find_by_id("3").unwrap().key, "HB-7");

    let mut session = LookupSession::default();
    session.reload(&CsvSource::from_path(file.path())).unwrap();
    match session.lookup("hb7") {
        Lookup::Found(m) => assert_eq!(m.record.label, "Hex bolt"),
        other => panic!("expected a match, got {:?}", other),
    }
}

#[test]
fn test_malformed_export_is_data_unavailable() {
    let file = export_file(b"ID,Part Number\n1,\"WX-100\n");
    let mut session = LookupSession::default();

    let err = session
        .reload(&CsvSource::from_path(file.path()))
        .unwrap_err();

    assert!(matches!(err, Error::Parse { line: 2, .. }));
    assert!(err.is_data_unavailable());
    assert!(matches!(session.status(), DataStatus::Unavailable { .. }));
}

#[test]
fn test_non_utf8_export_is_parse_error() {
    let file = export_file(b"ID,Part Number\n1,WX-\xfe100\n");
    let err = CsvSource::from_path(file.path())
        .load_records()
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
}

#[test]
fn test_missing_export_is_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let err = CsvSource::from_path(&missing).load_records().unwrap_err();
    match err {
        Error::Fetch { source_name, .. } => assert!(source_name.ends_with("missing.csv")),
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[test]
fn test_reader_source() {
    let source = CsvSource::from_reader("stdin", EXPORT.as_bytes()).unwrap();
    assert_eq!(source.name(), "stdin");
    assert_eq!(source.load_records().unwrap().len(), 4);
}

#[test]
fn test_multiline_description_keeps_data_available() {
    let file = export_file(
        b"ID,Part,Desc,Status\n1,WX-100,\"Widget\nsecond line\",Make\n2,WX-200,Gizmo,Buy\n",
    );
    let mut session = LookupSession::default();
    let stats = session.reload(&CsvSource::from_path(file.path())).unwrap();

    assert_eq!(stats.record_count, 2);
    assert!(session.is_ready());
    match session.lookup("wx200") {
        Lookup::Found(m) => assert_eq!(m.record.label, "Gizmo"),
        other => panic!("expected a match, got {:?}", other),
    }
    assert_eq!(
        session.store().find_by_id("1").unwrap().label,
        "Widget\nsecond line"
    );
}
