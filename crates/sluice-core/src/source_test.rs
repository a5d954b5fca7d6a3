use super::*;
use tempfile::TempDir;

const TELEGRAM_SOURCE: &str = r#"
kind: sources
name: raw
description: "Scraped Telegram channel data"
schema: raw
tables:
  - name: telegram_messages
    columns:
      - name: id
        type: BIGINT
        tests:
          - not_null
      - name: channel
        type: VARCHAR
"#;

#[test]
fn test_parse_source_file() {
    let source: SourceGroup = serde_yaml::from_str(TELEGRAM_SOURCE).unwrap();
    assert_eq!(source.name, "raw");
    assert_eq!(source.schema, "raw");
    assert_eq!(source.tables[0].columns.len(), 2);
    assert_eq!(
        source.qualified_name(&source.tables[0]),
        "raw.telegram_messages"
    );
}

#[test]
fn test_identifier_overrides_physical_name() {
    let group = SourceGroup::new("raw", "landing")
        .with_table(SourceTable::new("messages").with_identifier("telegram_messages_v2"));
    let table = group.table("messages").unwrap();
    assert_eq!(group.qualified_name(table), "landing.telegram_messages_v2");
}

#[test]
fn test_column_tests() {
    let source: SourceGroup = serde_yaml::from_str(TELEGRAM_SOURCE).unwrap();
    let tests = source.column_tests().unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].test_type, TestType::NotNull);
    assert_eq!(tests[0].name(), "source_not_null_raw_telegram_messages_id");
}

#[test]
fn test_validate_duplicate_table() {
    let group = SourceGroup::new("raw", "raw")
        .with_table(SourceTable::new("telegram_messages"))
        .with_table(SourceTable::new("telegram_messages"));
    assert!(matches!(
        group.validate(),
        Err(CoreError::SourceDuplicateTable { .. })
    ));
}

#[test]
fn test_validate_empty_tables() {
    let group = SourceGroup::new("raw", "raw");
    assert!(matches!(
        group.validate(),
        Err(CoreError::SourceEmptyTables { .. })
    ));
}

#[test]
fn test_load_rejects_wrong_kind() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("raw.yml");
    std::fs::write(&path, "kind: models\nname: raw\nschema: raw\ntables:\n  - name: t\n").unwrap();
    assert!(SourceGroup::load(&path).is_err());
}

#[test]
fn test_discover_sources_skips_other_yaml() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("sources");
    std::fs::create_dir_all(dir.join("nested")).unwrap();
    std::fs::write(dir.join("nested/raw.yml"), TELEGRAM_SOURCE).unwrap();
    std::fs::write(dir.join("notes.yml"), "description: not a source\n").unwrap();

    let sources = discover_sources(&[dir, temp.path().join("missing")]).unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].name, "raw");
}
