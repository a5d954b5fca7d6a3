use super::*;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.query_count("SELECT 1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_table_and_view() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table_as("stg_messages", "SELECT 1 AS id, 'hello' AS message", false)
        .await
        .unwrap();
    db.create_view_as("v_messages", "SELECT * FROM stg_messages", false)
        .await
        .unwrap();

    assert_eq!(
        db.relation_kind("stg_messages").await.unwrap(),
        Some(RelationKind::Table)
    );
    assert_eq!(
        db.relation_kind("v_messages").await.unwrap(),
        Some(RelationKind::View)
    );
    assert!(db.relation_exists("main.v_messages").await.unwrap());
}

#[tokio::test]
async fn test_replace_recomputes() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table_as("t", "SELECT 1 AS n", true).await.unwrap();
    db.create_table_as("t", "SELECT * FROM range(3) r(n)", true)
        .await
        .unwrap();
    assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 3);

    let err = db.create_table_as("t", "SELECT 1 AS n", false).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_query_count() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE nums AS SELECT * FROM range(10) t(n)")
        .await
        .unwrap();

    let count = db
        .query_count("SELECT * FROM nums WHERE n % 2 = 0")
        .await
        .unwrap();
    assert_eq!(count, 5);
}

#[tokio::test]
async fn test_execution_error_carries_sql() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.execute("SELEC 1").await.unwrap_err();
    match &err {
        DbError::Statement { sql, .. } => assert_eq!(sql, "SELEC 1"),
        other => panic!("expected Statement, got {other:?}"),
    }
    assert!(err.to_string().contains("SELEC 1"));
}

#[tokio::test]
async fn test_missing_table_classified() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.query_count("SELECT * FROM nowhere").await.unwrap_err();
    assert!(matches!(err, DbError::RelationNotFound { .. }));
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
    assert_eq!(db.relation_kind("raw.nonexistent").await.unwrap(), None);
}

#[tokio::test]
async fn test_drop_if_exists_handles_both_kinds() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table_as("a_table", "SELECT 1 AS id", false)
        .await
        .unwrap();
    db.create_view_as("a_view", "SELECT 1 AS id", false)
        .await
        .unwrap();

    db.drop_if_exists("a_table").await.unwrap();
    db.drop_if_exists("a_view").await.unwrap();
    db.drop_if_exists("never_existed").await.unwrap();

    assert!(!db.relation_exists("a_table").await.unwrap());
    assert!(!db.relation_exists("a_view").await.unwrap());
}

#[tokio::test]
async fn test_create_schema_if_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_schema_if_not_exists("staging").await.unwrap();
    db.create_view_as("staging.stg_messages", "SELECT 1 AS id", false)
        .await
        .unwrap();
    assert!(db.relation_exists("staging.stg_messages").await.unwrap());
    assert!(!db.relation_exists("stg_messages").await.unwrap());

    db.create_schema_if_not_exists("staging").await.unwrap();
}

#[tokio::test]
async fn test_query_sample_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t AS SELECT * FROM range(5) r(n)")
        .await
        .unwrap();
    let rows = db.query_sample_rows("SELECT n FROM t", 2).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].contains('0'));
}

#[tokio::test]
async fn test_file_backed_database_persists() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("warehouse.duckdb");
    {
        let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
        db.create_table_as("kept", "SELECT 42 AS answer", false)
            .await
            .unwrap();
    }
    let db = DuckDbBackend::from_path(&path).unwrap();
    assert!(db.relation_exists("kept").await.unwrap());
}
