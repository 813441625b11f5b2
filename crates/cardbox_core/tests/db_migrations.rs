use cardbox_core::db::migrations::latest_version;
use cardbox_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;
use std::time::Duration;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "cards");
    assert_index_exists(&conn, "idx_cards_deleted_created_at");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let address = dir.path().join("cards.db");
    let address = address.to_str().unwrap();

    let conn_first = open_db(address, Duration::from_secs(1)).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(address, Duration::from_secs(1)).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "cards");
}

#[test]
fn file_database_runs_in_wal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let address = dir.path().join("wal.db");
    let conn = open_db(address.to_str().unwrap(), Duration::from_secs(1)).unwrap();

    let mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(path.to_str().unwrap(), Duration::from_secs(1)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing table {table}");
}

fn assert_index_exists(conn: &Connection, index: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1);",
            [index],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "missing index {index}");
}
