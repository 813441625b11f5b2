//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open writer, reader and in-memory connections.
//! - Configure pragmas required by core behavior.
//! - Trigger schema migrations before returning a writable connection.
//!
//! # Invariants
//! - Returned writer connections have migrations fully applied.
//! - File-backed writers run in WAL mode so readers never block them.
//! - Reader connections are opened read-only and never migrate.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the read-write connection for `address` and applies pending migrations.
///
/// `address` is a filesystem path or a `file:` URI.
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(address: &str, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=writer");

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let mut conn = match Connection::open_with_flags(address, flags) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=writer duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_writer(&mut conn, busy_timeout, !is_memory_address(address)) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode=writer duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=writer duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

/// Opens an in-memory database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap_writer(&mut conn, DEFAULT_BUSY_TIMEOUT, false)?;
    info!("event=db_open module=db status=ok mode=memory");
    Ok(conn)
}

/// Opens a read-only connection against an already-migrated database.
pub(crate) fn open_reader(address: &str, busy_timeout: Duration) -> DbResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(address, flags).inspect_err(|err| {
        error!(
            "event=db_open module=db status=error mode=reader error_code=db_open_failed error={}",
            err
        );
    })?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

/// Returns whether `address` names a private in-memory database.
///
/// Such databases cannot be shared with reader connections.
pub(crate) fn is_memory_address(address: &str) -> bool {
    let trimmed = address.trim();
    trimmed.is_empty() || trimmed == ":memory:" || trimmed.contains("mode=memory")
}

fn bootstrap_writer(conn: &mut Connection, busy_timeout: Duration, wal: bool) -> DbResult<()> {
    conn.busy_timeout(busy_timeout)?;
    if wal {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
    }
    apply_migrations(conn)?;
    Ok(())
}
