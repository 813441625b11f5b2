//! Shared datastore client: one writer plus a bounded reader pool.
//!
//! # Responsibility
//! - Serialize mutations through a single writer connection.
//! - Lend read-only connections according to the configured read preference.
//! - Enforce the caller deadline/cancellation while waiting and executing.
//!
//! # Invariants
//! - At most `max_size` reader connections are open at any time.
//! - Idle readers past `max_idle` are closed on checkout, never below `min_size`.
//! - No pool lock is held while a statement executes.

use super::open::{is_memory_address, open_db, open_reader};
use super::{DbError, DbResult};
use crate::request::RequestContext;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use rusqlite::Connection;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Progress handler granularity in SQLite virtual machine steps.
const PROGRESS_OPS: i32 = 1_000;
/// Upper bound between cancellation re-checks while waiting for a reader.
const WAIT_SLICE: Duration = Duration::from_millis(50);

/// Where read-only use-cases send their queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPreference {
    /// Reads share the writer connection and always observe the latest write.
    Primary,
    /// Reads use the reader pool and may trail an in-flight write.
    #[default]
    SecondaryPreferred,
}

/// Sizing and timeout bounds for the reader pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_size: usize,
    pub max_size: usize,
    pub max_idle: Duration,
    pub busy_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 8,
            max_idle: Duration::from_secs(300),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

struct IdleReader {
    conn: Connection,
    idle_since: Instant,
}

#[derive(Default)]
struct ReaderPool {
    idle: Vec<IdleReader>,
    open: usize,
}

/// Established datastore handle shared by all use-cases.
pub struct DatastoreClient {
    address: String,
    settings: PoolSettings,
    read_preference: ReadPreference,
    writer: Mutex<Connection>,
    readers: Mutex<ReaderPool>,
    reader_returned: Condvar,
}

impl std::fmt::Debug for DatastoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreClient")
            .field("settings", &self.settings)
            .field("read_preference", &self.read_preference)
            .finish_non_exhaustive()
    }
}

impl DatastoreClient {
    /// Opens the writer (running migrations) and the minimum reader set.
    ///
    /// Private in-memory databases cannot be shared, so they always fall
    /// back to `ReadPreference::Primary`.
    pub fn open(
        address: &str,
        settings: PoolSettings,
        read_preference: ReadPreference,
    ) -> DbResult<Self> {
        let writer = open_db(address, settings.busy_timeout)?;

        let read_preference = if is_memory_address(address) {
            if read_preference != ReadPreference::Primary {
                warn!("event=pool_init module=db status=fallback reason=memory_database read_preference=primary");
            }
            ReadPreference::Primary
        } else {
            read_preference
        };

        let mut pool = ReaderPool::default();
        if read_preference == ReadPreference::SecondaryPreferred {
            for _ in 0..settings.min_size.min(settings.max_size) {
                pool.idle.push(IdleReader {
                    conn: open_reader(address, settings.busy_timeout)?,
                    idle_since: Instant::now(),
                });
                pool.open += 1;
            }
        }
        debug!(
            "event=pool_init module=db status=ok readers={} max_readers={}",
            pool.open, settings.max_size
        );

        Ok(Self {
            address: address.to_string(),
            settings,
            read_preference,
            writer: Mutex::new(writer),
            readers: Mutex::new(pool),
            reader_returned: Condvar::new(),
        })
    }

    pub fn read_preference(&self) -> ReadPreference {
        self.read_preference
    }

    /// Number of reader connections currently open (idle or lent out).
    pub fn open_readers(&self) -> usize {
        self.readers.lock().open
    }

    /// Liveness check against the writer connection.
    pub fn ping(&self, ctx: &RequestContext) -> DbResult<()> {
        self.with_writer(ctx, |conn| {
            conn.query_row("SELECT 1;", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }

    /// Runs `op` on the writer connection.
    pub fn with_writer<T, E>(
        &self,
        ctx: &RequestContext,
        op: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        ctx.check().map_err(DbError::from)?;
        let writer = match ctx.deadline() {
            Some(deadline) => self
                .writer
                .try_lock_until(deadline)
                .ok_or(DbError::DeadlineExceeded)?,
            None => self.writer.lock(),
        };
        run_interruptible(&writer, ctx, op)
    }

    /// Runs `op` on a connection chosen by the read preference.
    pub fn with_reader<T, E>(
        &self,
        ctx: &RequestContext,
        op: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        if self.read_preference == ReadPreference::Primary {
            return self.with_writer(ctx, op);
        }

        let lease = self.checkout(ctx)?;
        run_interruptible(lease.conn(), ctx, op)
    }

    fn checkout(&self, ctx: &RequestContext) -> DbResult<ReaderLease<'_>> {
        let mut pool = self.readers.lock();
        loop {
            ctx.check()?;
            self.evict_expired(&mut pool);

            if let Some(idle) = pool.idle.pop() {
                return Ok(ReaderLease {
                    client: self,
                    conn: Some(idle.conn),
                });
            }

            if pool.open < self.settings.max_size {
                pool.open += 1;
                drop(pool);
                return match open_reader(&self.address, self.settings.busy_timeout) {
                    Ok(conn) => Ok(ReaderLease {
                        client: self,
                        conn: Some(conn),
                    }),
                    Err(err) => {
                        self.readers.lock().open -= 1;
                        self.reader_returned.notify_one();
                        Err(err)
                    }
                };
            }

            let mut wait_until = Instant::now() + WAIT_SLICE;
            if let Some(deadline) = ctx.deadline() {
                wait_until = wait_until.min(deadline);
            }
            self.reader_returned.wait_until(&mut pool, wait_until);
        }
    }

    fn evict_expired(&self, pool: &mut ReaderPool) {
        let max_idle = self.settings.max_idle;
        while pool.open > self.settings.min_size {
            let Some(index) = pool
                .idle
                .iter()
                .position(|reader| reader.idle_since.elapsed() > max_idle)
            else {
                break;
            };
            pool.idle.swap_remove(index);
            pool.open -= 1;
            debug!("event=pool_evict module=db status=ok open_readers={}", pool.open);
        }
    }

    fn checkin(&self, conn: Connection) {
        self.readers.lock().idle.push(IdleReader {
            conn,
            idle_since: Instant::now(),
        });
        self.reader_returned.notify_one();
    }
}

/// A reader on loan; returned to the pool on drop, including on panic.
struct ReaderLease<'a> {
    client: &'a DatastoreClient,
    conn: Option<Connection>,
}

impl ReaderLease<'_> {
    fn conn(&self) -> &Connection {
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("reader lease is populated until drop"))
    }
}

impl Drop for ReaderLease<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.client.checkin(conn);
        }
    }
}

fn run_interruptible<T, E>(
    conn: &Connection,
    ctx: &RequestContext,
    op: impl FnOnce(&Connection) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<DbError>,
{
    conn.progress_handler(PROGRESS_OPS, Some(ctx.abort_probe()));
    let result = op(conn);
    conn.progress_handler(0, None::<fn() -> bool>);
    result
}
