//! One-shot datastore client initialization.
//!
//! # Responsibility
//! - Establish the shared `DatastoreClient` lazily, at most once at a time.
//! - Retry establishment with bounded linear backoff.
//! - Memoize the outcome for every later caller.
//!
//! # Invariants
//! - Establishment never runs concurrently with itself.
//! - Callers queued behind a running establishment observe its outcome
//!   instead of starting another one.
//! - A memoized failure is only re-armed after `rearm_after` has elapsed;
//!   with `rearm_after = None` a failure is permanent for the process.

use super::client::DatastoreClient;
use crate::config::DatastoreConfig;
use crate::request::RequestContext;
use crate::retry::retry_with_backoff;
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Establishment failed after exhausting every attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("datastore unavailable after {attempts} attempt(s): {reason}")]
pub struct ConnectError {
    pub attempts: u32,
    pub reason: String,
}

enum LatchState {
    Armed,
    Ready,
    Failed { error: ConnectError, at: Instant },
}

/// Owner of the process-wide datastore client.
pub struct ConnectionManager {
    config: DatastoreConfig,
    client: RwLock<Option<Arc<DatastoreClient>>>,
    latch: Mutex<LatchState>,
    attempts: AtomicUsize,
}

impl ConnectionManager {
    pub fn new(config: DatastoreConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            latch: Mutex::new(LatchState::Armed),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Returns the memoized client, establishing it on first use.
    pub fn get_client(&self) -> Result<Arc<DatastoreClient>, ConnectError> {
        if let Some(client) = self.client.read().as_ref() {
            return Ok(Arc::clone(client));
        }
        self.connect()
    }

    /// Establishes the client unless an earlier call already settled it.
    ///
    /// Runs under the exclusive latch; concurrent callers block until the
    /// running establishment finishes and then share its result.
    pub fn connect(&self) -> Result<Arc<DatastoreClient>, ConnectError> {
        let mut latch = self.latch.lock();

        match &*latch {
            LatchState::Ready => {
                if let Some(client) = self.client.read().as_ref() {
                    return Ok(Arc::clone(client));
                }
            }
            LatchState::Failed { error, at } => match self.config.rearm_after() {
                Some(window) if at.elapsed() >= window => {
                    info!(
                        "event=db_connect module=db status=rearm failed_for_ms={}",
                        at.elapsed().as_millis()
                    );
                }
                _ => return Err(error.clone()),
            },
            LatchState::Armed => {}
        }

        let retries = self.config.connect_retries.max(1);
        let outcome = retry_with_backoff(retries, self.config.retry_delay(), |attempt| {
            self.establish(attempt)
        });

        match outcome {
            Ok(client) => {
                let client = Arc::new(client);
                *self.client.write() = Some(Arc::clone(&client));
                *latch = LatchState::Ready;
                Ok(client)
            }
            Err(reason) => {
                let error = ConnectError {
                    attempts: retries,
                    reason,
                };
                error!(
                    "event=db_connect module=db status=exhausted attempts={} error={}",
                    retries, error.reason
                );
                *latch = LatchState::Failed {
                    error: error.clone(),
                    at: Instant::now(),
                };
                Err(error)
            }
        }
    }

    /// Number of single establishment attempts made so far.
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Returns whether a client is currently established.
    pub fn is_connected(&self) -> bool {
        self.client.read().is_some()
    }

    /// One attempt: open, migrate, then ping within the connection timeout.
    fn establish(&self, attempt: u32) -> Result<DatastoreClient, String> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let started_at = Instant::now();
        info!("event=db_connect module=db status=start attempt={attempt}");

        let address = self.config.expanded_address();
        let client = DatastoreClient::open(
            &address,
            self.config.pool_settings(),
            self.config.read_preference,
        )
        .map_err(|err| self.attempt_failed(attempt, started_at, "open", err.to_string()))?;

        let ping_ctx = RequestContext::new()
            .with_request_id(format!("db-connect-{attempt}"))
            .with_timeout(self.config.connection_timeout());
        client
            .ping(&ping_ctx)
            .map_err(|err| self.attempt_failed(attempt, started_at, "ping", err.to_string()))?;

        info!(
            "event=db_connect module=db status=ok attempt={} duration_ms={} read_preference={:?}",
            attempt,
            started_at.elapsed().as_millis(),
            client.read_preference()
        );
        Ok(client)
    }

    fn attempt_failed(
        &self,
        attempt: u32,
        started_at: Instant,
        stage: &str,
        reason: String,
    ) -> String {
        warn!(
            "event=db_connect module=db status=error attempt={} stage={} duration_ms={} error={}",
            attempt,
            stage,
            started_at.elapsed().as_millis(),
            reason
        );
        reason
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("attempts", &self.connect_attempts())
            .finish()
    }
}
