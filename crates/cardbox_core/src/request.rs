//! Per-call request context.
//!
//! # Responsibility
//! - Carry the request correlation id used in every log line.
//! - Carry the caller deadline and cancellation signal down to the datastore.
//!
//! # Invariants
//! - A context is never shared across inbound calls; only its cancel handle is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Reason an operation stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    DeadlineExceeded,
    Cancelled,
}

/// Shared cancellation signal. Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context for one inbound call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    deadline: Option<Instant>,
    cancel: CancelHandle,
    caller: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Creates a context with a generated correlation id and no deadline.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            deadline: None,
            cancel: CancelHandle::default(),
            caller: None,
        }
    }

    /// Replaces the generated correlation id with one supplied by the caller.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attaches the caller identity resolved by the identity provider.
    ///
    /// Core does not validate it; token validation lives outside this crate.
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Returns why the call should stop, if it should.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn interrupt(&self) -> Option<Interrupt> {
        if self.cancel.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn check(&self) -> Result<(), Interrupt> {
        match self.interrupt() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Builds a `'static` probe that reports whether work should abort.
    ///
    /// Installed as the SQLite progress handler while a statement runs.
    pub(crate) fn abort_probe(&self) -> impl FnMut() -> bool + Send + std::panic::RefUnwindSafe + 'static {
        let cancel = Arc::clone(&self.cancel.0);
        let deadline = self.deadline;
        move || {
            cancel.load(Ordering::SeqCst)
                || deadline.is_some_and(|deadline| Instant::now() >= deadline)
        }
    }
}
