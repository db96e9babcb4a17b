//! Global and per-host concurrency gate for outbound requests.
//!
//! Every network operation in a run (catalog pages, detail lookups, image
//! downloads) acquires a [`GatePermit`] before sending and holds it until the
//! response body has been consumed. Dropping the permit releases it.
//!
//! # Example
//!
//! ```
//! use bookshelf_core::http::RequestGate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gate = RequestGate::new(2, 2);
//! let permit = gate.acquire("https://www.googleapis.com/books/v1/volumes").await?;
//! assert_eq!(gate.in_flight(), 1);
//! drop(permit);
//! assert_eq!(gate.in_flight(), 0);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, trace};
use url::Url;

use super::FetchError;

/// Shared concurrency limiter.
///
/// Cloning is cheap; clones share the same permit pools. Acquisition is not
/// FIFO across hosts but every waiter is eventually served.
#[derive(Debug, Clone)]
pub struct RequestGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    global: Arc<Semaphore>,
    max_in_flight: usize,
    per_host_limit: usize,
    /// Arc so the semaphore can be cloned out and the shard lock released
    /// before awaiting a permit.
    hosts: DashMap<String, Arc<Semaphore>>,
}

/// RAII permit returned by [`RequestGate::acquire`].
#[derive(Debug)]
pub struct GatePermit {
    _host: Option<OwnedSemaphorePermit>,
    _global: OwnedSemaphorePermit,
}

impl RequestGate {
    /// Creates a gate allowing `max_in_flight` requests overall and
    /// `per_host_limit` requests to any single host.
    ///
    /// Zero values are raised to 1 so the gate can always make progress.
    #[must_use]
    pub fn new(max_in_flight: usize, per_host_limit: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let per_host_limit = per_host_limit.max(1);
        debug!(max_in_flight, per_host_limit, "creating request gate");
        Self {
            inner: Arc::new(GateInner {
                global: Arc::new(Semaphore::new(max_in_flight)),
                max_in_flight,
                per_host_limit,
                hosts: DashMap::new(),
            }),
        }
    }

    /// Waits until both a host permit and a global permit are free.
    ///
    /// The host permit is taken first so a task waiting on a busy host does
    /// not sit on a global slot. URLs without a parseable host only take the
    /// global permit.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::SessionClosed`] once [`close`](Self::close) has been called.
    pub async fn acquire(&self, url: &str) -> Result<GatePermit, FetchError> {
        let host = match host_key(url) {
            Some(key) => {
                let semaphore = Arc::clone(
                    self.inner
                        .hosts
                        .entry(key)
                        .or_insert_with(|| Arc::new(Semaphore::new(self.inner.per_host_limit)))
                        .value(),
                );
                Some(
                    semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| FetchError::SessionClosed)?,
                )
            }
            None => None,
        };

        let global = Arc::clone(&self.inner.global)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::SessionClosed)?;

        trace!(url, in_flight = self.in_flight(), "gate permit acquired");
        Ok(GatePermit {
            _host: host,
            _global: global,
        })
    }

    /// Number of permits currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner
            .max_in_flight
            .saturating_sub(self.inner.global.available_permits())
    }

    /// Configured global cap.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight
    }

    /// Configured per-host cap.
    #[must_use]
    pub fn per_host_limit(&self) -> usize {
        self.inner.per_host_limit
    }

    /// Closes every pool. Pending and future acquisitions fail; permits
    /// already handed out stay valid until dropped.
    pub fn close(&self) {
        self.inner.global.close();
        for entry in self.inner.hosts.iter() {
            entry.value().close();
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.global.is_closed()
    }
}

fn host_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
