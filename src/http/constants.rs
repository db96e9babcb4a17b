//! Constants for the HTTP session (timeouts, concurrency bounds).

/// Default total timeout for a single request, body included (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default cap on simultaneous in-flight requests.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 100;
