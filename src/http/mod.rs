//! Shared HTTP plumbing for every network phase of a run.
//!
//! - [`RequestGate`] bounds simultaneous requests, globally and per host
//! - [`Session`] owns the connection pool and the gate for one run
//! - [`FetchError`] is the per-request failure taxonomy
//!
//! # Example
//!
//! ```no_run
//! use bookshelf_core::http::{Session, SessionSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Session::new(&SessionSettings::default())?;
//! let body: serde_json::Value = session
//!     .get_json("https://www.googleapis.com/books/v1/volumes/zyTCAlFPjgYC")
//!     .await?;
//! println!("{body}");
//! session.close();
//! # Ok(())
//! # }
//! ```

mod constants;
mod error;
mod gate;
mod session;

pub use constants::{
    DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};
pub use error::FetchError;
pub use gate::{GatePermit, RequestGate};
pub use session::{Session, SessionSettings};
