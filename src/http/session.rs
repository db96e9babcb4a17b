//! Per-run HTTP session: one connection pool plus one [`RequestGate`].
//!
//! A [`Session`] is built once per run and handed (by clone) to every
//! component that talks to the network. All requests go through the same
//! gate, so the concurrency cap holds across phases. Call
//! [`Session::close`] when the run ends, whatever its outcome.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use super::{FetchError, GatePermit, RequestGate};
use crate::user_agent;

/// Knobs used to build a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Cap on simultaneous in-flight requests across the whole run.
    pub max_concurrent_requests: usize,
    /// Cap on simultaneous requests to a single host.
    pub max_connections_per_host: usize,
    /// Total timeout for one request, body included.
    pub request_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_connections_per_host: DEFAULT_MAX_CONCURRENT_REQUESTS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Shared HTTP client and request gate for one run.
///
/// Cloning is cheap: clones share the connection pool and the gate.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    gate: RequestGate,
}

impl Session {
    /// Builds the connection pool and gate.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be constructed.
    #[instrument(level = "debug")]
    pub fn new(settings: &SessionSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(settings.request_timeout)
            .pool_max_idle_per_host(settings.max_connections_per_host.max(1))
            .user_agent(user_agent::default_user_agent())
            .gzip(true)
            .build()
            .map_err(|source| FetchError::ClientBuild { source })?;

        Ok(Self {
            client,
            gate: RequestGate::new(
                settings.max_concurrent_requests,
                settings.max_connections_per_host,
            ),
        })
    }

    /// The gate shared by every request of this session.
    #[must_use]
    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    /// GETs `url` and decodes a 200 body as JSON.
    ///
    /// The gate permit is held until the body has been read.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on invalid URL, closed session, transport
    /// failure or timeout, any status other than 200, or an undecodable body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let (_permit, response) = self.send(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::parse(url, e))
    }

    /// GETs `url` and streams a 200 body into `path`, returning bytes written.
    ///
    /// The file is only created once a 200 response has arrived. A partially
    /// written file is removed if the body read or the write fails.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on request failure or [`FetchError::Persistence`]
    /// if the file cannot be written.
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_file(&self, url: &str, path: &Path) -> Result<u64, FetchError> {
        let (_permit, response) = self.send(url).await?;

        let file = File::create(path)
            .await
            .map_err(|e| FetchError::persistence(path, e))?;

        let result = stream_to_file(file, response, url, path).await;
        if result.is_err() {
            debug!(path = %path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }

    /// Closes the gate so no further request can start.
    ///
    /// The connection pool is released when the last clone is dropped.
    pub fn close(&self) {
        if self.gate.is_closed() {
            return;
        }
        self.gate.close();
        info!("HTTP session closed");
    }

    async fn send(&self, url: &str) -> Result<(GatePermit, reqwest::Response), FetchError> {
        Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let permit = self.gate.acquire(url).await?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(url, e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if status != StatusCode::OK {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok((permit, response))
    }
}

async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::transport(url, e))?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::persistence(path, e))?;
        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::persistence(path, e))?;

    Ok(bytes_written)
}
