//! HTTP fetch primitive used by the polling loop.
//!
//! The backend is a set of PHP scripts queried over plain GET requests, so the
//! whole transport surface is a single "fetch a text body from a URL" call.
//! The loop treats every transport failure as "no data this cycle": errors are
//! logged by the caller and never abort synchronization.

use log::debug;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Failures while talking to the match backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout or URL problems surfaced by the HTTP client.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The backend answered with something other than 200/201.
    #[error("unexpected status code {0}")]
    Status(u16),
}

/// Fetches a text/JSON body over HTTP GET with a per-request timeout.
pub trait Transport {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// reqwest-backed [`Transport`]. Cheap to clone; clones share the underlying
/// connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        let request = self.client.get(url).timeout(timeout);
        async move {
            let response = request.send().await?;
            match response.status().as_u16() {
                200 | 201 => {
                    let body = response.text().await?;
                    debug!("GET ok, {} bytes", body.len());
                    Ok(body)
                }
                code => Err(TransportError::Status(code)),
            }
        }
    }
}
