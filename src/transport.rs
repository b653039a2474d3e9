/* infoowl - an analytics.js-style integration for Infoowl collectors
 * Copyright (C) 2023 Withings
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>. */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use byte_unit::Byte as ByteSize;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::task::JoinHandle;
use log;

/// Errors reported to send callbacks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SendError {
    /// The envelope could not be turned into JSON
    #[error("failed to serialise envelope: {0}")]
    Serialisation(String),

    /// Network connectivity issue (DNS, refused connection, timeout, ...)
    #[error("connection issue: {0}")]
    Connectivity(String),

    /// The collector answered with a non-2xx status
    #[error("collector replied {0} for {1}")]
    Status(u16, String),
}

/// What the collector sent back over HTTP
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Convenience type: outcome of a send, no response when a beacon took the payload
pub type SendResult = Result<Option<Response>, SendError>;

/// Completion callback for a single send
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(SendResult) + Send + Sync>);

impl Callback {
    pub fn new<F>(f: F) -> Self where F: Fn(SendResult) + Send + Sync + 'static {
        Self(Arc::new(f))
    }

    /// Does nothing, used when the caller did not provide a callback
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn call(&self, result: SendResult) {
        (self.0)(result)
    }
}

impl Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        f.write_str("Callback")
    }
}

/// Asynchronous HTTP POST, the fallback path for every event
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, headers: &[(&str, &str)], body: String) -> Result<Response, SendError>;
}

/// Fire-and-forget delivery: returns false when the payload could not be queued
pub trait Beacon: Send + Sync {
    fn send_beacon(&self, url: &str, body: &str) -> bool;
}

/// Issues a POST request and maps the outcome onto SendError
async fn post(client: &reqwest::Client, url: &str, headers: &[(&str, &str)], body: String) -> Result<Response, SendError> {
    let mut request = client.post(url).body(body);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = request.send().await.map_err(|e| SendError::Connectivity(e.to_string()))?;
    let status = response.status();
    let final_url = response.url().to_string();
    let body = response.text().await.map_err(|e| SendError::Connectivity(e.to_string()))?;

    match status.is_success() {
        true => Ok(Response { url: final_url, status: status.as_u16(), body }),
        false => Err(SendError::Status(status.as_u16(), url.to_string())),
    }
}

/// reqwest-backed HTTP transport
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client with the given request timeout
    pub fn new(timeout: Duration) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Connectivity(e.to_string()))?;
        Ok(Self { client })
    }

    /// Shares the underlying client, e.g. with a QueuedBeacon
    pub fn client(&self) -> reqwest::Client {
        self.client.clone()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, headers: &[(&str, &str)], body: String) -> Result<Response, SendError> {
        post(&self.client, url, headers, body).await
    }
}

/// Beacon emulation: queues the POST on the runtime and returns at once.
///
/// Like browsers, payloads over the size limit are refused so the caller
/// falls back to a regular request.
pub struct QueuedBeacon {
    client: reqwest::Client,
    payload_limit: ByteSize,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl QueuedBeacon {
    pub fn new(client: reqwest::Client, payload_limit: ByteSize) -> Self {
        Self {
            client,
            payload_limit,
            pending: Mutex::new(vec!()),
        }
    }

    /// Waits for every queued beacon to complete
    pub async fn drain(&self) {
        let pending: Vec<JoinHandle<()>> = self.pending.lock().drain(..).collect();
        for handle in pending {
            if let Err(e) = handle.await {
                log::warn!("beacon task failed: {}", e);
            }
        }
    }
}

impl Beacon for QueuedBeacon {
    fn send_beacon(&self, url: &str, body: &str) -> bool {
        let limit = self.payload_limit.as_u64();
        if limit != 0 && body.len() as u64 > limit {
            log::debug!("beacon payload too large ({} > {} bytes)", body.len(), limit);
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(r) => r,
            Err(_) => return false,
        };

        let client = self.client.clone();
        let url = url.to_string();
        let body = body.to_string();
        let handle = runtime.spawn(async move {
            let headers = [("Content-Type", "text/plain;charset=UTF-8")];
            if let Err(e) = post(&client, &url, &headers, body).await {
                log::debug!("beacon to {} failed: {}", url, e);
            }
        });
        let mut pending = self.pending.lock();
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
        true
    }
}
