//! SAPM export client.
//!
//! A fixed-size pool of workers drains a bounded handoff channel; each worker
//! owns the whole send path for one in-flight export (serialize, compress,
//! POST, classify, retry). A single [`PauseGate`](pause::PauseGate) raised by
//! any worker on a rate-limit response holds every worker's next attempt
//! until the server-directed deadline passes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Uri;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

mod http_client;
mod pause;
#[cfg(test)]
mod testing;
mod worker;

pub use http_client::{HttpClient, HttpError};

use pause::PauseGate;
use worker::{ExportMessage, Worker};

use crate::proto::jaeger::Batch;

const DEFAULT_NUM_WORKERS: usize = 8;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_RATE_LIMIT_BACKOFF_SECONDS: u64 = 8;

/// Payload compression applied to outgoing requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Gzip, the default.
    #[default]
    Gzip,
    /// Zstandard.
    Zstd,
    /// No compression.
    None,
}

impl Compression {
    pub(crate) fn content_encoding(self) -> Option<&'static str> {
        match self {
            Compression::Gzip => Some(crate::protocol::ENCODING_GZIP),
            Compression::Zstd => Some(crate::protocol::ENCODING_ZSTD),
            Compression::None => None,
        }
    }
}

/// Body of a successful (2xx) ingest response, returned unmodified.
#[derive(Clone, Debug)]
pub struct IngestResponse {
    /// Raw response body; may be empty.
    pub body: Bytes,
}

/// HTTP transport or non-2xx response failure.
#[derive(Clone, Debug)]
pub struct SendError {
    /// HTTP status code; `0` for transport-level failures.
    pub status_code: u16,
    /// When true, retrying cannot succeed and the request should be dropped.
    pub permanent: bool,
    /// Server-directed backoff in seconds; non-zero only for rate-limit
    /// responses.
    pub retry_delay_seconds: u64,
    /// Response body, when the server sent one.
    pub body: Option<Bytes>,
    transport: Option<String>,
}

impl SendError {
    fn transport(message: String) -> Self {
        SendError {
            status_code: 0,
            permanent: false,
            retry_delay_seconds: 0,
            body: None,
            transport: Some(message),
        }
    }

    fn http(status_code: u16, permanent: bool, retry_delay_seconds: u64, body: Option<Bytes>) -> Self {
        SendError {
            status_code,
            permanent,
            retry_delay_seconds,
            body,
            transport: None,
        }
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.transport {
            return f.write_str(message);
        }
        if self.permanent {
            write!(
                f,
                "dropping request: server responded with: {}",
                self.status_code
            )
        } else {
            write!(
                f,
                "error exporting spans. server responded with status {}",
                self.status_code
            )
        }
    }
}

impl std::error::Error for SendError {}

/// Errors returned by [`SapmClient`] construction and export operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SapmError {
    /// The caller went away or the client was stopped before the export
    /// completed.
    #[error("export cancelled")]
    Cancelled,
    /// The batches could not be encoded or compressed.
    #[error("failed to serialize export request: {0}")]
    Serialization(#[from] std::io::Error),
    /// The server rejected the request or it could not be delivered.
    #[error(transparent)]
    Send(#[from] SendError),
    /// The configured endpoint is missing or not an absolute URL.
    #[error("invalid endpoint")]
    InvalidEndpoint,
    /// No HTTP client was provided and no default client is available.
    #[error("no http client provided")]
    NoHttpClient,
    /// The default reqwest client could not be constructed.
    #[cfg(feature = "reqwest-client")]
    #[error("reqwest failed with {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration for a [`SapmClient`].
#[derive(Debug)]
pub struct SapmClientBuilder {
    endpoint: Option<Uri>,
    http_client: Option<Arc<dyn HttpClient>>,
    num_workers: usize,
    max_retries: u32,
    access_token: Option<String>,
    compression: Compression,
}

impl SapmClientBuilder {
    /// Override the default HTTP client.
    pub fn with_http_client<C: HttpClient + 'static>(mut self, client: C) -> Self {
        self.http_client = Some(Arc::new(client));
        self
    }

    /// Set the number of workers; also the capacity of the handoff channel.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.num_workers = workers;
        self
    }

    /// Set how many times an export is retried after its first attempt.
    /// Zero means exactly one attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the default value sent in the `X-SF-Token` header.
    pub fn with_access_token<T: Into<String>>(mut self, token: T) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the payload compression method.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Validate the configuration and eagerly spawn the worker pool.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Result<SapmClient, SapmError> {
        let endpoint = self.endpoint.ok_or(SapmError::InvalidEndpoint)?;
        if endpoint.scheme().is_none() || endpoint.authority().is_none() {
            return Err(SapmError::InvalidEndpoint);
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => default_http_client()?,
        };

        let num_workers = self.num_workers.max(1);
        let pause = Arc::new(PauseGate::new());
        let (sender, receiver) = mpsc::channel(num_workers);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let mut workers = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let worker = Worker {
                http_client: Arc::clone(&http_client),
                endpoint: endpoint.clone(),
                access_token: self.access_token.clone(),
                compression: self.compression,
                max_retries: self.max_retries,
                pause: Arc::clone(&pause),
            };
            workers.push(tokio::spawn(worker.run(Arc::clone(&receiver))));
        }

        Ok(SapmClient {
            sender: std::sync::Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
            pause,
        })
    }
}

#[cfg(feature = "reqwest-client")]
fn default_http_client() -> Result<Arc<dyn HttpClient>, SapmError> {
    let client = reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .build()?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "reqwest-client"))]
fn default_http_client() -> Result<Arc<dyn HttpClient>, SapmError> {
    Err(SapmError::NoHttpClient)
}

/// Client for exporting Jaeger batches to a SAPM ingest endpoint.
///
/// `export` is safe to call from any task; when all workers are busy it
/// blocks until one frees up, which is the client's backpressure mechanism.
#[derive(Debug)]
pub struct SapmClient {
    sender: std::sync::Mutex<Option<mpsc::Sender<ExportMessage>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    pause: Arc<PauseGate>,
}

impl SapmClient {
    /// Start configuring a client for the given endpoint.
    pub fn builder<T>(endpoint: T) -> SapmClientBuilder
    where
        Uri: TryFrom<T>,
    {
        SapmClientBuilder {
            endpoint: Uri::try_from(endpoint).ok(),
            http_client: None,
            num_workers: DEFAULT_NUM_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            access_token: None,
            compression: Compression::default(),
        }
    }

    /// Deliver the batches as a single request, blocking while all workers
    /// are busy and returning the final outcome after any retries.
    pub async fn export(&self, batches: Vec<Batch>) -> Result<(), SapmError> {
        self.export_with_access_token(batches, None).await
    }

    /// Like [`export`](Self::export), but a non-empty `access_token`
    /// overrides the client's default token for this one request.
    pub async fn export_with_access_token(
        &self,
        batches: Vec<Batch>,
        access_token: Option<&str>,
    ) -> Result<(), SapmError> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| SapmError::Cancelled)?
            .clone()
            .ok_or(SapmError::Cancelled)?;

        let (reply_sender, reply) = oneshot::channel();
        let message = ExportMessage {
            batches,
            access_token: access_token
                .filter(|token| !token.is_empty())
                .map(str::to_owned),
            reply: reply_sender,
        };

        sender
            .send(message)
            .await
            .map_err(|_| SapmError::Cancelled)?;
        reply.await.map_err(|_| SapmError::Cancelled)?
    }

    /// Shut the client down: close the handoff channel, release every gate
    /// waiter with a cancellation, and wait for in-flight work to drain.
    /// Idempotent; no request is issued after `stop` returns.
    pub async fn stop(&self) {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        drop(sender);
        self.pause.stop();

        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            let _ = worker.await;
        }
    }
}
