use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use http::header::{CONTENT_ENCODING, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, Method, Request, Uri};
use prost::Message;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::http_client::HttpClient;
use super::pause::PauseGate;
use super::{
    Compression, IngestResponse, SapmError, SendError, DEFAULT_RATE_LIMIT_BACKOFF_SECONDS,
};
use crate::proto::jaeger::Batch;
use crate::proto::sapm::PostSpansRequest;
use crate::protocol::{ACCESS_TOKEN_HEADER, CONTENT_TYPE_X_PROTOBUF};

/// A queued export: the payload, an optional per-request token override, and
/// the channel on which the worker reports the outcome.
pub(crate) struct ExportMessage {
    pub(crate) batches: Vec<Batch>,
    pub(crate) access_token: Option<String>,
    pub(crate) reply: oneshot::Sender<Result<(), SapmError>>,
}

/// An encoded, possibly compressed `PostSpansRequest` ready to send.
pub(crate) struct SerializedRequest {
    message: Vec<u8>,
    batches: i64,
    spans: i64,
}

/// A worker owns the full send path for one in-flight export: serialize,
/// compress, POST, classify, retry.
pub(crate) struct Worker {
    pub(crate) http_client: Arc<dyn HttpClient>,
    pub(crate) endpoint: Uri,
    pub(crate) access_token: Option<String>,
    pub(crate) compression: Compression,
    pub(crate) max_retries: u32,
    pub(crate) pause: Arc<PauseGate>,
}

impl Worker {
    /// Receives from the shared handoff channel until it closes, replying to
    /// each caller through its one-shot channel. A caller that went away is
    /// detected through the closed reply channel and its request abandoned.
    pub(crate) async fn run(self, requests: Arc<tokio::sync::Mutex<mpsc::Receiver<ExportMessage>>>) {
        loop {
            let message = { requests.lock().await.recv().await };
            let Some(message) = message else { break };

            let ExportMessage {
                batches,
                access_token,
                mut reply,
            } = message;

            let export = self.export(batches, access_token.as_deref());
            tokio::pin!(export);
            let result = tokio::select! {
                _ = reply.closed() => Err(SapmError::Cancelled),
                result = &mut export => result,
            };
            let _ = reply.send(result);
        }
    }

    async fn export(&self, batches: Vec<Batch>, access_token: Option<&str>) -> Result<(), SapmError> {
        let serialized = self.prepare(batches)?;
        debug!(
            batches = serialized.batches,
            spans = serialized.spans,
            "exporting spans"
        );

        let mut retries: u32 = 0;
        loop {
            self.pause.wait().await?;
            match self.send(&serialized, access_token).await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    if err.permanent {
                        warn!(status = err.status_code, "dropping request");
                        return Err(err.into());
                    }
                    if err.retry_delay_seconds > 0 {
                        self.pause
                            .raise(Duration::from_secs(err.retry_delay_seconds));
                    }
                    if retries >= self.max_retries {
                        warn!(
                            status = err.status_code,
                            attempts = retries + 1,
                            "export failed"
                        );
                        return Err(err.into());
                    }
                    retries += 1;
                    debug!(status = err.status_code, retries, "retrying export");
                }
            }
        }
    }

    /// Serializes the batches into a `PostSpansRequest` and applies the
    /// configured compression. No retries happen at this layer.
    pub(crate) fn prepare(&self, batches: Vec<Batch>) -> Result<SerializedRequest, SapmError> {
        let batch_count = batches.len() as i64;
        let span_count = batches.iter().map(|batch| batch.spans.len() as i64).sum();

        let encoded = PostSpansRequest { batches }.encode_to_vec();
        let message = match self.compression {
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&encoded)?;
                encoder.finish()?
            }
            Compression::Zstd => zstd::encode_all(encoded.as_slice(), 0)?,
            Compression::None => encoded,
        };

        Ok(SerializedRequest {
            message,
            batches: batch_count,
            spans: span_count,
        })
    }

    /// POSTs a prepared request once and classifies the response. An empty
    /// or absent token override falls back to the worker's default token.
    pub(crate) async fn send(
        &self,
        serialized: &SerializedRequest,
        access_token: Option<&str>,
    ) -> Result<IngestResponse, SendError> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(self.endpoint.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_X_PROTOBUF);
        if let Some(encoding) = self.compression.content_encoding() {
            builder = builder.header(CONTENT_ENCODING, encoding);
        }
        let access_token = access_token
            .filter(|token| !token.is_empty())
            .or(self.access_token.as_deref());
        if let Some(token) = access_token {
            builder = builder.header(ACCESS_TOKEN_HEADER, token);
        }

        let request = builder
            .body(serialized.message.clone())
            .map_err(|err| SendError::transport(err.to_string()))?;

        let response = match self.http_client.send(request).await {
            Ok(response) => response,
            Err(err) => return Err(SendError::transport(err.to_string())),
        };

        let status = response.status().as_u16();
        let retry_delay_seconds = retry_after_seconds(response.headers());
        let body = response.into_body();

        if (200..300).contains(&status) {
            return Ok(IngestResponse { body });
        }

        let body = (!body.is_empty()).then_some(body);
        match status {
            429 => Err(SendError::http(status, false, retry_delay_seconds, body)),
            400..=499 => Err(SendError::http(status, true, 0, body)),
            _ => Err(SendError::http(status, false, 0, body)),
        }
    }
}

/// Parses `Retry-After` as integer seconds. Missing, unparseable, or zero
/// values fall back to the default backoff so a misbehaving server cannot
/// cause a tight retry loop.
fn retry_after_seconds(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&seconds| seconds > 0)
        .unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF_SECONDS)
}
