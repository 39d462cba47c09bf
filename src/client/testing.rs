//! Mock HTTP client used by the client and worker test suites.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Response, Uri};
use tokio::time::Instant;

use super::http_client::{HttpClient, HttpError};

#[derive(Debug, Default)]
struct MockState {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Option<String>,
    error: Option<String>,
    delay: Option<Duration>,
    requests: Vec<RecordedRequest>,
}

/// A request observed by the mock, captured after any configured delay.
#[derive(Clone, Debug)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub received_at: Instant,
}

/// Records every request and answers with a configurable canned response,
/// optional delay, or transport error.
#[derive(Clone, Debug)]
pub(crate) struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    pub(crate) fn new() -> Self {
        MockHttpClient {
            state: Arc::new(Mutex::new(MockState {
                status: 200,
                ..Default::default()
            })),
        }
    }

    pub(crate) fn with_status(self, status: u16) -> Self {
        self.state.lock().unwrap().status = status;
        self
    }

    pub(crate) fn with_header(self, name: &'static str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .headers
            .push((name, value.to_owned()));
        self
    }

    pub(crate) fn with_body(self, body: &str) -> Self {
        self.state.lock().unwrap().body = Some(body.to_owned());
        self
    }

    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().delay = Some(delay);
        self
    }

    /// Clears recorded requests and canned behavior, keeping only `status`.
    pub(crate) fn reset(&self, status: u16) {
        let mut state = self.state.lock().unwrap();
        *state = MockState {
            status,
            ..Default::default()
        };
    }

    pub(crate) fn set_header(&self, name: &'static str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .headers
            .push((name, value.to_owned()));
    }

    pub(crate) fn set_error(&self, message: &str) {
        self.state.lock().unwrap().error = Some(message.to_owned());
    }

    pub(crate) fn set_body(&self, body: &str) {
        self.state.lock().unwrap().body = Some(body.to_owned());
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        let (parts, body) = request.into_parts();
        state.requests.push(RecordedRequest {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            received_at: Instant::now(),
        });

        if let Some(message) = &state.error {
            return Err(message.clone().into());
        }

        let mut response = Response::builder().status(state.status);
        for (name, value) in &state.headers {
            response = response.header(*name, value.as_str());
        }
        let body = Bytes::from(state.body.clone().unwrap_or_default());
        Ok(response.body(body).expect("mock response"))
    }
}
