use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

/// Opaque error type returned by [`HttpClient`] implementations.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A minimal interface necessary for sending serialized span batches over
/// HTTP.
///
/// Users sometimes choose http clients that rely on a certain runtime. This
/// trait allows users to bring their own choice of http client.
#[async_trait]
pub trait HttpClient: std::fmt::Debug + Send + Sync {
    /// Send the specified HTTP request.
    ///
    /// Returns the full response regardless of status code so the caller can
    /// classify it; only transport-level failures are errors.
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError>;
}

#[cfg(feature = "reqwest-client")]
#[async_trait]
impl HttpClient for reqwest::Client {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Bytes>, HttpError> {
        let request = request.try_into()?;
        let response = self.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut converted = Response::new(body);
        *converted.status_mut() = status;
        *converted.headers_mut() = headers;
        Ok(converted)
    }
}
