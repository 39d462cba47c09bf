//! SAPM wire constants and the shared request decoder.
//!
//! The decoder is used by both receive paths: SAPM payloads are unmarshalled
//! directly, OTLP payloads are unmarshalled here and then translated (see
//! [`crate::otlp`]).

use std::io::Read;
use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use bytes::Bytes;
use http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use http::Request;
use prost::Message;

use crate::proto::sapm::PostSpansRequest;

/// The endpoint used for SAPM v2 traces. The SAPM protocol started with v2;
/// there is no v1.
pub const TRACE_ENDPOINT_V2: &str = "/v2/trace";
/// The only Content-Type accepted on SAPM and OTLP requests.
pub const CONTENT_TYPE_X_PROTOBUF: &str = "application/x-protobuf";
/// Content-Encoding value for gzip-compressed payloads.
pub const ENCODING_GZIP: &str = "gzip";
/// Content-Encoding value for zstd-compressed payloads.
pub const ENCODING_ZSTD: &str = "zstd";
/// Header carrying the ingest access token.
pub const ACCESS_TOKEN_HEADER: &str = "X-SF-Token";

/// Errors surfaced to HTTP handlers by the request decoder.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The request Content-Type is not `application/x-protobuf`.
    #[error("bad content type")]
    BadContentType,
    /// The body could not be read, decompressed, or unmarshalled.
    #[error("bad request")]
    BadRequest(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::BadRequest(err.into())
    }
}

impl From<prost::DecodeError> for ParseError {
    fn from(err: prost::DecodeError) -> Self {
        ParseError::BadRequest(err.into())
    }
}

/// Decodes an HTTP request body into the protobuf message `M`.
///
/// The Content-Type must be `application/x-protobuf`. `gzip` and `zstd`
/// content encodings are recognized; an absent header means identity, and so
/// does any other value (the subsequent unmarshal rejects the body).
pub fn parse_request<M: Message + Default>(request: &Request<Bytes>) -> Result<M, ParseError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    if content_type != Some(CONTENT_TYPE_X_PROTOBUF) {
        return Err(ParseError::BadContentType);
    }

    let encoding = request
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok());
    let body = request.body().as_ref();

    match encoding {
        Some(ENCODING_GZIP) => {
            let mut buffer = PooledBuffer::acquire();
            flate2::read::GzDecoder::new(body).read_to_end(&mut buffer)?;
            Ok(M::decode(buffer.as_slice())?)
        }
        Some(ENCODING_ZSTD) => {
            let mut buffer = PooledBuffer::acquire();
            zstd::stream::read::Decoder::new(body)?.read_to_end(&mut buffer)?;
            Ok(M::decode(buffer.as_slice())?)
        }
        _ => Ok(M::decode(body)?),
    }
}

/// Decodes an HTTP request carrying a SAPM `PostSpansRequest`.
pub fn parse_sapm_request(request: &Request<Bytes>) -> Result<PostSpansRequest, ParseError> {
    parse_request(request)
}

static BUFFER_POOL: Mutex<Vec<Vec<u8>>> = Mutex::new(Vec::new());

const POOL_MAX_BUFFERS: usize = 16;

/// Decompression output buffer checked out of a process-wide pool, cleared
/// on acquire and returned on drop. Concurrent requests contend only on the
/// pool lock itself.
struct PooledBuffer(Vec<u8>);

impl PooledBuffer {
    fn acquire() -> Self {
        let mut buffer = BUFFER_POOL
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_default();
        buffer.clear();
        PooledBuffer(buffer)
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Ok(mut pool) = BUFFER_POOL.lock() {
            if pool.len() < POOL_MAX_BUFFERS {
                pool.push(std::mem::take(&mut self.0));
            }
        }
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use prost::Message;

    use super::*;
    use crate::proto::jaeger::{Batch, Process, Span};

    fn test_request() -> PostSpansRequest {
        PostSpansRequest {
            batches: vec![Batch {
                process: Some(Process {
                    service_name: "test_service".to_owned(),
                    tags: vec![],
                }),
                spans: vec![Span {
                    operation_name: "hello".to_owned(),
                    ..Default::default()
                }],
            }],
        }
    }

    fn build_request(
        body: Vec<u8>,
        content_type: Option<&str>,
        encoding: Option<&str>,
    ) -> Request<Bytes> {
        let mut builder = Request::builder().method("POST").uri(TRACE_ENDPOINT_V2);
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(encoding) = encoding {
            builder = builder.header(CONTENT_ENCODING, encoding);
        }
        builder.body(Bytes::from(body)).unwrap()
    }

    fn gzipped(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn parses_uncompressed_payload() {
        let expected = test_request();
        let request = build_request(
            expected.encode_to_vec(),
            Some(CONTENT_TYPE_X_PROTOBUF),
            None,
        );
        let parsed = parse_sapm_request(&request).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parses_gzip_payload() {
        let expected = test_request();
        let request = build_request(
            gzipped(&expected.encode_to_vec()),
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_GZIP),
        );
        let parsed = parse_sapm_request(&request).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parses_zstd_payload() {
        let expected = test_request();
        let body = zstd::encode_all(expected.encode_to_vec().as_slice(), 0).unwrap();
        let request = build_request(
            body,
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_ZSTD),
        );
        let parsed = parse_sapm_request(&request).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn rejects_missing_or_wrong_content_type() {
        let body = test_request().encode_to_vec();

        let request = build_request(body.clone(), None, None);
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadContentType)
        ));

        let request = build_request(body, Some("application/json"), None);
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadContentType)
        ));
    }

    #[test]
    fn rejects_corrupt_compressed_bodies() {
        let garbage = b"hello world".to_vec();

        let request = build_request(
            garbage.clone(),
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_GZIP),
        );
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadRequest(_))
        ));

        let request = build_request(
            garbage,
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_ZSTD),
        );
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_undecodable_protobuf() {
        // 0xff is an invalid field key, with and without a recognized
        // encoding header.
        let request = build_request(
            vec![0xff, 0xff, 0xff],
            Some(CONTENT_TYPE_X_PROTOBUF),
            None,
        );
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadRequest(_))
        ));

        let request = build_request(
            gzipped(&[0xff, 0xff, 0xff]),
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_GZIP),
        );
        assert!(matches!(
            parse_sapm_request(&request),
            Err(ParseError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_encoding_is_treated_as_identity() {
        let expected = test_request();
        let request = build_request(
            expected.encode_to_vec(),
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some("br"),
        );
        let parsed = parse_sapm_request(&request).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn empty_compressed_body_decodes_to_default() {
        let request = build_request(
            gzipped(&[]),
            Some(CONTENT_TYPE_X_PROTOBUF),
            Some(ENCODING_GZIP),
        );
        let parsed = parse_sapm_request(&request).unwrap();
        assert_eq!(parsed, PostSpansRequest::default());
    }
}
