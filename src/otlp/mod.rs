//! Translation of OTLP trace payloads into the SAPM wire form.
//!
//! The conversion targets the Jaeger model: one batch per resource, string
//! and scalar tags, OpenTracing span-kind conventions, and synthesized
//! status/error tags.

mod json;

use bytes::Bytes;
use prost_types::{Duration, Timestamp};

use crate::proto::jaeger::{
    Batch, KeyValue, Log, Process, Span as JaegerSpan, SpanRef, SpanRefType, ValueType,
};
use crate::proto::otlp::collector::ExportTraceServiceRequest;
use crate::proto::otlp::common::{any_value, AnyValue, InstrumentationLibrary};
use crate::proto::otlp::resource::Resource;
use crate::proto::otlp::trace::{span, status, ResourceSpans, Span};
use crate::proto::sapm::PostSpansRequest;
use crate::protocol::ParseError;

const ATTRIBUTE_SERVICE_NAME: &str = "service.name";

const TAG_MESSAGE: &str = "message";
const TAG_SPAN_KIND: &str = "span.kind";
const TAG_STATUS_CODE: &str = "status.code";
const TAG_STATUS_MESSAGE: &str = "status.message";
const TAG_ERROR: &str = "error";
const TAG_W3C_TRACE_STATE: &str = "w3c.tracestate";
const TAG_INSTRUMENTATION_NAME: &str = "otel.library.name";
const TAG_INSTRUMENTATION_VERSION: &str = "otel.library.version";

/// Service names used when OTLP data does not carry one.
const RESOURCE_NOT_SET: &str = "OTLPResourceNotSet";
const RESOURCE_NO_SERVICE_NAME: &str = "OTLPResourceNoServiceName";

/// `span.kind` values follow the OpenTracing semantic conventions.
const SPAN_KIND_CLIENT: &str = "client";
const SPAN_KIND_SERVER: &str = "server";
const SPAN_KIND_PRODUCER: &str = "producer";
const SPAN_KIND_CONSUMER: &str = "consumer";
const SPAN_KIND_INTERNAL: &str = "internal";

/// A span that cannot be represented in the Jaeger model.
///
/// Any such span fails the whole translation; partial batches are never
/// returned.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TranslationError {
    #[error("incorrect trace ID: expected 16 bytes, got {0}")]
    InvalidTraceId(usize),
    #[error("incorrect span ID: expected 8 bytes, got {0}")]
    InvalidSpanId(usize),
    #[error("incorrect parent span ID: expected 8 bytes, got {0}")]
    InvalidParentSpanId(usize),
    #[error("incorrect linked trace ID: expected 16 bytes, got {0}")]
    InvalidLinkTraceId(usize),
    #[error("incorrect linked span ID: expected 8 bytes, got {0}")]
    InvalidLinkSpanId(usize),
}

/// Errors from the OTLP receive path.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP request could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// The decoded payload could not be converted to SAPM.
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

/// Parses an OTLP trace export request from HTTP (decompressing if needed)
/// and converts it to SAPM.
pub fn parse_request(request: &http::Request<Bytes>) -> Result<PostSpansRequest, Error> {
    let otlp: ExportTraceServiceRequest = crate::protocol::parse_request(request)?;
    Ok(translate(otlp)?)
}

/// Converts an OTLP trace export request into a SAPM `PostSpansRequest`,
/// one Jaeger batch per non-empty resource.
pub fn translate(request: ExportTraceServiceRequest) -> Result<PostSpansRequest, TranslationError> {
    let mut batches = Vec::with_capacity(request.resource_spans.len());
    for resource_spans in &request.resource_spans {
        if let Some(batch) = resource_spans_to_batch(resource_spans)? {
            batches.push(batch);
        }
    }
    Ok(PostSpansRequest { batches })
}

fn resource_spans_to_batch(
    resource_spans: &ResourceSpans,
) -> Result<Option<Batch>, TranslationError> {
    if resource_spans.instrumentation_library_spans.is_empty() {
        return Ok(None);
    }

    let span_count = resource_spans
        .instrumentation_library_spans
        .iter()
        .map(|library_spans| library_spans.spans.len())
        .sum();
    let mut spans = Vec::with_capacity(span_count);
    for library_spans in &resource_spans.instrumentation_library_spans {
        for span in &library_spans.spans {
            spans.push(span_to_jaeger(
                span,
                library_spans.instrumentation_library.as_ref(),
            )?);
        }
    }

    // A span-less resource does not become an empty batch.
    if spans.is_empty() {
        return Ok(None);
    }

    Ok(Some(Batch {
        process: Some(resource_to_process(resource_spans.resource.as_ref())),
        spans,
    }))
}

fn resource_to_process(resource: Option<&Resource>) -> Process {
    let Some(resource) = resource else {
        return Process {
            service_name: RESOURCE_NOT_SET.to_owned(),
            tags: vec![],
        };
    };

    let mut service_name = RESOURCE_NO_SERVICE_NAME.to_owned();
    let mut tags = Vec::with_capacity(resource.attributes.len());
    for attribute in &resource.attributes {
        if attribute.key == ATTRIBUTE_SERVICE_NAME {
            service_name = match attribute.value.as_ref().and_then(|value| value.value.as_ref()) {
                Some(any_value::Value::StringValue(name)) => name.clone(),
                _ => String::new(),
            };
            continue;
        }
        tags.push(attribute_to_tag(&attribute.key, attribute.value.as_ref()));
    }

    Process { service_name, tags }
}

fn attribute_to_tag(key: &str, value: Option<&AnyValue>) -> KeyValue {
    let mut tag = KeyValue {
        key: key.to_owned(),
        ..Default::default()
    };
    match value.and_then(|value| value.value.as_ref()) {
        Some(any_value::Value::StringValue(s)) => {
            tag.v_type = ValueType::String as i32;
            tag.v_str = s.clone();
        }
        Some(any_value::Value::BoolValue(b)) => {
            tag.v_type = ValueType::Bool as i32;
            tag.v_bool = *b;
        }
        Some(any_value::Value::IntValue(i)) => {
            tag.v_type = ValueType::Int64 as i32;
            tag.v_int64 = *i;
        }
        Some(any_value::Value::DoubleValue(d)) => {
            tag.v_type = ValueType::Float64 as i32;
            tag.v_float64 = *d;
        }
        Some(any_value::Value::KvlistValue(list)) => {
            tag.v_type = ValueType::String as i32;
            tag.v_str = json::key_value_list_to_json(list);
        }
        Some(any_value::Value::ArrayValue(array)) => {
            tag.v_type = ValueType::String as i32;
            tag.v_str = json::array_value_to_json(array);
        }
        // An unset attribute becomes a string tag with an empty value.
        None => {}
    }
    tag
}

fn span_to_jaeger(
    span: &Span,
    library: Option<&InstrumentationLibrary>,
) -> Result<JaegerSpan, TranslationError> {
    if span.trace_id.len() != 16 {
        return Err(TranslationError::InvalidTraceId(span.trace_id.len()));
    }
    if span.span_id.len() != 8 {
        return Err(TranslationError::InvalidSpanId(span.span_id.len()));
    }

    Ok(JaegerSpan {
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        operation_name: span.name.clone(),
        references: make_references(&span.links, &span.parent_span_id, &span.trace_id)?,
        start_time: Some(unix_nano_to_timestamp(span.start_time_unix_nano)),
        duration: Some(duration_between(
            span.end_time_unix_nano,
            span.start_time_unix_nano,
        )),
        tags: build_span_tags(span, library),
        logs: events_to_logs(&span.events),
        ..Default::default()
    })
}

fn make_references(
    links: &[span::Link],
    parent_span_id: &[u8],
    trace_id: &[u8],
) -> Result<Vec<SpanRef>, TranslationError> {
    let has_parent = !parent_span_id.is_empty();
    let mut references = Vec::with_capacity(links.len() + usize::from(has_parent));

    // The parent goes first: backends look for it as the first CHILD_OF
    // reference.
    if has_parent {
        if parent_span_id.len() != 8 {
            return Err(TranslationError::InvalidParentSpanId(parent_span_id.len()));
        }
        references.push(SpanRef {
            trace_id: trace_id.to_vec(),
            span_id: parent_span_id.to_vec(),
            ref_type: SpanRefType::ChildOf as i32,
        });
    }

    for link in links {
        if link.trace_id.len() != 16 {
            return Err(TranslationError::InvalidLinkTraceId(link.trace_id.len()));
        }
        if link.span_id.len() != 8 {
            return Err(TranslationError::InvalidLinkSpanId(link.span_id.len()));
        }
        // OTLP links carry no reference type; CHILD_OF is reserved for the
        // parent, so links become FOLLOWS_FROM.
        references.push(SpanRef {
            trace_id: link.trace_id.clone(),
            span_id: link.span_id.clone(),
            ref_type: SpanRefType::FollowsFrom as i32,
        });
    }

    Ok(references)
}

fn build_span_tags(span: &Span, library: Option<&InstrumentationLibrary>) -> Vec<KeyValue> {
    let mut tags = Vec::new();

    if let Some(library) = library {
        if !library.name.is_empty() {
            tags.push(string_tag(TAG_INSTRUMENTATION_NAME, &library.name));
        }
        if !library.version.is_empty() {
            tags.push(string_tag(TAG_INSTRUMENTATION_VERSION, &library.version));
        }
    }

    for attribute in &span.attributes {
        tags.push(attribute_to_tag(&attribute.key, attribute.value.as_ref()));
    }

    if let Some(kind) = open_tracing_span_kind(span.kind) {
        tags.push(string_tag(TAG_SPAN_KIND, kind));
    }

    if let Some(span_status) = &span.status {
        tags.push(KeyValue {
            key: TAG_STATUS_CODE.to_owned(),
            v_type: ValueType::Int64 as i32,
            v_int64: i64::from(span_status.code),
            ..Default::default()
        });
        if span_status.code != status::StatusCode::Ok as i32 {
            tags.push(KeyValue {
                key: TAG_ERROR.to_owned(),
                v_type: ValueType::Bool as i32,
                v_bool: true,
                ..Default::default()
            });
        }
        if !span_status.message.is_empty() {
            tags.push(string_tag(TAG_STATUS_MESSAGE, &span_status.message));
        }
    }

    if !span.trace_state.is_empty() {
        tags.push(string_tag(TAG_W3C_TRACE_STATE, &span.trace_state));
    }

    tags
}

fn open_tracing_span_kind(kind: i32) -> Option<&'static str> {
    match span::SpanKind::try_from(kind).ok()? {
        span::SpanKind::Client => Some(SPAN_KIND_CLIENT),
        span::SpanKind::Server => Some(SPAN_KIND_SERVER),
        span::SpanKind::Producer => Some(SPAN_KIND_PRODUCER),
        span::SpanKind::Consumer => Some(SPAN_KIND_CONSUMER),
        span::SpanKind::Internal => Some(SPAN_KIND_INTERNAL),
        span::SpanKind::Unspecified => None,
    }
}

fn events_to_logs(events: &[span::Event]) -> Vec<Log> {
    events
        .iter()
        .map(|event| {
            let has_name = !event.name.is_empty();
            let mut fields = Vec::with_capacity(event.attributes.len() + usize::from(has_name));
            if has_name {
                fields.push(string_tag(TAG_MESSAGE, &event.name));
            }
            for attribute in &event.attributes {
                fields.push(attribute_to_tag(&attribute.key, attribute.value.as_ref()));
            }
            Log {
                timestamp: Some(unix_nano_to_timestamp(event.time_unix_nano)),
                fields,
            }
        })
        .collect()
}

fn string_tag(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_owned(),
        v_type: ValueType::String as i32,
        v_str: value.to_owned(),
        ..Default::default()
    }
}

fn unix_nano_to_timestamp(nanos: u64) -> Timestamp {
    // 0 is a special case and maps to the zero time.
    if nanos == 0 {
        return Timestamp::default();
    }
    Timestamp {
        seconds: (nanos / 1_000_000_000) as i64,
        nanos: (nanos % 1_000_000_000) as i32,
    }
}

fn duration_between(end_nanos: u64, start_nanos: u64) -> Duration {
    let delta = end_nanos as i128 - start_nanos as i128;
    Duration {
        seconds: (delta / 1_000_000_000) as i64,
        nanos: (delta % 1_000_000_000) as i32,
    }
}
