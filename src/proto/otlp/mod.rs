//! OTLP trace data model, `opentelemetry.proto.*` schema.

pub mod collector;
pub mod common;
pub mod resource;
pub mod trace;
