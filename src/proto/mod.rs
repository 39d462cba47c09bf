//! Vendored protobuf message definitions.
//!
//! These modules mirror the generated output of `prost-build` for the SAPM,
//! Jaeger api_v2, and OTLP trace schemas and are checked in so that builds do
//! not require `protoc`.

pub mod jaeger;
pub mod otlp;
pub mod sapm;
