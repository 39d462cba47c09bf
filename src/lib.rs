//! # SAPM protocol client
//!
//! Exports distributed-tracing data to a SignalFx-compatible ingest endpoint
//! using SAPM, the Splunk APM Protocol: a protobuf `PostSpansRequest`
//! carrying Jaeger batches, POSTed over HTTP with optional gzip or zstd
//! compression.
//!
//! The [`SapmClient`] drives a fixed pool of workers fed through a bounded
//! handoff channel. Each worker owns the full send path — serialize,
//! compress, POST, classify the response, retry — and all workers honor a
//! shared pause raised whenever the server rate-limits, so one `429` backs
//! off the whole client for the server-directed delay.
//!
//! A companion subsystem, [`otlp`], translates OpenTelemetry (OTLP) trace
//! payloads received over HTTP into the SAPM wire form, and [`protocol`]
//! holds the shared request decoder used by both receive paths.
//!
//! ## Quickstart
//!
//! ```no_run
//! use sapm_proto::proto::jaeger::{Batch, Process, Span};
//! use sapm_proto::SapmClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sapm_proto::SapmError> {
//!     let client = SapmClient::builder("https://ingest.signalfx.com/v2/trace")
//!         .with_access_token("TOKEN")
//!         .build()?;
//!
//!     let batch = Batch {
//!         process: Some(Process {
//!             service_name: "my-service".to_owned(),
//!             tags: vec![],
//!         }),
//!         spans: vec![Span::default()],
//!     };
//!     client.export(vec![batch]).await?;
//!
//!     client.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery semantics
//!
//! Delivery is at-least-once with best-effort retries: transient failures
//! (transport errors, `5xx`, `429`) are retried up to the configured budget,
//! other `4xx` responses are permanent and surfaced immediately, and nothing
//! is spooled to disk.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![allow(elided_lifetimes_in_paths)]

pub mod client;
pub mod otlp;
pub mod proto;
pub mod protocol;

pub use client::{
    Compression, HttpClient, HttpError, IngestResponse, SapmClient, SapmClientBuilder, SapmError,
    SendError,
};
