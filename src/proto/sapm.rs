/// PostSpansRequest is the only request accepted by the SAPM ingest endpoint.
/// It carries one or more Jaeger batches.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PostSpansRequest {
    /// Jaeger batches, keyed by service.
    #[prost(message, repeated, tag = "1")]
    pub batches: ::prost::alloc::vec::Vec<super::jaeger::Batch>,
}
/// PostSpansResponse is the empty acknowledgement body returned by a SAPM
/// ingest endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PostSpansResponse {}
