/// The request a client sends to a trace collection endpoint.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportTraceServiceRequest {
    /// An array of ResourceSpans.
    /// For data coming from a single resource this array will typically
    /// contain one element. Intermediary nodes (such as batchers) that
    /// receive data from multiple origins typically batch the data before
    /// forwarding further and in that case this array will contain multiple
    /// elements.
    #[prost(message, repeated, tag = "1")]
    pub resource_spans: ::prost::alloc::vec::Vec<super::trace::ResourceSpans>,
}
/// The (empty) response to an export request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExportTraceServiceResponse {}
