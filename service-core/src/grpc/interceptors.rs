//! gRPC metadata helpers for cross-cutting concerns.
//!
//! Request IDs and trace context arrive as metadata on every call; these
//! helpers read them so middleware can attach them to its spans.

use tonic::metadata::MetadataMap;

/// gRPC metadata key for W3C traceparent header.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// gRPC metadata key for request ID.
pub const REQUEST_ID_KEY: &str = "x-request-id";

fn metadata_str(metadata: &MetadataMap, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract the request ID from incoming gRPC request metadata.
pub fn extract_request_id(metadata: &MetadataMap) -> Option<String> {
    metadata_str(metadata, REQUEST_ID_KEY)
}

/// Extract the W3C traceparent from incoming gRPC request metadata.
pub fn extract_traceparent(metadata: &MetadataMap) -> Option<String> {
    metadata_str(metadata, TRACEPARENT_KEY)
}

/// Record request identifiers from `metadata` on the current span.
///
/// The span must declare a `request_id` field for the value to be kept.
pub fn record_request_metadata(metadata: &MetadataMap) {
    if let Some(request_id) = extract_request_id(metadata) {
        tracing::Span::current().record("request_id", request_id.as_str());
    }

    if let Some(traceparent) = extract_traceparent(metadata) {
        tracing::debug!(traceparent = %traceparent, "Received trace context");
    }
}
