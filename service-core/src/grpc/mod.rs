//! gRPC utilities shared by gateway middleware.
//!
//! This module provides:
//! - Error conversion between `AppError` and `tonic::Status`
//! - Metadata helpers for request ID and trace context

pub mod error;
pub mod interceptors;

pub use error::IntoStatus;
pub use interceptors::{
    REQUEST_ID_KEY, TRACEPARENT_KEY, extract_request_id, extract_traceparent,
    record_request_metadata,
};

// Re-export commonly used tonic types
pub use tonic::{Code, Request, Response, Status};
