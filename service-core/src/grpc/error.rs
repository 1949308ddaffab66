//! Error conversion utilities between `AppError` and `tonic::Status`.
//!
//! | AppError | gRPC Status |
//! |----------|-------------|
//! | `NotFound` | `NOT_FOUND` |
//! | `Unauthorized` | `UNAUTHENTICATED` |
//! | `Forbidden` | `PERMISSION_DENIED` |
//! | `FailedPrecondition` | `FAILED_PRECONDITION` |
//! | `ResourceExhausted` | `RESOURCE_EXHAUSTED` |
//! | `Upstream` | unchanged |
//! | `InternalError` | `INTERNAL` |

use tonic::{Code, Status};

use crate::error::AppError;

/// Extension trait for converting types into `tonic::Status`.
pub trait IntoStatus {
    /// Convert into a `tonic::Status`.
    fn into_status(self) -> Status;
}

impl IntoStatus for AppError {
    fn into_status(self) -> Status {
        match self {
            AppError::NotFound(err) => Status::not_found(err.to_string()),
            AppError::Unauthorized(err) => Status::unauthenticated(err.to_string()),
            AppError::Forbidden(err) => Status::permission_denied(err.to_string()),
            AppError::FailedPrecondition(err) => Status::failed_precondition(err.to_string()),
            AppError::ResourceExhausted(msg) => Status::resource_exhausted(msg),
            AppError::Upstream(status) => status,
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                Status::internal("Internal server error")
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                Status::internal("Configuration error")
            }
        }
    }
}

impl From<AppError> for Status {
    fn from(err: AppError) -> Self {
        err.into_status()
    }
}

/// Convert a `tonic::Status` received from a downstream service into an `AppError`.
///
/// `NOT_FOUND` becomes `AppError::NotFound` so callers can branch on it; every
/// other status is kept as-is.
impl From<Status> for AppError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound => AppError::NotFound(anyhow::anyhow!("{}", status.message())),
            _ => AppError::Upstream(status),
        }
    }
}
