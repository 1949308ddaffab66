//! service-core: Shared infrastructure for gateway middleware crates.
pub mod config;
pub mod error;
pub mod grpc;
pub mod observability;

pub use error::AppError;

pub use tonic;
pub use tracing;
