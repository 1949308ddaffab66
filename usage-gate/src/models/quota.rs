//! Call-scoped storage quota.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// `available` value meaning the owner is billed per use and has no cap.
pub const UNLIMITED: i64 = -1;

/// Storage availability for the owner of a call, plus the bytes the handler
/// reports having added or removed.
///
/// Clones share the same delta, so the copy handed to the handler and the
/// copy kept for the post-call commit always agree.
#[derive(Debug, Clone)]
pub struct StorageQuota {
    used: i64,
    available: i64,
    delta: Arc<AtomicI64>,
}

impl StorageQuota {
    pub fn new(used: i64, available: i64) -> Self {
        Self {
            used,
            available,
            delta: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Bytes stored before this call.
    pub fn used(&self) -> i64 {
        self.used
    }

    /// Free bytes left, or [`UNLIMITED`].
    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn is_unlimited(&self) -> bool {
        self.available == UNLIMITED
    }

    /// Whether `additional` more bytes fit on top of what this call already recorded.
    pub fn fits(&self, additional: i64) -> bool {
        self.is_unlimited() || self.delta().saturating_add(additional) <= self.available
    }

    /// Add `bytes` (negative on deletion) to this call's consumption.
    pub fn record(&self, bytes: i64) {
        self.delta.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Overwrite this call's consumption.
    pub fn set_delta(&self, bytes: i64) {
        self.delta.store(bytes, Ordering::SeqCst);
    }

    /// Net bytes this call added.
    pub fn delta(&self) -> i64 {
        self.delta.load(Ordering::SeqCst)
    }
}
