use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::ApiError;

/// A cached value of unknown type; readers downcast to what they expect.
pub(crate) type Erased = Arc<dyn Any + Send + Sync>;

/// A cached entry with timestamp and staleness information.
///
/// The last error is kept next to the data so a failed refetch can report
/// the failure while the previous value stays visible.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    pub data: Option<Erased>,
    pub error: Option<ApiError>,
    pub updated_at: Instant,
    pub is_stale: bool,
    /// Client-wide write counter at the time of the last write; lets
    /// watchers skip notifications for values they already emitted.
    pub revision: u64,
}

impl CacheEntry {
    pub fn new(data: Erased, revision: u64) -> Self {
        Self {
            data: Some(data),
            error: None,
            updated_at: Instant::now(),
            is_stale: false,
            revision,
        }
    }

    pub fn failed(error: ApiError, revision: u64) -> Self {
        Self {
            data: None,
            error: Some(error),
            updated_at: Instant::now(),
            is_stale: true,
            revision,
        }
    }

    /// Checks if this entry is stale based on the given stale time.
    pub fn check_staleness(&mut self, stale_time: Duration) -> bool {
        if self.updated_at.elapsed() >= stale_time {
            self.is_stale = true;
        }
        self.is_stale
    }

    pub fn mark_stale(&mut self) {
        self.is_stale = true;
    }

    /// Replaces the data, resetting timestamp, staleness and error.
    pub fn update(&mut self, data: Erased, revision: u64) {
        self.data = Some(data);
        self.error = None;
        self.updated_at = Instant::now();
        self.is_stale = false;
        self.revision = revision;
    }

    /// Swaps the data in place; timestamp, staleness and error are kept.
    pub fn replace_data(&mut self, data: Erased, revision: u64) {
        self.data = Some(data);
        self.revision = revision;
    }

    pub fn record_error(&mut self, error: ApiError, revision: u64) {
        self.error = Some(error);
        self.is_stale = true;
        self.revision = revision;
    }

    /// Whether this entry should be garbage collected based on cache time.
    pub fn should_gc(&self, cache_time: Duration) -> bool {
        self.updated_at.elapsed() > cache_time
    }

    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.data.as_deref()?.downcast_ref::<T>().cloned()
    }
}
