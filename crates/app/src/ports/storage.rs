//! Storage port: the append-only sample table.

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use uhilog_domain::sample::{NumberedSample, Sample};

/// A storage operation failed. The source is adapter specific.
#[derive(Debug, thiserror::Error)]
#[error("storage failure")]
pub struct StorageError(#[source] Box<dyn Error + Send + Sync>);

impl StorageError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Local table of joined sensor and location samples.
///
/// Writers are serialised by the session, so `append` and `delete_all` are
/// never invoked concurrently.
pub trait SampleStore: Send + Sync {
    /// Persist one sample.
    fn append(&self, sample: Sample) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete every stored sample.
    fn delete_all(&self) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// All samples ordered by timestamp.
    fn all(&self) -> impl Future<Output = Result<Vec<Sample>, StorageError>> + Send;

    /// All samples with their 1-based export row number.
    fn numbered(&self) -> impl Future<Output = Result<Vec<NumberedSample>, StorageError>> + Send;

    /// Drop the underlying handle so the next call reopens it.
    fn invalidate(&self) -> impl Future<Output = ()> + Send;
}

impl<T: SampleStore> SampleStore for Arc<T> {
    fn append(&self, sample: Sample) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).append(sample)
    }

    fn delete_all(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).delete_all()
    }

    fn all(&self) -> impl Future<Output = Result<Vec<Sample>, StorageError>> + Send {
        (**self).all()
    }

    fn numbered(&self) -> impl Future<Output = Result<Vec<NumberedSample>, StorageError>> + Send {
        (**self).numbered()
    }

    fn invalidate(&self) -> impl Future<Output = ()> + Send {
        (**self).invalidate()
    }
}
