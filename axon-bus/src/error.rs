//! Bus errors.

use axon_core::error::{JournalError, RegistryError};
use thiserror::Error;

/// Errors returned by [`Bus`](crate::Bus) operations.
///
/// Delivery failures are not errors: they are reported per subscription
/// in [`PublishReport`](crate::PublishReport) and dead-lettered.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    /// Subscription catalog rejected the operation.
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    /// The journal rejected the operation or its backend failed.
    #[error("journal: {0}")]
    Journal(#[from] JournalError),
}
