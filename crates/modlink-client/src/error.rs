//! Error domain exposed by the client proxy.
//!
//! Every transport failure, whatever its shape at the boundary, folds
//! into the single [`ServiceError`] before it reaches a caller. The
//! two conditions that are not transport failures get their own types:
//! an unsupported featured method ([`FeaturedMethodError::Unsupported`])
//! and a read on a deleted preference handle ([`StoreDeleted`]).

use modlink_proto::TransportError;
use thiserror::Error;

/// Uniform failure raised by proxy operations when the remote round
/// trip does not complete.
///
/// Callers are not expected to recover beyond treating the connection
/// as dead; the wrapped [`TransportError`] is carried for diagnostics,
/// not for dispatch.
#[derive(Debug, Error)]
#[error("module-host service error")]
pub struct ServiceError {
    #[from]
    source: TransportError,
}

impl ServiceError {
    /// The transport failure behind this error.
    #[must_use]
    pub const fn cause(&self) -> &TransportError {
        &self.source
    }
}

/// Failure surface of [`featured_method`].
///
/// [`featured_method`]: crate::service::ModuleService::featured_method
#[derive(Debug, Error)]
pub enum FeaturedMethodError {
    /// The remote implementation does not provide the named method.
    #[error("featured method `{name}` is not supported by this framework")]
    Unsupported {
        /// The method name the remote side did not recognize.
        name: String,
    },

    /// The round trip failed; same meaning as [`ServiceError`].
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// The preference group behind a handle has been deleted.
///
/// Terminal for the handle: every subsequent read or refresh on it
/// keeps failing with this error. Re-attaching the group through the
/// proxy produces a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("preference group `{group}` has been deleted")]
pub struct StoreDeleted {
    /// Name of the deleted group.
    pub group: String,
}

/// Failure surface of a snapshot refresh on a preference handle.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The group was deleted; the handle is permanently stale.
    #[error(transparent)]
    Deleted(#[from] StoreDeleted),

    /// The pull round trip failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

// =============================================================================
// Tests
// =============================================================================
