//! Failure signals raised at the service boundary.
//!
//! Every remote operation is a blocking round trip to the module-host
//! service, and every way that round trip can break is collapsed into
//! [`TransportError`]. Callers one layer up fold these into their own
//! error domain; nothing here is recoverable beyond "treat the
//! connection as dead and re-bootstrap".

use thiserror::Error;

/// A remote call could not complete.
///
/// Transport implementations must map their native failures onto these
/// variants so the client proxy can stay ignorant of the underlying
/// RPC mechanism.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection to the module-host service was severed before or
    /// during the call.
    #[error("connection to the module-host service was lost")]
    ConnectionLost,

    /// The module-host service process died while the call was in
    /// flight.
    #[error("module-host service process died")]
    ServiceDied,

    /// The reply arrived but could not be decoded into the expected
    /// shape.
    #[error("malformed reply from the module-host service: {reason}")]
    MalformedReply {
        /// What the decoder could not make sense of.
        reason: String,
    },

    /// The service reported an unexpected internal fault while
    /// handling the call.
    #[error("module-host service fault: {reason}")]
    Fault {
        /// Description relayed from the service side.
        reason: String,
    },
}

impl TransportError {
    /// Build a [`TransportError::MalformedReply`] from any printable
    /// reason.
    pub fn malformed_reply(reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            reason: reason.into(),
        }
    }

    /// Build a [`TransportError::Fault`] from any printable reason.
    pub fn fault(reason: impl Into<String>) -> Self {
        Self::Fault {
            reason: reason.into(),
        }
    }
}

/// Failure surface of the vendor extension call.
///
/// Unlike every other remote operation, the extension call can fail
/// because the named method simply does not exist on the remote side.
/// That outcome is not a transport problem and must stay
/// distinguishable from one, so the transport reports it as its own
/// variant instead of smuggling it through [`TransportError`].
#[derive(Debug, Error)]
pub enum FeaturedCallError {
    /// The remote implementation does not provide the requested
    /// method.
    #[error("featured method is not provided by this framework")]
    Unsupported,

    /// The round trip itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::ConnectionLost.to_string(),
            "connection to the module-host service was lost"
        );
        assert_eq!(
            TransportError::ServiceDied.to_string(),
            "module-host service process died"
        );
        assert_eq!(
            TransportError::malformed_reply("truncated frame").to_string(),
            "malformed reply from the module-host service: truncated frame"
        );
        assert_eq!(
            TransportError::fault("store unwritable").to_string(),
            "module-host service fault: store unwritable"
        );
    }

    #[test]
    fn test_featured_call_error_wraps_transport() {
        let err = FeaturedCallError::from(TransportError::ConnectionLost);
        assert!(matches!(err, FeaturedCallError::Transport(_)));
        // Transparent display: the wrapper adds no prefix of its own.
        assert_eq!(
            err.to_string(),
            "connection to the module-host service was lost"
        );
    }

    #[test]
    fn test_unsupported_is_not_a_transport_failure() {
        let err = FeaturedCallError::Unsupported;
        assert!(!matches!(err, FeaturedCallError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "featured method is not provided by this framework"
        );
    }
}
