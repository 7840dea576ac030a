//! Error types for HTTPMU client operations.
//!
//! The taxonomy mirrors the failure policy of the client: construction and
//! send-side failures are fatal to an operation, deadline expiry is not an
//! error at all, and per-packet parse failures never appear here because the
//! collector drops them on the floor (see [`crate::message::ParseError`]).

use std::io;

use thiserror::Error;

use crate::message::EncodeError;

/// Errors that can occur while constructing or driving an HTTPMU client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The local bind address could not be parsed as an IP address.
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),

    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket: {0}")]
    Bind(#[source] io::Error),

    /// The request could not be rendered into its wire form.
    #[error("request could not be encoded: {0}")]
    Encode(#[from] EncodeError),

    /// The destination host:port could not be resolved to a socket address.
    #[error("could not resolve destination address `{host}`")]
    Resolve {
        /// The host:port string that failed to resolve.
        host: String,
    },

    /// A datagram write transmitted fewer bytes than the encoded request.
    ///
    /// Integrity of the request on the wire is not guaranteed, so the
    /// operation is aborted rather than retried.
    #[error("short write: sent {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes actually written.
        written: usize,
        /// Bytes that should have been written.
        expected: usize,
    },

    /// The caller's cancellation signal fired during the receive window.
    ///
    /// Distinct from deadline expiry, which ends the window with `Ok(())`.
    #[error("operation canceled by caller")]
    Canceled,

    /// The client was closed, either before the operation started or while
    /// it was in flight.
    #[error("client is closed")]
    Closed,

    /// Any other socket-level I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Check whether this error means the operation was deliberately ended
    /// by the caller rather than failing on its own.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::Canceled | ClientError::Closed)
    }

    /// Check whether this error came from the send side of an operation.
    ///
    /// Send-side failures mean the request may never have reached the
    /// network; responses already collected remain valid either way.
    pub fn is_send_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Encode(_)
                | ClientError::Resolve { .. }
                | ClientError::ShortWrite { .. }
        )
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_classification() {
        assert!(ClientError::Canceled.is_cancellation());
        assert!(ClientError::Closed.is_cancellation());

        assert!(!ClientError::Resolve { host: "x:1900".into() }.is_cancellation());
        assert!(!ClientError::Io(io::Error::other("boom")).is_cancellation());
    }

    #[test]
    fn test_send_failure_classification() {
        assert!(ClientError::Resolve { host: "nowhere:0".into() }.is_send_failure());
        assert!(ClientError::ShortWrite { written: 3, expected: 64 }.is_send_failure());

        assert!(!ClientError::Canceled.is_send_failure());
        assert!(!ClientError::Closed.is_send_failure());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ClientError::ShortWrite { written: 10, expected: 120 };
        assert_eq!(err.to_string(), "short write: sent 10 of 120 bytes");

        let err = ClientError::Resolve { host: "239.255.255.250:1900".into() };
        assert!(err.to_string().contains("239.255.255.250:1900"));
    }
}
