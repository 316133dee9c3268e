//! Error types for the collector server.

use nodewatch_core::EnvelopeError;
use thiserror::Error;

/// A read or write failure on a live connection.
///
/// Fatal to the owning read loop; never retried at this layer. The
/// message is carried as text because the collector side (axum) and
/// the relay side (tungstenite) surface different error types.
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

/// Reasons the mandatory first-frame handshake is rejected.
///
/// All variants are fatal: the connection is closed without a `ready`
/// acknowledgement and the session never reaches `Authenticated`.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The first frame decoded to something other than `hello`.
    #[error("unexpected first frame type {0:?}, expected \"hello\"")]
    NotHello(String),

    /// The presented secret does not match the configured one.
    #[error("shared secret mismatch")]
    SecretMismatch,

    /// The first frame did not decode, or its `secret`/`info` fields
    /// were missing or malformed.
    #[error("malformed hello frame: {0}")]
    BadHello(#[from] EnvelopeError),

    /// The `ready` acknowledgement could not be written.
    #[error("failed to send ready: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_messages() {
        let err = AuthError::NotHello("stats".into());
        assert!(err.to_string().contains("stats"));
        assert!(err.to_string().contains("hello"));

        let err = AuthError::SecretMismatch;
        assert_eq!(err.to_string(), "shared secret mismatch");
    }

    #[test]
    fn envelope_error_converts() {
        let bad = nodewatch_core::Envelope::decode("not json").unwrap_err();
        let err: AuthError = bad.into();
        assert!(matches!(err, AuthError::BadHello(_)));
    }

    #[test]
    fn transport_error_converts() {
        let err: AuthError = TransportError("broken pipe".into()).into();
        assert!(err.to_string().contains("broken pipe"));
    }
}
