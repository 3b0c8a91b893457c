//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format: expected 64 bytes, got {0}")]
    InvalidSignatureFormat(usize),

    /// Bytes do not describe a point on the curve
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Malformed StrKey text
    #[error("Invalid strkey: {0}")]
    InvalidStrKey(String),
}
