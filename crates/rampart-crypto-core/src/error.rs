//! Cryptographic error types for `rampart-crypto-core`.
//!
//! Every message carried by these variants is safe to log: lengths, indices
//! and reasons only, never key bytes, share values or biometric features.

use thiserror::Error;

/// Errors produced by cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Structurally invalid parameters (threshold/share counts, unknown
    /// segment index, empty secret).
    #[error("configuration error: {0}")]
    Config(String),

    /// Not enough evidence to complete the operation (fewer shares than the
    /// threshold, missing attestation material).
    #[error("insufficient evidence: {0}")]
    InsufficientEvidence(String),

    /// A commitment or binding hash did not match: a share, signature or
    /// proof was modified after it was produced.
    #[error("tamper detected: {0}")]
    TamperDetected(String),

    /// HKDF or Argon2id derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Digital signature creation or verification failure.
    #[error("signature error: {0}")]
    Signature(String),

    /// Invalid key material (wrong length, corrupted bytes).
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Secure memory allocation or CSPRNG failure.
    #[error("secure memory error: {0}")]
    SecureMemory(String),

    /// Biometric enrollment or matching failure.
    #[error("biometric error: {0}")]
    Biometric(String),

    /// Hardware binding or attestation envelope failure.
    #[error("hardware key error: {0}")]
    HardwareKey(String),

    /// Binary encoding/decoding failure (signature or evidence envelopes).
    #[error("encoding error: {0}")]
    Encoding(String),
}
