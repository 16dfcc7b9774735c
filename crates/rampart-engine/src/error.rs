//! Engine error types for `rampart-engine`.
//!
//! Every payload is safe to log: barrier ids, counts, durations and
//! non-secret reasons only.

use rampart_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced by configuration and verification.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Primitive-layer failure that could not be mapped to a barrier result.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Invalid strand configuration or unknown suite/framework name.
    #[error("configuration error: {0}")]
    Config(String),

    /// Required evidence is missing (shares, hardware, biometric, factors).
    #[error("insufficient evidence: {0}")]
    InsufficientEvidence(String),

    /// A barrier reported FAILED.
    #[error("barrier {barrier_id} failed: {reason}")]
    VerificationFailure {
        /// Barrier id, 1..=24.
        barrier_id: u8,
        /// Non-secret reason recorded in the barrier details.
        reason: String,
    },

    /// A barrier exceeded its time budget and was failed closed.
    #[error("barrier {barrier_id} timed out after {elapsed_ms}ms (budget {budget_ms}ms)")]
    Timeout {
        /// Barrier id, 1..=24.
        barrier_id: u8,
        /// Measured execution time.
        elapsed_ms: u64,
        /// Threat-scaled budget.
        budget_ms: u64,
    },

    /// No barrier failed, but warnings pushed risk to the ceiling.
    #[error("cumulative risk {risk:.3} reached ceiling {ceiling:.3}")]
    RiskExceeded {
        /// Sum of barrier risk contributions.
        risk: f64,
        /// Ceiling for the applied threat level.
        ceiling: f64,
    },

    /// Commitment or binding mismatch on a share, signature or proof.
    #[error("tamper detected: {0}")]
    TamperDetected(String),

    /// Configuration JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
