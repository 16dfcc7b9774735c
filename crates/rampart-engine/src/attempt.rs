//! Evidence supplied for one authentication attempt.
//!
//! The engine never loads or stores anything: enrollment records arrive in
//! [`EnrolledCredentials`] from the storage collaborator, fresh evidence in
//! [`AuthenticationAttempt`].

use rampart_crypto_core::biometric::{BiometricSample, BiometricTemplate};
use rampart_crypto_core::hardware::HardwareBinding;
use rampart_crypto_core::signature::{MultiLayerPublicKey, MultiLayerSignature};
use rampart_crypto_core::threshold::ThresholdShare;
use rampart_crypto_core::vrf::VrfOutput;
use rampart_crypto_core::zkp::{self, ZkProof};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::policy::CryptoSuite;
use crate::threat::ThreatLevel;

const FINGERPRINT_DOMAIN: &[u8] = b"rampart credential fingerprint v1";

/// Suite-specific fingerprint of the master secret, stored at enrollment
/// and compared after reconstruction.
#[must_use]
pub fn secret_fingerprint(suite: CryptoSuite, secret: &[u8]) -> Vec<u8> {
    suite
        .parameters()
        .hash_algorithm
        .digest(FINGERPRINT_DOMAIN, secret)
}

// ── Enrollment record ──────────────────────────────────────────────

/// Typing rhythm captured at enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeystrokeProfile {
    pub mean_interval_ms: f64,
    pub std_dev_ms: f64,
}

/// Public material recorded when the principal enrolled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrolledCredentials {
    /// [`secret_fingerprint`] of the master secret.
    pub secret_fingerprint: Vec<u8>,
    /// [`zkp::derive_public_input`] of the master secret.
    pub zk_public_input: [u8; 32],
    pub signing_key: MultiLayerPublicKey,
    pub vrf_public_key: Option<[u8; 32]>,
    /// Binding captured at device enrollment.
    pub device: Option<HardwareBinding>,
    pub biometric: Option<BiometricTemplate>,
    pub keystroke: Option<KeystrokeProfile>,
}

impl EnrolledCredentials {
    /// Record the secret-derived fields for `secret` under `suite`; optional
    /// factors start empty.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Crypto` if `secret` is empty.
    pub fn for_secret(
        suite: CryptoSuite,
        secret: &[u8],
        signing_key: MultiLayerPublicKey,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            secret_fingerprint: secret_fingerprint(suite, secret),
            zk_public_input: zkp::derive_public_input(secret)?,
            signing_key,
            vrf_public_key: None,
            device: None,
            biometric: None,
            keystroke: None,
        })
    }
}

// ── Behavioral and network signals ─────────────────────────────────

/// A location fix with its Unix time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: u64,
}

/// Network context reported by the service layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkContext {
    /// 0.0 (known bad) to 1.0 (known good).
    pub ip_reputation: f64,
    pub previous_fix: Option<GeoFix>,
    pub current_fix: Option<GeoFix>,
}

/// Soft signals scored by the behavioral barriers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehavioralSignals {
    #[serde(default)]
    pub keystroke_intervals_ms: Vec<f64>,
    /// Caller's anomaly model output, 0.0 (normal) to 1.0 (anomalous).
    #[serde(default)]
    pub interaction_anomaly: Option<f64>,
    #[serde(default)]
    pub network: Option<NetworkContext>,
}

// ── Attempt ────────────────────────────────────────────────────────

/// Everything the engine sees for one attempt.
///
/// `challenge` is the server-issued nonce: the ZK proof message and the VRF
/// input both equal it. The signature covers [`signed_message`], which also
/// pins `requested_at`. Whether a challenge was issued recently and used
/// once is for the issuing service to track; the engine only bounds the
/// skew of the signed request time.
#[derive(Debug, Clone)]
pub struct AuthenticationAttempt {
    pub principal_id: String,
    pub challenge: Vec<u8>,
    /// Unix seconds at which the client built the request.
    pub requested_at: u64,
    /// Ignored when weaker than the strand's floor.
    pub threat_override: Option<ThreatLevel>,
    /// Attempts already made in the caller's rate window.
    pub prior_attempts: u32,
    pub shares: Vec<ThresholdShare>,
    pub zk_proof: Option<ZkProof>,
    pub vrf_output: Option<VrfOutput>,
    pub signature: Option<MultiLayerSignature>,
    pub hardware: Option<HardwareBinding>,
    pub biometric_sample: Option<BiometricSample>,
    pub behavior: BehavioralSignals,
    pub enrolled: EnrolledCredentials,
}

/// Bytes the principal signs: `challenge ‖ requested_at` (big-endian u64).
#[must_use]
pub fn signed_message(challenge: &[u8], requested_at: u64) -> Vec<u8> {
    let mut message = Vec::with_capacity(challenge.len().saturating_add(8));
    message.extend_from_slice(challenge);
    message.extend_from_slice(&requested_at.to_be_bytes());
    message
}

impl AuthenticationAttempt {
    /// [`signed_message`] for this attempt.
    #[must_use]
    pub fn signed_message(&self) -> Vec<u8> {
        signed_message(&self.challenge, self.requested_at)
    }

    /// Attempt carrying only identity, challenge and enrollment; fill the
    /// evidence fields directly.
    #[must_use]
    pub fn new(
        principal_id: impl Into<String>,
        challenge: Vec<u8>,
        requested_at: u64,
        enrolled: EnrolledCredentials,
    ) -> Self {
        Self {
            principal_id: principal_id.into(),
            challenge,
            requested_at,
            threat_override: None,
            prior_attempts: 0,
            shares: Vec::new(),
            zk_proof: None,
            vrf_output: None,
            signature: None,
            hardware: None,
            biometric_sample: None,
            behavior: BehavioralSignals::default(),
            enrolled,
        }
    }
}
