//! Hardware binding and attestation evidence.
//!
//! The core never talks to a TPM or secure enclave. A caller-side driver
//! produces an [`AttestationEvidence`] envelope at enrollment; every attempt
//! re-presents it inside a [`HardwareBinding`], which this module checks
//! for *shape* (fail-closed). Cryptographic trust in the evidence is
//! delegated to an [`AttestationVerifier`] collaborator when one is wired in.
//!
//! # Envelope
//!
//! ```text
//! Magic "RATT" (4 B) | Version (1 B) | Format (1 B) | u32 LE len | payload | u32 LE len | signature
//! ```
//!
//! # Binding signature
//!
//! `SHA-256(domain ‖ device_id ‖ evidence ‖ timestamp)` ties the evidence to
//! the device identifier and enrollment time, so neither can be swapped
//! without re-enrolling.

use ring::hkdf;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::{SecretBuffer, SecretBytes};
use crate::quantum::{constant_time_eq, digest_256, DIGEST_LEN};
use crate::signature::Reader;

/// Envelope magic.
pub const ATTESTATION_MAGIC: &[u8; 4] = b"RATT";

/// Envelope version.
pub const ATTESTATION_VERSION: u8 = 1;

const BINDING_DOMAIN: &[u8] = b"rampart hardware binding v1";
const HKDF_SALT: &[u8] = b"rampart-hardware-v1";
const HKDF_INFO: &[u8] = b"hardware-wrapping-key";
const MIN_TOKEN_LEN: usize = 16;
const WRAPPING_KEY_LEN: usize = 32;

/// Source of the attestation statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AttestationFormat {
    Tpm2Quote = 1,
    SecureEnclave = 2,
    AndroidKeystore = 3,
    WebAuthn = 4,
}

impl AttestationFormat {
    const fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Tpm2Quote),
            2 => Some(Self::SecureEnclave),
            3 => Some(Self::AndroidKeystore),
            4 => Some(Self::WebAuthn),
            _ => None,
        }
    }
}

/// Decoded attestation envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationEvidence {
    pub format: AttestationFormat,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl AttestationEvidence {
    /// Encode to the `RATT` envelope.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` if a field exceeds `u32::MAX` bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::with_capacity(
            self.payload
                .len()
                .saturating_add(self.signature.len())
                .saturating_add(14),
        );
        out.extend_from_slice(ATTESTATION_MAGIC);
        out.push(ATTESTATION_VERSION);
        out.push(self.format as u8);
        for field in [&self.payload, &self.signature] {
            let len = u32::try_from(field.len())
                .map_err(|_| CryptoError::Encoding("evidence field too large".into()))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(field);
        }
        Ok(out)
    }

    /// Parse a `RATT` envelope.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` on bad magic, version, format byte,
    /// truncation or trailing bytes.
    pub fn parse(data: &[u8]) -> Result<Self, CryptoError> {
        let mut reader = Reader::new(data);
        if reader.take(4)? != ATTESTATION_MAGIC {
            return Err(CryptoError::Encoding("bad attestation magic".into()));
        }
        let version = reader.take(1)?[0];
        if version != ATTESTATION_VERSION {
            return Err(CryptoError::Encoding(format!(
                "unsupported attestation version {version}"
            )));
        }
        let format_byte = reader.take(1)?[0];
        let format = AttestationFormat::from_byte(format_byte).ok_or_else(|| {
            CryptoError::Encoding(format!("unknown attestation format {format_byte}"))
        })?;
        let payload = reader.take_framed()?.to_vec();
        let signature = reader.take_framed()?.to_vec();
        reader.finish()?;
        Ok(Self {
            format,
            payload,
            signature,
        })
    }
}

/// Caller-supplied trust decision over attestation evidence (TPM quote
/// verification, Apple App Attest, Android key attestation chains...).
pub trait AttestationVerifier: Send + Sync {
    /// Return `true` only if `evidence` is cryptographically valid for
    /// `device_id`.
    fn verify(&self, device_id: &str, evidence: &AttestationEvidence) -> bool;
}

/// Device binding re-validated on every attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareBinding {
    pub device_id: String,
    pub attestation_evidence: Vec<u8>,
    pub binding_signature: [u8; DIGEST_LEN],
    /// Unix seconds at enrollment.
    pub timestamp: u64,
}

fn binding_signature(device_id: &str, evidence: &[u8], timestamp: u64) -> [u8; DIGEST_LEN] {
    digest_256(
        BINDING_DOMAIN,
        &[device_id.as_bytes(), evidence, &timestamp.to_be_bytes()],
    )
}

impl HardwareBinding {
    /// Bind `evidence` to `device_id` at `timestamp`.
    #[must_use]
    pub fn new(device_id: impl Into<String>, attestation_evidence: Vec<u8>, timestamp: u64) -> Self {
        let device_id = device_id.into();
        let binding_signature = binding_signature(&device_id, &attestation_evidence, timestamp);
        Self {
            device_id,
            attestation_evidence,
            binding_signature,
            timestamp,
        }
    }

    /// Structural check, fail-closed.
    ///
    /// `false` for an empty device id or evidence, a malformed envelope, an
    /// empty payload or signature, or a binding signature mismatch.
    #[must_use]
    pub fn verify_attestation(&self) -> bool {
        self.parsed_evidence().is_some()
    }

    /// Structural check followed by the collaborator's trust decision.
    #[must_use]
    pub fn verify_attestation_with(&self, verifier: &dyn AttestationVerifier) -> bool {
        self.parsed_evidence()
            .is_some_and(|evidence| verifier.verify(&self.device_id, &evidence))
    }

    fn parsed_evidence(&self) -> Option<AttestationEvidence> {
        if self.device_id.is_empty() || self.attestation_evidence.is_empty() {
            return None;
        }
        let expected = binding_signature(&self.device_id, &self.attestation_evidence, self.timestamp);
        if !constant_time_eq(&expected, &self.binding_signature) {
            return None;
        }
        let evidence = AttestationEvidence::parse(&self.attestation_evidence).ok()?;
        if evidence.payload.is_empty() || evidence.signature.is_empty() {
            return None;
        }
        Some(evidence)
    }
}

// ---------------------------------------------------------------------------
// Hardware-held tokens
// ---------------------------------------------------------------------------

struct WrappingKeyLen;

impl hkdf::KeyType for WrappingKeyLen {
    fn len(&self) -> usize {
        WRAPPING_KEY_LEN
    }
}

/// HKDF-SHA256 wrapping key from a token sealed in the device's hardware
/// module. Salted separately from every other derivation in the crate.
///
/// # Errors
///
/// Returns `CryptoError::HardwareKey` if the token is shorter than 16 bytes
/// or HKDF fails.
pub fn derive_hardware_wrapping_key(token: &[u8]) -> Result<SecretBuffer, CryptoError> {
    if token.len() < MIN_TOKEN_LEN {
        return Err(CryptoError::HardwareKey(format!(
            "hardware token too short: {} bytes (minimum {MIN_TOKEN_LEN})",
            token.len()
        )));
    }
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(token);
    let okm = prk
        .expand(&[HKDF_INFO], WrappingKeyLen)
        .map_err(|_| CryptoError::HardwareKey("HKDF expand failed".into()))?;
    let mut key = [0u8; WRAPPING_KEY_LEN];
    okm.fill(&mut key)
        .map_err(|_| CryptoError::HardwareKey("HKDF fill failed".into()))?;
    let buf = SecretBuffer::new(&key);
    key.zeroize();
    buf
}

/// Fresh 32-byte token for a hardware module to seal at enrollment.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
pub fn generate_hardware_token() -> Result<SecretBytes<32>, CryptoError> {
    SecretBytes::random()
}
