//! Biometric templates as fuzzy commitments.
//!
//! A template never contains the enrolled feature vector. Enrollment picks a
//! random 128-bit key `k`, spreads it with an 8× repetition code and XORs
//! it with the features:
//!
//! ```text
//! helper_data      = features ⊕ encode(k)
//! fuzzy_commitment = BLAKE3("commitment" ‖ k)
//! template_hash    = BLAKE3("template" ‖ modality ‖ level ‖ flags ‖ helper_data ‖ fuzzy_commitment)
//! ```
//!
//! A fresh sample within the code's error radius decodes back to `k`
//! (majority vote per byte). The match score is the fraction of feature bits
//! that did not need correcting.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::memory::SecretBytes;
use crate::quantum::constant_time_eq;

/// Bytes of the committed key.
pub const BIOMETRIC_KEY_LEN: usize = 16;

/// Repetition factor: each key bit occupies one full feature byte.
pub const REPETITION: usize = 8;

/// Required feature-vector length in bytes.
pub const BIOMETRIC_FEATURE_LEN: usize = BIOMETRIC_KEY_LEN * REPETITION;

/// Default match threshold supplied to [`BiometricMatch::is_match`].
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.95;

const FEATURE_BITS: u32 = 1024;
const COMMITMENT_DOMAIN: &str = "rampart biometric commitment v1";
const TEMPLATE_DOMAIN: &str = "rampart biometric template v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricModality {
    Fingerprint,
    Face,
    Iris,
    Voice,
    Palm,
}

impl BiometricModality {
    const fn tag(self) -> u8 {
        match self {
            Self::Fingerprint => 1,
            Self::Face => 2,
            Self::Iris => 3,
            Self::Voice => 4,
            Self::Palm => 5,
        }
    }
}

/// Sensor/template assurance tier; sets the liveness floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricSecurityLevel {
    Standard,
    High,
    Maximum,
}

impl BiometricSecurityLevel {
    /// Minimum liveness score a sample must report.
    #[must_use]
    pub const fn min_liveness(self) -> f64 {
        match self {
            Self::Standard => 0.80,
            Self::High => 0.90,
            Self::Maximum => 0.97,
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::High => 2,
            Self::Maximum => 3,
        }
    }
}

/// Fresh capture from a sensor. Features are zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BiometricSample {
    pub features: Vec<u8>,
    /// Sensor-reported liveness confidence in `[0, 1]`.
    #[zeroize(skip)]
    pub liveness_score: f64,
    /// Presentation-attack detector verdict.
    #[zeroize(skip)]
    pub presentation_attack_detected: bool,
}

impl std::fmt::Debug for BiometricSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiometricSample")
            .field("features", &"***")
            .field("liveness_score", &self.liveness_score)
            .field("presentation_attack_detected", &self.presentation_attack_detected)
            .finish()
    }
}

/// Enrolled template. Safe to store; holds no raw features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiometricTemplate {
    pub modality: BiometricModality,
    pub security_level: BiometricSecurityLevel,
    pub template_hash: [u8; 32],
    pub fuzzy_commitment: [u8; 32],
    pub helper_data: Vec<u8>,
    pub require_liveness: bool,
    pub require_pad: bool,
}

/// Outcome of comparing a sample with a template.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiometricMatch {
    /// `1 - corrected_bits / total_bits`.
    pub score: f64,
    pub key_recovered: bool,
    pub liveness_ok: bool,
    pub pad_ok: bool,
}

impl BiometricMatch {
    /// Key recovered, score at or above `threshold`, liveness and PAD held.
    #[must_use]
    pub fn is_match(&self, threshold: f64) -> bool {
        self.key_recovered && self.score >= threshold && self.liveness_ok && self.pad_ok
    }
}

fn commitment_for(key: &[u8]) -> [u8; 32] {
    let mut h = blake3::Hasher::new_derive_key(COMMITMENT_DOMAIN);
    h.update(key);
    *h.finalize().as_bytes()
}

fn spread(key: &[u8; BIOMETRIC_KEY_LEN]) -> Vec<u8> {
    let mut codeword = Vec::with_capacity(BIOMETRIC_FEATURE_LEN);
    for byte in key {
        for bit in (0..8).rev() {
            codeword.push(if (byte >> bit) & 1 == 1 { 0xFF } else { 0x00 });
        }
    }
    codeword
}

fn check_len(features: &[u8]) -> Result<(), CryptoError> {
    if features.len() == BIOMETRIC_FEATURE_LEN {
        Ok(())
    } else {
        Err(CryptoError::Biometric(format!(
            "feature vector must be {BIOMETRIC_FEATURE_LEN} bytes, got {}",
            features.len()
        )))
    }
}

impl BiometricTemplate {
    /// Enroll `features`. Liveness and presentation-attack checks are
    /// required by default.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Biometric` on a wrong-length feature vector, or
    /// `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn enroll(
        modality: BiometricModality,
        features: &[u8],
        security_level: BiometricSecurityLevel,
    ) -> Result<Self, CryptoError> {
        check_len(features)?;
        let key = SecretBytes::<BIOMETRIC_KEY_LEN>::random()?;
        let mut codeword = spread(key.expose());
        let helper_data: Vec<u8> = features.iter().zip(&codeword).map(|(f, c)| f ^ c).collect();
        codeword.zeroize();

        let mut template = Self {
            modality,
            security_level,
            template_hash: [0u8; 32],
            fuzzy_commitment: commitment_for(key.expose()),
            helper_data,
            require_liveness: true,
            require_pad: true,
        };
        template.template_hash = template.compute_hash();
        Ok(template)
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut h = blake3::Hasher::new_derive_key(TEMPLATE_DOMAIN);
        h.update(&[
            self.modality.tag(),
            self.security_level.tag(),
            u8::from(self.require_liveness),
            u8::from(self.require_pad),
        ]);
        h.update(&(self.helper_data.len() as u64).to_le_bytes());
        h.update(&self.helper_data);
        h.update(&self.fuzzy_commitment);
        *h.finalize().as_bytes()
    }

    /// `false` if any stored field was modified after enrollment.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        constant_time_eq(&self.compute_hash(), &self.template_hash)
    }

    /// Compare a fresh sample against this template.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Biometric` if the sample or helper data has the
    /// wrong length.
    #[allow(clippy::arithmetic_side_effects)]
    pub fn evaluate(&self, sample: &BiometricSample) -> Result<BiometricMatch, CryptoError> {
        check_len(&sample.features)?;
        check_len(&self.helper_data)?;

        let mut key = [0u8; BIOMETRIC_KEY_LEN];
        let mut corrected: u32 = 0;
        for (i, (h, f)) in self.helper_data.iter().zip(&sample.features).enumerate() {
            let ones = (h ^ f).count_ones();
            let bit = u8::from(ones > 4);
            corrected += if bit == 1 { 8 - ones } else { ones };
            key[i / 8] |= bit << (7 - (i % 8));
        }
        let key_recovered = constant_time_eq(&commitment_for(&key), &self.fuzzy_commitment);
        key.zeroize();

        let score = 1.0 - f64::from(corrected) / f64::from(FEATURE_BITS);
        let liveness_floor = self.security_level.min_liveness();
        Ok(BiometricMatch {
            score,
            key_recovered,
            liveness_ok: if self.require_liveness {
                (liveness_floor..=1.0).contains(&sample.liveness_score)
            } else {
                (0.0..=1.0).contains(&sample.liveness_score)
            },
            pad_ok: !self.require_pad || !sample.presentation_attack_detected,
        })
    }
}
