//! Shared fixtures: clocks and evidence bundles for one enrolled principal.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rampart_crypto_core::biometric::{
    BiometricModality, BiometricSample, BiometricSecurityLevel, BiometricTemplate,
    BIOMETRIC_FEATURE_LEN,
};
use rampart_crypto_core::hardware::{AttestationEvidence, AttestationFormat, HardwareBinding};
use rampart_crypto_core::memory::SecretBuffer;
use rampart_crypto_core::signature::{generate_signing_keypair, sign};
use rampart_crypto_core::threshold::split;
use rampart_crypto_core::vrf::{self, VrfKeyPair};
use rampart_crypto_core::zkp::generate_proof;
use rampart_engine::{
    signed_message, AuthenticationAttempt, BehavioralSignals, Clock, CryptoSuite,
    EnrolledCredentials, GeoFix, KeystrokeProfile, NetworkContext, StrandConfig,
    VerificationEngine,
};

pub const NOW: u64 = 1_760_000_000;
pub const DAY: u64 = 86_400;
pub const PRINCIPAL: &str = "alice@rampart.test";
pub const DEVICE_ID: &str = "tpm-7f3a";

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Time never moves: every barrier takes zero time.
pub struct FixedClock {
    base: Instant,
}

impl FixedClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.base
    }

    fn unix_time(&self) -> u64 {
        NOW
    }
}

/// Each `now()` call advances by `step`, so every barrier appears to take
/// exactly `step`.
pub struct SteppingClock {
    base: Instant,
    step_ms: u64,
    elapsed_ms: AtomicU64,
}

impl SteppingClock {
    pub fn new(step: Duration) -> Self {
        Self {
            base: Instant::now(),
            step_ms: u64::try_from(step.as_millis()).unwrap(),
            elapsed_ms: AtomicU64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Instant {
        let ms = self.elapsed_ms.fetch_add(self.step_ms, Ordering::SeqCst);
        self.base + Duration::from_millis(ms)
    }

    fn unix_time(&self) -> u64 {
        NOW
    }
}

pub fn engine(config: StrandConfig) -> VerificationEngine {
    VerificationEngine::with_clock(config, Arc::new(FixedClock::new()))
        .expect("config should validate")
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

pub fn attestation() -> Vec<u8> {
    AttestationEvidence {
        format: AttestationFormat::Tpm2Quote,
        payload: format!("quote for {DEVICE_ID}: pcr0..pcr7").into_bytes(),
        signature: vec![0x5A; 64],
    }
    .encode()
    .expect("encode should succeed")
}

fn random(len: usize) -> Vec<u8> {
    SecretBuffer::random(len)
        .expect("random should succeed")
        .expose()
        .to_vec()
}

/// Every factor present and genuine, enrolled under `suite`.
pub fn full_attempt(suite: CryptoSuite) -> AuthenticationAttempt {
    full_attempt_at(suite, NOW)
}

/// [`full_attempt`] signed for a request built at `requested_at`.
pub fn full_attempt_at(suite: CryptoSuite, requested_at: u64) -> AuthenticationAttempt {
    let secret = random(32);
    let challenge = random(32);
    let signer = generate_signing_keypair().expect("keygen should succeed");
    let vrf_key = VrfKeyPair::generate().expect("keygen should succeed");
    let features = random(BIOMETRIC_FEATURE_LEN);
    let template = BiometricTemplate::enroll(
        BiometricModality::Fingerprint,
        &features,
        BiometricSecurityLevel::High,
    )
    .expect("enroll should succeed");
    let device = HardwareBinding::new(DEVICE_ID, attestation(), NOW - DAY);

    let mut enrolled = EnrolledCredentials::for_secret(suite, &secret, signer.public.clone())
        .expect("enrollment should succeed");
    enrolled.vrf_public_key = Some(*vrf_key.public_key());
    enrolled.device = Some(device.clone());
    enrolled.biometric = Some(template);
    enrolled.keystroke = Some(KeystrokeProfile {
        mean_interval_ms: 120.0,
        std_dev_ms: 20.0,
    });

    let mut attempt = AuthenticationAttempt::new(PRINCIPAL, challenge.clone(), requested_at, enrolled);
    attempt.shares = split(&secret, 3, 5)
        .expect("split should succeed")
        .into_iter()
        .take(3)
        .collect();
    attempt.zk_proof = Some(generate_proof(&secret, &challenge).expect("prove should succeed"));
    attempt.vrf_output = Some(vrf::evaluate(&challenge, &vrf_key).expect("evaluate should succeed"));
    let message = signed_message(&challenge, requested_at);
    attempt.signature = Some(sign(&message, &signer).expect("sign should succeed"));
    attempt.hardware = Some(device);
    attempt.biometric_sample = Some(BiometricSample {
        features,
        liveness_score: 0.99,
        presentation_attack_detected: false,
    });
    attempt.behavior = BehavioralSignals {
        keystroke_intervals_ms: vec![118.0, 125.0, 121.0, 119.0, 130.0, 112.0, 117.0, 123.0, 120.0, 126.0],
        interaction_anomaly: Some(0.1),
        network: Some(NetworkContext {
            ip_reputation: 0.9,
            previous_fix: Some(GeoFix {
                latitude: 48.8566,
                longitude: 2.3522,
                timestamp: NOW - 3_600,
            }),
            current_fix: Some(GeoFix {
                latitude: 48.8606,
                longitude: 2.3376,
                timestamp: NOW,
            }),
        }),
    };
    attempt
}

/// Only knowledge and possession evidence: shares, proof and signature.
pub fn minimal_attempt(suite: CryptoSuite) -> AuthenticationAttempt {
    let mut attempt = full_attempt(suite);
    strip_optional(&mut attempt);
    attempt
}

pub fn strip_optional(attempt: &mut AuthenticationAttempt) {
    attempt.vrf_output = None;
    attempt.hardware = None;
    attempt.biometric_sample = None;
    attempt.behavior = BehavioralSignals::default();
}
