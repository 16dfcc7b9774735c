//! Barrier handlers.
//!
//! Each handler reads its slice of the attempt plus whatever earlier
//! barriers left in [`Pipeline`] and returns an [`Outcome`]. The engine
//! turns outcomes into statuses; handlers never see the mandate or the
//! clock.

use std::sync::Arc;

use rampart_crypto_core::hardware::AttestationVerifier;
use rampart_crypto_core::kdf::derive_key;
use rampart_crypto_core::quantum::{constant_time_eq, shannon_entropy};
use rampart_crypto_core::signature;
use rampart_crypto_core::threshold::reconstruct_verified;
use rampart_crypto_core::vrf::verify_with_key;
use rampart_crypto_core::zkp::verify_proof_for;
use rampart_crypto_core::{CryptoError, SecretBuffer};

use crate::attempt::{secret_fingerprint, AuthenticationAttempt, GeoFix};
use crate::barrier::{Check, BARRIER_COUNT};
use crate::config::StrandConfig;
use crate::engine::{BarrierStatus, FactorClass};
use crate::threat::{ThreatLevel, ThreatPolicy};

const MAX_PRINCIPAL_LEN: usize = 256;
const MAX_CHALLENGE_LEN: usize = 1024;
const MAX_SHARES: usize = 255;

/// Fraction of the best achievable per-byte entropy a challenge must reach.
const CHALLENGE_ENTROPY_RATIO: f64 = 0.75;

const MIN_KEYSTROKE_SAMPLES: usize = 8;
const MAX_KEYSTROKE_DEVIATION: f64 = 3.0;
const MAX_INTERACTION_ANOMALY: f64 = 0.7;
const MIN_IP_REPUTATION: f64 = 0.5;
const MAX_TRAVEL_KMH: f64 = 1_000.0;
const EARTH_RADIUS_KM: f64 = 6_371.0;

/// What a handler concluded, before mandates are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Pass(String),
    /// Evidence absent. WARNING unless mandatory.
    Missing(String),
    /// Evidence present but weak. WARNING unless mandatory.
    Degraded(String),
    /// Evidence present and wrong. Always FAILED.
    Reject(String),
    /// Commitment or binding mismatch. Always FAILED.
    Tamper(String),
}

/// Per-attempt state shared by the handlers. Secrets drop (and zeroize)
/// with it.
pub(crate) struct Pipeline<'a> {
    pub config: &'a StrandConfig,
    pub threat: ThreatLevel,
    pub policy: ThreatPolicy,
    pub attempt: &'a AuthenticationAttempt,
    pub now: u64,
    pub correlation_id: &'a str,
    pub verifier: Option<&'a Arc<dyn AttestationVerifier>>,
    pub secret: Option<SecretBuffer>,
    pub session_key: Option<SecretBuffer>,
    pub statuses: [Option<BarrierStatus>; BARRIER_COUNT],
}

impl Pipeline<'_> {
    fn passed(&self, id: u8) -> bool {
        usize::from(id)
            .checked_sub(1)
            .and_then(|i| self.statuses.get(i))
            .is_some_and(|s| *s == Some(BarrierStatus::Passed))
    }

    fn all_passed(&self, ids: &[u8]) -> bool {
        ids.iter().all(|&id| self.passed(id))
    }

    /// Factor classes fully established by the barriers run so far.
    pub(crate) fn factors(&self) -> Vec<FactorClass> {
        FactorClass::ALL
            .into_iter()
            .filter(|class| self.all_passed(class.barriers()))
            .collect()
    }

    /// Drop state produced by a barrier that ended FAILED.
    pub(crate) fn discard(&mut self, check: Check) {
        match check {
            Check::ThresholdReconstruction => self.secret = None,
            Check::SessionKeyDerivation => self.session_key = None,
            _ => {}
        }
    }
}

pub(crate) fn run(check: Check, p: &mut Pipeline<'_>) -> Outcome {
    match check {
        Check::RequestIntegrity => request_integrity(p.attempt),
        Check::ThreatFloor => threat_floor(p),
        Check::RateLimit => rate_limit(p),
        Check::TemporalWindow => temporal_window(p),
        Check::ChallengeEntropy => challenge_entropy(p),
        Check::DeviceIdentity => device_identity(p.attempt),
        Check::HardwareAttestation => hardware_attestation(p),
        Check::BindingFreshness => binding_freshness(p),
        Check::BiometricLiveness => biometric_liveness(p.attempt),
        Check::PresentationAttack => presentation_attack(p.attempt),
        Check::BiometricMatch => biometric_match(p),
        Check::ShareCommitments => share_commitments(p),
        Check::ThresholdReconstruction => threshold_reconstruction(p),
        Check::ZeroKnowledgeProof => zero_knowledge_proof(p.attempt),
        Check::VrfChallenge => vrf_challenge(p.attempt),
        Check::SignatureBinding => signature_binding(p),
        Check::SignatureVerification => signature_verification(p.attempt),
        Check::SessionKeyDerivation => session_key_derivation(p),
        Check::KeystrokeDynamics => keystroke_dynamics(p.attempt),
        Check::InteractionAnomaly => interaction_anomaly(p.attempt),
        Check::NetworkReputation => network_reputation(p.attempt),
        Check::GeoVelocity => geo_velocity(p.attempt),
        Check::CompliancePolicy => compliance_policy(p),
        Check::FactorQuorum => factor_quorum(p),
    }
}

// ── Request and policy ─────────────────────────────────────────────

fn request_integrity(attempt: &AuthenticationAttempt) -> Outcome {
    let id = &attempt.principal_id;
    if id.is_empty() || id.len() > MAX_PRINCIPAL_LEN {
        return Outcome::Reject(format!(
            "principal id length {} outside 1..={MAX_PRINCIPAL_LEN}",
            id.len()
        ));
    }
    if id.chars().any(char::is_control) {
        return Outcome::Reject("principal id contains control characters".into());
    }
    if attempt.challenge.is_empty() || attempt.challenge.len() > MAX_CHALLENGE_LEN {
        return Outcome::Reject(format!(
            "challenge length {} outside 1..={MAX_CHALLENGE_LEN}",
            attempt.challenge.len()
        ));
    }
    if attempt.shares.len() > MAX_SHARES {
        return Outcome::Reject(format!("{} shares exceeds {MAX_SHARES}", attempt.shares.len()));
    }
    Outcome::Pass("request well-formed".into())
}

fn threat_floor(p: &Pipeline<'_>) -> Outcome {
    let floor = p.config.threat_floor;
    match p.attempt.threat_override {
        Some(requested) if requested < floor => Outcome::Degraded(format!(
            "override {requested} below floor {floor}; {} applied",
            p.threat
        )),
        _ => Outcome::Pass(format!("{} applied", p.threat)),
    }
}

fn rate_limit(p: &Pipeline<'_>) -> Outcome {
    let prior = p.attempt.prior_attempts;
    let limit = p.policy.max_attempts;
    if prior >= limit {
        Outcome::Reject(format!("{prior} prior attempts; limit {limit} at {}", p.threat))
    } else {
        Outcome::Pass(format!("attempt {} of {limit}", prior.saturating_add(1)))
    }
}

fn temporal_window(p: &Pipeline<'_>) -> Outcome {
    let skew = p.now.abs_diff(p.attempt.requested_at);
    if skew > p.policy.clock_skew_secs {
        Outcome::Reject(format!(
            "request time off by {skew}s; allowed {}s",
            p.policy.clock_skew_secs
        ))
    } else {
        Outcome::Pass(format!("skew {skew}s"))
    }
}

#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
fn challenge_entropy(p: &Pipeline<'_>) -> Outcome {
    let challenge = &p.attempt.challenge;
    let bits = challenge.len().saturating_mul(8);
    let floor = p.config.parameters().min_entropy_bits;
    if bits < usize::try_from(floor).unwrap_or(usize::MAX) {
        return Outcome::Reject(format!("challenge is {bits} bits; suite requires {floor}"));
    }
    // A sample of n bytes can show at most log2(min(n, 256)) bits per byte.
    let achievable = (challenge.len().min(256) as f64).log2();
    let required = achievable * CHALLENGE_ENTROPY_RATIO;
    let measured = shannon_entropy(challenge);
    if measured < required {
        Outcome::Reject(format!(
            "challenge entropy {measured:.2} bits/byte below {required:.2}"
        ))
    } else {
        Outcome::Pass(format!("{bits} bits, {measured:.2} bits/byte"))
    }
}

// ── Hardware ───────────────────────────────────────────────────────

fn device_identity(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(presented) = &attempt.hardware else {
        return Outcome::Missing("no hardware binding presented".into());
    };
    let Some(enrolled) = &attempt.enrolled.device else {
        return Outcome::Missing("no device enrolled".into());
    };
    if constant_time_eq(presented.device_id.as_bytes(), enrolled.device_id.as_bytes()) {
        Outcome::Pass("device matches enrollment".into())
    } else {
        Outcome::Reject("device id does not match enrollment".into())
    }
}

fn hardware_attestation(p: &Pipeline<'_>) -> Outcome {
    let Some(binding) = &p.attempt.hardware else {
        return Outcome::Missing("no hardware binding presented".into());
    };
    match p.verifier {
        Some(verifier) if binding.verify_attestation_with(verifier.as_ref()) => {
            Outcome::Pass("attestation verified by collaborator".into())
        }
        Some(_) => Outcome::Reject("attestation rejected by collaborator".into()),
        None if binding.verify_attestation() => {
            Outcome::Pass("attestation structurally valid".into())
        }
        None => Outcome::Reject("attestation evidence malformed or unbound".into()),
    }
}

fn binding_freshness(p: &Pipeline<'_>) -> Outcome {
    let Some(binding) = &p.attempt.hardware else {
        return Outcome::Missing("no hardware binding presented".into());
    };
    if binding.timestamp > p.now.saturating_add(p.policy.clock_skew_secs) {
        return Outcome::Reject("binding timestamp is in the future".into());
    }
    let age = p.now.saturating_sub(binding.timestamp);
    if age > p.policy.max_binding_age_secs {
        Outcome::Reject(format!(
            "binding is {age}s old; limit {}s at {}",
            p.policy.max_binding_age_secs, p.threat
        ))
    } else {
        Outcome::Pass(format!("binding age {age}s"))
    }
}

// ── Biometric ──────────────────────────────────────────────────────

fn biometric_liveness(attempt: &AuthenticationAttempt) -> Outcome {
    let (Some(sample), Some(template)) = (&attempt.biometric_sample, &attempt.enrolled.biometric)
    else {
        return Outcome::Missing("no biometric sample or template".into());
    };
    if !template.verify_integrity() {
        return Outcome::Tamper("biometric template integrity check failed".into());
    }
    let score = sample.liveness_score;
    if !(0.0..=1.0).contains(&score) {
        return Outcome::Reject(format!("liveness score {score} outside [0, 1]"));
    }
    let floor = template.security_level.min_liveness();
    if template.require_liveness && score < floor {
        Outcome::Reject(format!("liveness {score:.2} below {floor:.2}"))
    } else {
        Outcome::Pass(format!("liveness {score:.2}"))
    }
}

fn presentation_attack(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(sample) = &attempt.biometric_sample else {
        return Outcome::Missing("no biometric sample".into());
    };
    if sample.presentation_attack_detected {
        Outcome::Reject("presentation attack detected".into())
    } else {
        Outcome::Pass("no presentation attack".into())
    }
}

fn biometric_match(p: &Pipeline<'_>) -> Outcome {
    let attempt = p.attempt;
    let (Some(sample), Some(template)) = (&attempt.biometric_sample, &attempt.enrolled.biometric)
    else {
        return Outcome::Missing("no biometric sample or template".into());
    };
    let threshold = p.config.biometric_threshold.max(p.policy.biometric_threshold);
    let m = match template.evaluate(sample) {
        Ok(m) => m,
        Err(e) => return Outcome::Reject(e.to_string()),
    };
    if !m.key_recovered {
        return Outcome::Reject("fuzzy commitment did not open".into());
    }
    if m.is_match(threshold) {
        Outcome::Pass(format!("score {:.3} >= {threshold:.3}", m.score))
    } else {
        Outcome::Reject(format!("score {:.3} below {threshold:.3}", m.score))
    }
}

// ── Threshold, proofs, signatures ──────────────────────────────────

fn share_commitments(p: &Pipeline<'_>) -> Outcome {
    let shares = &p.attempt.shares;
    let Some(first) = shares.first() else {
        return Outcome::Missing("no shares supplied".into());
    };
    let min_k = p.config.min_share_threshold;
    if let Some(weak) = shares.iter().find(|s| s.threshold < min_k) {
        return Outcome::Reject(format!(
            "share {} comes from a {}-of-N split; strand requires K >= {min_k}",
            weak.index, weak.threshold
        ));
    }
    let bad: Vec<u8> = shares
        .iter()
        .filter(|s| !s.verify_commitment())
        .map(|s| s.index)
        .collect();
    if bad.is_empty() {
        Outcome::Pass(format!("{} shares, K = {}", shares.len(), first.threshold))
    } else {
        Outcome::Tamper(format!("commitment mismatch on shares {bad:?}"))
    }
}

fn threshold_reconstruction(p: &mut Pipeline<'_>) -> Outcome {
    if p.attempt.shares.is_empty() {
        return Outcome::Missing("no shares supplied".into());
    }
    let secret = match reconstruct_verified(&p.attempt.shares) {
        Ok(secret) => secret,
        Err(CryptoError::InsufficientEvidence(m)) => return Outcome::Missing(m),
        Err(CryptoError::TamperDetected(m)) => return Outcome::Tamper(m),
        Err(e) => return Outcome::Reject(e.to_string()),
    };
    let floor = p.config.parameters().min_entropy_bits;
    let bits = secret.len().saturating_mul(8);
    if bits < usize::try_from(floor).unwrap_or(usize::MAX) {
        return Outcome::Reject(format!("secret is {bits} bits; suite requires {floor}"));
    }
    let fingerprint = secret_fingerprint(p.config.suite, secret.expose());
    if !constant_time_eq(&fingerprint, &p.attempt.enrolled.secret_fingerprint) {
        return Outcome::Reject("reconstructed secret does not match enrollment".into());
    }
    p.secret = Some(secret);
    Outcome::Pass(format!("{bits}-bit secret reconstructed"))
}

fn zero_knowledge_proof(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(proof) = &attempt.zk_proof else {
        return Outcome::Missing("no proof supplied".into());
    };
    if verify_proof_for(proof, &attempt.challenge, &attempt.enrolled.zk_public_input) {
        Outcome::Pass("proof verified for enrolled statement".into())
    } else {
        Outcome::Reject("proof does not verify for this challenge and enrollment".into())
    }
}

fn vrf_challenge(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(output) = &attempt.vrf_output else {
        return Outcome::Missing("no VRF output supplied".into());
    };
    let Some(key) = &attempt.enrolled.vrf_public_key else {
        return Outcome::Missing("no VRF key enrolled".into());
    };
    if verify_with_key(&attempt.challenge, output, key) {
        Outcome::Pass("VRF output verified".into())
    } else {
        Outcome::Reject("VRF output does not verify under enrolled key".into())
    }
}

fn signature_binding(p: &Pipeline<'_>) -> Outcome {
    let Some(sig) = &p.attempt.signature else {
        return Outcome::Missing("no signature supplied".into());
    };
    if !sig.verify_binding() {
        return Outcome::Tamper("signature binding hash mismatch".into());
    }
    let expected = p.config.parameters().pq_signature.signature_len();
    if sig.lattice.len() == expected {
        Outcome::Pass("binding hash intact".into())
    } else {
        Outcome::Reject(format!(
            "lattice layer is {} bytes; suite expects {expected}",
            sig.lattice.len()
        ))
    }
}

fn signature_verification(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(sig) = &attempt.signature else {
        return Outcome::Missing("no signature supplied".into());
    };
    match signature::verify(&attempt.signed_message(), sig, &attempt.enrolled.signing_key) {
        Ok(()) => Outcome::Pass("all signature layers verified".into()),
        Err(CryptoError::TamperDetected(m)) => Outcome::Tamper(m),
        Err(e) => Outcome::Reject(e.to_string()),
    }
}

fn session_key_derivation(p: &mut Pipeline<'_>) -> Outcome {
    let Some(secret) = &p.secret else {
        return Outcome::Missing("no reconstructed secret".into());
    };
    let mut context = Vec::with_capacity(
        8usize
            .saturating_add(p.attempt.principal_id.len())
            .saturating_add(p.correlation_id.len()),
    );
    context.extend_from_slice(b"session:");
    context.extend_from_slice(p.attempt.principal_id.as_bytes());
    context.extend_from_slice(p.correlation_id.as_bytes());
    match derive_key(secret.expose(), &context) {
        Ok(key) => {
            p.session_key = Some(key);
            Outcome::Pass("session key derived".into())
        }
        Err(e) => Outcome::Reject(e.to_string()),
    }
}

// ── Behavioral and network ─────────────────────────────────────────

#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
fn keystroke_dynamics(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(profile) = &attempt.enrolled.keystroke else {
        return Outcome::Missing("no keystroke profile enrolled".into());
    };
    let intervals = &attempt.behavior.keystroke_intervals_ms;
    if intervals.len() < MIN_KEYSTROKE_SAMPLES {
        return Outcome::Missing(format!(
            "{} keystroke intervals; need {MIN_KEYSTROKE_SAMPLES}",
            intervals.len()
        ));
    }
    if !(profile.std_dev_ms.is_finite() && profile.std_dev_ms > 0.0) {
        return Outcome::Degraded("enrolled keystroke profile has no spread".into());
    }
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let deviation = (mean - profile.mean_interval_ms).abs() / profile.std_dev_ms;
    if deviation.is_finite() && deviation <= MAX_KEYSTROKE_DEVIATION {
        Outcome::Pass(format!("rhythm within {deviation:.2} sigma"))
    } else {
        Outcome::Degraded(format!("rhythm deviates {deviation:.2} sigma"))
    }
}

fn interaction_anomaly(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(score) = attempt.behavior.interaction_anomaly else {
        return Outcome::Missing("no interaction score".into());
    };
    if !(0.0..=1.0).contains(&score) {
        return Outcome::Degraded(format!("anomaly score {score} out of range"));
    }
    if score > MAX_INTERACTION_ANOMALY {
        Outcome::Degraded(format!("anomaly score {score:.2} above {MAX_INTERACTION_ANOMALY}"))
    } else {
        Outcome::Pass(format!("anomaly score {score:.2}"))
    }
}

fn network_reputation(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(network) = &attempt.behavior.network else {
        return Outcome::Missing("no network context".into());
    };
    let rep = network.ip_reputation;
    if (MIN_IP_REPUTATION..=1.0).contains(&rep) {
        Outcome::Pass(format!("reputation {rep:.2}"))
    } else {
        Outcome::Degraded(format!("reputation {rep:.2} below {MIN_IP_REPUTATION}"))
    }
}

/// Great-circle distance in km.
#[allow(clippy::arithmetic_side_effects)]
fn haversine_km(a: &GeoFix, b: &GeoFix) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[allow(clippy::cast_precision_loss, clippy::arithmetic_side_effects)]
fn geo_velocity(attempt: &AuthenticationAttempt) -> Outcome {
    let Some(GeoFixes(previous, current)) = attempt
        .behavior
        .network
        .as_ref()
        .and_then(|n| Some(GeoFixes(n.previous_fix?, n.current_fix?)))
    else {
        return Outcome::Missing("no location history".into());
    };
    let distance = haversine_km(&previous, &current);
    if !distance.is_finite() {
        return Outcome::Degraded("location fix out of range".into());
    }
    let elapsed_h = current.timestamp.saturating_sub(previous.timestamp) as f64 / 3_600.0;
    // Anything under a kilometre is GPS jitter, whatever the interval.
    if distance < 1.0 {
        return Outcome::Pass(format!("{distance:.1} km moved"));
    }
    if elapsed_h <= 0.0 {
        return Outcome::Degraded(format!("{distance:.0} km in zero time"));
    }
    let speed = distance / elapsed_h;
    if speed > MAX_TRAVEL_KMH {
        Outcome::Degraded(format!("implied travel {speed:.0} km/h"))
    } else {
        Outcome::Pass(format!("implied travel {speed:.0} km/h"))
    }
}

struct GeoFixes(GeoFix, GeoFix);

// ── Compliance ─────────────────────────────────────────────────────

fn compliance_policy(p: &Pipeline<'_>) -> Outcome {
    let frameworks = p.config.compliance;
    if frameworks.is_empty() {
        return Outcome::Pass("no compliance frameworks".into());
    }
    if frameworks.requires_fips() && !p.config.parameters().hash_algorithm.is_fips_approved() {
        return Outcome::Reject("suite digest not FIPS approved".into());
    }
    if frameworks.requires_hardware() && !p.all_passed(FactorClass::Hardware.barriers()) {
        return Outcome::Reject("framework requires a hardware-bound authenticator".into());
    }
    if frameworks.requires_mfa() && p.factors().len() < 2 {
        return Outcome::Reject("framework requires multi-factor authentication".into());
    }
    Outcome::Pass(format!("satisfies {}", frameworks.names().join(", ")))
}

fn factor_quorum(p: &Pipeline<'_>) -> Outcome {
    let factors = p.factors();
    let required = p.config.required_factors();
    let names: Vec<&str> = factors.iter().copied().map(FactorClass::name).collect();
    if factors.len() >= required {
        Outcome::Pass(format!(
            "{} of {required} factor classes: {}",
            factors.len(),
            names.join(", ")
        ))
    } else {
        Outcome::Missing(format!(
            "{} of {required} factor classes for {:?}",
            factors.len(),
            p.config.classification
        ))
    }
}
