//! The fixed, ordered table of 24 barriers.
//!
//! Ordering is part of the security contract: later barriers read state
//! produced by earlier ones (the reconstructed secret, hardware and factor
//! results), so the engine walks [`BARRIERS`] front to back.

use std::time::Duration;

use serde::Serialize;

use crate::config::StrandConfig;
use crate::threat::ThreatPolicy;

/// Number of barriers in the pipeline.
pub const BARRIER_COUNT: usize = 24;

/// Category of a barrier; drives threat- and config-dependent mandates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Policy,
    Rate,
    Temporal,
    Entropy,
    Device,
    Hardware,
    Liveness,
    Biometric,
    Threshold,
    ZeroKnowledge,
    Vrf,
    Signature,
    KeyDerivation,
    Behavioral,
    Network,
    Compliance,
}

/// The individual check a barrier runs. Closed set; the engine dispatches
/// with an exhaustive `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    RequestIntegrity,
    ThreatFloor,
    RateLimit,
    TemporalWindow,
    ChallengeEntropy,
    DeviceIdentity,
    HardwareAttestation,
    BindingFreshness,
    BiometricLiveness,
    PresentationAttack,
    BiometricMatch,
    ShareCommitments,
    ThresholdReconstruction,
    ZeroKnowledgeProof,
    VrfChallenge,
    SignatureBinding,
    SignatureVerification,
    SessionKeyDerivation,
    KeystrokeDynamics,
    InteractionAnomaly,
    NetworkReputation,
    GeoVelocity,
    CompliancePolicy,
    FactorQuorum,
}

/// Static descriptor of one barrier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BarrierSpec {
    pub id: u8,
    pub name: &'static str,
    pub check: Check,
    pub kind: CheckKind,
    /// Budget at GREEN; scaled down by the threat timeout factor.
    pub base_timeout_ms: u64,
    /// Risk charged when FAILED; a WARNING charges a threat-scaled fraction.
    pub weight: f64,
    /// Fails instead of warns at every threat level.
    pub mandatory: bool,
}

impl BarrierSpec {
    /// Whether a degraded outcome is FAILED rather than WARNING under
    /// `config` and `threat`.
    #[must_use]
    pub fn is_mandatory(&self, config: &StrandConfig, threat: &ThreatPolicy) -> bool {
        self.mandatory
            || match self.kind {
                CheckKind::Device | CheckKind::Hardware => {
                    config.require_hardware || threat.hardware_mandatory
                }
                CheckKind::Liveness | CheckKind::Biometric => config.require_biometric,
                CheckKind::Behavioral => threat.behavioral_mandatory,
                _ => false,
            }
    }

    /// Budget after applying `timeout_factor`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn budget(&self, timeout_factor: f64) -> Duration {
        let ms = (self.base_timeout_ms as f64 * timeout_factor).max(1.0);
        Duration::from_millis(ms as u64)
    }
}

const fn spec(
    id: u8,
    name: &'static str,
    check: Check,
    kind: CheckKind,
    base_timeout_ms: u64,
    weight: f64,
    mandatory: bool,
) -> BarrierSpec {
    BarrierSpec {
        id,
        name,
        check,
        kind,
        base_timeout_ms,
        weight,
        mandatory,
    }
}

const FAST: u64 = 250;
const CRYPTO: u64 = 2_000;
const BIOMETRIC: u64 = 500;

/// The pipeline, ids 1..=24 in ascending order.
pub static BARRIERS: [BarrierSpec; BARRIER_COUNT] = [
    spec(1, "request_integrity", Check::RequestIntegrity, CheckKind::Policy, FAST, 0.10, true),
    spec(2, "threat_floor", Check::ThreatFloor, CheckKind::Policy, FAST, 0.05, false),
    spec(3, "rate_limit", Check::RateLimit, CheckKind::Rate, FAST, 0.10, true),
    spec(4, "temporal_window", Check::TemporalWindow, CheckKind::Temporal, FAST, 0.10, true),
    spec(5, "challenge_entropy", Check::ChallengeEntropy, CheckKind::Entropy, FAST, 0.10, true),
    spec(6, "device_identity", Check::DeviceIdentity, CheckKind::Device, FAST, 0.10, false),
    spec(7, "hardware_attestation", Check::HardwareAttestation, CheckKind::Hardware, CRYPTO, 0.20, false),
    spec(8, "binding_freshness", Check::BindingFreshness, CheckKind::Hardware, FAST, 0.10, false),
    spec(9, "biometric_liveness", Check::BiometricLiveness, CheckKind::Liveness, BIOMETRIC, 0.15, false),
    spec(10, "presentation_attack", Check::PresentationAttack, CheckKind::Liveness, BIOMETRIC, 0.15, false),
    spec(11, "biometric_match", Check::BiometricMatch, CheckKind::Biometric, BIOMETRIC, 0.20, false),
    spec(12, "share_commitments", Check::ShareCommitments, CheckKind::Threshold, CRYPTO, 0.20, true),
    spec(13, "threshold_reconstruction", Check::ThresholdReconstruction, CheckKind::Threshold, CRYPTO, 0.30, true),
    spec(14, "zero_knowledge_proof", Check::ZeroKnowledgeProof, CheckKind::ZeroKnowledge, CRYPTO, 0.25, true),
    spec(15, "vrf_challenge", Check::VrfChallenge, CheckKind::Vrf, CRYPTO, 0.15, false),
    spec(16, "signature_binding", Check::SignatureBinding, CheckKind::Signature, CRYPTO, 0.20, true),
    spec(17, "signature_verification", Check::SignatureVerification, CheckKind::Signature, CRYPTO, 0.30, true),
    spec(18, "session_key_derivation", Check::SessionKeyDerivation, CheckKind::KeyDerivation, CRYPTO, 0.10, true),
    spec(19, "keystroke_dynamics", Check::KeystrokeDynamics, CheckKind::Behavioral, FAST, 0.10, false),
    spec(20, "interaction_anomaly", Check::InteractionAnomaly, CheckKind::Behavioral, FAST, 0.10, false),
    spec(21, "network_reputation", Check::NetworkReputation, CheckKind::Network, FAST, 0.15, false),
    spec(22, "geo_velocity", Check::GeoVelocity, CheckKind::Network, FAST, 0.15, false),
    spec(23, "compliance_policy", Check::CompliancePolicy, CheckKind::Compliance, FAST, 0.20, true),
    spec(24, "factor_quorum", Check::FactorQuorum, CheckKind::Compliance, FAST, 0.30, true),
];

/// Look up a barrier by id.
#[must_use]
pub fn barrier(id: u8) -> Option<&'static BarrierSpec> {
    BARRIERS.iter().find(|b| b.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::ThreatLevel;

    #[test]
    fn ids_are_one_to_twenty_four_ascending() {
        let ids: Vec<u8> = BARRIERS.iter().map(|b| b.id).collect();
        let expected: Vec<u8> = (1..=24).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn names_and_checks_are_unique() {
        let mut names: Vec<&str> = BARRIERS.iter().map(|b| b.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BARRIER_COUNT);

        let mut checks: Vec<String> = BARRIERS.iter().map(|b| format!("{:?}", b.check)).collect();
        checks.sort_unstable();
        checks.dedup();
        assert_eq!(checks.len(), BARRIER_COUNT);
    }

    #[test]
    fn weights_are_positive() {
        assert!(BARRIERS.iter().all(|b| b.weight > 0.0 && b.base_timeout_ms > 0));
    }

    #[test]
    fn budgets_shrink_with_threat() {
        for b in &BARRIERS {
            for pair in ThreatLevel::ALL.windows(2) {
                let lo = b.budget(pair[0].policy().timeout_factor);
                let hi = b.budget(pair[1].policy().timeout_factor);
                assert!(hi <= lo, "barrier {} budget grew", b.id);
            }
        }
    }

    #[test]
    fn mandates_only_grow_with_threat() {
        let config = StrandConfig::default();
        for b in &BARRIERS {
            for pair in ThreatLevel::ALL.windows(2) {
                let lo = b.is_mandatory(&config, &pair[0].policy());
                let hi = b.is_mandatory(&config, &pair[1].policy());
                assert!(hi >= lo, "barrier {} relaxed at {}", b.id, pair[1]);
            }
        }
    }

    #[test]
    fn config_flags_make_evidence_mandatory() {
        let config = StrandConfig::builder()
            .require_hardware(true)
            .require_biometric(true)
            .build()
            .unwrap();
        let green = ThreatLevel::Green.policy();
        for id in 6..=11 {
            assert!(barrier(id).unwrap().is_mandatory(&config, &green));
        }
        assert!(!barrier(19).unwrap().is_mandatory(&config, &green));
        assert!(barrier(19).unwrap().is_mandatory(&config, &ThreatLevel::Red.policy()));
    }

    #[test]
    fn table_snapshot() {
        insta::assert_json_snapshot!("barrier_table", BARRIERS.to_vec());
    }
}
