//! Enrollment, noisy re-presentation and policy gates for biometrics.

use rampart_crypto_core::biometric::{
    BiometricModality, BiometricSample, BiometricSecurityLevel, BiometricTemplate,
    BIOMETRIC_FEATURE_LEN, DEFAULT_MATCH_THRESHOLD,
};
use rampart_crypto_core::memory::SecretBuffer;

fn enrolled_features() -> Vec<u8> {
    SecretBuffer::random(BIOMETRIC_FEATURE_LEN)
        .expect("random should succeed")
        .expose()
        .to_vec()
}

fn sample(features: Vec<u8>, liveness_score: f64, attack: bool) -> BiometricSample {
    BiometricSample {
        features,
        liveness_score,
        presentation_attack_detected: attack,
    }
}

/// Flip one bit in every `stride`-th feature byte.
fn noisy(features: &[u8], stride: usize) -> Vec<u8> {
    features
        .iter()
        .enumerate()
        .map(|(i, &b)| if i % stride == 0 { b ^ 0x01 } else { b })
        .collect()
}

#[test]
fn genuine_noisy_sample_matches() {
    let f = enrolled_features();
    let template =
        BiometricTemplate::enroll(BiometricModality::Fingerprint, &f, BiometricSecurityLevel::High)
            .expect("enroll should succeed");

    // 32 flipped bits out of 1024: score 0.96875.
    let m = template
        .evaluate(&sample(noisy(&f, 4), 0.99, false))
        .expect("evaluate should succeed");
    assert!(m.key_recovered);
    assert!(m.score > DEFAULT_MATCH_THRESHOLD);
    assert!(m.is_match(DEFAULT_MATCH_THRESHOLD));
}

#[test]
fn impostor_never_matches() {
    let template = BiometricTemplate::enroll(
        BiometricModality::Face,
        &enrolled_features(),
        BiometricSecurityLevel::High,
    )
    .expect("enroll should succeed");
    let m = template
        .evaluate(&sample(enrolled_features(), 0.99, false))
        .expect("evaluate should succeed");
    assert!(!m.is_match(DEFAULT_MATCH_THRESHOLD));
}

#[test]
fn low_liveness_and_attack_flag_block_a_match() {
    let f = enrolled_features();
    let template =
        BiometricTemplate::enroll(BiometricModality::Iris, &f, BiometricSecurityLevel::Maximum)
            .expect("enroll should succeed");

    let spoof = template
        .evaluate(&sample(f.clone(), 0.99, true))
        .expect("evaluate should succeed");
    assert!(spoof.key_recovered && !spoof.pad_ok);
    assert!(!spoof.is_match(DEFAULT_MATCH_THRESHOLD));

    // Maximum needs 0.97.
    let replay = template
        .evaluate(&sample(f, 0.95, false))
        .expect("evaluate should succeed");
    assert!(!replay.liveness_ok);
    assert!(!replay.is_match(DEFAULT_MATCH_THRESHOLD));
}

#[test]
fn stricter_threshold_rejects_more_noise() {
    let f = enrolled_features();
    let template =
        BiometricTemplate::enroll(BiometricModality::Palm, &f, BiometricSecurityLevel::Standard)
            .expect("enroll should succeed");
    let m = template
        .evaluate(&sample(noisy(&f, 4), 0.99, false))
        .expect("evaluate should succeed");
    assert!(m.is_match(0.95));
    assert!(!m.is_match(0.99));
}

#[test]
fn stored_template_detects_tampering() {
    let template = BiometricTemplate::enroll(
        BiometricModality::Voice,
        &enrolled_features(),
        BiometricSecurityLevel::High,
    )
    .expect("enroll should succeed");
    let json = serde_json::to_string(&template).expect("serialize should succeed");
    let mut stored: BiometricTemplate =
        serde_json::from_str(&json).expect("deserialize should succeed");
    assert!(stored.verify_integrity());

    stored.require_liveness = false;
    assert!(!stored.verify_integrity());
}
