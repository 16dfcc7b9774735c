//! Formatting a secret-bearing value must never print its bytes.

use rampart_crypto_core::biometric::{BiometricSample, BIOMETRIC_FEATURE_LEN};
use rampart_crypto_core::kdf::derive_key;
use rampart_crypto_core::memory::SecretBytes;
use rampart_crypto_core::signature::generate_signing_keypair;
use rampart_crypto_core::threshold::split;
use rampart_crypto_core::vrf::VrfKeyPair;

#[test]
fn derived_key_is_masked() {
    let key = derive_key(b"master", b"ctx").expect("derive should succeed");
    assert_eq!(format!("{key:?}"), "SecretBuffer(***)");
    assert_eq!(format!("{key}"), "SecretBuffer(***)");
}

#[test]
fn fixed_secret_is_masked() {
    let bytes = SecretBytes::new([0x41u8; 32]);
    let debug = format!("{bytes:?}");
    assert!(!debug.contains("65"), "byte value leaked: {debug}");
    assert!(debug.contains("***"));
}

#[test]
fn share_value_is_masked() {
    let shares = split(&[0xABu8; 16], 2, 3).expect("split should succeed");
    for share in &shares {
        let debug = format!("{share:?}");
        assert!(debug.contains("index"));
        assert!(debug.contains("***"));
        assert!(!debug.contains(&format!("{:?}", share.value)));
    }
}

#[test]
fn biometric_sample_features_are_masked() {
    let sample = BiometricSample {
        features: vec![0x7Fu8; BIOMETRIC_FEATURE_LEN],
        liveness_score: 0.99,
        presentation_attack_detected: false,
    };
    let debug = format!("{sample:?}");
    assert!(!debug.contains("127"), "feature bytes leaked: {debug}");
    assert!(debug.contains("liveness_score"));
}

#[test]
fn key_pairs_are_masked() {
    let vrf = VrfKeyPair::generate().expect("keygen should succeed");
    assert_eq!(format!("{vrf:?}"), "VrfKeyPair(***)");

    let signing = generate_signing_keypair().expect("keygen should succeed");
    assert_eq!(format!("{signing:?}"), "MultiLayerSigningKeyPair(***)");
}
