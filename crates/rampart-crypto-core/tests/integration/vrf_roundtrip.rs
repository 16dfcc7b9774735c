//! VRF determinism and binding across keys and inputs.

use std::collections::HashSet;

use rampart_crypto_core::vrf::{evaluate, verify, verify_with_key, VrfKeyPair, VrfOutput};

#[test]
fn same_key_same_input_same_value() {
    let key = VrfKeyPair::generate().expect("keygen should succeed");
    let a = evaluate(b"x", &key).expect("evaluate should succeed");
    let b = evaluate(b"x", &key).expect("evaluate should succeed");
    assert_eq!(a.value, b.value);
    assert!(verify(b"x", &a));
}

#[test]
fn distinct_inputs_give_distinct_values() {
    let key = VrfKeyPair::generate().expect("keygen should succeed");
    let values: HashSet<[u8; 32]> = (0u32..256)
        .map(|i| {
            evaluate(&i.to_be_bytes(), &key)
                .expect("evaluate should succeed")
                .value
        })
        .collect();
    assert_eq!(values.len(), 256);
}

#[test]
fn output_does_not_verify_for_another_input() {
    let key = VrfKeyPair::generate().expect("keygen should succeed");
    let out = evaluate(b"x", &key).expect("evaluate should succeed");
    assert!(!verify(b"y", &out));
}

#[test]
fn seeded_key_is_reproducible() {
    let seed = [7u8; 32];
    let a = VrfKeyPair::from_seed(&seed).expect("from_seed should succeed");
    let b = VrfKeyPair::from_seed(&seed).expect("from_seed should succeed");
    assert_eq!(a.public_key(), b.public_key());
    let va = evaluate(b"challenge", &a).expect("evaluate should succeed");
    let vb = evaluate(b"challenge", &b).expect("evaluate should succeed");
    assert_eq!(va.value, vb.value);
}

#[test]
fn pinned_key_rejects_substituted_output() {
    let enrolled = VrfKeyPair::generate().expect("keygen should succeed");
    let attacker = VrfKeyPair::generate().expect("keygen should succeed");
    let forged = evaluate(b"challenge", &attacker).expect("evaluate should succeed");

    // Self-consistent, but not under the enrolled key.
    assert!(verify(b"challenge", &forged));
    assert!(!verify_with_key(b"challenge", &forged, enrolled.public_key()));
}

#[test]
fn output_survives_json_roundtrip() {
    let key = VrfKeyPair::generate().expect("keygen should succeed");
    let out = evaluate(b"json", &key).expect("evaluate should succeed");
    let json = serde_json::to_string(&out).expect("serialize should succeed");
    let decoded: VrfOutput = serde_json::from_str(&json).expect("deserialize should succeed");
    assert!(verify_with_key(b"json", &decoded, key.public_key()));
}
