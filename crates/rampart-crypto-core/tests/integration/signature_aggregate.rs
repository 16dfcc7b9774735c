//! Multi-layer signatures across several signers, folded into one aggregate.

use rampart_crypto_core::signature::{
    generate_signing_keypair, sign, verify, MultiLayerPublicKey, MultiLayerSignature,
    SignatureAggregator, BINDING_HASH_LEN,
};
use rampart_crypto_core::CryptoError;

struct Signers {
    signatures: Vec<MultiLayerSignature>,
    keys: Vec<MultiLayerPublicKey>,
    messages: Vec<Vec<u8>>,
}

fn signers(count: usize) -> Signers {
    let mut out = Signers {
        signatures: Vec::with_capacity(count),
        keys: Vec::with_capacity(count),
        messages: Vec::with_capacity(count),
    };
    for i in 0..count {
        let kp = generate_signing_keypair().expect("keygen should succeed");
        let message = format!("approval #{i}").into_bytes();
        out.signatures
            .push(sign(&message, &kp).expect("sign should succeed"));
        out.keys.push(kp.public.clone());
        out.messages.push(message);
    }
    out
}

fn refs(messages: &[Vec<u8>]) -> Vec<&[u8]> {
    messages.iter().map(Vec::as_slice).collect()
}

#[test]
fn sign_verify_and_binary_roundtrip() {
    let kp = generate_signing_keypair().expect("keygen should succeed");
    let sig = sign(b"transfer 10 units", &kp).expect("sign should succeed");
    assert_eq!(sig.binding_hash.len(), BINDING_HASH_LEN);
    verify(b"transfer 10 units", &sig, &kp.public).expect("verify should succeed");

    let bytes = sig.to_bytes().expect("encode should succeed");
    let decoded = MultiLayerSignature::from_bytes(&bytes).expect("decode should succeed");
    assert_eq!(decoded, sig);
    verify(b"transfer 10 units", &decoded, &kp.public).expect("verify should succeed");
}

#[test]
fn wrong_message_fails_signature_layer() {
    let kp = generate_signing_keypair().expect("keygen should succeed");
    let sig = sign(b"a", &kp).expect("sign should succeed");
    assert!(matches!(
        verify(b"b", &sig, &kp.public),
        Err(CryptoError::Signature(_))
    ));
}

#[test]
fn swapped_payload_is_tamper() {
    let kp = generate_signing_keypair().expect("keygen should succeed");
    let mut sig = sign(b"a", &kp).expect("sign should succeed");
    sig.lattice[0] ^= 0x80;
    assert!(!sig.verify_binding());
    assert!(matches!(
        verify(b"a", &sig, &kp.public),
        Err(CryptoError::TamperDetected(_))
    ));
}

#[test]
fn three_signers_aggregate_and_reverify() {
    let s = signers(3);
    let messages = refs(&s.messages);
    let aggregator = SignatureAggregator::default();

    let aggregate = aggregator
        .aggregate(&s.signatures, &s.keys, &messages)
        .expect("aggregate should succeed");
    assert_eq!(aggregate.signature_count, 3);
    assert_eq!(aggregate.combined.len(), 64);

    aggregator
        .verify_aggregate(&aggregate, &messages)
        .expect("verify_aggregate should succeed");

    let json = serde_json::to_string(&aggregate).expect("serialize should succeed");
    let decoded = serde_json::from_str(&json).expect("deserialize should succeed");
    aggregator
        .verify_aggregate(&decoded, &messages)
        .expect("verify_aggregate after JSON should succeed");
}

#[test]
fn aggregate_rejects_a_bad_member() {
    let mut s = signers(2);
    s.messages[1] = b"something else".to_vec();
    let messages = refs(&s.messages);
    let result = SignatureAggregator::default().aggregate(&s.signatures, &s.keys, &messages);
    assert!(matches!(result, Err(CryptoError::Signature(_))));
}

#[test]
fn aggregate_rejects_length_mismatch_and_limit() {
    let s = signers(2);
    let messages = refs(&s.messages);
    let mismatch = SignatureAggregator::default().aggregate(&s.signatures, &s.keys[..1], &messages);
    assert!(matches!(mismatch, Err(CryptoError::Config(_))));

    let limited = SignatureAggregator::new(1).aggregate(&s.signatures, &s.keys, &messages);
    assert!(matches!(limited, Err(CryptoError::Config(_))));
}

#[test]
fn verify_aggregate_detects_reordered_messages() {
    let s = signers(2);
    let messages = refs(&s.messages);
    let aggregator = SignatureAggregator::default();
    let aggregate = aggregator
        .aggregate(&s.signatures, &s.keys, &messages)
        .expect("aggregate should succeed");

    let reversed: Vec<&[u8]> = messages.iter().rev().copied().collect();
    assert!(matches!(
        aggregator.verify_aggregate(&aggregate, &reversed),
        Err(CryptoError::TamperDetected(_))
    ));
}

#[test]
fn verify_aggregate_detects_dropped_entry() {
    let s = signers(2);
    let messages = refs(&s.messages);
    let aggregator = SignatureAggregator::default();
    let mut aggregate = aggregator
        .aggregate(&s.signatures, &s.keys, &messages)
        .expect("aggregate should succeed");
    aggregate.entries.pop();
    aggregate.signature_count = 1;
    assert!(matches!(
        aggregator.verify_aggregate(&aggregate, &messages[..1]),
        Err(CryptoError::TamperDetected(_))
    ));
}
