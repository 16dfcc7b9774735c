//! Hardware binding validation, fail-closed.

use rampart_crypto_core::hardware::{
    derive_hardware_wrapping_key, generate_hardware_token, AttestationEvidence, AttestationFormat,
    AttestationVerifier, HardwareBinding,
};

const ENROLLED_AT: u64 = 1_700_000_000;

fn evidence(format: AttestationFormat) -> Vec<u8> {
    AttestationEvidence {
        format,
        payload: b"quote: pcr0..pcr7".to_vec(),
        signature: vec![0xA5; 64],
    }
    .encode()
    .expect("encode should succeed")
}

/// Accepts only evidence whose payload mentions the device id.
struct PayloadNamesDevice;

impl AttestationVerifier for PayloadNamesDevice {
    fn verify(&self, device_id: &str, evidence: &AttestationEvidence) -> bool {
        evidence
            .payload
            .windows(device_id.len())
            .any(|w| w == device_id.as_bytes())
    }
}

#[test]
fn empty_evidence_is_rejected() {
    let binding = HardwareBinding::new("tpm-0001", Vec::new(), ENROLLED_AT);
    assert!(!binding.verify_attestation());
}

#[test]
fn well_formed_evidence_is_accepted() {
    let binding = HardwareBinding::new("tpm-0001", evidence(AttestationFormat::Tpm2Quote), ENROLLED_AT);
    assert!(binding.verify_attestation());
}

#[test]
fn every_format_roundtrips_through_binding() {
    for format in [
        AttestationFormat::Tpm2Quote,
        AttestationFormat::SecureEnclave,
        AttestationFormat::AndroidKeystore,
        AttestationFormat::WebAuthn,
    ] {
        let binding = HardwareBinding::new("dev", evidence(format), ENROLLED_AT);
        assert!(binding.verify_attestation(), "{format:?}");
        let parsed = AttestationEvidence::parse(&binding.attestation_evidence)
            .expect("parse should succeed");
        assert_eq!(parsed.format, format);
    }
}

#[test]
fn rebinding_to_another_device_is_detected() {
    let mut binding = HardwareBinding::new("tpm-0001", evidence(AttestationFormat::Tpm2Quote), ENROLLED_AT);
    binding.device_id = "tpm-0002".into();
    assert!(!binding.verify_attestation());
}

#[test]
fn backdated_timestamp_is_detected() {
    let mut binding = HardwareBinding::new("tpm-0001", evidence(AttestationFormat::Tpm2Quote), ENROLLED_AT);
    binding.timestamp += 86_400;
    assert!(!binding.verify_attestation());
}

#[test]
fn garbage_evidence_is_rejected_even_when_bound() {
    let binding = HardwareBinding::new("tpm-0001", b"not an envelope".to_vec(), ENROLLED_AT);
    assert!(!binding.verify_attestation());
}

#[test]
fn collaborator_decides_trust() {
    let named = AttestationEvidence {
        format: AttestationFormat::SecureEnclave,
        payload: b"attest device se-42".to_vec(),
        signature: vec![1; 32],
    }
    .encode()
    .expect("encode should succeed");

    let trusted = HardwareBinding::new("se-42", named.clone(), ENROLLED_AT);
    assert!(trusted.verify_attestation_with(&PayloadNamesDevice));

    let stranger = HardwareBinding::new("se-43", named, ENROLLED_AT);
    assert!(stranger.verify_attestation());
    assert!(!stranger.verify_attestation_with(&PayloadNamesDevice));
}

#[test]
fn binding_survives_json_roundtrip() {
    let binding = HardwareBinding::new("tpm-0001", evidence(AttestationFormat::WebAuthn), ENROLLED_AT);
    let json = serde_json::to_string(&binding).expect("serialize should succeed");
    let decoded: HardwareBinding = serde_json::from_str(&json).expect("deserialize should succeed");
    assert_eq!(decoded, binding);
    assert!(decoded.verify_attestation());
}

#[test]
fn wrapping_key_is_stable_per_token() {
    let token = generate_hardware_token().expect("token should succeed");
    let a = derive_hardware_wrapping_key(token.expose()).expect("derive should succeed");
    let b = derive_hardware_wrapping_key(token.expose()).expect("derive should succeed");
    assert_eq!(a.expose(), b.expose());

    let other = generate_hardware_token().expect("token should succeed");
    let c = derive_hardware_wrapping_key(other.expose()).expect("derive should succeed");
    assert_ne!(a.expose(), c.expose());
}
