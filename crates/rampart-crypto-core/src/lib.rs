//! `rampart-crypto-core`: cryptographic primitives for RAMPART.
//!
//! This crate is the audit target of the barrier pipeline: zero network,
//! zero async, no engine policy. Everything secret it produces lives in
//! [`SecretBuffer`]/[`SecretBytes`] and is zeroized on drop.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;
pub mod quantum;

pub mod kdf;
pub mod threshold;

pub mod zkp;
pub mod vrf;

pub mod signature;

pub mod biometric;
pub mod hardware;

pub use biometric::{
    BiometricMatch, BiometricModality, BiometricSample, BiometricSecurityLevel,
    BiometricTemplate, BIOMETRIC_FEATURE_LEN, DEFAULT_MATCH_THRESHOLD,
};
pub use error::CryptoError;
pub use hardware::{
    derive_hardware_wrapping_key, generate_hardware_token, AttestationEvidence,
    AttestationFormat, AttestationVerifier, HardwareBinding,
};
pub use kdf::{
    derive_key, derive_password_key, derive_segment_key, Argon2idParams, KdfPreset, SegmentType,
    DEFAULT_SEGMENT_COUNT, DERIVED_KEY_LEN,
};
pub use memory::{disable_core_dumps, LockedRegion, SecretBuffer, SecretBytes};
pub use quantum::{
    constant_time_eq, correlation_hash, digest_256, secure_digest, secure_random_bytes,
    shannon_entropy,
};
pub use signature::{
    compute_binding_hash, generate_signing_keypair, sign, verify, AggregateEntry,
    AggregateSignature, MultiLayerPublicKey, MultiLayerSignature, MultiLayerSigningKeyPair,
    SignatureAggregator,
};
pub use threshold::{
    reconstruct, reconstruct_verified, split, split_with_rng, verify_commitment, ThresholdShare,
};
pub use vrf::{VrfKeyPair, VrfOutput};
pub use zkp::{derive_public_input, generate_proof, verify_proof, verify_proof_for, ZkProof};
