//! Verifiable random function over deterministic Ed25519 signatures.
//!
//! ```text
//! proof = Ed25519-Sign(seed, "rampart vrf v1" ‖ input)   // RFC 8032: deterministic
//! value = SHA-256(domain ‖ proof)
//! ```
//!
//! Anyone holding the public key can check that `proof` is a valid signature
//! over `input` and that `value` is its hash; nobody without the seed can
//! predict `value` for a fresh input. Uniqueness of the proof is not
//! claimed (a malicious key holder could in principle produce a second
//! valid signature); the barrier pipeline only relies on determinism and
//! unpredictability.

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use ring::signature::{self, Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use crate::quantum::{constant_time_eq, digest_256, DIGEST_LEN};

/// VRF output value length (SHA-256).
pub const VRF_OUTPUT_LEN: usize = DIGEST_LEN;

/// Ed25519 public key length.
pub const VRF_PUBLIC_KEY_LEN: usize = 32;

/// Ed25519 signature length.
pub const VRF_PROOF_LEN: usize = 64;

const SEED_LEN: usize = 32;
const INPUT_DOMAIN: &[u8] = b"rampart vrf v1";
const VALUE_DOMAIN: &[u8] = b"rampart vrf value v1";

/// VRF secret key. The seed lives in locked, zeroizing memory.
pub struct VrfKeyPair {
    seed: SecretBuffer,
    public: [u8; VRF_PUBLIC_KEY_LEN],
}

impl fmt::Debug for VrfKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VrfKeyPair(***)")
    }
}

impl VrfKeyPair {
    /// Fresh key from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` if `ring` rejects the seed.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut seed = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut seed);
        let result = Self::from_seed(&seed);
        seed.zeroize();
        result
    }

    /// Rebuild a key from a stored 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyMaterial` on a wrong-length seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        if seed.len() != SEED_LEN {
            return Err(CryptoError::InvalidKeyMaterial(format!(
                "VRF seed must be {SEED_LEN} bytes, got {}",
                seed.len()
            )));
        }
        let kp = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| CryptoError::InvalidKeyMaterial(format!("VRF seed rejected: {e}")))?;
        let mut public = [0u8; VRF_PUBLIC_KEY_LEN];
        public.copy_from_slice(kp.public_key().as_ref());
        Ok(Self {
            seed: SecretBuffer::new(seed)?,
            public,
        })
    }

    #[must_use]
    pub const fn public_key(&self) -> &[u8; VRF_PUBLIC_KEY_LEN] {
        &self.public
    }
}

/// VRF evaluation result: value, proof and the key it was made with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfOutput {
    pub value: [u8; VRF_OUTPUT_LEN],
    pub proof: Vec<u8>,
    pub public_key: [u8; VRF_PUBLIC_KEY_LEN],
}

fn framed_input(input: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(INPUT_DOMAIN.len().saturating_add(input.len()));
    msg.extend_from_slice(INPUT_DOMAIN);
    msg.extend_from_slice(input);
    msg
}

/// Evaluate the VRF on `input`.
///
/// # Errors
///
/// Returns `CryptoError::InvalidKeyMaterial` if the stored seed is rejected.
pub fn evaluate(input: &[u8], key: &VrfKeyPair) -> Result<VrfOutput, CryptoError> {
    let kp = Ed25519KeyPair::from_seed_and_public_key(key.seed.expose(), &key.public)
        .map_err(|e| CryptoError::InvalidKeyMaterial(format!("VRF key reconstruction: {e}")))?;
    let proof = kp.sign(&framed_input(input)).as_ref().to_vec();
    let value = digest_256(VALUE_DOMAIN, &[&proof]);
    Ok(VrfOutput {
        value,
        proof,
        public_key: key.public,
    })
}

/// Check that `output` was derived from `input` under `output.public_key`.
#[must_use]
pub fn verify(input: &[u8], output: &VrfOutput) -> bool {
    if output.proof.len() != VRF_PROOF_LEN {
        return false;
    }
    let pk = signature::UnparsedPublicKey::new(&signature::ED25519, &output.public_key);
    if pk.verify(&framed_input(input), &output.proof).is_err() {
        return false;
    }
    let value = digest_256(VALUE_DOMAIN, &[&output.proof]);
    constant_time_eq(&value, &output.value)
}

/// [`verify`] plus a check that the output belongs to an enrolled key.
#[must_use]
pub fn verify_with_key(
    input: &[u8],
    output: &VrfOutput,
    expected_public_key: &[u8; VRF_PUBLIC_KEY_LEN],
) -> bool {
    constant_time_eq(&output.public_key, expected_public_key) && verify(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_is_deterministic() {
        let key = VrfKeyPair::generate().expect("keygen should succeed");
        let a = evaluate(b"x", &key).expect("evaluate should succeed");
        let b = evaluate(b"x", &key).expect("evaluate should succeed");
        assert_eq!(a.value, b.value);
        assert_eq!(a.proof, b.proof);
    }

    #[test]
    fn distinct_inputs_give_distinct_values() {
        let key = VrfKeyPair::generate().expect("keygen should succeed");
        let x = evaluate(b"x", &key).expect("evaluate should succeed");
        let y = evaluate(b"y", &key).expect("evaluate should succeed");
        assert_ne!(x.value, y.value);
    }

    #[test]
    fn verify_accepts_own_output_only() {
        let key = VrfKeyPair::generate().expect("keygen should succeed");
        let out = evaluate(b"x", &key).expect("evaluate should succeed");
        assert!(verify(b"x", &out));
        assert!(!verify(b"y", &out));

        let mut bad_value = out.clone();
        bad_value.value[0] ^= 1;
        assert!(!verify(b"x", &bad_value));

        let mut bad_proof = out.clone();
        bad_proof.proof[10] ^= 1;
        assert!(!verify(b"x", &bad_proof));

        let mut short = out;
        short.proof.truncate(10);
        assert!(!verify(b"x", &short));
    }

    #[test]
    fn seed_roundtrip_reproduces_outputs() {
        let seed = [0x11u8; 32];
        let a = VrfKeyPair::from_seed(&seed).expect("from_seed should succeed");
        let b = VrfKeyPair::from_seed(&seed).expect("from_seed should succeed");
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(
            evaluate(b"in", &a).expect("evaluate should succeed").value,
            evaluate(b"in", &b).expect("evaluate should succeed").value
        );
    }

    #[test]
    fn key_pinning_rejects_foreign_key() {
        let enrolled = VrfKeyPair::generate().expect("keygen should succeed");
        let other = VrfKeyPair::generate().expect("keygen should succeed");
        let out = evaluate(b"c", &other).expect("evaluate should succeed");
        assert!(verify(b"c", &out));
        assert!(!verify_with_key(b"c", &out, enrolled.public_key()));
    }

    #[test]
    fn wrong_seed_length_is_rejected() {
        assert!(matches!(
            VrfKeyPair::from_seed(&[0u8; 31]),
            Err(CryptoError::InvalidKeyMaterial(_))
        ));
    }
}
