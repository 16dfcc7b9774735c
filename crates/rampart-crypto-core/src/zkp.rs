//! Non-interactive proof of knowledge (hash construction, Fiat–Shamir).
//!
//! ```text
//! nonce        ← CSPRNG(32)
//! commitment   = H("commit"   ‖ nonce)
//! challenge    = H("challenge" ‖ commitment ‖ message)
//! public_input = HKDF(secret, "zk-public-input")
//! response     = H("response" ‖ public_input ‖ commitment ‖ challenge)
//! ```
//!
//! The verifier recomputes `challenge` and `response`. This is a hash
//! simulation of a sigma protocol: it gives the binding and freshness
//! contracts the barrier pipeline relies on (any change to message, secret
//! or proof field fails verification) but not soundness against a party
//! that knows `public_input`. Swap in a discrete-log Schnorr proof from a
//! vetted library for that property; the types here stay the same.

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::kdf;
use crate::memory::SecretBytes;
use crate::quantum::{constant_time_eq, digest_256, DIGEST_LEN};

const DOMAIN_COMMIT: &[u8] = b"rampart zk commit v1";
const DOMAIN_CHALLENGE: &[u8] = b"rampart zk challenge v1";
const DOMAIN_RESPONSE: &[u8] = b"rampart zk response v1";
const PUBLIC_INPUT_CONTEXT: &[u8] = b"zk-public-input";

/// Proof transcript. Contains no secret material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkProof {
    pub commitment: [u8; DIGEST_LEN],
    pub challenge: [u8; DIGEST_LEN],
    pub response: [u8; DIGEST_LEN],
    pub public_input: [u8; DIGEST_LEN],
}

/// Non-secret commitment to `secret`, stored at enrollment and compared
/// against [`ZkProof::public_input`] at verification.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if `secret` is empty.
pub fn derive_public_input(secret: &[u8]) -> Result<[u8; DIGEST_LEN], CryptoError> {
    let key = kdf::derive_key(secret, PUBLIC_INPUT_CONTEXT)?;
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(key.expose());
    Ok(out)
}

fn challenge_for(commitment: &[u8], message: &[u8]) -> [u8; DIGEST_LEN] {
    digest_256(DOMAIN_CHALLENGE, &[commitment, message])
}

fn response_for(public_input: &[u8], commitment: &[u8], challenge: &[u8]) -> [u8; DIGEST_LEN] {
    digest_256(DOMAIN_RESPONSE, &[public_input, commitment, challenge])
}

/// Prove knowledge of `secret` bound to `message`.
///
/// Uses a fresh nonce per call, so two proofs of the same statement differ.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the CSPRNG fails, or
/// `CryptoError::KeyDerivation` if `secret` is empty.
pub fn generate_proof(secret: &[u8], message: &[u8]) -> Result<ZkProof, CryptoError> {
    let nonce = SecretBytes::<32>::random()?;
    let public_input = derive_public_input(secret)?;
    let commitment = digest_256(DOMAIN_COMMIT, &[nonce.expose()]);
    let challenge = challenge_for(&commitment, message);
    let response = response_for(&public_input, &commitment, &challenge);
    Ok(ZkProof {
        commitment,
        challenge,
        response,
        public_input,
    })
}

/// Verify `proof` against `message`.
#[must_use]
pub fn verify_proof(proof: &ZkProof, message: &[u8]) -> bool {
    let challenge = challenge_for(&proof.commitment, message);
    if !constant_time_eq(&challenge, &proof.challenge) {
        return false;
    }
    let response = response_for(&proof.public_input, &proof.commitment, &proof.challenge);
    constant_time_eq(&response, &proof.response)
}

/// Verify `proof` against `message` and an enrolled public input.
#[must_use]
pub fn verify_proof_for(
    proof: &ZkProof,
    message: &[u8],
    expected_public_input: &[u8; DIGEST_LEN],
) -> bool {
    // Evaluate both so timing does not reveal which check failed.
    let bound = constant_time_eq(&proof.public_input, expected_public_input);
    let valid = verify_proof(proof, message);
    bound & valid
}
