//! Multi-layer signatures: Ed25519 + ML-DSA-65 + hash layer, bound together.
//!
//! This module provides:
//! - [`generate_signing_keypair`]: Ed25519 seed + ML-DSA-65 signing key
//! - [`sign`]: three independent payloads plus a SHA-512 binding hash
//! - [`verify`]: binding first, then every layer (all must hold)
//! - [`SignatureAggregator`]: combine N signer/message pairs into one
//!   re-verifiable [`AggregateSignature`]
//!
//! # Layers
//!
//! | layer | payload | provider |
//! |---|---|---|
//! | classical | Ed25519 signature | `ring` |
//! | lattice | ML-DSA-65 signature, context `RAMPART-MLSIG-v1` | `libcrux-ml-dsa` |
//! | hash | BLAKE3 commitment to (public keys, message) | `blake3` |
//!
//! The hash layer is a public-key-bound message commitment, not a signature
//! on its own; a stateless hash-based scheme (SLH-DSA) from an audited
//! library can occupy the slot without changing the wire format.
//!
//! # Binding
//!
//! `binding_hash = SHA-512(domain ‖ len‖classical ‖ len‖lattice ‖ len‖hash)`.
//! Swapping or editing any one payload changes the binding.
//!
//! # Binary form
//!
//! ```text
//! Magic "RMLS" (4 B) | Version (1 B) | [u32 LE len | payload] × 3 | binding (64 B)
//! ```

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use ring::signature::{self, Ed25519KeyPair, KeyPair};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use crate::quantum::{constant_time_eq, digest_256, secure_digest, DIGEST_LEN, WIDE_DIGEST_LEN};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const ED25519_PUBLIC_KEY_LEN: usize = 32;
pub const ED25519_SIGNATURE_LEN: usize = 64;
const ED25519_SEED_LEN: usize = 32;

/// ML-DSA-65 verification key length (FIPS 204).
pub const ML_DSA_65_VERIFICATION_KEY_LEN: usize = 1952;

/// ML-DSA-65 signature length (FIPS 204).
pub const ML_DSA_65_SIGNATURE_LEN: usize = 3309;

/// Hash-layer payload length (BLAKE3).
pub const HASH_LAYER_LEN: usize = 32;

/// Binding hash length (SHA-512).
pub const BINDING_HASH_LEN: usize = WIDE_DIGEST_LEN;

/// Binary magic.
pub const SIGNATURE_MAGIC: &[u8; 4] = b"RMLS";

/// Binary format version.
pub const SIGNATURE_FORMAT_VERSION: u8 = 1;

const ML_DSA_RAND_LEN: usize = 32;
const ML_DSA_CONTEXT: &[u8] = b"RAMPART-MLSIG-v1";
const BINDING_DOMAIN: &[u8] = b"rampart multi-layer binding v1";
const HASH_LAYER_DOMAIN: &str = "rampart multi-layer hash layer v1";
const AGGREGATE_DOMAIN: &[u8] = b"rampart signature aggregate v1";
const MESSAGE_DOMAIN: &[u8] = b"rampart aggregate message v1";

/// Default upper bound on signers per aggregate.
pub const DEFAULT_MAX_SIGNERS: usize = 256;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Public half of a multi-layer signing key. Safe to distribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiLayerPublicKey {
    pub ed25519: [u8; ED25519_PUBLIC_KEY_LEN],
    pub ml_dsa: Vec<u8>,
}

impl MultiLayerPublicKey {
    /// # Errors
    ///
    /// Returns `CryptoError::Signature` if the ML-DSA key has the wrong length.
    pub fn new(ed25519: [u8; ED25519_PUBLIC_KEY_LEN], ml_dsa: Vec<u8>) -> Result<Self, CryptoError> {
        if ml_dsa.len() != ML_DSA_65_VERIFICATION_KEY_LEN {
            return Err(CryptoError::Signature(format!(
                "invalid ML-DSA verification key length: {} bytes (expected {ML_DSA_65_VERIFICATION_KEY_LEN})",
                ml_dsa.len()
            )));
        }
        Ok(Self { ed25519, ml_dsa })
    }

    /// Short stable identifier for logs and aggregate framing.
    #[must_use]
    pub fn fingerprint(&self) -> [u8; DIGEST_LEN] {
        digest_256(b"rampart public key fingerprint v1", &[&self.ed25519, &self.ml_dsa])
    }
}

/// Private key material. Not serializable; zeroized on drop.
pub struct MultiLayerSigningKeyPair {
    ed25519_seed: SecretBuffer,
    ml_dsa_signing_key: SecretBuffer,
    pub public: MultiLayerPublicKey,
}

impl fmt::Debug for MultiLayerSigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MultiLayerSigningKeyPair(***)")
    }
}

/// Generate a fresh multi-layer key pair.
///
/// # Errors
///
/// Returns `CryptoError::Signature` if Ed25519 key generation fails, or
/// `CryptoError::SecureMemory` if a secret buffer cannot be allocated.
pub fn generate_signing_keypair() -> Result<MultiLayerSigningKeyPair, CryptoError> {
    let mut seed = [0u8; ED25519_SEED_LEN];
    OsRng.fill_bytes(&mut seed);
    let ed_kp = Ed25519KeyPair::from_seed_unchecked(&seed).map_err(|e| {
        seed.zeroize();
        CryptoError::Signature(format!("Ed25519 key generation failed: {e}"))
    })?;
    let mut ed_pk = [0u8; ED25519_PUBLIC_KEY_LEN];
    ed_pk.copy_from_slice(ed_kp.public_key().as_ref());
    let ed25519_seed = SecretBuffer::new(&seed);
    seed.zeroize();
    let ed25519_seed = ed25519_seed?;

    let mut keygen_rand = [0u8; ML_DSA_RAND_LEN];
    OsRng.fill_bytes(&mut keygen_rand);
    let ml_kp = libcrux_ml_dsa::ml_dsa_65::generate_key_pair(keygen_rand);
    keygen_rand.zeroize();

    // libcrux key types do not implement Zeroize; the authoritative copy is
    // the SecretBuffer below.
    let ml_dsa_signing_key = SecretBuffer::new(ml_kp.signing_key.as_slice())?;

    Ok(MultiLayerSigningKeyPair {
        ed25519_seed,
        ml_dsa_signing_key,
        public: MultiLayerPublicKey {
            ed25519: ed_pk,
            ml_dsa: ml_kp.verification_key.as_ref().to_vec(),
        },
    })
}

// ---------------------------------------------------------------------------
// Signature type
// ---------------------------------------------------------------------------

/// Three independent payloads and the hash binding them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiLayerSignature {
    pub classical: Vec<u8>,
    pub lattice: Vec<u8>,
    pub hash: Vec<u8>,
    pub binding_hash: Vec<u8>,
}

/// SHA-512 over the three length-framed payloads.
#[must_use]
pub fn compute_binding_hash(classical: &[u8], lattice: &[u8], hash: &[u8]) -> [u8; BINDING_HASH_LEN] {
    secure_digest(BINDING_DOMAIN, &[classical, lattice, hash])
}

impl MultiLayerSignature {
    /// Build a signature from payloads, computing the binding hash.
    #[must_use]
    pub fn from_payloads(classical: Vec<u8>, lattice: Vec<u8>, hash: Vec<u8>) -> Self {
        let binding_hash = compute_binding_hash(&classical, &lattice, &hash).to_vec();
        Self {
            classical,
            lattice,
            hash,
            binding_hash,
        }
    }

    /// `true` iff the stored binding hash matches the three payloads.
    #[must_use]
    pub fn verify_binding(&self) -> bool {
        let expected = compute_binding_hash(&self.classical, &self.lattice, &self.hash);
        constant_time_eq(&expected, &self.binding_hash)
    }

    /// Encode to the `RMLS` binary form.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` if a payload exceeds `u32::MAX` bytes
    /// or the binding hash has the wrong width.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        if self.binding_hash.len() != BINDING_HASH_LEN {
            return Err(CryptoError::Encoding(format!(
                "binding hash is {} bytes (expected {BINDING_HASH_LEN})",
                self.binding_hash.len()
            )));
        }
        let mut out = Vec::with_capacity(
            self.classical
                .len()
                .saturating_add(self.lattice.len())
                .saturating_add(self.hash.len())
                .saturating_add(96),
        );
        out.extend_from_slice(SIGNATURE_MAGIC);
        out.push(SIGNATURE_FORMAT_VERSION);
        for payload in [&self.classical, &self.lattice, &self.hash] {
            let len = u32::try_from(payload.len())
                .map_err(|_| CryptoError::Encoding("payload exceeds u32::MAX bytes".into()))?;
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(payload);
        }
        out.extend_from_slice(&self.binding_hash);
        Ok(out)
    }

    /// Decode from the `RMLS` binary form. Does not check the binding.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encoding` on bad magic, unknown version,
    /// truncation or trailing bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, CryptoError> {
        let mut reader = Reader::new(data);
        if reader.take(4)? != SIGNATURE_MAGIC {
            return Err(CryptoError::Encoding("bad signature magic".into()));
        }
        let version = reader.take(1)?[0];
        if version != SIGNATURE_FORMAT_VERSION {
            return Err(CryptoError::Encoding(format!(
                "unsupported signature format version {version}"
            )));
        }
        let classical = reader.take_framed()?.to_vec();
        let lattice = reader.take_framed()?.to_vec();
        let hash = reader.take_framed()?.to_vec();
        let binding_hash = reader.take(BINDING_HASH_LEN)?.to_vec();
        reader.finish()?;
        Ok(Self {
            classical,
            lattice,
            hash,
            binding_hash,
        })
    }
}

/// Cursor over a length-prefixed byte layout.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], CryptoError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CryptoError::Encoding("truncated input".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn take_framed(&mut self) -> Result<&'a [u8], CryptoError> {
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(4)?);
        let len = usize::try_from(u32::from_le_bytes(len))
            .map_err(|_| CryptoError::Encoding("length prefix overflow".into()))?;
        self.take(len)
    }

    pub(crate) fn finish(&self) -> Result<(), CryptoError> {
        if self.pos == self.data.len() {
            Ok(())
        } else {
            Err(CryptoError::Encoding("trailing bytes after payload".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Sign / verify
// ---------------------------------------------------------------------------

fn hash_layer(public: &MultiLayerPublicKey, message: &[u8]) -> [u8; HASH_LAYER_LEN] {
    let mut hasher = blake3::Hasher::new_derive_key(HASH_LAYER_DOMAIN);
    hasher.update(&public.ed25519);
    hasher.update(&(public.ml_dsa.len() as u64).to_le_bytes());
    hasher.update(&public.ml_dsa);
    hasher.update(message);
    *hasher.finalize().as_bytes()
}

/// Sign `message` with every layer.
///
/// # Errors
///
/// Returns `CryptoError::Signature` if either asymmetric layer fails.
pub fn sign(
    message: &[u8],
    keypair: &MultiLayerSigningKeyPair,
) -> Result<MultiLayerSignature, CryptoError> {
    let ed_kp = Ed25519KeyPair::from_seed_and_public_key(
        keypair.ed25519_seed.expose(),
        &keypair.public.ed25519,
    )
    .map_err(|e| CryptoError::Signature(format!("Ed25519 key reconstruction failed: {e}")))?;
    let classical = ed_kp.sign(message).as_ref().to_vec();

    let mut sign_rand = [0u8; ML_DSA_RAND_LEN];
    OsRng.fill_bytes(&mut sign_rand);
    let ml_sk = libcrux_ml_dsa::ml_dsa_65::MLDSA65SigningKey::new(
        keypair.ml_dsa_signing_key.expose().try_into().map_err(|_| {
            sign_rand.zeroize();
            CryptoError::Signature("ML-DSA signing key has invalid length".into())
        })?,
    );
    let ml_result = libcrux_ml_dsa::ml_dsa_65::sign(&ml_sk, message, ML_DSA_CONTEXT, sign_rand);
    sign_rand.zeroize();
    let lattice = ml_result
        .map_err(|e| CryptoError::Signature(format!("ML-DSA signing failed: {e:?}")))?
        .as_ref()
        .to_vec();

    let hash = hash_layer(&keypair.public, message).to_vec();
    Ok(MultiLayerSignature::from_payloads(classical, lattice, hash))
}

/// Verify every layer of `sig` over `message`.
///
/// # Errors
///
/// - `CryptoError::TamperDetected` if the binding hash does not match
/// - `CryptoError::Signature` if any layer fails
pub fn verify(
    message: &[u8],
    sig: &MultiLayerSignature,
    public_key: &MultiLayerPublicKey,
) -> Result<(), CryptoError> {
    if !sig.verify_binding() {
        return Err(CryptoError::TamperDetected(
            "multi-layer binding hash mismatch".into(),
        ));
    }

    signature::UnparsedPublicKey::new(&signature::ED25519, &public_key.ed25519)
        .verify(message, &sig.classical)
        .map_err(|_| CryptoError::Signature("Ed25519 verification failed".into()))?;

    let vk: &[u8; ML_DSA_65_VERIFICATION_KEY_LEN] =
        public_key.ml_dsa.as_slice().try_into().map_err(|_| {
            CryptoError::Signature(format!(
                "invalid ML-DSA verification key length: {} bytes",
                public_key.ml_dsa.len()
            ))
        })?;
    let ml_sig: &[u8; ML_DSA_65_SIGNATURE_LEN] =
        sig.lattice.as_slice().try_into().map_err(|_| {
            CryptoError::Signature(format!(
                "invalid ML-DSA signature length: {} bytes",
                sig.lattice.len()
            ))
        })?;
    libcrux_ml_dsa::ml_dsa_65::verify(
        &libcrux_ml_dsa::ml_dsa_65::MLDSA65VerificationKey::new(*vk),
        message,
        ML_DSA_CONTEXT,
        &libcrux_ml_dsa::ml_dsa_65::MLDSA65Signature::new(*ml_sig),
    )
    .map_err(|_| CryptoError::Signature("ML-DSA verification failed".into()))?;

    if !constant_time_eq(&hash_layer(public_key, message), &sig.hash) {
        return Err(CryptoError::Signature("hash layer mismatch".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// One signer's contribution to an aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateEntry {
    pub signature: MultiLayerSignature,
    pub public_key: MultiLayerPublicKey,
    pub message_digest: [u8; DIGEST_LEN],
}

/// N signatures folded into one combined digest plus the per-signer
/// material needed to re-verify them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSignature {
    pub combined: Vec<u8>,
    pub signature_count: u32,
    pub entries: Vec<AggregateEntry>,
}

/// Builds and checks [`AggregateSignature`]s.
#[derive(Clone, Copy, Debug)]
pub struct SignatureAggregator {
    max_signers: usize,
}

impl Default for SignatureAggregator {
    fn default() -> Self {
        Self {
            max_signers: DEFAULT_MAX_SIGNERS,
        }
    }
}

fn combine(entries: &[AggregateEntry]) -> [u8; BINDING_HASH_LEN] {
    let mut parts: Vec<&[u8]> = Vec::with_capacity(entries.len().saturating_mul(3));
    for e in entries {
        parts.push(&e.signature.binding_hash);
        parts.push(&e.public_key.ed25519);
        parts.push(&e.message_digest);
    }
    secure_digest(AGGREGATE_DOMAIN, &parts)
}

impl SignatureAggregator {
    #[must_use]
    pub const fn new(max_signers: usize) -> Self {
        Self { max_signers }
    }

    /// Verify each `(signature, key, message)` triple and fold them.
    ///
    /// # Errors
    ///
    /// - `CryptoError::Config` if the slices differ in length, are empty, or
    ///   exceed the signer limit
    /// - any error from [`verify`] for the first bad signature
    pub fn aggregate(
        &self,
        signatures: &[MultiLayerSignature],
        public_keys: &[MultiLayerPublicKey],
        messages: &[&[u8]],
    ) -> Result<AggregateSignature, CryptoError> {
        if signatures.len() != public_keys.len() || signatures.len() != messages.len() {
            return Err(CryptoError::Config(format!(
                "aggregate input length mismatch: {} signatures, {} keys, {} messages",
                signatures.len(),
                public_keys.len(),
                messages.len()
            )));
        }
        if signatures.is_empty() {
            return Err(CryptoError::Config("nothing to aggregate".into()));
        }
        if signatures.len() > self.max_signers {
            return Err(CryptoError::Config(format!(
                "{} signers exceeds limit {}",
                signatures.len(),
                self.max_signers
            )));
        }

        let mut entries = Vec::with_capacity(signatures.len());
        for ((sig, pk), msg) in signatures.iter().zip(public_keys).zip(messages) {
            verify(msg, sig, pk)?;
            entries.push(AggregateEntry {
                signature: sig.clone(),
                public_key: pk.clone(),
                message_digest: digest_256(MESSAGE_DOMAIN, &[*msg]),
            });
        }
        let signature_count = u32::try_from(entries.len())
            .map_err(|_| CryptoError::Config("too many signers".into()))?;
        Ok(AggregateSignature {
            combined: combine(&entries).to_vec(),
            signature_count,
            entries,
        })
    }

    /// Re-validate an aggregate against the original messages.
    ///
    /// # Errors
    ///
    /// - `CryptoError::Config` if counts disagree
    /// - `CryptoError::TamperDetected` if the combined digest or a message
    ///   digest does not match
    /// - any error from [`verify`] for a bad per-signer signature
    pub fn verify_aggregate(
        &self,
        aggregate: &AggregateSignature,
        messages: &[&[u8]],
    ) -> Result<(), CryptoError> {
        let count = usize::try_from(aggregate.signature_count)
            .map_err(|_| CryptoError::Config("signature count overflow".into()))?;
        if count != aggregate.entries.len() || count != messages.len() {
            return Err(CryptoError::Config(format!(
                "aggregate claims {count} signers, carries {} entries, {} messages supplied",
                aggregate.entries.len(),
                messages.len()
            )));
        }
        if count > self.max_signers {
            return Err(CryptoError::Config("aggregate exceeds signer limit".into()));
        }
        if !constant_time_eq(&combine(&aggregate.entries), &aggregate.combined) {
            return Err(CryptoError::TamperDetected(
                "aggregate combined digest mismatch".into(),
            ));
        }
        for (entry, msg) in aggregate.entries.iter().zip(messages) {
            if !constant_time_eq(&digest_256(MESSAGE_DOMAIN, &[*msg]), &entry.message_digest) {
                return Err(CryptoError::TamperDetected(
                    "aggregate message digest mismatch".into(),
                ));
            }
            verify(msg, &entry.signature, &entry.public_key)?;
        }
        Ok(())
    }
}
