//! Key derivation.
//!
//! This module provides:
//! - [`derive_key`]: HKDF-SHA256 subkey for an arbitrary context label
//! - [`derive_segment_key`]: one of up to `segment_count` independent
//!   subkeys of a large-entropy credential, bound to an index and a
//!   [`SegmentType`]
//! - [`derive_password_key`]: Argon2id stretch for callers whose master
//!   credential is a low-entropy passphrase
//!
//! # Key Hierarchy
//!
//! ```text
//! Master ──► HKDF(salt = "rampart-kdf-v1", info = context)              ──► subkey
//! Master ──► HKDF(salt = "rampart-kdf-v1", info = "segment" ‖ type ‖ i) ──► segment key i
//! ```
//!
//! Segment info strings are length-framed, so no `(type, index)` pair can
//! produce the info of another pair or of a plain context label.

use ring::hkdf;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::memory::SecretBuffer;

/// Length of every derived subkey (256 bits).
pub const DERIVED_KEY_LEN: usize = 32;

/// Default number of segments a credential is divided into (2^20).
pub const DEFAULT_SEGMENT_COUNT: u32 = 1_048_576;

const HKDF_SALT: &[u8] = b"rampart-kdf-v1";
const CONTEXT_INFO: &[u8] = b"context";
const SEGMENT_INFO: &[u8] = b"segment";

/// Minimum Argon2id salt length in bytes.
const MIN_SALT_LEN: usize = 16;

/// 256 MB in KiB.
const MEMORY_256MB: u32 = 262_144;

/// 512 MB in KiB.
const MEMORY_512MB: u32 = 524_288;

// ---------------------------------------------------------------------------
// HKDF
// ---------------------------------------------------------------------------

struct SubkeyLen;

impl hkdf::KeyType for SubkeyLen {
    fn len(&self) -> usize {
        DERIVED_KEY_LEN
    }
}

/// Categorical tag mixed into segment derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Authentication,
    Encryption,
    Signing,
    Session,
    Recovery,
}

impl SegmentType {
    #[must_use]
    pub const fn tag(self) -> &'static [u8] {
        match self {
            Self::Authentication => b"authentication",
            Self::Encryption => b"encryption",
            Self::Signing => b"signing",
            Self::Session => b"session",
            Self::Recovery => b"recovery",
        }
    }
}

fn expand(master: &[u8], info: &[&[u8]]) -> Result<SecretBuffer, CryptoError> {
    if master.is_empty() {
        return Err(CryptoError::KeyDerivation("master key is empty".into()));
    }
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, HKDF_SALT).extract(master);
    let okm = prk
        .expand(info, SubkeyLen)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".into()))?;

    let mut out = [0u8; DERIVED_KEY_LEN];
    okm.fill(&mut out)
        .map_err(|_| CryptoError::KeyDerivation("HKDF fill failed".into()))?;
    let buf = SecretBuffer::new(&out);
    out.zeroize();
    buf
}

/// Derive a 32-byte subkey of `master` for `context`.
///
/// Deterministic: the same `(master, context)` always yields the same key.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if `master` is empty or HKDF fails.
pub fn derive_key(master: &[u8], context: &[u8]) -> Result<SecretBuffer, CryptoError> {
    let context_len = u32::try_from(context.len())
        .map_err(|_| CryptoError::KeyDerivation("context label too long".into()))?
        .to_be_bytes();
    expand(master, &[CONTEXT_INFO, &context_len, context])
}

/// Derive segment key `index` of type `segment_type`.
///
/// # Errors
///
/// Returns `CryptoError::Config` if `index >= segment_count`, and
/// `CryptoError::KeyDerivation` if `master` is empty or HKDF fails.
pub fn derive_segment_key(
    master: &[u8],
    index: u32,
    segment_type: SegmentType,
    segment_count: u32,
) -> Result<SecretBuffer, CryptoError> {
    if index >= segment_count {
        return Err(CryptoError::Config(format!(
            "segment index {index} out of range (segment count {segment_count})"
        )));
    }
    let tag = segment_type.tag();
    let tag_len = u32::try_from(tag.len())
        .map_err(|_| CryptoError::KeyDerivation("segment tag too long".into()))?
        .to_be_bytes();
    expand(
        master,
        &[SEGMENT_INFO, &tag_len, tag, &index.to_be_bytes()],
    )
}

// ---------------------------------------------------------------------------
// Argon2id
// ---------------------------------------------------------------------------

/// Argon2id cost parameters (`argon2` crate units: KiB, iterations, lanes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2idParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

/// Argon2id cost tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdfPreset {
    /// ~1 s on commodity hardware.
    Interactive,
    /// Enrollment and recovery paths.
    Sensitive,
}

impl KdfPreset {
    #[must_use]
    pub const fn params(self) -> Argon2idParams {
        match self {
            Self::Interactive => Argon2idParams {
                m_cost: MEMORY_256MB,
                t_cost: 2,
                p_cost: 4,
            },
            Self::Sensitive => Argon2idParams {
                m_cost: MEMORY_512MB,
                t_cost: 4,
                p_cost: 4,
            },
        }
    }
}

/// Stretch a passphrase into a 32-byte master key with Argon2id.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivation` if the salt is shorter than 16 bytes,
/// the parameters are rejected, or derivation fails.
pub fn derive_password_key(
    password: &[u8],
    salt: &[u8],
    params: &Argon2idParams,
) -> Result<SecretBuffer, CryptoError> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::KeyDerivation(format!(
            "salt too short: {} bytes (minimum {MIN_SALT_LEN})",
            salt.len()
        )));
    }
    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DERIVED_KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid argon2 params: {e}")))?;
    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut out = [0u8; DERIVED_KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut out)
        .map_err(|e| CryptoError::KeyDerivation(format!("argon2id derivation failed: {e}")))?;
    let buf = SecretBuffer::new(&out);
    out.zeroize();
    buf
}
