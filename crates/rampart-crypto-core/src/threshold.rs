//! (K, N) threshold secret sharing over GF(2^8).
//!
//! This module provides:
//! - [`split`] / [`split_with_rng`]: one degree-(K-1) polynomial per secret
//!   byte, evaluated at x = 1..=N
//! - [`reconstruct`]: Lagrange interpolation at x = 0 from K shares, with
//!   any surplus shares checked against the recovered polynomial
//! - [`reconstruct_verified`]: same, refusing shares whose commitment fails
//! - [`verify_commitment`]: recompute a share's commitment
//!
//! # Field
//!
//! GF(2^8) with reduction polynomial x^8 + x^4 + x^3 + x + 1 (0x11B).
//! Multiplication is a fixed eight-round shift-and-add with no data-dependent
//! branches; inversion is `a^254`.
//!
//! # Commitments
//!
//! `commitment = BLAKE3(domain ‖ index ‖ threshold ‖ len ‖ value ‖ salt)`.
//! The 16-byte salt is drawn once per split and shared by all N shares, so a
//! share cannot be replayed into a different split with the same value.
//! [`reconstruct`] refuses share sets whose salts differ.

use std::collections::HashSet;
use std::fmt;

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use crate::quantum::constant_time_eq;

/// Per-split salt length in bytes.
pub const SHARE_SALT_LEN: usize = 16;

/// Commitment length in bytes (BLAKE3).
pub const COMMITMENT_LEN: usize = 32;

/// Largest supported share count (indices are non-zero field elements).
pub const MAX_SHARES: u8 = 255;

const COMMITMENT_DOMAIN: &str = "rampart threshold-share commitment v1";

// ---------------------------------------------------------------------------
// GF(2^8)
// ---------------------------------------------------------------------------

mod gf256 {
    pub(super) const fn mul(mut a: u8, mut b: u8) -> u8 {
        let mut acc = 0u8;
        let mut round = 0;
        while round < 8 {
            // mask = 0xFF when the low bit of b is set, else 0x00.
            let mask = 0u8.wrapping_sub(b & 1);
            acc ^= a & mask;
            let carry = 0u8.wrapping_sub(a >> 7);
            a = (a << 1) ^ (0x1B & carry);
            b >>= 1;
            round += 1;
        }
        acc
    }

    /// Multiplicative inverse; `inv(0)` is 0 and never reached by callers.
    pub(super) const fn inv(a: u8) -> u8 {
        // a^254 = a^-1 in GF(2^8)*.
        let mut result = 1u8;
        let mut base = a;
        let mut exp = 254u8;
        while exp > 0 {
            if exp & 1 == 1 {
                result = mul(result, base);
            }
            base = mul(base, base);
            exp >>= 1;
        }
        result
    }

    /// Horner evaluation; `coeffs[0]` is the constant term.
    pub(super) fn eval(coeffs: &[u8], x: u8) -> u8 {
        coeffs.iter().rev().fold(0u8, |acc, &c| mul(acc, x) ^ c)
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One of N shares produced by [`split`].
///
/// `value` is secret: it is zeroized on drop and masked in `Debug`.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ThresholdShare {
    /// Evaluation point, 1..=N.
    pub index: u8,
    /// K: number of shares needed to reconstruct.
    pub threshold: u8,
    /// Polynomial evaluations, one byte per secret byte.
    pub value: Vec<u8>,
    /// Per-split salt.
    #[zeroize(skip)]
    pub salt: [u8; SHARE_SALT_LEN],
    /// BLAKE3 commitment over index, threshold, value and salt.
    #[zeroize(skip)]
    pub commitment: [u8; COMMITMENT_LEN],
}

impl fmt::Debug for ThresholdShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdShare")
            .field("index", &self.index)
            .field("threshold", &self.threshold)
            .field("value", &"***")
            .finish_non_exhaustive()
    }
}

impl ThresholdShare {
    /// Recompute the commitment and compare it with the stored one.
    #[must_use]
    pub fn verify_commitment(&self) -> bool {
        let expected = compute_commitment(self.index, self.threshold, &self.value, &self.salt);
        constant_time_eq(&expected, &self.commitment)
    }
}

fn compute_commitment(
    index: u8,
    threshold: u8,
    value: &[u8],
    salt: &[u8; SHARE_SALT_LEN],
) -> [u8; COMMITMENT_LEN] {
    let mut hasher = blake3::Hasher::new_derive_key(COMMITMENT_DOMAIN);
    hasher.update(&[index, threshold]);
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value);
    hasher.update(salt);
    *hasher.finalize().as_bytes()
}

// ---------------------------------------------------------------------------
// Split
// ---------------------------------------------------------------------------

/// Split `secret` into `n` shares, any `k` of which reconstruct it.
///
/// Coefficients and salt come from the OS CSPRNG.
///
/// # Errors
///
/// Returns `CryptoError::Config` if `k < 1`, `k > n`, or `secret` is empty.
pub fn split(secret: &[u8], k: u8, n: u8) -> Result<Vec<ThresholdShare>, CryptoError> {
    split_with_rng(secret, k, n, &mut OsRng)
}

/// [`split`] with an explicit RNG. The same RNG state always produces the
/// same shares.
///
/// # Errors
///
/// Returns `CryptoError::Config` if `k < 1`, `k > n`, or `secret` is empty.
pub fn split_with_rng<R: RngCore + CryptoRng>(
    secret: &[u8],
    k: u8,
    n: u8,
    rng: &mut R,
) -> Result<Vec<ThresholdShare>, CryptoError> {
    if k < 1 {
        return Err(CryptoError::Config("threshold must be at least 1".into()));
    }
    if k > n {
        return Err(CryptoError::Config(format!(
            "threshold {k} exceeds share count {n}"
        )));
    }
    if secret.is_empty() {
        return Err(CryptoError::Config("secret must not be empty".into()));
    }

    let mut salt = [0u8; SHARE_SALT_LEN];
    rng.fill_bytes(&mut salt);

    let mut values: Vec<Vec<u8>> = (0..n).map(|_| Vec::with_capacity(secret.len())).collect();
    let mut coeffs = vec![0u8; usize::from(k)];
    for &byte in secret {
        coeffs[0] = byte;
        rng.fill_bytes(&mut coeffs[1..]);
        for (x, value) in (1..=n).zip(values.iter_mut()) {
            value.push(gf256::eval(&coeffs, x));
        }
    }
    coeffs.zeroize();

    Ok((1..=n)
        .zip(values)
        .map(|(index, value)| {
            let commitment = compute_commitment(index, k, &value, &salt);
            ThresholdShare {
                index,
                threshold: k,
                value,
                salt,
                commitment,
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Reconstruct
// ---------------------------------------------------------------------------

/// Recover the secret from at least K shares.
///
/// The first K shares are interpolated. Every further share must lie on
/// the same polynomial, so any qualifying subset of the input yields the
/// same secret. Commitments are not checked here, see
/// [`reconstruct_verified`].
///
/// # Errors
///
/// - `CryptoError::InsufficientEvidence` if fewer than K shares are supplied
/// - `CryptoError::Config` on threshold 0, empty values, mixed thresholds,
///   mixed value lengths, index 0 or duplicate indices
/// - `CryptoError::TamperDetected` on shares from different splits or a
///   surplus share off the interpolated polynomial
pub fn reconstruct(shares: &[ThresholdShare]) -> Result<SecretBuffer, CryptoError> {
    let first = shares
        .first()
        .ok_or_else(|| CryptoError::InsufficientEvidence("no shares supplied".into()))?;
    let k = first.threshold;
    let len = first.value.len();

    if k == 0 {
        return Err(CryptoError::Config("share threshold must be at least 1".into()));
    }
    if len == 0 {
        return Err(CryptoError::Config("share value is empty".into()));
    }
    if shares.len() < usize::from(k) {
        return Err(CryptoError::InsufficientEvidence(format!(
            "{} shares supplied, threshold is {k}",
            shares.len()
        )));
    }

    let mut indices = HashSet::with_capacity(shares.len());
    for share in shares {
        if share.threshold != k {
            return Err(CryptoError::Config(
                "shares come from splits with different thresholds".into(),
            ));
        }
        if share.value.len() != len {
            return Err(CryptoError::Config("share values differ in length".into()));
        }
        if share.index == 0 {
            return Err(CryptoError::Config("share index 0 is invalid".into()));
        }
        if !constant_time_eq(&share.salt, &first.salt) {
            return Err(CryptoError::TamperDetected(format!(
                "share {} comes from a different split",
                share.index
            )));
        }
        if !indices.insert(share.index) {
            return Err(CryptoError::Config(format!(
                "duplicate share index {}",
                share.index
            )));
        }
    }

    let (used, surplus) = shares.split_at(usize::from(k));

    let mut secret = vec![0u8; len];
    let at_zero = lagrange_basis(used, 0);
    for (pos, out) in secret.iter_mut().enumerate() {
        *out = interpolate(used, &at_zero, pos);
    }

    for extra in surplus {
        let basis = lagrange_basis(used, extra.index);
        let mut agrees = 0u8;
        for (pos, &actual) in extra.value.iter().enumerate() {
            agrees |= interpolate(used, &basis, pos) ^ actual;
        }
        if agrees != 0 {
            secret.zeroize();
            return Err(CryptoError::TamperDetected(format!(
                "share {} disagrees with the other shares",
                extra.index
            )));
        }
    }
    SecretBuffer::from_vec(secret)
}

/// Lagrange basis at `x`: l_j = prod_{m != j} (x - x_m) / (x_j - x_m).
/// Subtraction is XOR in characteristic 2. `x` is never one of the indices
/// in `used`, which are distinct and non-zero.
fn lagrange_basis(used: &[ThresholdShare], x: u8) -> Vec<u8> {
    used.iter()
        .map(|sj| {
            used.iter()
                .filter(|sm| sm.index != sj.index)
                .fold(1u8, |acc, sm| {
                    let num = x ^ sm.index;
                    let den = sj.index ^ sm.index;
                    gf256::mul(acc, gf256::mul(num, gf256::inv(den)))
                })
        })
        .collect()
}

fn interpolate(used: &[ThresholdShare], basis: &[u8], pos: usize) -> u8 {
    used.iter()
        .zip(basis)
        .fold(0u8, |acc, (share, &l)| acc ^ gf256::mul(share.value[pos], l))
}

/// [`reconstruct`] after checking every supplied share's commitment.
///
/// # Errors
///
/// Returns `CryptoError::TamperDetected` naming the first share index whose
/// commitment fails, otherwise the errors of [`reconstruct`].
pub fn reconstruct_verified(shares: &[ThresholdShare]) -> Result<SecretBuffer, CryptoError> {
    if let Some(bad) = shares.iter().find(|s| !s.verify_commitment()) {
        return Err(CryptoError::TamperDetected(format!(
            "commitment mismatch on share {}",
            bad.index
        )));
    }
    reconstruct(shares)
}

/// Free-function form of [`ThresholdShare::verify_commitment`].
#[must_use]
pub fn verify_commitment(share: &ThresholdShare) -> bool {
    share.verify_commitment()
}
