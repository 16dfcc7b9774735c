//! Digest and randomness utilities shared by every primitive.
//!
//! - [`secure_digest`]: domain-separated SHA-512 over length-prefixed parts
//! - [`digest_256`]: the same framing truncated to SHA-256 width
//! - [`secure_random_bytes`]: CSPRNG bytes in a [`SecretBuffer`]
//! - [`correlation_hash`]: fresh, non-secret hex identifier for audit trails
//! - [`constant_time_eq`]: comparison without early exit on content
//! - [`shannon_entropy`]: bits-per-byte smoke test for degenerate input
//!
//! Parts are framed as `u64 LE length ‖ bytes` so that `("ab", "c")` and
//! `("a", "bc")` never collide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::HEXLOWER;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::digest;

use crate::error::CryptoError;
use crate::memory::SecretBuffer;

/// Width of [`secure_digest`] output (SHA-512).
pub const WIDE_DIGEST_LEN: usize = 64;

/// Width of [`digest_256`] output (SHA-256).
pub const DIGEST_LEN: usize = 32;

/// Length of a [`correlation_hash`] in hex characters.
pub const CORRELATION_HASH_HEX_LEN: usize = 64;

const CORRELATION_DOMAIN: &str = "rampart correlation-id v1";

fn feed(ctx: &mut digest::Context, domain: &[u8], parts: &[&[u8]]) {
    ctx.update(&(domain.len() as u64).to_le_bytes());
    ctx.update(domain);
    for part in parts {
        ctx.update(&(part.len() as u64).to_le_bytes());
        ctx.update(part);
    }
}

/// Domain-separated SHA-512 over `parts`.
#[must_use]
pub fn secure_digest(domain: &[u8], parts: &[&[u8]]) -> [u8; WIDE_DIGEST_LEN] {
    let mut ctx = digest::Context::new(&digest::SHA512);
    feed(&mut ctx, domain, parts);
    let mut out = [0u8; WIDE_DIGEST_LEN];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// Domain-separated SHA-256 over `parts`.
#[must_use]
pub fn digest_256(domain: &[u8], parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let mut ctx = digest::Context::new(&digest::SHA256);
    feed(&mut ctx, domain, parts);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(ctx.finish().as_ref());
    out
}

/// `len` CSPRNG bytes.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the OS RNG fails.
pub fn secure_random_bytes(len: usize) -> Result<SecretBuffer, CryptoError> {
    SecretBuffer::random(len)
}

/// Fresh 64-char lowercase hex identifier.
///
/// Mixes wall-clock nanoseconds, a process-wide counter and 32 CSPRNG bytes
/// through BLAKE3, so two calls never return the same value even within one
/// clock tick. Carries no secret and may be logged.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if the OS RNG fails.
pub fn correlation_hash() -> Result<String, CryptoError> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let sequence = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut noise = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut noise)
        .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;

    let mut hasher = blake3::Hasher::new_derive_key(CORRELATION_DOMAIN);
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&sequence.to_le_bytes());
    hasher.update(&noise);
    Ok(HEXLOWER.encode(hasher.finalize().as_bytes()))
}

/// Length-checked comparison that visits every byte regardless of content.
///
/// The early return on length is fine: every caller compares fixed-width
/// digests whose length is public.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Shannon entropy of `bytes` in bits per byte (0.0 ..= 8.0).
///
/// A smoke test for degenerate input, not an entropy estimate: 32 uniform
/// bytes typically score about 4.9 because most byte values never appear.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in bytes {
        counts[usize::from(b)] = counts[usize::from(b)].saturating_add(1);
    }
    let total = bytes.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}
