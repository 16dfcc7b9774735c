//! Entropy smoke tests for CSPRNG-backed outputs.
//!
//! Finite samples never reach 8.0 bits/byte because most byte values never
//! appear. Thresholds sit well under the expected value for each size so
//! only degenerate output (all-zeros, short cycles) trips them:
//!
//! | Sample size | Expected | Threshold |
//! |-------------|----------|-----------|
//! | 32 bytes    | ~4.88    | 4.0       |
//! | 1 KB        | ~7.81    | 7.5       |
//! | 64 KB       | ~7.997   | 7.99      |

use rampart_crypto_core::quantum::{correlation_hash, secure_random_bytes, shannon_entropy};
use rampart_crypto_core::threshold::split;

#[test]
fn random_1kb_entropy() {
    let buf = secure_random_bytes(1024).expect("CSPRNG should succeed");
    let entropy = shannon_entropy(buf.expose());
    assert!(entropy > 7.5, "1 KB entropy too low: {entropy:.4}");
}

#[test]
fn random_64kb_entropy() {
    let buf = secure_random_bytes(65536).expect("CSPRNG should succeed");
    let entropy = shannon_entropy(buf.expose());
    assert!(entropy > 7.99, "64 KB entropy too low: {entropy:.4}");
}

#[test]
fn random_32_bytes_not_degenerate() {
    for _ in 0..32 {
        let buf = secure_random_bytes(32).expect("CSPRNG should succeed");
        let entropy = shannon_entropy(buf.expose());
        assert!(entropy > 4.0, "32-byte entropy too low: {entropy:.4}");
    }
}

/// Shares of an all-zero secret are polynomial evaluations with random
/// coefficients, so they must not look like the secret.
#[test]
fn shares_of_constant_secret_look_random() {
    let secret = vec![0u8; 4096];
    let shares = split(&secret, 3, 5).expect("split should succeed");
    for share in &shares {
        let entropy = shannon_entropy(&share.value);
        assert!(
            entropy > 7.5,
            "share {} entropy too low: {entropy:.4}",
            share.index
        );
    }
}

/// Concatenated correlation hashes decode to high-entropy bytes.
#[test]
fn correlation_hashes_carry_entropy() {
    let mut bytes = Vec::with_capacity(32 * 64);
    for _ in 0..64 {
        let hex = correlation_hash().expect("correlation hash should succeed");
        let decoded = data_encoding::HEXLOWER
            .decode(hex.as_bytes())
            .expect("correlation hash should be lowercase hex");
        bytes.extend_from_slice(&decoded);
    }
    let entropy = shannon_entropy(&bytes);
    assert!(entropy > 7.5, "correlation hash entropy too low: {entropy:.4}");
}
