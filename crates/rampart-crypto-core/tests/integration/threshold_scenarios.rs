//! 3-of-5 split of a 32-byte secret, exercised exhaustively.

use rampart_crypto_core::memory::SecretBytes;
use rampart_crypto_core::threshold::{reconstruct, reconstruct_verified, split, ThresholdShare};
use rampart_crypto_core::CryptoError;

fn all_subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn go(start: usize, n: usize, k: usize, cur: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if cur.len() == k {
            out.push(cur.clone());
            return;
        }
        for i in start..n {
            cur.push(i);
            go(i + 1, n, k, cur, out);
            cur.pop();
        }
    }
    let mut out = Vec::new();
    go(0, n, k, &mut Vec::new(), &mut out);
    out
}

fn pick(shares: &[ThresholdShare], idx: &[usize]) -> Vec<ThresholdShare> {
    idx.iter().map(|&i| shares[i].clone()).collect()
}

#[test]
fn every_3_of_5_subset_reconstructs() {
    let secret = SecretBytes::<32>::random().expect("random should succeed");
    let shares = split(secret.expose(), 3, 5).expect("split should succeed");

    let subsets = all_subsets(5, 3);
    assert_eq!(subsets.len(), 10);
    for subset in subsets {
        let chosen = pick(&shares, &subset);
        let recovered = reconstruct_verified(&chosen).expect("reconstruct should succeed");
        assert_eq!(recovered.expose(), secret.expose(), "subset {subset:?}");
    }
}

#[test]
fn every_2_subset_is_insufficient() {
    let secret = SecretBytes::<32>::random().expect("random should succeed");
    let shares = split(secret.expose(), 3, 5).expect("split should succeed");

    let subsets = all_subsets(5, 2);
    assert_eq!(subsets.len(), 10);
    for subset in subsets {
        let chosen = pick(&shares, &subset);
        let result = reconstruct(&chosen);
        assert!(
            matches!(result, Err(CryptoError::InsufficientEvidence(_))),
            "subset {subset:?} should be insufficient"
        );
    }
}

#[test]
fn tampered_share_never_contributes() {
    let secret = [0x5Au8; 32];
    let mut shares = split(&secret, 3, 5).expect("split should succeed");
    shares[1].value[7] ^= 0x01;

    let result = reconstruct_verified(&shares[..3]);
    assert!(matches!(result, Err(CryptoError::TamperDetected(_))));

    // Excluding the tampered share still works.
    let good = pick(&shares, &[0, 2, 3]);
    let recovered = reconstruct_verified(&good).expect("reconstruct should succeed");
    assert_eq!(recovered.expose(), &secret);
}

#[test]
fn shares_from_different_splits_do_not_mix() {
    let a = split(&[1u8; 32], 3, 5).expect("split should succeed");
    let b = split(&[1u8; 32], 2, 5).expect("split should succeed");
    let mixed = vec![a[0].clone(), a[1].clone(), b[2].clone()];
    assert!(matches!(reconstruct(&mixed), Err(CryptoError::Config(_))));
}

#[test]
fn same_shape_splits_do_not_mix() {
    // Same K, same length: only the per-split salt tells the shares apart.
    let a = split(&[0xAA; 16], 2, 3).expect("split should succeed");
    let b = split(&[0xBB; 16], 2, 3).expect("split should succeed");
    let mixed = vec![a[0].clone(), b[1].clone()];
    assert!(mixed.iter().all(ThresholdShare::verify_commitment));

    let result = reconstruct_verified(&mixed);
    assert!(matches!(result, Err(CryptoError::TamperDetected(_))));
}

#[test]
fn shares_survive_json_roundtrip() {
    let secret = b"json transported shares";
    let shares = split(secret, 2, 4).expect("split should succeed");
    let json = serde_json::to_string(&shares).expect("serialize should succeed");
    let decoded: Vec<ThresholdShare> =
        serde_json::from_str(&json).expect("deserialize should succeed");
    assert!(decoded.iter().all(ThresholdShare::verify_commitment));
    let recovered = reconstruct_verified(&decoded[2..]).expect("reconstruct should succeed");
    assert_eq!(recovered.expose(), secret);
}
