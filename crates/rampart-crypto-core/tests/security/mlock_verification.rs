//! mlock status of derived secrets and core dump disabling (Unix only).

use rampart_crypto_core::kdf::derive_key;
use rampart_crypto_core::memory::disable_core_dumps;
use rampart_crypto_core::threshold::{reconstruct, split};

/// mlock can legitimately fail under container quotas, so only the
/// reporting path is checked here.
#[cfg(unix)]
#[test]
fn derived_and_reconstructed_secrets_report_mlock_status() {
    let key = derive_key(b"master", b"mlock").expect("derive should succeed");
    eprintln!("derived key mlock status: {}", key.is_mlocked());

    let shares = split(b"mlock reconstruct", 2, 3).expect("split should succeed");
    let secret = reconstruct(&shares[1..]).expect("reconstruct should succeed");
    eprintln!("reconstructed secret mlock status: {}", secret.is_mlocked());
    assert_eq!(secret.expose(), b"mlock reconstruct");
}

#[cfg(unix)]
#[test]
fn disable_core_dumps_sets_rlimit_zero() {
    disable_core_dumps().expect("disable_core_dumps should succeed");

    let mut rlim = libc::rlimit {
        rlim_cur: 1,
        rlim_max: 1,
    };
    // SAFETY: getrlimit only writes into the struct we own.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_CORE, &mut rlim) };
    assert_eq!(rc, 0, "getrlimit should succeed");
    assert_eq!(rlim.rlim_cur, 0, "soft core limit should be 0");
}
