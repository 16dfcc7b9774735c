//! Scoped containers for secret material.
//!
//! Reconstructed secrets, derived keys, nonces and private keys never sit in
//! a bare `Vec<u8>` for longer than one expression. They are moved into one
//! of the two types below, which:
//! - zero their bytes on drop (including during unwinding)
//! - attempt to `mlock` the backing pages so they are not swapped out
//! - print `***` instead of their contents in `Debug`/`Display`

use crate::error::CryptoError;
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Page locking
// ---------------------------------------------------------------------------

/// RAII guard over an `mlock`ed region; `munlock`s on drop.
pub struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: the pointer is only handed to mlock/munlock, which are thread-safe.
// The bytes themselves are owned and accessed through the enclosing container.
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    /// Lock `len` bytes at `ptr`. Failure is soft: the region stays unlocked
    /// and a single warning is emitted per process.
    #[must_use]
    pub(crate) fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: std::sync::Once = std::sync::Once::new();
            WARNED.call_once(|| {
                tracing::warn!(
                    len,
                    "mlock failed; secret material may be swapped to disk (raise RLIMIT_MEMLOCK)"
                );
            });
        }
        Self { ptr, len, locked }
    }

    const fn unlocked() -> Self {
        Self {
            ptr: std::ptr::null(),
            len: 0,
            locked: false,
        }
    }

    /// Returns `true` if the region is currently locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// SecretBuffer
// ---------------------------------------------------------------------------

/// Variable-length secret (reconstructed secrets, derived keys, key seeds).
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
    lock: LockedRegion,
}

impl SecretBuffer {
    /// Copy `data` into a fresh locked allocation.
    ///
    /// The caller remains responsible for zeroizing its own copy.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the allocation cannot be made.
    pub fn new(data: &[u8]) -> Result<Self, CryptoError> {
        let inner: SecretSlice<u8> = data.to_vec().into();
        let exposed = inner.expose_secret();
        let lock = LockedRegion::try_lock(exposed.as_ptr(), exposed.len());
        Ok(Self { inner, lock })
    }

    /// Take ownership of `data`, zeroizing the source vector.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the allocation cannot be made.
    pub fn from_vec(mut data: Vec<u8>) -> Result<Self, CryptoError> {
        let result = Self::new(&data);
        data.zeroize();
        result
    }

    /// `len` bytes from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random(len: usize) -> Result<Self, CryptoError> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        Self::from_vec(bytes)
    }

    /// Borrow the raw bytes for the duration of a cryptographic call.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the backing pages are `mlock`ed.
    #[must_use]
    pub const fn is_mlocked(&self) -> bool {
        self.lock.is_locked()
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N>
// ---------------------------------------------------------------------------

/// Fixed-size secret (nonces, seeds, fuzzy-commitment keys).
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
    #[zeroize(skip)]
    lock: LockedRegion,
}

impl<const N: usize> SecretBytes<N> {
    /// Move `data` into a new container.
    ///
    /// The lock is taken at the construction address; after a move the
    /// `munlock` on drop targets a stale address, which is a harmless no-op.
    /// Zeroization does not depend on the lock.
    #[must_use]
    pub fn new(data: [u8; N]) -> Self {
        let mut s = Self {
            bytes: data,
            lock: LockedRegion::unlocked(),
        };
        s.lock = LockedRegion::try_lock(s.bytes.as_ptr(), N);
        s
    }

    /// `N` bytes from the OS CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::SecureMemory` if the CSPRNG fails.
    pub fn random() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; N];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::SecureMemory(format!("CSPRNG fill failed: {e}")))?;
        let out = Self::new(bytes);
        bytes.zeroize();
        Ok(out)
    }

    #[must_use]
    pub const fn expose(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> fmt::Display for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> From<[u8; N]> for SecretBytes<N> {
    fn from(data: [u8; N]) -> Self {
        Self::new(data)
    }
}

// ---------------------------------------------------------------------------
// Core dumps
// ---------------------------------------------------------------------------

/// Set `RLIMIT_CORE` to zero so a crash mid-attempt cannot dump secrets.
///
/// No-op on non-Unix targets.
///
/// # Errors
///
/// Returns `CryptoError::SecureMemory` if `setrlimit` fails.
pub fn disable_core_dumps() -> Result<(), CryptoError> {
    platform::disable_core_dumps_impl()
}

#[cfg(unix)]
mod platform {
    use crate::error::CryptoError;

    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock accepts any pointer/length; invalid ranges yield ENOMEM.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock failure is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }

    pub(super) fn disable_core_dumps_impl() -> Result<(), CryptoError> {
        let limit = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: standard POSIX call with a valid rlimit pointer.
        let ret = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &raw const limit) };
        if ret != 0 {
            return Err(CryptoError::SecureMemory(
                "failed to disable core dumps via RLIMIT_CORE".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod platform {
    use crate::error::CryptoError;

    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}

    pub(super) fn disable_core_dumps_impl() -> Result<(), CryptoError> {
        Ok(())
    }
}
