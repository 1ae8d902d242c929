//! Memory protection for seed material
//!
//! Two best-effort hardening measures for the process that holds the
//! wallet seed:
//!
//! 1. Core dumps are disabled via `setrlimit(RLIMIT_CORE, 0)` so a crash
//!    never writes seed bytes to flash.
//! 2. [`LockedSeedBuf`] keeps a seed-sized buffer `mlock`ed so it cannot
//!    be swapped out, and zeroizes it on drop.
//!
//! Failures are logged and tolerated: unprivileged or containerized
//! environments may refuse either operation.

use std::sync::atomic::{AtomicBool, Ordering};

use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process. Call once, early in boot.
///
/// Returns `true` when core dumps are (already) disabled.
pub fn disable_core_dumps() -> bool {
    if CORE_DUMPS_DISABLED.swap(true, Ordering::SeqCst) {
        return true;
    }

    #[cfg(unix)]
    {
        // SAFETY: setrlimit with RLIMIT_CORE=0 is a plain POSIX call
        unsafe {
            let rlim = libc::rlimit {
                rlim_cur: 0,
                rlim_max: 0,
            };
            if libc::setrlimit(libc::RLIMIT_CORE, &rlim) != 0 {
                log::warn!(
                    "failed to disable core dumps: {}",
                    std::io::Error::last_os_error()
                );
                return false;
            }
        }
        true
    }

    #[cfg(not(unix))]
    {
        log::warn!("core dump prevention not supported on this platform");
        false
    }
}

/// A fixed-size buffer for seed material: locked against swap while alive,
/// zeroized on drop.
pub struct LockedSeedBuf {
    data: Box<[u8; 64]>,
    locked: bool,
}

impl LockedSeedBuf {
    pub fn new() -> Self {
        let data = Box::new([0u8; 64]);

        #[cfg(unix)]
        // SAFETY: data is a live heap allocation of exactly 64 bytes
        let locked = unsafe { libc::mlock(data.as_ptr() as *const libc::c_void, 64) == 0 };
        #[cfg(not(unix))]
        let locked = false;

        if !locked {
            log::warn!("mlock unavailable — seed buffer may be swappable");
        }

        Self { data, locked }
    }

    pub fn as_slice(&self) -> &[u8; 64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8; 64] {
        &mut self.data
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for LockedSeedBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for LockedSeedBuf {
    fn drop(&mut self) {
        self.data.zeroize();

        #[cfg(unix)]
        if self.locked {
            // SAFETY: matches the mlock call in new()
            unsafe {
                libc::munlock(self.data.as_ptr() as *const libc::c_void, 64);
            }
        }
    }
}
