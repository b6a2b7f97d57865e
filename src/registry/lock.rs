/*!
 * Segment Lock
 *
 * Cross-process mutual exclusion over the registry segment. The lock word holds
 * the holder's pid (zero when free) and is claimed with compare-and-swap.
 * Waiters spin, then yield. Every `LOCK_PROBE_INTERVAL` failed attempts the
 * waiter probes the holder with `kill(pid, 0)`; a holder that no longer exists
 * died inside a critical section, and its lock is taken over.
 */

use crate::core::limits::{LOCK_PROBE_INTERVAL, LOCK_SPIN_LIMIT};
use crate::core::types::Pid;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use tracing::warn;

/// Held segment lock, released on drop
pub(crate) struct SegmentLockGuard<'a> {
    word: &'a AtomicU32,
}

impl<'a> SegmentLockGuard<'a> {
    /// Block until `me` owns the lock
    pub fn acquire(word: &'a AtomicU32, me: Pid) -> Self {
        let mut attempts: u32 = 0;
        loop {
            let holder = match word.compare_exchange_weak(0, me, Ordering::Acquire, Ordering::Relaxed)
            {
                Ok(_) => return Self { word },
                Err(holder) => holder,
            };

            attempts = attempts.wrapping_add(1);
            if holder != 0 && attempts % LOCK_PROBE_INTERVAL == 0 && !holder_alive(holder) {
                if word
                    .compare_exchange(holder, me, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
                {
                    warn!(
                        dead_holder = holder,
                        pid = me,
                        "Registry lock holder exited while locked, taking over"
                    );
                    return Self { word };
                }
            }

            if attempts < LOCK_SPIN_LIMIT {
                std::hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
    }
}

impl Drop for SegmentLockGuard<'_> {
    fn drop(&mut self) {
        self.word.store(0, Ordering::Release);
    }
}

/// `kill(pid, 0)`: ESRCH means gone, EPERM means alive under another user
fn holder_alive(pid: Pid) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    !matches!(kill(NixPid::from_raw(raw), None), Err(Errno::ESRCH))
}
