/*!
 * System Limits and Constants
 *
 * Centralized location for the tracker's fixed sizes, defaults and magic numbers.
 * Values that shape the shared segment are part of its binary interface: every
 * process attaching to the same segment must agree on them.
 */

use std::time::Duration;

// =============================================================================
// SHARED REGISTRY LAYOUT
// =============================================================================

/// Active process slots in the shared table
pub const DEFAULT_ACTIVE_CAPACITY: usize = 1024;

/// Finished process slots in the history ring
pub const DEFAULT_FINISHED_CAPACITY: usize = 1024;

/// Bytes reserved per record for the process name, terminator included
pub const PROCESS_NAME_LEN: usize = 256;

/// Marks a segment whose header has been written ("MEMTRAK1")
pub const SEGMENT_MAGIC: u64 = 0x4D45_4D54_5241_4B31;

/// Well-known POSIX shared memory name for the registry
pub const DEFAULT_SHM_NAME: &str = "/memtrack_registry";

/// Permission bits for a freshly created segment (rw for everyone)
pub const SHM_MODE: u32 = 0o666;

// =============================================================================
// CROSS-PROCESS LOCK
// =============================================================================

/// Busy spins before the lock waiter starts yielding the CPU
pub const LOCK_SPIN_LIMIT: u32 = 64;

/// Failed attempts between liveness probes of the lock holder
pub const LOCK_PROBE_INTERVAL: u32 = 1024;

// =============================================================================
// MONITOR
// =============================================================================

/// Poll interval of the watch loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Name substituted when the process metadata cannot be read
pub const UNKNOWN_PROCESS_NAME: &str = "Unknown";

/// Leak percentage above which a record is reported as critical
pub const CRITICAL_LEAK_PERCENT: f64 = 50.0;

/// Leak percentage above which a record is reported as a warning
pub const WARNING_LEAK_PERCENT: f64 = 10.0;
