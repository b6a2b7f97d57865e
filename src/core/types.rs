/*!
 * Core Types
 * Common types used across the tracker
 */

use serde::{Deserialize, Serialize};

/// Process ID type
pub type Pid = u32;

/// Size type for allocation accounting
pub type Size = usize;

/// Wall-clock timestamp in seconds since the Unix epoch
pub type Timestamp = i64;

/// Registry-wide sequence number distinguishing lifetimes that share a pid
pub type Generation = u64;

/// Common result type for tracker operations
pub type TrackerResult<T> = Result<T, super::errors::TrackerError>;

/// Shape of the shared table: how many active slots and finished slots it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub active_capacity: usize,
    pub finished_capacity: usize,
}

impl TableLayout {
    pub const fn new(active_capacity: usize, finished_capacity: usize) -> Self {
        Self {
            active_capacity,
            finished_capacity,
        }
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::new(
            super::limits::DEFAULT_ACTIVE_CAPACITY,
            super::limits::DEFAULT_FINISHED_CAPACITY,
        )
    }
}

impl std::fmt::Display for TableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} active / {} finished",
            self.active_capacity, self.finished_capacity
        )
    }
}

/// Current wall-clock time as a Unix timestamp
pub fn now() -> Timestamp {
    time::OffsetDateTime::now_utc().unix_timestamp()
}
