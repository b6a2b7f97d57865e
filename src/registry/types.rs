/*!
 * Registry Types
 * Process records, allocation events and the fixed-size slot stored in shared memory
 */

use crate::core::limits::PROCESS_NAME_LEN;
use crate::core::types::{Generation, Pid, Size, Timestamp};
use serde::{Deserialize, Serialize};

/// One accounting event routed from the allocator facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "bytes")]
pub enum AllocationEvent {
    /// Bytes handed out by the allocator
    Allocated(Size),
    /// Bytes the caller claims to have released
    Deallocated(Size),
    /// Signed change of an existing allocation, counted against `allocated`.
    /// A shrink is a negative allocation, not a deallocation. `allocated`
    /// saturates at zero, so a shrink larger than the recorded total loses
    /// the excess.
    Resized(i64),
}

impl AllocationEvent {
    /// Event for a resize from `old_size` to `new_size`
    pub fn resized(old_size: Size, new_size: Size) -> Self {
        let delta = new_size as i128 - old_size as i128;
        AllocationEvent::Resized(delta.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

/// Snapshot of a tracked process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessRecord {
    pub pid: Pid,
    pub generation: Generation,
    pub name: String,
    pub allocated_bytes: u64,
    pub deallocated_bytes: u64,
    /// Allocated minus deallocated; negative when more was freed than allocated
    pub outstanding_bytes: i64,
    pub started_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<Timestamp>,
}

impl ProcessRecord {
    /// Outstanding bytes as a percentage of everything allocated
    pub fn leak_percent(&self) -> f64 {
        if self.allocated_bytes == 0 {
            return 0.0;
        }
        self.outstanding_bytes as f64 / self.allocated_bytes as f64 * 100.0
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Every allocated byte has been reported freed
    pub fn is_balanced(&self) -> bool {
        self.allocated_bytes == self.deallocated_bytes
    }

    pub fn has_leak(&self) -> bool {
        self.outstanding_bytes > 0
    }
}

/// Fixed-size record slot as laid out in the shared segment.
/// All-zero bytes is a valid empty slot.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct RawRecord {
    pub pid: u32,
    _reserved: u32,
    pub generation: u64,
    pub allocated: u64,
    pub deallocated: u64,
    pub outstanding: i64,
    pub started_at: i64,
    /// Zero while active
    pub finished_at: i64,
    pub name: [u8; PROCESS_NAME_LEN],
}

impl RawRecord {
    pub const EMPTY: RawRecord = RawRecord {
        pid: 0,
        _reserved: 0,
        generation: 0,
        allocated: 0,
        deallocated: 0,
        outstanding: 0,
        started_at: 0,
        finished_at: 0,
        name: [0; PROCESS_NAME_LEN],
    };

    pub fn new(pid: Pid, generation: Generation, name: &str, started_at: Timestamp) -> Self {
        let mut record = Self::EMPTY;
        record.pid = pid;
        record.generation = generation;
        record.started_at = started_at;
        record.set_name(name);
        record
    }

    /// Store the name, truncated at a char boundary so one NUL always fits
    pub fn set_name(&mut self, name: &str) {
        let mut end = name.len().min(PROCESS_NAME_LEN - 1);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        self.name = [0; PROCESS_NAME_LEN];
        self.name[..end].copy_from_slice(&name.as_bytes()[..end]);
    }

    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PROCESS_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }

    /// Apply one event and recompute the outstanding balance
    pub fn apply(&mut self, event: AllocationEvent) {
        match event {
            AllocationEvent::Allocated(size) => {
                self.allocated = self.allocated.saturating_add(size as u64)
            }
            AllocationEvent::Deallocated(size) => {
                self.deallocated = self.deallocated.saturating_add(size as u64)
            }
            AllocationEvent::Resized(delta) => {
                self.allocated = self.allocated.saturating_add_signed(delta)
            }
        }
        let outstanding = self.allocated as i128 - self.deallocated as i128;
        self.outstanding = outstanding.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    }
}

impl From<&RawRecord> for ProcessRecord {
    fn from(raw: &RawRecord) -> Self {
        Self {
            pid: raw.pid,
            generation: raw.generation,
            name: raw.name(),
            allocated_bytes: raw.allocated,
            deallocated_bytes: raw.deallocated,
            outstanding_bytes: raw.outstanding,
            started_at: raw.started_at,
            finished_at: (raw.finished_at != 0).then_some(raw.finished_at),
        }
    }
}
