/*!
 * Segment Layout
 *
 * Binary layout of the registry segment shared between processes:
 *
 * ```text
 * +-----------+--------------+----------------------+------------------------+
 * | lock word | table header | active slots (N)     | finished slots (M)     |
 * +-----------+--------------+----------------------+------------------------+
 * ```
 *
 * The lock word is the only field touched without holding the lock. Everything
 * after it is accessed through [`Tables`], which callers may only build while
 * holding the segment lock.
 */

use super::ring::{FinishedRing, RingView};
use super::types::{AllocationEvent, RawRecord};
use crate::core::limits::SEGMENT_MAGIC;
use crate::core::types::{Pid, TableLayout, Timestamp};
use std::mem::size_of;
use std::ptr::{self, NonNull};
use std::sync::atomic::AtomicU32;

/// Alignment the storage backends guarantee for the segment base
pub(crate) const SEGMENT_ALIGN: usize = 64;

#[repr(C)]
pub(crate) struct SegmentHeader {
    /// Pid of the lock holder, zero when free
    pub lock: AtomicU32,
    _reserved: u32,
    pub table: TableHeader,
}

#[repr(C)]
pub(crate) struct TableHeader {
    pub magic: u64,
    pub active_capacity: u32,
    pub finished_capacity: u32,
    pub active_count: u32,
    pub finished_head: u32,
    pub finished_len: u32,
    _reserved: u32,
    pub next_generation: u64,
}

impl TableHeader {
    pub fn layout(&self) -> TableLayout {
        TableLayout::new(
            self.active_capacity as usize,
            self.finished_capacity as usize,
        )
    }
}

/// Bytes a segment with this layout occupies
pub(crate) fn segment_len(layout: TableLayout) -> usize {
    size_of::<SegmentHeader>()
        + (layout.active_capacity + layout.finished_capacity) * size_of::<RawRecord>()
}

/// Typed window over a mapped segment
pub(crate) struct SharedTable {
    base: NonNull<SegmentHeader>,
    layout: TableLayout,
}

// The segment is only mutated through `Tables`, which requires the lock.
unsafe impl Send for SharedTable {}

impl SharedTable {
    /// # Safety
    /// `base` must be aligned to [`SEGMENT_ALIGN`], valid for reads and writes of
    /// `segment_len(layout)` bytes, and stay mapped for the lifetime of the table.
    pub unsafe fn new(base: NonNull<u8>, layout: TableLayout) -> Self {
        Self {
            base: base.cast(),
            layout,
        }
    }

    pub fn lock_word(&self) -> &AtomicU32 {
        // SAFETY: the lock word is atomic and valid for the table's lifetime
        unsafe { &*ptr::addr_of!((*self.base.as_ptr()).lock) }
    }

    /// # Safety
    /// The caller must hold the segment lock for the lifetime of the returned
    /// value, and must not build two `Tables` from the same segment at once.
    pub unsafe fn tables(&self) -> Tables<'_> {
        let header = ptr::addr_of_mut!((*self.base.as_ptr()).table);
        let slots = self.base.as_ptr().add(1).cast::<RawRecord>();
        let active_len = self.layout.active_capacity;
        let finished_len = self.layout.finished_capacity;
        Tables {
            header: &mut *header,
            active: std::slice::from_raw_parts_mut(slots, active_len),
            finished: std::slice::from_raw_parts_mut(slots.add(active_len), finished_len),
        }
    }
}

/// Exclusive access to the header and both slot arrays
pub(crate) struct Tables<'a> {
    header: &'a mut TableHeader,
    active: &'a mut [RawRecord],
    finished: &'a mut [RawRecord],
}

impl<'a> Tables<'a> {
    pub fn is_formatted(&self) -> bool {
        self.header.magic == SEGMENT_MAGIC
    }

    pub fn stored_layout(&self) -> TableLayout {
        self.header.layout()
    }

    /// Zero every slot and write a fresh header
    pub fn format(&mut self) {
        self.active.fill(RawRecord::EMPTY);
        self.finished.fill(RawRecord::EMPTY);
        self.header.active_capacity = self.active.len() as u32;
        self.header.finished_capacity = self.finished.len() as u32;
        self.header.active_count = 0;
        self.header.finished_head = 0;
        self.header.finished_len = 0;
        self.header.next_generation = 1;
        self.header.magic = SEGMENT_MAGIC;
    }

    /// Live active entries; a corrupt count never exposes slots past capacity
    pub fn active_count(&self) -> usize {
        (self.header.active_count as usize).min(self.active.len())
    }

    pub fn active(&self) -> &[RawRecord] {
        &self.active[..self.active_count()]
    }

    pub fn finished(&self) -> RingView<'_, RawRecord> {
        RingView::new(
            &*self.finished,
            self.header.finished_head,
            self.header.finished_len,
        )
    }

    pub fn position(&self, pid: Pid) -> Option<usize> {
        self.active().iter().position(|record| record.pid == pid)
    }

    pub fn find(&self, pid: Pid) -> Option<&RawRecord> {
        self.position(pid).map(|index| &self.active[index])
    }

    /// Apply an event to an already active `pid`. Returns false if untracked.
    pub fn apply_existing(&mut self, pid: Pid, event: AllocationEvent) -> bool {
        match self.position(pid) {
            Some(index) => {
                self.active[index].apply(event);
                true
            }
            None => false,
        }
    }

    /// Apply an event to `pid`, registering it under `name` if it is not
    /// active. The name is only used for a new record.
    ///
    /// Returns the record evicted to make room, if any.
    pub fn record_event(
        &mut self,
        pid: Pid,
        event: AllocationEvent,
        now: Timestamp,
        name: &str,
    ) -> Option<RawRecord> {
        let mut evicted = None;
        let index = match self.position(pid) {
            Some(index) => index,
            None => {
                if self.active_count() >= self.active.len() {
                    evicted = Some(self.finish_at(0, now));
                }
                let slot = self.active_count();
                let generation = self.header.next_generation;
                self.header.next_generation = generation.wrapping_add(1);
                self.active[slot] = RawRecord::new(pid, generation, name, now);
                self.header.active_count = (slot + 1) as u32;
                slot
            }
        };
        self.active[index].apply(event);
        evicted
    }

    /// Finish every active record matching `predicate`, in table order
    pub fn finish_where(
        &mut self,
        now: Timestamp,
        mut predicate: impl FnMut(&RawRecord) -> bool,
    ) -> Vec<RawRecord> {
        let mut finished = Vec::new();
        let mut index = 0;
        while index < self.active_count() {
            if predicate(&self.active[index]) {
                finished.push(self.finish_at(index, now));
            } else {
                index += 1;
            }
        }
        finished
    }

    /// Move `pid` to the finished ring. Unknown pids are ignored.
    pub fn mark_finished(&mut self, pid: Pid, now: Timestamp) -> Option<RawRecord> {
        let index = self.position(pid)?;
        Some(self.finish_at(index, now))
    }

    /// Stamp, archive and compact out the active entry at `index`
    fn finish_at(&mut self, index: usize, now: Timestamp) -> RawRecord {
        let count = self.active_count();
        let mut record = self.active[index];
        record.finished_at = now;

        FinishedRing::new(
            &mut *self.finished,
            &mut self.header.finished_head,
            &mut self.header.finished_len,
        )
        .push(record);

        self.active.copy_within(index + 1..count, index);
        self.active[count - 1] = RawRecord::EMPTY;
        self.header.active_count = (count - 1) as u32;
        record
    }
}
