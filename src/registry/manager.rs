/*!
 * Allocation Registry
 * Shared table of active processes plus the finished-process history ring
 */

use super::layout::{segment_len, SharedTable, Tables};
use super::lock::SegmentLockGuard;
use super::shm::ShmStorage;
use super::storage::{InMemoryStorage, RegistryStorage};
use super::types::{AllocationEvent, ProcessRecord};
use crate::core::config::TrackerConfig;
use crate::core::errors::TrackerError;
use crate::core::types::{now, Pid, TableLayout, TrackerResult};
use crate::identity::{ProcessIdentityResolver, ProcfsResolver};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Attachment {
    table: SharedTable,
    storage: Box<dyn RegistryStorage>,
}

/// Allocation registry bound to one storage region
///
/// Every operation runs under an in-process mutex and the cross-process
/// segment lock, so concurrent mutation from several processes is serialized.
/// After [`teardown`](Registry::teardown) all operations are no-ops.
pub struct Registry {
    attachment: Mutex<Option<Attachment>>,
    layout: TableLayout,
    resolver: Arc<dyn ProcessIdentityResolver>,
}

impl Registry {
    /// Bind `storage`, formatting it if no other process has yet
    pub fn attach(storage: Box<dyn RegistryStorage>, layout: TableLayout) -> TrackerResult<Self> {
        if layout.active_capacity == 0 || layout.finished_capacity == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "registry capacities must be non-zero, got {}",
                layout
            )));
        }
        let required = segment_len(layout);
        if storage.len() < required {
            return Err(TrackerError::SegmentSize {
                expected: required,
                found: storage.len() as u64,
            });
        }

        // SAFETY: the storage contract guarantees alignment and length
        let table = unsafe { SharedTable::new(storage.base(), layout) };
        {
            let _lock = SegmentLockGuard::acquire(table.lock_word(), std::process::id());
            // SAFETY: lock held, no other `Tables` alive
            let mut tables = unsafe { table.tables() };
            if !tables.is_formatted() {
                tables.format();
                info!(storage = %storage.describe(), %layout, "Created registry table");
            } else if tables.stored_layout() != layout {
                return Err(TrackerError::LayoutMismatch {
                    expected: layout,
                    found: tables.stored_layout(),
                });
            } else {
                info!(
                    storage = %storage.describe(),
                    active = tables.active_count(),
                    "Attached to existing registry table"
                );
            }
        }

        Ok(Self {
            attachment: Mutex::new(Some(Attachment { table, storage })),
            layout,
            resolver: Arc::new(ProcfsResolver::new()),
        })
    }

    /// Registry over a private heap region
    pub fn in_memory(layout: TableLayout) -> TrackerResult<Self> {
        Self::attach(Box::new(InMemoryStorage::new(layout)?), layout)
    }

    /// Registry over the shared segment named in `config`
    pub fn open_shared(config: &TrackerConfig) -> TrackerResult<Self> {
        let storage = ShmStorage::open(&config.shm_name, config.layout)?;
        Self::attach(Box::new(storage), config.layout)
    }

    /// Replace the name resolver used when registering new processes
    pub fn with_resolver(mut self, resolver: Arc<dyn ProcessIdentityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn layout(&self) -> TableLayout {
        self.layout
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.lock().is_some()
    }

    /// Drop this process's binding. Shared data is left for other processes.
    pub fn teardown(&self) {
        let Some(attachment) = self.attachment.lock().take() else {
            return;
        };
        let description = attachment.storage.describe();
        match attachment.storage.detach() {
            Ok(()) => info!(storage = %description, "Detached from registry"),
            Err(e) => warn!(storage = %description, error = %e, "Registry detach failed"),
        }
    }

    /// Run `f` with exclusive table access; `None` once torn down
    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables<'_>) -> R) -> Option<R> {
        let attachment = self.attachment.lock();
        let attachment = attachment.as_ref()?;
        let _lock = SegmentLockGuard::acquire(attachment.table.lock_word(), std::process::id());
        // SAFETY: segment lock held and the mutex excludes other threads here
        let mut tables = unsafe { attachment.table.tables() };
        Some(f(&mut tables))
    }

    /// Active record for `pid`, if tracked
    pub fn find(&self, pid: Pid) -> Option<ProcessRecord> {
        self.with_tables(|tables| tables.find(pid).map(ProcessRecord::from))
            .flatten()
    }

    /// Apply `event` to `pid`, registering it on first sight.
    ///
    /// When the active table is full the oldest record is finished to make room.
    ///
    /// The process name of a new pid is resolved before the lock is taken.
    pub fn record_event(&self, pid: Pid, event: AllocationEvent) {
        match self.with_tables(|tables| tables.apply_existing(pid, event)) {
            None | Some(true) => return,
            Some(false) => {}
        }

        let name = self.resolver.resolve(pid);
        // Another thread or process may have registered `pid` meanwhile
        let evicted = self.with_tables(|tables| tables.record_event(pid, event, now(), &name));
        if let Some(Some(evicted)) = evicted {
            debug!(
                evicted_pid = evicted.pid,
                pid,
                outstanding = evicted.outstanding,
                "Active table full, evicted oldest process"
            );
        }
    }

    /// Move `pid` to the finished ring. Unknown pids are a silent no-op.
    pub fn mark_finished(&self, pid: Pid) -> Option<ProcessRecord> {
        let finished = self
            .with_tables(|tables| tables.mark_finished(pid, now()))
            .flatten()
            .map(|raw| ProcessRecord::from(&raw));
        if let Some(record) = &finished {
            debug!(
                pid,
                generation = record.generation,
                outstanding = record.outstanding_bytes,
                "Process finished"
            );
        }
        finished
    }

    /// Finish every active process that has allocated and freed the same
    /// non-zero number of bytes. Check and finish happen under one lock.
    pub fn finish_balanced(&self) -> Vec<ProcessRecord> {
        let finished = self
            .with_tables(|tables| {
                tables.finish_where(now(), |record| {
                    record.allocated > 0 && record.allocated == record.deallocated
                })
            })
            .unwrap_or_default();
        finished
            .iter()
            .map(|raw| {
                let record = ProcessRecord::from(raw);
                debug!(
                    pid = record.pid,
                    generation = record.generation,
                    "Balanced process finished"
                );
                record
            })
            .collect()
    }

    /// Active records in table order
    pub fn active(&self) -> Vec<ProcessRecord> {
        self.with_tables(|tables| tables.active().iter().map(ProcessRecord::from).collect())
            .unwrap_or_default()
    }

    /// Finished records, oldest surviving first
    pub fn finished(&self) -> Vec<ProcessRecord> {
        self.with_tables(|tables| tables.finished().iter().map(ProcessRecord::from).collect())
            .unwrap_or_default()
    }

    pub fn active_count(&self) -> usize {
        self.with_tables(|tables| tables.active_count())
            .unwrap_or(0)
    }

    pub fn finished_count(&self) -> usize {
        self.with_tables(|tables| tables.finished().len())
            .unwrap_or(0)
    }

    /// Most recent finished record
    pub fn last_finished(&self) -> Option<ProcessRecord> {
        self.with_tables(|tables| tables.finished().latest().map(ProcessRecord::from))
            .flatten()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("layout", &self.layout)
            .field("attached", &self.is_attached())
            .finish()
    }
}
