/*!
 * Registry Watcher
 * One poll of the monitor loop: retire balanced processes and raise leak alerts
 */

use crate::registry::{ProcessRecord, Registry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of one poll
#[derive(Debug, Default, Clone)]
pub struct TickSummary {
    /// Records this tick moved to the finished ring
    pub retired: Vec<ProcessRecord>,
    pub active: usize,
    pub finished: usize,
}

pub struct Watcher {
    registry: Arc<Registry>,
    auto_finish_balanced: bool,
    /// Finished generations already examined, so each leak is reported once
    alerted: HashSet<u64>,
}

impl Watcher {
    pub fn new(registry: Arc<Registry>, auto_finish_balanced: bool) -> Self {
        Self {
            registry,
            auto_finish_balanced,
            alerted: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Retire every active process whose frees match its allocations, then
    /// alert on finished records with outstanding bytes not yet reported
    pub fn tick(&mut self) -> TickSummary {
        let retired = if self.auto_finish_balanced {
            self.registry.finish_balanced()
        } else {
            Vec::new()
        };

        let finished = self.registry.finished();
        for record in &finished {
            if self.alerted.insert(record.generation) {
                leak_alert(record);
            }
        }
        // Forget generations the ring has overwritten
        let live: HashSet<u64> = finished.iter().map(|r| r.generation).collect();
        self.alerted.retain(|generation| live.contains(generation));

        let summary = TickSummary {
            retired,
            active: self.registry.active_count(),
            finished: finished.len(),
        };
        debug!(
            retired = summary.retired.len(),
            active = summary.active,
            finished = summary.finished,
            "Registry poll complete"
        );
        summary
    }
}

/// Warn about a record that still holds allocated bytes. Returns whether it did.
pub fn leak_alert(record: &ProcessRecord) -> bool {
    if !record.has_leak() {
        return false;
    }
    warn!(
        pid = record.pid,
        name = %record.name,
        leak_bytes = record.outstanding_bytes,
        leak_percent = %format!("{:.1}", record.leak_percent()),
        "Memory leak detected"
    );
    true
}
