/*!
 * Finished Ring Tests
 * Bounded history of completed processes, oldest overwritten first
 */

use memtrack::identity::FixedNameResolver;
use memtrack::{AllocationEvent, Registry, TableLayout};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn finish(registry: &Registry, pid: u32, bytes: usize) {
    registry.record_event(pid, AllocationEvent::Allocated(bytes));
    registry.mark_finished(pid);
}

#[test]
fn test_ring_never_exceeds_capacity() {
    let registry = Registry::in_memory(TableLayout::new(4, 3))
        .unwrap()
        .with_resolver(Arc::new(FixedNameResolver("ring".into())));

    for pid in 1..=3 {
        finish(&registry, pid, 8);
    }
    assert_eq!(registry.finished_count(), 3);

    finish(&registry, 4, 8);
    assert_eq!(registry.finished_count(), 3);

    let pids: Vec<u32> = registry.finished().iter().map(|r| r.pid).collect();
    assert_eq!(pids, vec![2, 3, 4]);
    assert_eq!(registry.last_finished().unwrap().pid, 4);
}

#[test]
fn test_ring_wraps_many_times() {
    let registry = Registry::in_memory(TableLayout::new(2, 4))
        .unwrap()
        .with_resolver(Arc::new(FixedNameResolver("ring".into())));

    for pid in 1..=11 {
        finish(&registry, pid, pid as usize);
    }

    let finished = registry.finished();
    let pids: Vec<u32> = finished.iter().map(|r| r.pid).collect();
    assert_eq!(pids, vec![8, 9, 10, 11]);
    assert_eq!(finished[3].allocated_bytes, 11);
}

#[test]
fn test_empty_ring() {
    let registry = Registry::in_memory(TableLayout::new(2, 2)).unwrap();
    assert!(registry.finished().is_empty());
    assert!(registry.last_finished().is_none());
}
