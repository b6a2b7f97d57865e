/*!
 * Eviction Tests
 * A full active table retires its oldest process to make room
 */

use memtrack::identity::FixedNameResolver;
use memtrack::{AllocationEvent, Registry, TableLayout};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn registry(active: usize, finished: usize) -> Registry {
    Registry::in_memory(TableLayout::new(active, finished))
        .unwrap()
        .with_resolver(Arc::new(FixedNameResolver("proc".into())))
}

#[test]
fn test_capacity_one_evicts_previous_process() {
    let registry = registry(1, 4);
    registry.record_event(100, AllocationEvent::Allocated(300));
    registry.record_event(100, AllocationEvent::Deallocated(100));
    registry.record_event(200, AllocationEvent::Allocated(50));

    let active = registry.active();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].pid, 200);

    let evicted = registry.last_finished().unwrap();
    assert_eq!(evicted.pid, 100);
    assert_eq!(evicted.allocated_bytes, 300);
    assert_eq!(evicted.deallocated_bytes, 100);
    assert_eq!(evicted.outstanding_bytes, 200);
    assert!(evicted.finished_at.is_some());
}

#[test]
fn test_eviction_takes_oldest_first() {
    let registry = registry(3, 8);
    for pid in 1..=5 {
        registry.record_event(pid, AllocationEvent::Allocated(pid as usize * 10));
    }

    let active: Vec<u32> = registry.active().iter().map(|r| r.pid).collect();
    assert_eq!(active, vec![3, 4, 5]);

    let finished: Vec<u32> = registry.finished().iter().map(|r| r.pid).collect();
    assert_eq!(finished, vec![1, 2]);
}

#[test]
fn test_evicted_counters_are_frozen() {
    let registry = registry(1, 4);
    registry.record_event(1, AllocationEvent::Allocated(10));
    registry.record_event(2, AllocationEvent::Allocated(20));

    // pid 1 comes back as a new lifetime and evicts pid 2
    registry.record_event(1, AllocationEvent::Allocated(5));

    let finished = registry.finished();
    assert_eq!(finished.len(), 2);
    assert_eq!(finished[0].pid, 1);
    assert_eq!(finished[0].allocated_bytes, 10);
    assert_eq!(finished[1].pid, 2);

    let current = registry.find(1).unwrap();
    assert_eq!(current.allocated_bytes, 5);
    assert!(current.generation > finished[0].generation);
}
