/*!
 * Registry Tests
 * Event accounting, completion and teardown on an in-memory registry
 */

use memtrack::identity::FixedNameResolver;
use memtrack::{
    AllocationEvent, InMemoryStorage, ProcessIdentityResolver, Registry, TableLayout, TrackerError,
};
use pretty_assertions::assert_eq;
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Signals when a lookup starts, then takes `delay` to answer
struct SlowResolver {
    started: Mutex<Sender<()>>,
    delay: Duration,
}

impl ProcessIdentityResolver for SlowResolver {
    fn resolve(&self, _pid: u32) -> String {
        let _ = self.started.lock().unwrap().send(());
        std::thread::sleep(self.delay);
        "slow".to_string()
    }
}

/// Reads the registry it is resolving for
struct ReentrantResolver {
    other: Registry,
}

impl ProcessIdentityResolver for ReentrantResolver {
    fn resolve(&self, _pid: u32) -> String {
        format!("peer-of-{}", self.other.active_count())
    }
}

fn registry(active: usize, finished: usize) -> Registry {
    Registry::in_memory(TableLayout::new(active, finished))
        .unwrap()
        .with_resolver(Arc::new(FixedNameResolver("worker".into())))
}

#[test]
fn test_first_event_registers_process() {
    let registry = registry(4, 4);
    assert!(registry.find(10).is_none());

    registry.record_event(10, AllocationEvent::Allocated(128));

    let record = registry.find(10).unwrap();
    assert_eq!(record.pid, 10);
    assert_eq!(record.name, "worker");
    assert_eq!(record.allocated_bytes, 128);
    assert_eq!(record.deallocated_bytes, 0);
    assert_eq!(record.outstanding_bytes, 128);
    assert!(record.finished_at.is_none());
    assert_eq!(registry.active_count(), 1);
}

#[test]
fn test_outstanding_tracks_mismatched_frees() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(2000));
    registry.record_event(10, AllocationEvent::Allocated(1500));
    registry.record_event(10, AllocationEvent::Deallocated(500));

    let record = registry.find(10).unwrap();
    assert_eq!(record.allocated_bytes, 3500);
    assert_eq!(record.deallocated_bytes, 500);
    assert_eq!(record.outstanding_bytes, 3000);
    assert!((record.leak_percent() - 85.714).abs() < 0.01);
}

#[test]
fn test_over_free_goes_negative() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(10));
    registry.record_event(10, AllocationEvent::Deallocated(30));

    let record = registry.find(10).unwrap();
    assert_eq!(record.outstanding_bytes, -20);
    assert!(!record.has_leak());
}

#[test]
fn test_resize_event_adjusts_allocated() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(20));
    registry.record_event(10, AllocationEvent::resized(20, 24));
    registry.record_event(10, AllocationEvent::Deallocated(24));

    let record = registry.find(10).unwrap();
    assert_eq!(record.allocated_bytes, 24);
    assert_eq!(record.outstanding_bytes, 0);
    assert!(record.is_balanced());
}

#[test]
fn test_mark_finished_moves_record() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(64));
    registry.record_event(11, AllocationEvent::Allocated(32));

    let finished = registry.mark_finished(10).unwrap();
    assert_eq!(finished.pid, 10);
    assert!(finished.finished_at.is_some());

    assert!(registry.find(10).is_none());
    assert_eq!(registry.active_count(), 1);
    assert_eq!(registry.finished_count(), 1);
    assert_eq!(registry.last_finished(), Some(finished));
}

#[test]
fn test_mark_finished_unknown_pid_is_noop() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(64));
    let before_active = registry.active();
    let before_finished = registry.finished();

    assert!(registry.mark_finished(999).is_none());

    assert_eq!(registry.active(), before_active);
    assert_eq!(registry.finished(), before_finished);
}

#[test]
fn test_compaction_preserves_order() {
    let registry = registry(4, 4);
    for pid in [1, 2, 3] {
        registry.record_event(pid, AllocationEvent::Allocated(8));
    }
    registry.mark_finished(2);

    let pids: Vec<u32> = registry.active().iter().map(|r| r.pid).collect();
    assert_eq!(pids, vec![1, 3]);
}

#[test]
fn test_reused_pid_gets_new_generation() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(8));
    let first = registry.mark_finished(10).unwrap();

    registry.record_event(10, AllocationEvent::Allocated(8));
    let second = registry.find(10).unwrap();

    assert!(second.generation > first.generation);
    assert_eq!(second.allocated_bytes, 8);
}

#[test]
fn test_teardown_is_idempotent() {
    let registry = registry(4, 4);
    registry.record_event(10, AllocationEvent::Allocated(8));
    assert!(registry.is_attached());

    registry.teardown();
    registry.teardown();

    assert!(!registry.is_attached());
    assert!(registry.find(10).is_none());
    assert!(registry.active().is_empty());
    registry.record_event(10, AllocationEvent::Allocated(8));
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn test_shared_storage_sees_other_binding() {
    let layout = TableLayout::new(4, 4);
    let storage = InMemoryStorage::new(layout).unwrap();
    let writer = Registry::attach(Box::new(storage.clone()), layout).unwrap();
    writer.record_event(10, AllocationEvent::Allocated(100));

    let reader = Registry::attach(Box::new(storage), layout).unwrap();
    assert_eq!(reader.find(10).unwrap().allocated_bytes, 100);
}

#[test]
fn test_attach_rejects_other_layout() {
    let layout = TableLayout::new(4, 4);
    let storage = InMemoryStorage::new(layout).unwrap();
    let _first = Registry::attach(Box::new(storage.clone()), layout).unwrap();

    let err = Registry::attach(Box::new(storage), TableLayout::new(2, 4)).unwrap_err();
    assert!(matches!(err, TrackerError::LayoutMismatch { .. }));
}

#[test]
fn test_zero_capacity_rejected() {
    let err = Registry::in_memory(TableLayout::new(0, 4)).unwrap_err();
    assert!(matches!(err, TrackerError::InvalidConfig(_)));
}

#[test]
fn test_concurrent_events_are_not_lost() {
    let registry = Arc::new(registry(8, 8));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    registry.record_event(42, AllocationEvent::Allocated(1));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(registry.find(42).unwrap().allocated_bytes, 4000);
    assert_eq!(registry.active_count(), 1);
}

#[test]
fn test_name_lookup_does_not_block_other_bindings() {
    let layout = TableLayout::new(4, 4);
    let storage = InMemoryStorage::new(layout).unwrap();
    let (started_tx, started_rx) = channel();
    let writer = Arc::new(
        Registry::attach(Box::new(storage.clone()), layout)
            .unwrap()
            .with_resolver(Arc::new(SlowResolver {
                started: Mutex::new(started_tx),
                delay: Duration::from_millis(500),
            })),
    );
    let reader = Registry::attach(Box::new(storage), layout).unwrap();

    let handle = {
        let writer = Arc::clone(&writer);
        std::thread::spawn(move || writer.record_event(2, AllocationEvent::Allocated(16)))
    };
    started_rx.recv().unwrap();

    let begin = Instant::now();
    assert!(reader.find(2).is_none());
    assert!(begin.elapsed() < Duration::from_millis(250));

    handle.join().unwrap();
    assert_eq!(reader.find(2).unwrap().name, "slow");
}

#[test]
fn test_resolver_may_read_the_registry() {
    let layout = TableLayout::new(4, 4);
    let storage = InMemoryStorage::new(layout).unwrap();
    let other = Registry::attach(Box::new(storage.clone()), layout).unwrap();
    let registry = Registry::attach(Box::new(storage), layout)
        .unwrap()
        .with_resolver(Arc::new(ReentrantResolver { other }));

    registry.record_event(1, AllocationEvent::Allocated(8));
    registry.record_event(2, AllocationEvent::Allocated(8));

    assert_eq!(registry.find(1).unwrap().name, "peer-of-0");
    assert_eq!(registry.find(2).unwrap().name, "peer-of-1");
}

#[test]
fn test_finish_balanced_only_takes_balanced_records() {
    let registry = registry(8, 8);
    registry.record_event(7, AllocationEvent::Allocated(100));
    registry.record_event(7, AllocationEvent::Deallocated(100));
    registry.record_event(8, AllocationEvent::Allocated(100));
    registry.record_event(8, AllocationEvent::Deallocated(40));
    registry.record_event(9, AllocationEvent::Deallocated(0));
    registry.record_event(10, AllocationEvent::Allocated(5));
    registry.record_event(10, AllocationEvent::Deallocated(5));

    let finished = registry.finish_balanced();
    let pids: Vec<u32> = finished.iter().map(|r| r.pid).collect();
    assert_eq!(pids, vec![7, 10]);
    assert!(finished.iter().all(|r| r.finished_at.is_some()));

    let active: Vec<u32> = registry.active().iter().map(|r| r.pid).collect();
    assert_eq!(active, vec![8, 9]);
    assert_eq!(registry.finished_count(), 2);
}

#[test]
fn test_finish_balanced_sees_latest_counters() {
    let registry = registry(4, 4);
    registry.record_event(7, AllocationEvent::Allocated(100));
    registry.record_event(7, AllocationEvent::Deallocated(100));
    let snapshot = registry.find(7).unwrap();
    assert!(snapshot.is_balanced());

    // Allocation lands after the snapshot but before the sweep
    registry.record_event(7, AllocationEvent::Allocated(50));

    assert!(registry.finish_balanced().is_empty());
    assert_eq!(registry.find(7).unwrap().outstanding_bytes, 50);
    assert_eq!(registry.finished_count(), 0);
}
