/*!
 * Tracking Allocator Tests
 * Facade calls must reach the registry exactly when the heap call succeeds
 */

use memtrack::identity::FixedNameResolver;
use memtrack::{
    colorize, LeakSeverity, PlatformAllocator, RawAllocator, Registry, TableLayout,
    TrackingAllocator,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::Arc;

const PID: u32 = 4242;

fn registry() -> Arc<Registry> {
    Arc::new(
        Registry::in_memory(TableLayout::new(8, 8))
            .unwrap()
            .with_resolver(Arc::new(FixedNameResolver("facade".into()))),
    )
}

fn facade(registry: &Arc<Registry>) -> TrackingAllocator {
    TrackingAllocator::new(Arc::clone(registry)).for_pid(PID)
}

/// Heap that is always exhausted
struct ExhaustedAllocator;

unsafe impl RawAllocator for ExhaustedAllocator {
    fn allocate(&self, _size: usize) -> Option<NonNull<u8>> {
        None
    }

    unsafe fn release(&self, _ptr: NonNull<u8>) {}

    unsafe fn resize(&self, _ptr: NonNull<u8>, _new_size: usize) -> Option<NonNull<u8>> {
        None
    }
}

#[test]
fn test_large_partial_free_is_critical() {
    let registry = registry();
    let facade = facade(&registry);

    let first = facade.allocate(2000).unwrap();
    let second = facade.allocate(1500).unwrap();
    unsafe { facade.free(first.as_ptr(), 500) };

    let record = registry.find(PID).unwrap();
    assert_eq!(record.outstanding_bytes, 3000);
    assert_eq!(format!("{:.1}", record.leak_percent()), "85.7");
    assert_eq!(colorize(record.leak_percent()), LeakSeverity::Critical);

    unsafe { PlatformAllocator.release(second) };
}

#[test]
fn test_reallocate_then_free_balances() {
    let registry = registry();
    let facade = facade(&registry);
    let old_size = 5 * size_of::<i32>();
    let new_size = 6 * size_of::<i32>();

    let array = facade.allocate(old_size).unwrap();
    unsafe {
        for i in 0..5 {
            array.cast::<i32>().as_ptr().add(i).write(i as i32 + 1);
        }
        let grown = facade.reallocate(array.as_ptr(), old_size, new_size).unwrap();
        assert_eq!(grown.cast::<i32>().as_ptr().add(4).read(), 5);
        facade.free(grown.as_ptr(), new_size);
    }

    let record = registry.find(PID).unwrap();
    assert_eq!(record.allocated_bytes, new_size as u64);
    assert_eq!(record.deallocated_bytes, new_size as u64);
    assert_eq!(record.outstanding_bytes, 0);
}

#[test]
fn test_shrinking_reallocate_lowers_allocated() {
    let registry = registry();
    let facade = facade(&registry);

    let block = facade.allocate(100).unwrap();
    let shrunk = unsafe { facade.reallocate(block.as_ptr(), 100, 40) }.unwrap();

    assert_eq!(registry.find(PID).unwrap().allocated_bytes, 40);
    unsafe { facade.free(shrunk.as_ptr(), 40) };
    assert_eq!(registry.find(PID).unwrap().outstanding_bytes, 0);
}

#[test]
fn test_reallocate_null_allocates() {
    let registry = registry();
    let facade = facade(&registry);

    let block = unsafe { facade.reallocate(std::ptr::null_mut(), 0, 64) }.unwrap();
    assert_eq!(registry.find(PID).unwrap().allocated_bytes, 64);
    unsafe { facade.free(block.as_ptr(), 64) };
}

#[test]
fn test_free_null_is_ignored() {
    let registry = registry();
    let facade = facade(&registry);

    unsafe { facade.free(std::ptr::null_mut(), 128) };
    assert!(registry.find(PID).is_none());
}

#[test]
fn test_zeroed_allocate_records_total() {
    let registry = registry();
    let facade = facade(&registry);

    let block = facade.zeroed_allocate(16, 4).unwrap();
    let bytes = unsafe { std::slice::from_raw_parts(block.as_ptr(), 64) };
    assert!(bytes.iter().all(|&b| b == 0));
    assert_eq!(registry.find(PID).unwrap().allocated_bytes, 64);

    unsafe { facade.free(block.as_ptr(), 64) };
}

#[test]
fn test_zeroed_allocate_overflow_fails() {
    let registry = registry();
    let facade = facade(&registry);

    assert!(facade.zeroed_allocate(usize::MAX, 2).is_none());
    assert!(registry.find(PID).is_none());
}

#[test]
fn test_failed_calls_record_nothing() {
    let registry = registry();
    let facade = TrackingAllocator::with_allocator(Arc::clone(&registry), ExhaustedAllocator)
        .for_pid(PID);

    assert!(facade.allocate(64).is_none());
    assert!(facade.zeroed_allocate(4, 4).is_none());
    let mut dummy = 0u8;
    assert!(unsafe { facade.reallocate(&mut dummy, 1, 64) }.is_none());

    assert!(registry.find(PID).is_none());
    assert_eq!(registry.active_count(), 0);
}

#[test]
fn test_default_caller_is_current_process() {
    let registry = registry();
    let facade = TrackingAllocator::new(Arc::clone(&registry));
    assert_eq!(facade.caller_pid(), std::process::id());

    let block = facade.allocate(8).unwrap();
    assert!(registry.find(std::process::id()).is_some());
    unsafe { facade.free(block.as_ptr(), 8) };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_outstanding_is_allocs_minus_frees(
        steps in prop::collection::vec((1usize..4096, 0usize..8192, any::<bool>()), 1..40)
    ) {
        let registry = registry();
        let facade = facade(&registry);
        let mut kept = Vec::new();
        let mut allocated = 0i64;
        let mut freed = 0i64;

        for (size, reported_free, free_now) in steps {
            let block = facade.allocate(size).unwrap();
            allocated += size as i64;
            if free_now {
                unsafe { facade.free(block.as_ptr(), reported_free) };
                freed += reported_free as i64;
            } else {
                kept.push(block);
            }
        }

        let record = registry.find(PID).unwrap();
        prop_assert_eq!(record.outstanding_bytes, allocated - freed);
        prop_assert_eq!(record.allocated_bytes as i64, allocated);
        prop_assert_eq!(record.deallocated_bytes as i64, freed);

        for block in kept {
            unsafe { PlatformAllocator.release(block) };
        }
    }
}
