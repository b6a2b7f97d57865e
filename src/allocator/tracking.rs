/*!
 * Tracking Allocator
 *
 * Facade over a raw allocator that reports every successful allocate, free,
 * reallocate and zeroed allocate to the registry, keyed by the caller's pid.
 * Sizes passed to `free` and `reallocate` are trusted as given.
 */

use super::platform::PlatformAllocator;
use super::traits::RawAllocator;
use crate::core::config::TrackerConfig;
use crate::core::types::{Pid, Size};
use crate::lifecycle;
use crate::registry::{AllocationEvent, Registry};
use std::ptr::NonNull;
use std::sync::Arc;

/// Whose allocations the facade records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    /// The OS pid at call time, so a forked child records under its own pid
    CurrentProcess,
    Fixed(Pid),
}

pub struct TrackingAllocator<A: RawAllocator = PlatformAllocator> {
    registry: Arc<Registry>,
    raw: A,
    caller: Caller,
}

impl TrackingAllocator<PlatformAllocator> {
    /// Facade over the platform heap recording into `registry`
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_allocator(registry, PlatformAllocator)
    }

    /// Facade over the process-global registry, attaching it on first use.
    /// Aborts the process if the shared segment cannot be attached.
    pub fn global() -> Self {
        let registry = lifecycle::global().unwrap_or_else(|| {
            let config = TrackerConfig::from_env().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring invalid tracker environment, using defaults");
                TrackerConfig::default()
            });
            lifecycle::initialize_or_abort(&config)
        });
        Self::new(registry)
    }
}

impl<A: RawAllocator> TrackingAllocator<A> {
    pub fn with_allocator(registry: Arc<Registry>, raw: A) -> Self {
        Self {
            registry,
            raw,
            caller: Caller::CurrentProcess,
        }
    }

    /// Record under `pid` instead of the calling process
    pub fn for_pid(mut self, pid: Pid) -> Self {
        self.caller = Caller::Fixed(pid);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Pid the next event will be recorded under
    pub fn caller_pid(&self) -> Pid {
        match self.caller {
            Caller::CurrentProcess => std::process::id(),
            Caller::Fixed(pid) => pid,
        }
    }

    fn record(&self, event: AllocationEvent) {
        self.registry.record_event(self.caller_pid(), event);
    }

    /// Allocate `size` bytes. Failures are returned as `None` and not recorded.
    pub fn allocate(&self, size: Size) -> Option<NonNull<u8>> {
        let ptr = self.raw.allocate(size)?;
        self.record(AllocationEvent::Allocated(size));
        Some(ptr)
    }

    /// Record `size` bytes as freed, then release `ptr`. Null is ignored.
    ///
    /// # Safety
    /// A non-null `ptr` must come from this facade and not have been freed
    pub unsafe fn free(&self, ptr: *mut u8, size: Size) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        self.record(AllocationEvent::Deallocated(size));
        self.raw.release(ptr);
    }

    /// Resize `ptr` from `old_size` to `new_size`, recording the signed change
    /// as an allocation. A null `ptr` allocates `new_size` bytes. On failure
    /// nothing is recorded and `ptr` stays valid.
    ///
    /// # Safety
    /// A non-null `ptr` must come from this facade and not have been freed
    pub unsafe fn reallocate(
        &self,
        ptr: *mut u8,
        old_size: Size,
        new_size: Size,
    ) -> Option<NonNull<u8>> {
        let Some(ptr) = NonNull::new(ptr) else {
            return self.allocate(new_size);
        };
        let resized = self.raw.resize(ptr, new_size)?;
        self.record(AllocationEvent::resized(old_size, new_size));
        Some(resized)
    }

    /// Allocate `count * size` zeroed bytes, recorded as one allocation.
    /// An overflowing request fails without recording.
    pub fn zeroed_allocate(&self, count: Size, size: Size) -> Option<NonNull<u8>> {
        let total = count.checked_mul(size)?;
        let ptr = self.raw.allocate(total)?;
        // SAFETY: fresh block of `total` bytes
        unsafe { ptr.as_ptr().write_bytes(0, total) };
        self.record(AllocationEvent::Allocated(total));
        Some(ptr)
    }
}
