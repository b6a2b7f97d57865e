/*!
 * Registry Storage
 * Backends that provide the memory region holding the registry segment
 */

use super::layout::{segment_len, SEGMENT_ALIGN};
use crate::core::errors::TrackerError;
use crate::core::types::{TableLayout, TrackerResult};
use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

/// Memory region backing a registry
///
/// # Safety
/// `base` must be aligned to 64 bytes and valid for reads and writes of `len`
/// bytes until `detach` is called or the storage is dropped. New regions must
/// start zero-filled.
pub unsafe trait RegistryStorage: Send {
    /// Start of the region
    fn base(&self) -> NonNull<u8>;

    /// Length of the region in bytes
    fn len(&self) -> usize;

    /// Human-readable identity for logs
    fn describe(&self) -> String;

    /// Release this process's binding to the region. Never destroys shared data.
    fn detach(self: Box<Self>) -> TrackerResult<()>;
}

/// Heap region standing in for a shared segment
struct HeapRegion {
    base: NonNull<u8>,
    layout: Layout,
}

// Access is serialized by the registry lock.
unsafe impl Send for HeapRegion {}
unsafe impl Sync for HeapRegion {}

impl Drop for HeapRegion {
    fn drop(&mut self) {
        // SAFETY: allocated in `InMemoryStorage::new` with this layout
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

/// In-process storage for tests and single-process use.
///
/// Clones share the same region, so two registries attached to clones behave
/// like two processes attached to one segment.
#[derive(Clone)]
pub struct InMemoryStorage {
    region: Arc<HeapRegion>,
}

impl InMemoryStorage {
    pub fn new(table: TableLayout) -> TrackerResult<Self> {
        let layout = Layout::from_size_align(segment_len(table), SEGMENT_ALIGN)
            .map_err(|e| TrackerError::InvalidConfig(format!("table layout {}: {}", table, e)))?;
        // SAFETY: layout has non-zero size (the header alone is 48 bytes)
        let ptr = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(ptr).unwrap_or_else(|| handle_alloc_error(layout));
        Ok(Self {
            region: Arc::new(HeapRegion { base, layout }),
        })
    }
}

unsafe impl RegistryStorage for InMemoryStorage {
    fn base(&self) -> NonNull<u8> {
        self.region.base
    }

    fn len(&self) -> usize {
        self.region.layout.size()
    }

    fn describe(&self) -> String {
        format!("in-memory region ({} bytes)", self.len())
    }

    fn detach(self: Box<Self>) -> TrackerResult<()> {
        Ok(())
    }
}
