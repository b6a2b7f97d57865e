/*!
 * Allocator Traits
 * Raw heap interface the tracking facade delegates to
 */

use crate::core::types::Size;
use std::ptr::NonNull;

/// Untracked heap allocator with `malloc`-family semantics.
///
/// Release does not take a size, so a caller-supplied size that is wrong
/// only skews accounting, never the heap.
///
/// # Safety
/// Implementations must return pointers valid for `size` bytes, aligned for any
/// fundamental type, and accept every pointer they returned in `release` and
/// `resize`.
pub unsafe trait RawAllocator: Send + Sync {
    /// Allocate `size` bytes; `None` on exhaustion
    fn allocate(&self, size: Size) -> Option<NonNull<u8>>;

    /// Release a block
    ///
    /// # Safety
    /// `ptr` must come from this allocator and not have been released
    unsafe fn release(&self, ptr: NonNull<u8>);

    /// Resize a block, possibly moving it. On `None` the old block is untouched.
    ///
    /// # Safety
    /// `ptr` must come from this allocator and not have been released
    unsafe fn resize(&self, ptr: NonNull<u8>, new_size: Size) -> Option<NonNull<u8>>;
}
