/*!
 * Platform Allocator
 * The C library heap (`malloc`, `free`, `realloc`)
 */

use super::traits::RawAllocator;
use crate::core::types::Size;
use std::ptr::NonNull;

#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformAllocator;

unsafe impl RawAllocator for PlatformAllocator {
    #[inline]
    fn allocate(&self, size: Size) -> Option<NonNull<u8>> {
        // SAFETY: malloc has no preconditions
        NonNull::new(unsafe { libc::malloc(size) }.cast())
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>) {
        libc::free(ptr.as_ptr().cast());
    }

    /// A zero-byte resize keeps a one-byte block; `realloc(p, 0)` would free it
    #[inline]
    unsafe fn resize(&self, ptr: NonNull<u8>, new_size: Size) -> Option<NonNull<u8>> {
        NonNull::new(libc::realloc(ptr.as_ptr().cast(), new_size.max(1)).cast())
    }
}
