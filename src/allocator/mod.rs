/*!
 * Allocator Module
 * Tracking facade over the platform heap
 */

pub mod platform;
pub mod tracking;
pub mod traits;

// Re-export for convenience
pub use platform::PlatformAllocator;
pub use tracking::TrackingAllocator;
pub use traits::RawAllocator;
