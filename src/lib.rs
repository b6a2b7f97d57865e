/*!
 * memtrack Library
 *
 * Per-process allocation accounting in a registry shared between processes,
 * with a reporting layer for a live leak monitor.
 */

pub mod allocator;
pub mod core;
pub mod identity;
pub mod lifecycle;
pub mod monitoring;
pub mod registry;
pub mod report;

// Re-exports
pub use allocator::{PlatformAllocator, RawAllocator, TrackingAllocator};
pub use crate::core::{TableLayout, TrackerConfig, TrackerError, TrackerResult};
pub use identity::{ProcessIdentityResolver, ProcfsResolver};
pub use monitoring::init_tracing;
pub use registry::{AllocationEvent, InMemoryStorage, ProcessRecord, Registry, ShmStorage};
pub use report::{colorize, LeakSeverity, ReportView};
