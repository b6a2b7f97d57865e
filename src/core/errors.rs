/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::types::TableLayout;
use miette::Diagnostic;
use thiserror::Error;

/// Tracker errors
///
/// Only attach-time and terminal failures are errors. Table exhaustion,
/// unknown pids and mismatched free sizes are absorbed by the registry.
#[derive(Error, Debug, Diagnostic)]
pub enum TrackerError {
    #[error("Shared memory {op} failed for {name}: {source}")]
    #[diagnostic(
        code(registry::shared_memory),
        help("Check that /dev/shm is mounted and writable, and that no other user owns the segment.")
    )]
    SharedMemory {
        op: &'static str,
        name: String,
        #[source]
        source: nix::Error,
    },

    #[error("Registry layout mismatch: expected {expected}, segment holds {found}")]
    #[diagnostic(
        code(registry::layout_mismatch),
        help("Every attached process must use the same capacities. Remove the stale segment or align MEMTRACK_*_CAPACITY.")
    )]
    LayoutMismatch {
        expected: TableLayout,
        found: TableLayout,
    },

    #[error("Registry segment has {found} bytes, layout needs {expected}")]
    #[diagnostic(code(registry::segment_size))]
    SegmentSize { expected: usize, found: u64 },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(config::invalid))]
    InvalidConfig(String),

    #[error("Terminal control failed: {0}")]
    #[diagnostic(
        code(report::terminal),
        help("The interactive dashboard needs a TTY on stdin. Use `watch` or `json` mode otherwise.")
    )]
    Terminal(#[source] nix::Error),

    #[error("I/O error: {0}")]
    #[diagnostic(code(io::error))]
    Io(#[from] std::io::Error),
}
