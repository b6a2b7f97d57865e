/*!
 * Process Identity
 * Resolves a process id to a display name from platform process metadata
 */

use crate::core::limits::UNKNOWN_PROCESS_NAME;
use crate::core::types::Pid;
use std::fs;
use std::path::PathBuf;

/// Maps a pid to a display name. Implementations never fail; unreadable
/// metadata resolves to [`UNKNOWN_PROCESS_NAME`].
pub trait ProcessIdentityResolver: Send + Sync {
    fn resolve(&self, pid: Pid) -> String;
}

/// Reads `<root>/<pid>/comm`
#[derive(Debug, Clone)]
pub struct ProcfsResolver {
    root: PathBuf,
}

impl ProcfsResolver {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Resolve against another procfs-shaped directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessIdentityResolver for ProcfsResolver {
    fn resolve(&self, pid: Pid) -> String {
        let path = self.root.join(pid.to_string()).join("comm");
        let contents = fs::read_to_string(&path).unwrap_or_default();
        match contents.lines().next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_PROCESS_NAME.to_string(),
        }
    }
}

/// Resolves every pid to the same name
#[derive(Debug, Clone)]
pub struct FixedNameResolver(pub String);

impl ProcessIdentityResolver for FixedNameResolver {
    fn resolve(&self, _pid: Pid) -> String {
        self.0.clone()
    }
}
