/*!
 * Registry Lifecycle
 *
 * Process-global registry handle. `initialize` attaches (creating on first use)
 * the shared segment; `teardown` detaches it. Both are idempotent.
 */

use crate::core::config::TrackerConfig;
use crate::core::types::TrackerResult;
use crate::registry::Registry;
use parking_lot::{const_rwlock, RwLock};
use std::sync::Arc;
use tracing::error;

static GLOBAL: RwLock<Option<Arc<Registry>>> = const_rwlock(None);

/// Attach the global registry, or return the one already attached
pub fn initialize(config: &TrackerConfig) -> TrackerResult<Arc<Registry>> {
    if let Some(registry) = global() {
        return Ok(registry);
    }
    let mut slot = GLOBAL.write();
    if let Some(registry) = slot.as_ref() {
        return Ok(Arc::clone(registry));
    }
    let registry = Arc::new(Registry::open_shared(config)?);
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

/// [`initialize`], exiting the process if the shared segment is unavailable.
///
/// A half-attached registry is never returned: other processes may read the
/// segment, so there is no degraded mode.
pub fn initialize_or_abort(config: &TrackerConfig) -> Arc<Registry> {
    match initialize(config) {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, segment = %config.shm_name, "Failed to attach allocation registry");
            eprintln!("memtrack: cannot attach registry {}: {}", config.shm_name, e);
            std::process::exit(1);
        }
    }
}

/// The attached global registry, if any
pub fn global() -> Option<Arc<Registry>> {
    GLOBAL.read().clone()
}

/// Detach the global registry. Facades still holding it see a detached registry.
pub fn teardown() {
    if let Some(registry) = GLOBAL.write().take() {
        registry.teardown();
    }
}
