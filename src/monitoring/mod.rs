/*!
 * Monitoring
 * Tracing setup and the registry watcher driven by the monitor's poll loop
 */

mod tracer;
pub mod watcher;

pub use tracer::init_tracing;
pub use watcher::{leak_alert, TickSummary, Watcher};
