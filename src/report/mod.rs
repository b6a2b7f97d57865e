/*!
 * Report Module
 * Row formatting, severity coloring, tables, snapshots and the dashboard
 */

pub mod dashboard;
pub mod rows;
pub mod severity;
pub mod snapshot;
pub mod table;

pub use dashboard::{Command, Dashboard, KeySource, ScriptedKeys, TerminalKeys};
pub use rows::{format_timestamp, ReportRow, ReportView, Rows};
pub use severity::{colorize, LeakSeverity};
pub use snapshot::RegistrySnapshot;
pub use table::{active_table, finished_table};
