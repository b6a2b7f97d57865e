/*!
 * Report Rows
 * Display rows built lazily from registry snapshots
 */

use super::severity::{colorize, LeakSeverity};
use crate::core::types::{Pid, Timestamp};
use crate::registry::{ProcessRecord, Registry};
use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

/// One formatted table row. Column order: id, name, allocated, deallocated,
/// leak bytes, leak percent, then start and end time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub pid: Pid,
    pub name: String,
    pub allocated_bytes: u64,
    pub deallocated_bytes: u64,
    pub leak_bytes: i64,
    pub leak_percent: f64,
    pub severity: LeakSeverity,
    pub started: String,
    pub finished: Option<String>,
}

impl From<&ProcessRecord> for ReportRow {
    fn from(record: &ProcessRecord) -> Self {
        let leak_percent = record.leak_percent();
        Self {
            pid: record.pid,
            name: record.name.clone(),
            allocated_bytes: record.allocated_bytes,
            deallocated_bytes: record.deallocated_bytes,
            leak_bytes: record.outstanding_bytes,
            leak_percent,
            severity: colorize(leak_percent),
            started: format_timestamp(record.started_at),
            finished: record.finished_at.map(format_timestamp),
        }
    }
}

impl ReportRow {
    /// Cell texts in column order, without color
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.pid.to_string(),
            self.name.clone(),
            format!("{} bytes", self.allocated_bytes),
            format!("{} bytes", self.deallocated_bytes),
            format!("{} bytes", self.leak_bytes),
            format!("{:.1}%", self.leak_percent),
            self.started.clone(),
        ];
        if let Some(finished) = &self.finished {
            cells.push(finished.clone());
        }
        cells
    }
}

impl std::fmt::Display for ReportRow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.cells().join("\t"))
    }
}

/// `YYYY-MM-DD HH:MM:SS` in UTC
pub fn format_timestamp(timestamp: Timestamp) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|at| {
            at.format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .ok()
        })
        .unwrap_or_else(|| timestamp.to_string())
}

/// Finite iterator of rows over one snapshot; rows are formatted on demand
pub struct Rows {
    records: std::vec::IntoIter<ProcessRecord>,
}

impl Iterator for Rows {
    type Item = ReportRow;

    fn next(&mut self) -> Option<ReportRow> {
        self.records.next().as_ref().map(ReportRow::from)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for Rows {}

/// Read-only report over a registry. Each render takes a fresh snapshot, so
/// calling it again restarts from the current table contents.
#[derive(Debug, Clone, Copy)]
pub struct ReportView<'a> {
    registry: &'a Registry,
}

impl<'a> ReportView<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Active records in table order
    pub fn render_active(&self) -> Rows {
        Rows {
            records: self.registry.active().into_iter(),
        }
    }

    /// Finished records, oldest surviving first
    pub fn render_finished(&self) -> Rows {
        Rows {
            records: self.registry.finished().into_iter(),
        }
    }
}
