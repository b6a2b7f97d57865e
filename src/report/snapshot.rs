/*!
 * Registry Snapshot
 * Point-in-time JSON view of both tables
 */

use super::rows::ReportView;
use crate::core::types::{now, TableLayout, Timestamp};
use crate::registry::ProcessRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub taken_at: Timestamp,
    pub layout: TableLayout,
    pub active: Vec<ProcessRecord>,
    pub finished: Vec<ProcessRecord>,
}

impl RegistrySnapshot {
    pub fn capture(view: &ReportView<'_>) -> Self {
        let registry = view.registry();
        Self {
            taken_at: now(),
            layout: registry.layout(),
            active: registry.active(),
            finished: registry.finished(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
