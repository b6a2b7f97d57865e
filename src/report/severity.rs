/*!
 * Leak Severity
 * Presentation tiers for leak percentages
 */

use crate::core::limits::{CRITICAL_LEAK_PERCENT, WARNING_LEAK_PERCENT};
use serde::{Deserialize, Serialize};

pub const RESET_COLOR: &str = "\x1b[0m";
pub const GREEN_COLOR: &str = "\x1b[32m";
pub const YELLOW_COLOR: &str = "\x1b[33m";
pub const RED_COLOR: &str = "\x1b[31m";

/// Leak severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakSeverity {
    Nominal,
    Warning,
    Critical,
}

impl LeakSeverity {
    /// ANSI color used when printing a value of this severity
    pub fn color(&self) -> &'static str {
        match self {
            LeakSeverity::Nominal => GREEN_COLOR,
            LeakSeverity::Warning => YELLOW_COLOR,
            LeakSeverity::Critical => RED_COLOR,
        }
    }

    /// Wrap `text` in this severity's color
    pub fn paint(&self, text: &str) -> String {
        format!("{}{}{}", self.color(), text, RESET_COLOR)
    }
}

impl std::fmt::Display for LeakSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LeakSeverity::Nominal => write!(f, "NOMINAL"),
            LeakSeverity::Warning => write!(f, "WARNING"),
            LeakSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Map a leak percentage to its severity: above 50 critical, above 10 warning
pub fn colorize(leak_percent: f64) -> LeakSeverity {
    if leak_percent > CRITICAL_LEAK_PERCENT {
        LeakSeverity::Critical
    } else if leak_percent > WARNING_LEAK_PERCENT {
        LeakSeverity::Warning
    } else {
        LeakSeverity::Nominal
    }
}
