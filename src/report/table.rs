/*!
 * Table Printer
 * Fixed-width text tables for the active and finished process lists
 */

use super::rows::ReportRow;
use super::severity::{RESET_COLOR, YELLOW_COLOR};
use std::fmt::Write;

const ACTIVE_HEADERS: [&str; 7] = [
    "PID",
    "Process Name",
    "Allocated",
    "Deallocated",
    "Memory Leak",
    "Leak %",
    "Start Time",
];
const FINISHED_HEADERS: [&str; 8] = [
    "PID",
    "Process Name",
    "Allocated",
    "Deallocated",
    "Memory Leak",
    "Leak %",
    "Start Time",
    "End Time",
];
const WIDTHS: [usize; 8] = [8, 20, 16, 16, 16, 8, 20, 20];

/// Index of the leak columns, painted by severity
const LEAK_COLUMNS: [usize; 2] = [4, 5];

/// Clear screen and home the cursor
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub fn active_table(rows: impl Iterator<Item = ReportRow>, color: bool) -> String {
    render("Active Processes:", &ACTIVE_HEADERS, rows, color)
}

pub fn finished_table(rows: impl Iterator<Item = ReportRow>, color: bool) -> String {
    render("Finished Processes:", &FINISHED_HEADERS, rows, color)
}

fn render(
    title: &str,
    headers: &[&str],
    rows: impl Iterator<Item = ReportRow>,
    color: bool,
) -> String {
    let mut out = String::new();
    if color {
        let _ = writeln!(out, "{}{}{}", YELLOW_COLOR, title, RESET_COLOR);
    } else {
        let _ = writeln!(out, "{}", title);
    }

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let header = line(&header_cells, None);
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", "-".repeat(header.len()));

    let mut count = 0;
    for row in rows {
        let paint = color.then_some(row.severity);
        let _ = writeln!(out, "{}", line(&row.cells(), paint));
        count += 1;
    }
    if count == 0 {
        let _ = writeln!(out, "(none)");
    }
    out
}

fn line(cells: &[String], paint: Option<super::severity::LeakSeverity>) -> String {
    let mut out = String::new();
    for (index, cell) in cells.iter().enumerate() {
        let width = WIDTHS.get(index).copied().unwrap_or(0);
        let padded = format!("{:<width$}", truncate(cell, width), width = width);
        match paint {
            Some(severity) if LEAK_COLUMNS.contains(&index) => out.push_str(&severity.paint(&padded)),
            _ => out.push_str(&padded),
        }
        if index + 1 < cells.len() {
            out.push(' ');
        }
    }
    out.trim_end().to_string()
}

/// Cut to `width` chars so long names keep the columns aligned
fn truncate(cell: &str, width: usize) -> &str {
    if width == 0 {
        return cell;
    }
    match cell.char_indices().nth(width) {
        Some((end, _)) => &cell[..end],
        None => cell,
    }
}
