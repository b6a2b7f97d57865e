/*!
 * memtrack demo
 *
 * Runs one sample workload through the tracking facade so a monitor attached
 * to the same segment has something to show.
 */

use memtrack::lifecycle;
use memtrack::report::{active_table, finished_table, Dashboard, ReportRow, ReportView, TerminalKeys};
use memtrack::{init_tracing, TrackerConfig, TrackerError, TrackingAllocator};
use miette::Result;
use std::io::{IsTerminal, Write};
use std::mem::size_of;
use std::time::Duration;
use tracing::info;

/// Sample workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Workload {
    /// Two arrays, completion recorded twice, then the dashboard
    Lifecycle,
    /// Grow an array in place and free it: balanced
    Resize,
    /// Forget one small block
    Partial,
    /// Free a fraction of two large blocks: critical leak
    Critical,
}

impl std::str::FromStr for Workload {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lifecycle" => Ok(Workload::Lifecycle),
            "resize" => Ok(Workload::Resize),
            "partial" => Ok(Workload::Partial),
            "critical" => Ok(Workload::Critical),
            other => Err(TrackerError::InvalidConfig(format!(
                "unknown workload '{}', expected lifecycle, resize, partial or critical",
                other
            ))),
        }
    }
}

fn main() -> Result<()> {
    let config = TrackerConfig::from_env()?;
    init_tracing(&config);

    let workload = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Workload>()?,
        None => Workload::Critical,
    };

    lifecycle::initialize(&config)?;
    let facade = TrackingAllocator::global();
    info!(workload = ?workload, pid = facade.caller_pid(), "Running demo workload");

    match workload {
        Workload::Lifecycle => run_lifecycle(&facade)?,
        Workload::Resize => {
            run_resize(&facade);
            print_memory_info(&facade);
        }
        Workload::Partial => {
            run_partial(&facade);
            print_memory_info(&facade);
        }
        Workload::Critical => {
            run_critical(&facade);
            print_memory_info(&facade);
        }
    }

    drop(facade);
    lifecycle::teardown();
    Ok(())
}

fn run_lifecycle(facade: &TrackingAllocator) -> Result<()> {
    let small = 5 * size_of::<i32>();
    let large = 10 * size_of::<i32>();

    let first = facade.allocate(small);
    std::thread::sleep(Duration::from_secs(1));
    let second = facade.allocate(large);
    if let Some(ptr) = first {
        // SAFETY: allocated above by this facade
        unsafe { facade.free(ptr.as_ptr(), small) };
    }
    facade.registry().mark_finished(facade.caller_pid());

    // Freed with the wrong size, leaving half of it unaccounted
    if let Some(ptr) = second {
        // SAFETY: allocated above by this facade
        unsafe { facade.free(ptr.as_ptr(), small) };
    }
    facade.registry().mark_finished(facade.caller_pid());

    let view = ReportView::new(facade.registry());
    let color = std::io::stdout().is_terminal();
    if std::io::stdin().is_terminal() {
        Dashboard::new(view, TerminalKeys, std::io::stdout().lock())
            .with_color(color)
            .run()?;
    } else {
        print!("{}", active_table(view.render_active(), color));
        print!("{}", finished_table(view.render_finished(), color));
    }
    Ok(())
}

fn run_resize(facade: &TrackingAllocator) {
    let len = 5;
    let Some(array) = facade.allocate(len * size_of::<i32>()) else {
        eprintln!("Memory allocation failed");
        return;
    };
    let values = array.cast::<i32>();
    for i in 0..len {
        // SAFETY: `array` holds `len` i32 slots
        unsafe { values.as_ptr().add(i).write(i as i32 + 1) };
    }

    // SAFETY: `array` is live and was allocated with this size
    let resized = unsafe {
        facade.reallocate(
            array.as_ptr(),
            len * size_of::<i32>(),
            (len + 1) * size_of::<i32>(),
        )
    };
    match resized {
        // SAFETY: returned by the resize above
        Some(ptr) => unsafe { facade.free(ptr.as_ptr(), (len + 1) * size_of::<i32>()) },
        // SAFETY: resize failed, original block is still valid
        None => unsafe { facade.free(array.as_ptr(), len * size_of::<i32>()) },
    }
}

fn run_partial(facade: &TrackingAllocator) {
    let first = facade.allocate(1024);
    let second = facade.allocate(512);
    if let Some(ptr) = first {
        // SAFETY: allocated above by this facade
        unsafe { facade.free(ptr.as_ptr(), 1024) };
    }
    // Never freed
    let _third = facade.allocate(256);
    if let Some(ptr) = second {
        // SAFETY: allocated above by this facade
        unsafe { facade.free(ptr.as_ptr(), 512) };
    }
}

fn run_critical(facade: &TrackingAllocator) {
    let first = facade.allocate(2000);
    let _second = facade.allocate(1500);
    if let Some(ptr) = first {
        // SAFETY: allocated above; only 500 of its 2000 bytes are reported freed
        unsafe { facade.free(ptr.as_ptr(), 500) };
    }
}

/// Print the calling process's current record
fn print_memory_info(facade: &TrackingAllocator) {
    let color = std::io::stdout().is_terminal();
    let record = facade.registry().find(facade.caller_pid());
    print!("{}", active_table(record.iter().map(ReportRow::from), color));
    if let Some(record) = record {
        let percent = format!("{:.1}%", record.leak_percent());
        let severity = memtrack::colorize(record.leak_percent());
        let shown = if color { severity.paint(&percent) } else { percent };
        println!("Leak: {} bytes ({}) {}", record.outstanding_bytes, shown, severity);
    }
    let _ = std::io::stdout().flush();
}
