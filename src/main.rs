/*!
 * memtrack monitor
 *
 * Separate process over the shared allocation registry:
 * - dashboard: interactive single-key tables (default)
 * - watch: periodic poll that retires balanced processes and alerts on leaks
 * - json: one snapshot of both tables
 */

use memtrack::lifecycle;
use memtrack::monitoring::Watcher;
use memtrack::report::table::CLEAR_SCREEN;
use memtrack::report::{
    active_table, finished_table, Dashboard, RegistrySnapshot, ReportView, ScriptedKeys,
    TerminalKeys,
};
use memtrack::{init_tracing, Registry, TrackerConfig, TrackerError};
use miette::{IntoDiagnostic, Result};
use std::io::{IsTerminal, Read, Write};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Dashboard,
    Watch,
    Json,
}

impl std::str::FromStr for Mode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Mode::Dashboard),
            "watch" => Ok(Mode::Watch),
            "json" => Ok(Mode::Json),
            other => Err(TrackerError::InvalidConfig(format!(
                "unknown mode '{}', expected dashboard, watch or json",
                other
            ))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = TrackerConfig::from_env()?;
    init_tracing(&config);

    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<Mode>()?,
        None => Mode::Dashboard,
    };

    let registry = lifecycle::initialize(&config)?;
    info!(
        mode = ?mode,
        segment = %config.shm_name,
        layout = %registry.layout(),
        "Monitor attached"
    );

    let result = match mode {
        Mode::Dashboard => dashboard(Arc::clone(&registry)).await,
        Mode::Watch => watch(Arc::clone(&registry), &config).await,
        Mode::Json => json(&registry),
    };

    drop(registry);
    lifecycle::teardown();
    info!("Monitor detached");
    result
}

async fn dashboard(registry: Arc<Registry>) -> Result<()> {
    let color = std::io::stdout().is_terminal();
    tokio::task::spawn_blocking(move || {
        let view = ReportView::new(&registry);
        let out = std::io::stdout().lock();
        if std::io::stdin().is_terminal() {
            Dashboard::new(view, TerminalKeys, out)
                .with_color(color)
                .run()
                .map(|_| ())
        } else {
            let keys = std::io::stdin().lock().bytes().map_while(|byte| byte.ok());
            Dashboard::new(view, ScriptedKeys(keys), out)
                .with_color(color)
                .run()
                .map(|_| ())
        }
    })
    .await
    .into_diagnostic()??;
    Ok(())
}

async fn watch(registry: Arc<Registry>, config: &TrackerConfig) -> Result<()> {
    let color = std::io::stdout().is_terminal();
    let mut watcher = Watcher::new(Arc::clone(&registry), config.auto_finish_balanced);
    let mut interval = tokio::time::interval(config.poll_interval);
    let view = ReportView::new(&registry);

    info!(interval_ms = config.poll_interval.as_millis() as u64, "Watching registry");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let summary = watcher.tick();
                let mut out = std::io::stdout().lock();
                write!(
                    out,
                    "{}{}\n{}",
                    CLEAR_SCREEN,
                    active_table(view.render_active(), color),
                    finished_table(view.render_finished(), color)
                )
                .into_diagnostic()?;
                writeln!(
                    out,
                    "\n{} active, {} finished, {} retired this poll",
                    summary.active,
                    summary.finished,
                    summary.retired.len()
                )
                .into_diagnostic()?;
                out.flush().into_diagnostic()?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, stopping monitor");
                break;
            }
        }
    }
    Ok(())
}

fn json(registry: &Registry) -> Result<()> {
    let snapshot = RegistrySnapshot::capture(&ReportView::new(registry));
    println!("{}", snapshot.to_json_pretty().into_diagnostic()?);
    Ok(())
}
