/*!
 * Interactive Dashboard
 * Single-key menu over the active and finished tables
 */

use super::rows::ReportView;
use super::table::{active_table, finished_table, CLEAR_SCREEN};
use crate::core::errors::TrackerError;
use crate::core::types::TrackerResult;
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::io::{Read, Write};
use tracing::debug;

pub const INVALID_CHOICE: &str = "Invalid choice. Try again.";
pub const EXITING: &str = "Exiting...";

/// Menu commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ShowActive,
    ShowFinished,
    Quit,
}

impl Command {
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            b'1' => Some(Command::ShowActive),
            b'2' => Some(Command::ShowFinished),
            b'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Source of single keypresses. `None` means input is closed.
pub trait KeySource {
    fn read_key(&mut self) -> TrackerResult<Option<u8>>;
}

/// Reads one byte from stdin with line buffering and echo disabled
#[derive(Debug, Default)]
pub struct TerminalKeys;

/// Restores the saved terminal mode on drop
struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    fn enter() -> TrackerResult<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin).map_err(TrackerError::Terminal)?;
        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw).map_err(TrackerError::Terminal)?;
        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let stdin = std::io::stdin();
        if let Err(e) = termios::tcsetattr(&stdin, SetArg::TCSANOW, &self.original) {
            debug!(error = %e, "Failed to restore terminal mode");
        }
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> TrackerResult<Option<u8>> {
        let _guard = RawModeGuard::enter()?;
        let mut byte = [0u8; 1];
        let read = std::io::stdin().lock().read(&mut byte)?;
        Ok((read == 1).then_some(byte[0]))
    }
}

/// Keys from a fixed sequence, used when stdin is not a terminal
#[derive(Debug, Clone)]
pub struct ScriptedKeys<I>(pub I);

impl<I: Iterator<Item = u8>> KeySource for ScriptedKeys<I> {
    fn read_key(&mut self) -> TrackerResult<Option<u8>> {
        Ok(self.0.next())
    }
}

pub struct Dashboard<'a, K, W> {
    view: ReportView<'a>,
    keys: K,
    out: W,
    color: bool,
}

impl<'a, K: KeySource, W: Write> Dashboard<'a, K, W> {
    pub fn new(view: ReportView<'a>, keys: K, out: W) -> Self {
        Self {
            view,
            keys,
            out,
            color: true,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Loop until `q` or end of input. Each screen shows the output of the
    /// previous command above the menu; tables are re-read on every key.
    pub fn run(mut self) -> TrackerResult<W> {
        let mut body = String::new();
        loop {
            write!(self.out, "{}{}", CLEAR_SCREEN, body)?;
            if !body.is_empty() && !body.ends_with('\n') {
                writeln!(self.out)?;
            }
            self.menu()?;
            self.out.flush()?;

            let Some(key) = self.keys.read_key()? else {
                writeln!(self.out, "{}", EXITING)?;
                break;
            };
            body = match Command::from_key(key) {
                Some(Command::ShowActive) => active_table(self.view.render_active(), self.color),
                Some(Command::ShowFinished) => {
                    finished_table(self.view.render_finished(), self.color)
                }
                Some(Command::Quit) => {
                    writeln!(self.out, "{}", EXITING)?;
                    break;
                }
                None => {
                    debug!(key, "Unrecognized dashboard key");
                    INVALID_CHOICE.to_string()
                }
            };
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn menu(&mut self) -> TrackerResult<()> {
        writeln!(self.out)?;
        writeln!(self.out, "Memory Monitor")?;
        writeln!(self.out, "1. Show active processes")?;
        writeln!(self.out, "2. Show finished processes")?;
        writeln!(self.out, "q. Quit")?;
        write!(self.out, "Enter your choice: ")?;
        Ok(())
    }
}
