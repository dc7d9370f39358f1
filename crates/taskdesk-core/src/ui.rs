//! Capabilities the presentation layer hands to controllers: a sink for
//! transient notifications and a way to ask the user for confirmation.

use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warn,
    Error,
}

impl Severity {
    fn ansi_code(self) -> &'static str {
        match self {
            Severity::Success => "32",
            Severity::Info => "36",
            Severity::Warn => "33",
            Severity::Error => "31",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Success => "success",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, title: &str, message: &str);
}

pub trait Confirm {
    /// Blocks until the user answers. `Ok(false)` means declined.
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool>;
}

/// Writes notifications as single lines, e.g. `[Sucesso] Tarefa criada com
/// sucesso!`.
pub struct TerminalNotifier<W: Write + Send> {
    out: Mutex<W>,
    color: bool,
}

impl TerminalNotifier<io::Stderr> {
    pub fn stderr(color: bool) -> Self {
        Self::new(io::stderr(), color && io::stderr().is_terminal())
    }
}

impl<W: Write + Send> TerminalNotifier<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out: Mutex::new(out),
            color,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Notifier for TerminalNotifier<W> {
    fn notify(&self, severity: Severity, title: &str, message: &str) {
        info!(%severity, title, message, "notification");
        let tag = if self.color {
            format!("\x1b[{}m[{title}]\x1b[0m", severity.ansi_code())
        } else {
            format!("[{title}]")
        };

        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(out, "{tag} {message}") {
            debug!(error = %err, "failed writing notification");
        }
    }
}

/// Asks on `output` and reads one line from `input`. Only an explicit yes
/// (`y`, `yes`, `s`, `sim`) confirms.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        write!(self.output, "{prompt} [s/N] ")?;
        self.output.flush()?;

        let mut answer = String::new();
        let read = self
            .input
            .read_line(&mut answer)
            .context("failed reading confirmation")?;
        if read == 0 {
            return Err(anyhow!("input closed while waiting for confirmation"));
        }

        let accepted = matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes" | "s" | "sim"
        );
        debug!(accepted, "confirmation answered");
        Ok(accepted)
    }
}

/// Confirms everything, for `--yes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, prompt: &str) -> anyhow::Result<bool> {
        debug!(prompt, "confirmation assumed");
        Ok(true)
    }
}
