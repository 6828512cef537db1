//! Side-effect capabilities the core talks to: reply surfaces and the
//! notification provider. Every capability has an implementation that works
//! with nothing installed, so the core never checks for availability itself.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Where replies and action status lines go.
#[async_trait]
pub trait ReplySurface: Send + Sync {
    /// Deliver the assistant's reply (printed, spoken, ...).
    async fn deliver(&self, text: &str) -> Result<()>;

    /// Show an action status line. Surfaces that only speak ignore these.
    async fn report(&self, _line: &str) -> Result<()> {
        Ok(())
    }
}

/// Desktop/OS notification provider.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<()>;
}

// ── Reply surfaces ──

/// Prints to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSurface;

#[async_trait]
impl ReplySurface for ConsoleSurface {
    async fn deliver(&self, text: &str) -> Result<()> {
        println!("\nASSISTANT: {}", text);
        Ok(())
    }

    async fn report(&self, line: &str) -> Result<()> {
        println!("{}", line);
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

#[async_trait]
impl ReplySurface for NullSurface {
    async fn deliver(&self, _text: &str) -> Result<()> {
        Ok(())
    }
}

/// Text-to-speech through `say` (macOS) or `espeak`/`espeak-ng`/`spd-say`.
pub struct SpeechSurface {
    program: PathBuf,
}

impl SpeechSurface {
    /// `None` when no speech program is installed.
    pub fn detect() -> Option<Self> {
        find_program(&["say", "espeak-ng", "espeak", "spd-say"]).map(|program| Self { program })
    }
}

#[async_trait]
impl ReplySurface for SpeechSurface {
    async fn deliver(&self, text: &str) -> Result<()> {
        run_program(&self.program, &[text]).await.map(|_| ())
    }
}

/// Delivers to several surfaces; one failing surface does not stop the rest.
pub struct FanOut {
    surfaces: Vec<Arc<dyn ReplySurface>>,
}

impl FanOut {
    pub fn new(surfaces: Vec<Arc<dyn ReplySurface>>) -> Self {
        Self { surfaces }
    }
}

#[async_trait]
impl ReplySurface for FanOut {
    async fn deliver(&self, text: &str) -> Result<()> {
        for surface in &self.surfaces {
            if let Err(e) = surface.deliver(text).await {
                warn!("Reply surface failed: {:#}", e);
            }
        }
        Ok(())
    }

    async fn report(&self, line: &str) -> Result<()> {
        for surface in &self.surfaces {
            if let Err(e) = surface.report(line).await {
                warn!("Reply surface failed: {:#}", e);
            }
        }
        Ok(())
    }
}

// ── Notifiers ──

/// Prints `[NOTIFY] title: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        println!("\n[NOTIFY] {}: {}", title, message);
        Ok(())
    }
}

/// `notify-send` on Linux, `osascript` on macOS. Always echoes to the console too.
pub struct DesktopNotifier {
    program: PathBuf,
}

impl DesktopNotifier {
    pub fn detect() -> Option<Self> {
        let candidates: &[&str] = if cfg!(target_os = "macos") {
            &["osascript"]
        } else {
            &["notify-send"]
        };
        find_program(candidates).map(|program| Self { program })
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        ConsoleNotifier.notify(title, message).await?;
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification {:?} with title {:?}",
                message, title
            );
            run_program(&self.program, &["-e", script.as_str()]).await?;
        } else {
            run_program(&self.program, &[title, message]).await?;
        }
        Ok(())
    }
}

/// Pick the desktop notifier when wanted and installed, else the console.
pub fn default_notifier(desktop: bool) -> Arc<dyn Notifier> {
    if desktop {
        if let Some(n) = DesktopNotifier::detect() {
            return Arc::new(n);
        }
        debug!("No desktop notifier installed; using console");
    }
    Arc::new(ConsoleNotifier)
}

// ── External programs ──

/// First program from `candidates` found on PATH.
pub fn find_program(candidates: &[&str]) -> Option<PathBuf> {
    candidates.iter().find_map(|name| which::which(name).ok())
}

/// Run a program to completion; non-zero exit is an error carrying stderr.
pub async fn run_program(program: &std::path::Path, args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("Failed to run {}", program.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "{} exited with {}: {}",
            program.display(),
            output.status,
            stderr.trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Start a program without waiting for it (GUI launchers).
pub fn spawn_program(program: &std::path::Path, args: &[&str]) -> Result<()> {
    std::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to start {}", program.display()))?;
    Ok(())
}
