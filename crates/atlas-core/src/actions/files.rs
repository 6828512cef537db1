//! Clipboard and filesystem actions.

use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::info;

use super::{Action, ActionArgs, ActionError, ActionSpec, ArgSpec};
use crate::capability::{find_program, run_program};

/// Copy program plus its arguments, first one installed wins.
const COPY_PROGRAMS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

const PASTE_PROGRAMS: &[(&str, &[&str])] = &[
    ("pbpaste", &[]),
    ("wl-paste", &["--no-newline"]),
    ("xclip", &["-selection", "clipboard", "-o"]),
    ("xsel", &["--clipboard", "--output"]),
];

fn clipboard_program(
    table: &'static [(&'static str, &'static [&'static str])],
) -> Option<(PathBuf, &'static [&'static str])> {
    table
        .iter()
        .find_map(|(name, args)| find_program(&[*name]).map(|p| (p, *args)))
}

// ── clipboard_set ──

static CLIPBOARD_SET: ActionSpec = ActionSpec {
    name: "clipboard_set",
    description: "Put text on the clipboard",
    args: &[ArgSpec::text("text")],
};

pub struct ClipboardSet;

#[derive(Deserialize)]
struct ClipboardSetArgs {
    text: String,
}

#[async_trait]
impl Action for ClipboardSet {
    fn spec(&self) -> &'static ActionSpec {
        &CLIPBOARD_SET
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: ClipboardSetArgs = args.parse()?;
        let Some((program, prog_args)) = clipboard_program(COPY_PROGRAMS) else {
            return Ok("clipboard not available".to_string());
        };

        let mut child = tokio::process::Command::new(&program)
            .args(prog_args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", program.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(args.text.as_bytes())
                .await
                .context("Failed to write to clipboard")?;
        }
        let status = child.wait().await.context("Clipboard program failed")?;
        if !status.success() {
            return Err(anyhow::anyhow!("{} exited with {}", program.display(), status).into());
        }
        Ok("copied".to_string())
    }
}

// ── clipboard_get ──

static CLIPBOARD_GET: ActionSpec = ActionSpec {
    name: "clipboard_get",
    description: "Read the clipboard text",
    args: &[],
};

pub struct ClipboardGet;

#[async_trait]
impl Action for ClipboardGet {
    fn spec(&self) -> &'static ActionSpec {
        &CLIPBOARD_GET
    }

    async fn run(&self, _args: ActionArgs) -> Result<String, ActionError> {
        let Some((program, prog_args)) = clipboard_program(PASTE_PROGRAMS) else {
            return Ok("clipboard not available".to_string());
        };
        let text = run_program(&program, prog_args).await?;
        if text.is_empty() {
            Ok("empty".to_string())
        } else {
            Ok(text)
        }
    }
}

// ── file_move ──

static FILE_MOVE: ActionSpec = ActionSpec {
    name: "file_move",
    description: "Move or rename a file or directory",
    args: &[ArgSpec::text("src"), ArgSpec::text("dst")],
};

pub struct FileMove;

#[derive(Deserialize)]
struct FileMoveArgs {
    src: String,
    dst: String,
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[async_trait]
impl Action for FileMove {
    fn spec(&self) -> &'static ActionSpec {
        &FILE_MOVE
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: FileMoveArgs = args.parse()?;
        let src = expand_home(args.src.trim());
        let dst = expand_home(args.dst.trim());

        if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::rename(&src, &dst)
            .await
            .with_context(|| format!("Failed to move {} to {}", src.display(), dst.display()))?;

        info!(src = %src.display(), dst = %dst.display(), "moved file");
        Ok(format!("moved to {}", dst.display()))
    }
}

// ── file_delete ──

static FILE_DELETE: ActionSpec = ActionSpec {
    name: "file_delete",
    description: "Delete a file or directory tree",
    args: &[ArgSpec::text("path")],
};

pub struct FileDelete;

#[derive(Deserialize)]
struct FileDeleteArgs {
    path: String,
}

#[async_trait]
impl Action for FileDelete {
    fn spec(&self) -> &'static ActionSpec {
        &FILE_DELETE
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: FileDeleteArgs = args.parse()?;
        let path = expand_home(args.path.trim());

        let meta = match tokio::fs::symlink_metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok("not found".to_string());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to inspect {}", path.display()))
                    .into())
            }
        };

        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        removed.with_context(|| format!("Failed to delete {}", path.display()))?;

        info!(path = %path.display(), "deleted");
        Ok("deleted".to_string())
    }
}
