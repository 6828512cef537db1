//! atlas — interactive terminal assistant.
//! Reads one utterance per line; reminders fire in the background.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Timelike;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tracing::{info, warn};

use atlas_core::assistant::Assistant;
use atlas_core::capability::ConsoleSurface;
use atlas_core::config::Config;
use atlas_core::dispatcher::Dispatcher;
use atlas_core::habits;
use atlas_core::input;

const PROMPT: &str = "you> ";

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("config.yaml")
        })
}

async fn prompt() -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(PROMPT.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

fn print_banner(config: &Config, assistant: &Assistant) {
    let planner = assistant.dispatcher.planner().describe();
    println!(
        "Atlas ready. Planner: {}. Speech: {}. Desktop notifications: {}.",
        planner,
        if assistant.speech_enabled() { "on" } else { "off" },
        if config.desktop_notifications { "on" } else { "off" },
    );
    println!("Type a request, or 'exit' to quit.");
}

fn print_suggestions(assistant: &Assistant) {
    let hour = assistant.ctx.clock.now().hour();
    match habits::suggest_for_hour(&assistant.ctx.store, hour, 3) {
        Ok(names) if !names.is_empty() => {
            println!("Suggestions for this hour: {}", names.join(", "));
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to read habits: {}", e),
    }
}

/// Prompt loop. Ends on EOF, an exit command, or `interrupt` resolving,
/// including while a request is in flight.
async fn run_session<R, I>(
    lines: &mut Lines<R>,
    dispatcher: &Dispatcher,
    interrupt: I,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    I: Future,
{
    tokio::pin!(interrupt);

    loop {
        prompt().await?;
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = &mut interrupt => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        let Some(text) = input::normalize(&line) else {
            continue;
        };
        if input::is_exit_command(text) {
            break;
        }
        // Reply and status lines are printed by the console surface
        tokio::select! {
            _ = dispatcher.handle(text) => {}
            _ = &mut interrupt => {
                println!();
                warn!("Interrupted while handling request");
                break;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they don't interleave with the prompt by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load_or_default(&config_path()).context("Failed to load config")?;
    let mut assistant = Assistant::start(&config, Arc::new(ConsoleSurface))?;

    print_banner(&config, &assistant);
    print_suggestions(&assistant);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    run_session(&mut lines, &assistant.dispatcher, tokio::signal::ctrl_c()).await?;

    info!("Shutting down");
    assistant.shutdown().await;
    println!("Bye.");
    Ok(())
}
