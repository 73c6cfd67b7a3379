//! Tracer CLI - terminal front end for the trace explorer.
//!
//! ```text
//! main() -> Connection::websocket(url) -> TerminalSession::new()
//!        -> run_session(connection, session, key commands, render)
//!                 |
//!                 v
//!        SessionEnd::Quit | Disconnected
//! ```
//!
//! Logs go to `~/.tracer/logs/tracer.log` so the terminal stays clean.

mod config;
mod input;
mod view;

use anyhow::{Context, Result, bail};
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::{
    env,
    fs::{self, OpenOptions},
    io::{Stdout, stdout},
    path::PathBuf,
    sync::Mutex,
};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::TracerConfig;
use input::KeyReader;
use tracer_client::{Connection, SessionEnd, run_session};

fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file: stay silent rather than scribble over the tree view.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.tracer/logs/tracer.log
    if let Some(config_path) = config::config_path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("tracer.log"));
    }

    // Fallback: ./.tracer/logs/tracer.log
    candidates.push(PathBuf::from(".tracer").join("logs").join("tracer.log"));

    candidates
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    url: Option<String>,
    help: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "--url" => {
                parsed.url = Some(args.next().context("--url needs a value")?);
            }
            other => match other.strip_prefix("--url=") {
                Some(url) => parsed.url = Some(url.to_string()),
                None => bail!("unexpected argument '{other}'"),
            },
        }
    }
    Ok(parsed)
}

/// Raw mode with a hidden cursor, restored on drop even after an early return.
struct TerminalSession {
    out: Stdout,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut out = stdout();
        if let Err(err) = execute!(out, Hide) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        Ok(Self { out })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.out, Show);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    if args.help {
        println!("usage: tracer [--url <ws://host:port/path>]");
        return Ok(());
    }

    let config = match TracerConfig::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Ignoring config: {e}");
            TracerConfig::default()
        }
    };
    init_tracing(&config.log_filter);

    let url = config.server_url(args.url.as_deref());
    let connection = Connection::websocket(&url)
        .await
        .with_context(|| format!("no trace backend at {url}"))?;
    let session = connection.session();

    let (command_tx, command_rx) = mpsc::channel(config.command_capacity());
    let end = {
        let mut terminal = TerminalSession::new()?;
        let mut keys = KeyReader::spawn(command_tx);
        let end = run_session(connection, session, command_rx, |session| {
            if let Err(e) = view::render(session, &mut terminal.out) {
                tracing::warn!("Render failed: {e}");
            }
        })
        .await;
        keys.shutdown().await;
        end
    };

    match end {
        SessionEnd::Quit => Ok(()),
        SessionEnd::Disconnected(reason) => {
            eprintln!("Trace backend connection {reason}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args> {
        parse_args(raw.iter().map(ToString::to_string))
    }

    #[test]
    fn url_flag_forms() {
        assert_eq!(
            args(&["--url", "ws://a:1/q"]).unwrap().url.as_deref(),
            Some("ws://a:1/q")
        );
        assert_eq!(
            args(&["--url=ws://b:2/q"]).unwrap().url.as_deref(),
            Some("ws://b:2/q")
        );
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(args(&["--url"]).is_err());
        assert!(args(&["--port", "3"]).is_err());
        assert!(args(&["--help"]).unwrap().help);
    }

    #[test]
    fn log_file_has_fallback() {
        let candidates = log_file_candidates();
        assert_eq!(
            candidates.last(),
            Some(&PathBuf::from(".tracer").join("logs").join("tracer.log"))
        );
    }
}
