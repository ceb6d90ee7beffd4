//! runpick - picker service for the terminal
//!
//! Claims the picker bus, takes over the terminal, and answers `show`
//! requests until Ctrl+C / Ctrl+D is pressed with no prompt open.
//!
//! ```bash
//! runpick &                          # host the picker
//! printf 'a\nb\nc\n' | pick          # ask it for a choice
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use runpick::config::{self, Config, SelectionMode};
use runpick::error::PickerError;
use runpick::logging::{self, LogOptions};
use runpick::service::PickerService;
use runpick::terminal::{self, TerminalSurface};
use runpick::transport::BusServer;

/// Command line arguments. Every flag overrides the config file.
#[derive(Parser, Debug)]
#[command(name = "runpick")]
#[command(about = "Incremental-search picker service")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/runpick/config.json)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Selection mode: single or multi
    #[arg(short, long, value_name = "MODE")]
    mode: Option<SelectionMode>,

    /// Shorthand for --mode multi
    #[arg(long, conflicts_with = "mode")]
    multi: bool,

    /// Bus socket path
    #[arg(short, long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Rows per page (default: terminal height)
    #[arg(long, value_name = "ROWS")]
    page_size: Option<usize>,

    /// Keep only the first N matches
    #[arg(long, value_name = "N")]
    max_results: Option<usize>,

    /// Query recompute delay; 0 filters on every keystroke
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Mirror logs to stderr (draws over the prompt)
    #[arg(long)]
    log_stderr: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if self.multi {
            config.selection_mode = SelectionMode::Multi;
        } else if let Some(mode) = self.mode {
            config.selection_mode = mode;
        }
        if let Some(socket) = &self.socket {
            config.socket_path = Some(socket.to_string_lossy().into_owned());
        }
        if self.page_size.is_some() {
            config.page_size = self.page_size;
        }
        if self.max_results.is_some() {
            config.max_results = self.max_results;
        }
        if let Some(ms) = self.debounce_ms {
            config.debounce_ms = ms;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = logging::init(LogOptions {
        stderr: args.log_stderr,
        ..LogOptions::service()
    });

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::log_error("STARTUP", &format!("{:#}", e), None);
            match e.downcast_ref::<PickerError>() {
                Some(picker_err) => {
                    eprintln!("runpick: {}", picker_err.user_message());
                    if picker_err.is_fatal() {
                        eprintln!("runpick: stop the other instance or pass --socket");
                    }
                }
                None => eprintln!("runpick: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    args.apply(&mut config);
    config.validate()?;

    let socket = config.get_socket_path();
    let server = BusServer::bind(&socket)?;

    let (tx, rx) = mpsc::channel();
    server.spawn(tx.clone()).context("starting bus listener")?;

    let surface = TerminalSurface::attach()?;
    let (_, rows) = terminal::size()?;
    terminal::spawn_input_thread(tx).context("starting terminal input")?;

    info!(socket = %socket.display(), "runpick ready");
    PickerService::new(&config, Some(rows), server.subscribers(), surface).run(rx);

    drop(server);
    Ok(())
}
