//! pick - ask a running runpick service for a choice
//!
//! Reads one candidate per line from stdin and blocks until the user commits
//! or cancels.
//!
//! Exit status:
//! - 0: selected items printed, one per line
//! - 1: cancelled, nothing printed
//! - 2: no service, rejected request, or connection lost

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use runpick::config;
use runpick::logging::{self, LogOptions};
use runpick::session::Outcome;
use runpick::transport::BusClient;

const EXIT_CANCELLED: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "pick")]
#[command(about = "Pick lines from stdin with a running runpick service")]
#[command(version)]
struct Args {
    /// Prompt shown above the candidates
    #[arg(short, long, env = "RUNPICK_PROMPT")]
    prompt: Option<String>,

    /// Bus socket path (default: from the runpick config)
    #[arg(short, long, value_name = "PATH")]
    socket: Option<PathBuf>,

    /// Config file used to find the socket
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tag for this request; signals for other tags are ignored
    /// (default: pick-<pid>)
    #[arg(long, value_name = "ID")]
    request_id: Option<String>,
}

impl Args {
    fn request_id(&self) -> String {
        self.request_id
            .clone()
            .unwrap_or_else(|| format!("pick-{}", std::process::id()))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = logging::init(LogOptions::relay());

    match relay(&args) {
        Ok(Outcome::ItemSelected(items)) => match print_items(&items) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Failed to write selection");
                ExitCode::from(EXIT_ERROR)
            }
        },
        Ok(Outcome::Cancelled) => {
            info!("Prompt cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            logging::log_error("RELAY", &format!("{:#}", e), None);
            eprintln!("pick: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn relay(args: &Args) -> Result<Outcome> {
    let items = read_items(io::stdin().lock()).context("reading candidates from stdin")?;

    let socket = match &args.socket {
        Some(path) => path.clone(),
        None => match &args.config {
            Some(path) => config::load_config_from(path),
            None => config::load_config(),
        }
        .get_socket_path(),
    };

    let mut client = BusClient::connect(&socket)
        .with_context(|| format!("connecting to runpick at {}", socket.display()))?;
    client.show(items, args.prompt.clone(), Some(args.request_id()))?;
    Ok(client.wait_for_outcome()?)
}

/// One candidate per line; CRLF endings are stripped.
fn read_items<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    reader.lines().collect()
}

fn print_items(items: &[String]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for item in items {
        writeln!(out, "{}", item)?;
    }
    out.flush()
}
