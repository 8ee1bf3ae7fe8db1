//! Headless clinic terminal.
//!
//! Follows the live queue and prints the board for its role. `call-next`
//! performs one call for a room and exits.

mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use clinic_queue_core::{
    CallOutcome, HttpBackend, RoomId, Terminal, TerminalConfig, TerminalRole, WsTransport,
};

/// How long `call-next` waits for the first snapshot.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "clinic-terminal", about = "Live clinic patient queue terminal")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "CLINIC_CONFIG")]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the file)
    #[arg(long, env = "CLINIC_API_URL")]
    api_url: Option<String>,

    /// Bearer token for REST calls
    #[arg(long, env = "CLINIC_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, value_enum)]
    role: Option<Role>,

    /// Study number or area name, for `--role study`
    #[arg(long)]
    study: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    FrontDesk,
    Study,
    Display,
}

#[derive(Subcommand)]
enum Command {
    /// Print the board on every change (default)
    Watch,
    /// Call the next waiting patient of a room and exit
    CallNext { room: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let role = config.role.clone();

    let backend = Arc::new(HttpBackend::new(&config)?);
    let transport = Arc::new(WsTransport::new(&config.api_base()?)?);
    let terminal = Terminal::start(config, backend, transport);

    let result = match cli.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(&terminal, &role).await,
        Command::CallNext { room } => call_next(&terminal, RoomId::parse(&room)).await,
    };

    terminal.shutdown().await;
    result
}

fn build_config(cli: &Cli) -> Result<TerminalConfig> {
    let mut config = match (&cli.config, &cli.api_url) {
        (Some(path), _) => TerminalConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(url)) => TerminalConfig::new(url.clone()),
        (None, None) => bail!("either --config or --api-url is required"),
    };

    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.api_token = Some(token.clone());
    }
    if let Some(role) = cli.role {
        config.role = match role {
            Role::FrontDesk => TerminalRole::FrontDesk,
            Role::Display => TerminalRole::Display,
            Role::Study => {
                let study = cli
                    .study
                    .as_deref()
                    .context("--role study needs --study")?;
                TerminalRole::Study {
                    study: RoomId::parse(study),
                }
            }
        };
    }

    // Validate early so a bad URL fails before anything is spawned
    config.api_base()?;
    Ok(config)
}

async fn watch(terminal: &Terminal, role: &TerminalRole) -> Result<()> {
    let mut board = terminal.board();
    let mut state = terminal.connection_state();
    let mut calls = terminal.announcements();

    loop {
        tokio::select! {
            changed = board.changed() => {
                changed?;
                let current = board.borrow_and_update().clone();
                println!("{}", render::board_summary(&current, role));
            }
            changed = state.changed() => {
                changed?;
                let current = *state.borrow_and_update();
                println!("{}", render::connection_line(current));
            }
            call = calls.recv() => match call {
                Ok(call) => println!("{}", render::announcement_line(&call)),
                Err(RecvError::Lagged(missed)) => tracing::warn!(missed, "Display fell behind on calls"),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

async fn call_next(terminal: &Terminal, room: RoomId) -> Result<()> {
    tokio::time::timeout(SYNC_TIMEOUT, terminal.wait_until_synced())
        .await
        .context("timed out waiting for the patient list and doctor roster")??;

    match terminal.sequencer().call_next(&room).await? {
        CallOutcome::Called { patient, doctor } => {
            println!("Called #{} {} ({})", patient.assigned_number, patient.full_name, doctor.name);
        }
        CallOutcome::CalledWithoutLabel { patient, doctor, error } => {
            println!(
                "Called #{} {} ({}), but the doctor label was not updated: {}",
                patient.assigned_number, patient.full_name, doctor.name, error
            );
        }
    }
    Ok(())
}
