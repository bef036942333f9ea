//! CLI entry point for kitty-agenda.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kitty_agenda_app::{AgendaService, AppConfig, BackendKind, MemoryBackend, SupabaseBackend, SystemClock};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod render;
mod shell;

/// Hello Kitty themed to-do agenda.
#[derive(Parser, Debug)]
#[command(
    name = "kitty-agenda",
    version,
    about = "kitty-agenda: a kawaii to-do agenda backed by Supabase"
)]
struct Cli {
    /// Path to config.toml (defaults to <config dir>/kitty-agenda/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend to use, overriding config and environment.
    #[arg(long)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand, Debug, Default, PartialEq, Eq)]
enum Command {
    /// Start the interactive agenda (default).
    #[default]
    Shell,

    /// Print the resolved configuration with the anon key redacted.
    Config,
}

fn main() -> Result<()> {
    let Cli {
        config,
        backend,
        cmd,
    } = Cli::parse();

    install_tracing();

    let config = AppConfig::load(config.as_deref(), backend)?;
    match cmd.unwrap_or_default() {
        Command::Config => {
            print!("{}", config.to_redacted_toml()?);
            Ok(())
        }
        Command::Shell => run_shell(&config),
    }
}

fn run_shell(config: &AppConfig) -> Result<()> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?
        .block_on(serve(config))
}

async fn serve(config: &AppConfig) -> Result<()> {
    let clock = SystemClock::local();
    let ttl = config.notice_ttl();
    match config.backend.kind {
        BackendKind::Memory => {
            let backend = MemoryBackend::with_clock(clock);
            let service = AgendaService::new(backend.clone(), backend, clock).with_notice_ttl(ttl);
            shell::run(service).await
        }
        BackendKind::Supabase => {
            let url = config.backend.url.as_deref().context("backend.url is not set")?;
            let key = config
                .backend
                .anon_key
                .as_deref()
                .context("backend.anon_key is not set")?;
            let backend = SupabaseBackend::connect(url.trim(), key.trim())?;
            let service = AgendaService::new(backend.clone(), backend, clock).with_notice_ttl(ttl);
            shell::run(service).await
        }
    }
}

fn install_tracing() {
    // stderr keeps the shell output clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Filter from a `RUST_LOG` value; INFO when unset or unparsable.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}
