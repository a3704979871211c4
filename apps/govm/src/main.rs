#![warn(clippy::pedantic)]

//! # govm
//!
//! Installs several Go toolchains side by side and keeps stable aliases for
//! them in `$GOBIN`.
//!
//! ## Subcommands
//!
//! - `install` - Install a release or the newest release of a line
//! - `update` - Move installed lines to their newest release
//! - `clean` - Remove superseded releases of a line
//! - `lock` / `unlock` - Protect a release from `clean`
//! - `remove` - Uninstall one release
//! - `list` - Show known lines and what is installed
//! - `fix` - Repair the `go.latest` and `go` aliases
//!
//! ## Examples
//!
//! ```bash
//! govm install go1.21     # newest go1.21.x, aliased as go1.21
//! govm install go1.20.4   # exact release
//! govm update             # every installed line
//! govm lock go1.20.4
//! govm clean go1.20
//! ```

mod commands;
mod errors;
mod toolchain;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use commands::{clean, fix, install, list, lock, remove, update};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Side-by-side Go toolchain manager.
#[derive(Parser)]
#[command(
    name = "govm",
    author,
    version,
    about = "Install and switch between Go toolchain versions",
    after_help = "\
FILES:
    ~/.config/govm/config.toml  Settings (created on first run)
    ~/sdk/<release>/            Installed toolchains
    $GOBIN/<release>            Aliases, plus go.latest and go

ENVIRONMENT VARIABLES:
    GOVM_CONFIG     Alternate config file
    GOBIN           Alias directory when bin_dir is not configured
    RUST_LOG        Log filter (default: govm=info)"
)]
pub struct Cli {
    /// Show debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the govm CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install a Go release.
    ///
    /// A line such as go1.21 installs its newest release; an exact release
    /// such as go1.21.3 installs exactly that.
    Install(install::InstallArgs),

    /// Update installed lines to their newest release.
    ///
    /// Without an argument, or with "all", every installed line is updated
    /// and its superseded releases are cleaned.
    Update(update::UpdateArgs),

    /// Remove every release of a line except the newest.
    ///
    /// Locked releases are kept.
    Clean(clean::CleanArgs),

    /// Protect an installed release from `clean`.
    Lock(lock::LockArgs),

    /// Remove the protection added by `lock`.
    Unlock(lock::LockArgs),

    /// Uninstall one release.
    #[command(visible_alias = "uninstall")]
    Remove(remove::RemoveArgs),

    /// List known lines and installed releases.
    List(list::ListArgs),

    /// Repair the go.latest and go aliases.
    Fix,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = tokio::select! {
        result = run(cli.command) => result,
        _ = tokio::signal::ctrl_c() => Err(anyhow!("interrupted")),
    };

    if let Err(e) = result {
        std::process::exit(handle_error(&e));
    }
}

/// Logs to stderr. `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: bool) {
    let default = if verbose { "govm=debug" } else { "govm=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Prints the error chain and returns the process exit code.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    1
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::Update(args) => update::execute(&args).await,
        Commands::Clean(args) => clean::execute(&args).await,
        Commands::Lock(args) => lock::execute(&args, toolchain::LockAction::Add),
        Commands::Unlock(args) => lock::execute(&args, toolchain::LockAction::Remove),
        Commands::Remove(args) => remove::execute(&args).await,
        Commands::List(args) => list::execute(&args).await,
        Commands::Fix => fix::execute().await,
    }
}
