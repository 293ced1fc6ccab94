//! socgen CLI: compose, build, load and flash SoCs for FPGA boards.

mod commands;
mod manifest;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use socgen_build::CancelToken;

use commands::build::BuildArgs;
use manifest::SocgenManifest;

const DEFAULT_LOG_FILTER: &str = "socgen=info,socgen_clock=info,socgen_soc=info,socgen_boards=info,socgen_build=info";

#[derive(Parser)]
#[command(name = "socgen", version, about = "SoC generator for FPGA boards")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a board SoC and build, load or flash it
    Build(BuildArgs),
    /// Inspect and author board descriptors
    Board {
        #[command(subcommand)]
        action: BoardAction,
    },
    /// Remove build output
    Clean {
        /// Only this board's output directory
        #[arg(long)]
        board: Option<String>,
    },
}

#[derive(Subcommand)]
enum BoardAction {
    /// List builtin and project boards
    List,
    /// Show a board descriptor
    Describe {
        /// Board name or path to a .board.toml
        name: String,
        /// Output format: text (default) or toml
        #[arg(long)]
        format: Option<String>,
        /// Also print the SoC composed with default options
        #[arg(long)]
        soc: bool,
    },
    /// Check a board descriptor for errors
    Validate {
        /// Board name or path to a .board.toml
        name: String,
    },
    /// Write a new .board.toml template
    Template {
        /// Name of the new board
        name: String,
    },
}

fn main() {
    Builder::from_env(Env::default().default_filter_or(DEFAULT_LOG_FILTER))
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel);
    if let Err(e) = run(cli, &cancel) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// First Ctrl-C cancels the running build so its lock is released; a
/// second one exits at once.
fn install_interrupt_handler(cancel: &CancelToken) {
    let cancel = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            process::exit(130);
        }
        eprintln!("interrupted: stopping build (press Ctrl-C again to force)");
        cancel.cancel();
    });
    if let Err(e) = installed {
        log::warn!("could not install Ctrl-C handler: {e}");
    }
}

fn run(cli: Cli, cancel: &CancelToken) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let (manifest, project_dir) = load_manifest(cwd)?;

    match cli.command {
        Commands::Build(args) => commands::build::run(&project_dir, &manifest, &args, cancel),
        Commands::Board { action } => match action {
            BoardAction::List => commands::board::list(&project_dir, &manifest),
            BoardAction::Describe { name, format, soc } => {
                commands::board::describe(&name, &project_dir, &manifest, format.as_deref(), soc)
            }
            BoardAction::Validate { name } => commands::board::validate(&name, &project_dir, &manifest),
            BoardAction::Template { name } => commands::board::template(&name, &project_dir, &manifest),
        },
        Commands::Clean { board } => commands::clean::run(&project_dir, &manifest, board.as_deref()),
    }
}

/// The project manifest and its directory, or defaults rooted at `cwd`.
fn load_manifest(cwd: PathBuf) -> anyhow::Result<(SocgenManifest, PathBuf)> {
    match SocgenManifest::find_and_load(&cwd)? {
        Some((manifest, dir)) => {
            log::debug!("using {}", dir.join(manifest::MANIFEST_FILE).display());
            Ok((manifest, dir))
        }
        None => Ok((SocgenManifest::default(), cwd)),
    }
}
