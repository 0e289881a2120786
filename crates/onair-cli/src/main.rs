use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "onair", version, about = "Music-on-air status indicator")]
struct Cli {
    /// Path to the TOML config file [default: ~/.config/onair/config.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the indicator until killed
    Run,
    /// Refresh the schedule once and print the resulting state as JSON
    Check {
        /// Classify at this instant (YYYY-MM-DDThh:mm:ss.sssZ) instead of now
        #[arg(long)]
        at: Option<String>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Drive the output lines to a fixed pattern
    Lights {
        /// A display state (now, soon, later, never, config_error, ...),
        /// all_on, all_off or startup
        pattern: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("onair=info,onair_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = commands::config_path(cli.config).and_then(|path| match cli.command {
        Commands::Run => commands::run::run(&path),
        Commands::Check { at } => commands::check::run(&path, at.as_deref()),
        Commands::Config { action } => commands::config::run(&path, action),
        Commands::Lights { pattern } => commands::lights::run(&path, &pattern),
    });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
