mod config_cmd;
mod doctor_cmd;
mod run_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use encore_config::{config_dir, config_file_path};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "encore: play a video's audio in your Discord voice channel")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.encore/config.yaml, or $ENCORE_CONFIG_DIR/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Connect to Discord and serve commands until interrupted (default)
    Run,
    /// Print the effective configuration with secrets masked
    Config,
    /// Check the token and the external tools
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli
        .config
        .unwrap_or_else(|| config_file_path(&config_dir()));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_cmd::run(&path).await,
        Commands::Config => config_cmd::run(&path).await,
        Commands::Doctor => doctor_cmd::run(&path).await,
    }
}
