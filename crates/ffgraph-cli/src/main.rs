//! ffgraph CLI - compile pipeline files into media processor commands.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ffgraph")]
#[command(author, version, about = "Filtergraph compiler CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a pipeline file and print the resulting command
    Compile(commands::compile::CompileArgs),

    /// List available operation kinds and their parameters
    Filters(commands::filters::FiltersArgs),
}

fn main() -> anyhow::Result<()> {
    // stdout carries the command; diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile(args) => commands::compile::run(args),
        Commands::Filters(args) => commands::filters::run(args),
    }
}
