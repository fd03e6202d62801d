//! crxpack - build, sign, and inspect CRX extension packages

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crxpack_cli::cmd;
use crxpack_cli::ui::Output;
use crxpack_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; -v only raises the fallback level
    let fallback = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = Output::new(cli.quiet);

    match cli.command {
        Commands::Pack(args) => cmd::pack::pack(args, &output).await,
        Commands::Unpack { file, output: dest } => {
            cmd::unpack::unpack(&file, dest.as_deref(), &output).await
        }
        Commands::Keygen {
            output: path,
            size,
            ecdsa,
            force,
        } => cmd::keygen::keygen(&path, size, ecdsa, force, &output).await,
        Commands::Id { path } => cmd::id::id(&path).await,
        Commands::Inspect { file, json } => cmd::inspect::inspect(&file, json).await,
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
