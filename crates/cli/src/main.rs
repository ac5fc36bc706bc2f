mod commands;
mod config;
mod dispatcher;

use clap::{Parser, Subcommand};
use commands::serve::ServeArgs;
use commands::version::VersionArgs;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tapbridge")]
#[command(about = "Tunnel an ethernet link over a single stream connection")]
#[command(version)]
struct Cli {
    /// Enable debug logging, including a decoded dump of every frame
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept peer connections and bridge frames to the link endpoint
    Serve(ServeArgs),

    /// Show version information
    Version(VersionArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => commands::serve::run(args, cli.debug).await,
        Commands::Version(args) => {
            commands::version::run(args);
            Ok(())
        }
    }
}
