use clap::Parser;
use tracing_subscriber::EnvFilter;

use canopy_cli::Cli;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(err) = canopy_cli::run(cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
