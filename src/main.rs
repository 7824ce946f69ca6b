mod bridge;
mod cli;
mod config;
mod console;
mod delta;
mod dispatch;
mod model;
mod parse;
mod queue;
mod session;
mod shutdown;
mod sink;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Log to stderr; stdout is reserved for command output.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "serial_relay=debug"
    } else {
        "serial_relay=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
