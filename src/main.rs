use clap::Parser;
use tracing_subscriber::EnvFilter;

use rover_tracks::runtime::{Cli, run};

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug to see every PWM write)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init(); // installs the subscriber globally

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("rover-tracks error: {}", e);
        std::process::exit(1);
    }
}
