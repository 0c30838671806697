//! deskcast - turn a fresh Ubuntu host into a remote desktop streaming server

use clap::Parser;
use tracing_subscriber::EnvFilter;

use deskcast_cli::cli::Cli;
use deskcast_cli::output::{OutputContext, json};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let as_json = cli.json;
    let output = OutputContext::new(cli.no_color, false);
    if let Err(e) = cli.run().await {
        if as_json {
            let (code, stage) = json::classify(&e);
            match json::format_error(&format!("{e:#}"), code, stage) {
                Ok(out) => println!("{out}"),
                Err(_) => eprintln!("Error: {e:#}"),
            }
        } else {
            output.error(&format!("Error: {e:#}"));
        }
        std::process::exit(1);
    }
}
