//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Turn a fresh Ubuntu host into a remote desktop streaming server
#[derive(Parser)]
#[command(name = "deskcast", version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration file (default: $DESKCAST_CONFIG or ~/.deskcast/config.yaml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Execute the provisioning run.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or any stage fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            config,
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
            config,
        });
        commands::provision::run(&app).await
    }
}
