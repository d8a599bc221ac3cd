//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod query;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Submit a query and print its job id
    Submit {
        /// Query text
        query: String,
    },
    /// Poll a job once
    Result {
        /// Job ID returned by `submit`
        job_id: String,
    },
    /// Submit a query and wait for the answer
    Ask {
        /// Query text
        query: String,

        /// Pause between polls, in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
}

/// Handle a CLI command
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Submit { query } => query::submit(config, &query).await,
        Commands::Result { job_id } => query::result(config, &job_id).await,
        Commands::Ask {
            query,
            interval_ms,
            timeout_secs,
        } => query::ask(config, &query, interval_ms, timeout_secs).await,
    }
}
