//! Ragline CLI
//!
//! Command-line interface for submitting queries to the Ragline gateway.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "ragline")]
#[command(about = "Ragline query CLI", long_about = None)]
struct Cli {
    /// Gateway URL
    #[arg(long, env = "RAGLINE_GATEWAY_URL", default_value = "http://localhost:8000")]
    gateway_url: String,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        gateway_url: cli.gateway_url,
        json: cli.json,
    };

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from(["ragline", "submit", "What is Node.js?"]).unwrap();
        assert!(!cli.json);
        assert!(matches!(cli.command, Commands::Submit { query } if query == "What is Node.js?"));
    }

    #[test]
    fn test_parse_ask_with_options() {
        let cli = Cli::try_parse_from([
            "ragline",
            "--gateway-url",
            "http://gateway:8000",
            "ask",
            "Explain event loop",
            "--interval-ms",
            "250",
            "--timeout-secs",
            "10",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.gateway_url, "http://gateway:8000");
        assert!(cli.json);
        match cli.command {
            Commands::Ask {
                query,
                interval_ms,
                timeout_secs,
            } => {
                assert_eq!(query, "Explain event loop");
                assert_eq!(interval_ms, 250);
                assert_eq!(timeout_secs, 10);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_result_requires_job_id() {
        assert!(Cli::try_parse_from(["ragline", "result"]).is_err());
    }
}
