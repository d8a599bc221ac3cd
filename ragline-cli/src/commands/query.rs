//! Query command handlers
//!
//! Submitting queries, polling a job once, and waiting for an answer.

use std::time::Duration;

use anyhow::{Context, Result};
use colored::*;
use ragline_client::{GatewayClient, ResultResponse};
use ragline_core::domain::job::{JobId, JobState};

use crate::config::Config;

/// Submit a query and print the assigned job id
pub async fn submit(config: &Config, query: &str) -> Result<()> {
    let client = GatewayClient::new(&config.gateway_url);

    let submitted = client
        .submit_query(query)
        .await
        .context("Failed to submit query")?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&submitted)?);
    } else {
        println!("{}", "Query submitted".green().bold());
        println!("  {}: {}", "Job ID".bold(), submitted.job_id);
        println!("  {}: {}", "Status".bold(), format_state(submitted.status));
    }

    Ok(())
}

/// Poll a job once
pub async fn result(config: &Config, job_id: &str) -> Result<()> {
    let client = GatewayClient::new(&config.gateway_url);
    let job_id = parse_job_id(job_id)?;

    let response = found(client.fetch_result(&job_id).await)?;
    print_result(config, &response)
}

/// Turns a missing job into a command failure with a readable message
fn found(outcome: ragline_client::Result<ResultResponse>) -> Result<ResultResponse> {
    match outcome {
        Err(e) if e.is_not_found() => {
            anyhow::bail!("Job not found (unknown id, or its result was already retrieved)")
        }
        other => other.context("Failed to fetch result"),
    }
}

/// Submit a query and poll until it is answered
pub async fn ask(config: &Config, query: &str, interval_ms: u64, timeout_secs: u64) -> Result<()> {
    let client = GatewayClient::new(&config.gateway_url);

    let submitted = client
        .submit_query(query)
        .await
        .context("Failed to submit query")?;

    if !config.json {
        println!(
            "{} {}",
            "Waiting for job".dimmed(),
            submitted.job_id.to_string().dimmed()
        );
    }

    let response = client
        .wait_for_result(
            &submitted.job_id,
            Duration::from_millis(interval_ms),
            Duration::from_secs(timeout_secs),
        )
        .await
        .context("No answer received")?;

    print_result(config, &response)
}

fn parse_job_id(raw: &str) -> Result<JobId> {
    raw.parse()
        .with_context(|| format!("Invalid job id '{}'", raw))
}

fn print_result(config: &Config, response: &ResultResponse) -> Result<()> {
    if config.json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("  {}: {}", "Job ID".bold(), response.job_id);
    println!("  {}: {}", "Status".bold(), format_state(response.status));

    match (&response.status, &response.result) {
        (JobState::Completed, Some(answer)) => {
            println!();
            println!("{}", answer);
        }
        (JobState::Failed, _) => {
            println!("{}", "The job could not be processed.".red());
        }
        _ => {}
    }

    Ok(())
}

fn format_state(state: JobState) -> ColoredString {
    match state {
        JobState::Queued => "queued".cyan(),
        JobState::Pending => "pending".yellow(),
        JobState::Completed => "completed".green(),
        JobState::Failed => "failed".red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_client::ClientError;

    #[test]
    fn test_missing_job_fails_the_command() {
        let id = JobId::new();

        let err = found(Err(ClientError::NotFound(id.to_string()))).unwrap_err();
        assert!(err.to_string().contains("Job not found"));

        let err = found(Err(ClientError::api_error(503, "Job queue unavailable"))).unwrap_err();
        assert!(err.to_string().contains("Failed to fetch result"));

        let response = found(Ok(ResultResponse::pending(id))).unwrap();
        assert_eq!(response.status, JobState::Pending);
    }

    #[test]
    fn test_parse_job_id() {
        let id = JobId::new();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
        assert!(parse_job_id("nope").is_err());
    }
}
