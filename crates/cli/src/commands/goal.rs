// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `corectl goal` — Goal Scheduler admin surface commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use core_wire::{GoalDetailResponse, GoalListResponse, GoalRunRequest, GoalRunResponse};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct GoalArgs {
    #[command(subcommand)]
    pub command: GoalCommand,
}

#[derive(Subcommand)]
pub enum GoalCommand {
    /// List every loaded goal definition
    List,
    /// Show one goal's config plus its last 10 instances
    Show {
        id: String,
    },
    /// Start a new instance of a goal immediately
    Run {
        goal_id: String,
        /// Template params as a JSON object (default: `{}`)
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Re-scan the goals directory
    Reload,
    /// Pause a running or pending instance
    Pause {
        instance_id: String,
    },
    /// Resume a paused instance
    Resume {
        instance_id: String,
    },
}

pub async fn handle(args: GoalArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match args.command {
        GoalCommand::List => list(client, format).await,
        GoalCommand::Show { id } => show(client, format, &id).await,
        GoalCommand::Run { goal_id, params } => run(client, format, &goal_id, &params).await,
        GoalCommand::Reload => reload(client).await,
        GoalCommand::Pause { instance_id } => pause(client, &instance_id).await,
        GoalCommand::Resume { instance_id } => resume(client, &instance_id).await,
    }
}

async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let response: GoalListResponse = client.get("/goals").await?;
    format_or_json(format, &response, || {
        for goal in &response.goals {
            let schedule = goal.schedule.as_deref().unwrap_or("-");
            println!("{:<24} enabled={:<5} periodic={:<5} schedule={}", goal.id, goal.enabled, goal.is_periodic, schedule);
        }
        if response.goals.is_empty() {
            println!("No goals loaded");
        }
    })
}

async fn show(client: &DaemonClient, format: OutputFormat, id: &str) -> Result<()> {
    let response: GoalDetailResponse = client.get(&format!("/goals/{id}")).await?;
    format_or_json(format, &response, || {
        println!("{} ({})", response.config.name, response.config.id);
        if let Some(next_run) = response.next_run {
            println!("  next run: {next_run}");
        }
        for instance in &response.instances {
            println!(
                "  {} state={:?} step={} fail_count={}",
                instance.instance_id, instance.state, instance.current_step, instance.fail_count
            );
            if let Some(error) = &instance.last_error {
                println!("    last_error: {error}");
            }
        }
    })
}

async fn run(client: &DaemonClient, format: OutputFormat, goal_id: &str, params: &str) -> Result<()> {
    let params = serde_json::from_str(params)?;
    let body = GoalRunRequest { goal_id: goal_id.to_string(), params };
    let response: GoalRunResponse = client.post("/goals/run", &body).await?;
    format_or_json(format, &response, || println!("started instance {}", response.instance_id))
}

async fn reload(client: &DaemonClient) -> Result<()> {
    client.post_empty("/goals/reload").await?;
    println!("Goals reloaded");
    Ok(())
}

async fn pause(client: &DaemonClient, instance_id: &str) -> Result<()> {
    client.post_empty(&format!("/goals/{instance_id}/pause")).await?;
    println!("Instance {instance_id} paused");
    Ok(())
}

async fn resume(client: &DaemonClient, instance_id: &str) -> Result<()> {
    client.post_empty(&format!("/goals/{instance_id}/resume")).await?;
    println!("Instance {instance_id} resumed");
    Ok(())
}
