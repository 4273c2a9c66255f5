// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `corectl plugin` — Plugin Manager admin surface commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use core_wire::{
    PluginDetailResponse, PluginExecuteRequest, PluginExecuteResponse, PluginListResponse,
    PluginPauseRequest,
};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommand,
}

#[derive(Subcommand)]
pub enum PluginCommand {
    /// List every discovered plugin and its breaker state
    List,
    /// Show one plugin's config and health detail
    Show {
        name: String,
    },
    /// Trigger one plugin directly, bypassing topic subscriptions
    Execute {
        name: String,
        /// Event payload as a JSON object (default: `{}`)
        #[arg(long, default_value = "{}")]
        data: String,
    },
    /// Clear a plugin's breaker back to ACTIVE
    Reset {
        name: String,
    },
    /// Pause a plugin for N minutes without counting it as a failure
    Pause {
        name: String,
        minutes: u64,
    },
}

pub async fn handle(args: PluginArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match args.command {
        PluginCommand::List => list(client, format).await,
        PluginCommand::Show { name } => show(client, format, &name).await,
        PluginCommand::Execute { name, data } => execute(client, format, &name, &data).await,
        PluginCommand::Reset { name } => reset(client, &name).await,
        PluginCommand::Pause { name, minutes } => pause(client, &name, minutes).await,
    }
}

async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let response: PluginListResponse = client.get("/plugins").await?;
    format_or_json(format, &response, || {
        for plugin in &response.plugins {
            println!(
                "{:<24} {:<10?} failures={:<4} executions={}",
                plugin.name, plugin.state, plugin.consecutive_failures, plugin.total_executions
            );
        }
        if response.plugins.is_empty() {
            println!("No plugins discovered");
        }
    })
}

async fn show(client: &DaemonClient, format: OutputFormat, name: &str) -> Result<()> {
    let response: PluginDetailResponse = client.get(&format!("/plugins/{name}")).await?;
    format_or_json(format, &response, || {
        println!("{} v{}", response.config.name, response.config.version);
        println!("  state:       {:?}", response.state);
        println!("  failures:    {} (total {})", response.consecutive_failures, response.total_failures);
        println!("  executions:  {}", response.total_executions);
        if let Some(until) = response.disabled_until {
            println!("  disabled until: {until}");
        }
        for reason in &response.recent_failure_reasons {
            println!("  - {reason}");
        }
    })
}

async fn execute(client: &DaemonClient, format: OutputFormat, name: &str, data: &str) -> Result<()> {
    let event_data = serde_json::from_str(data)?;
    let body = PluginExecuteRequest { plugin: name.to_string(), event_data };
    let response: PluginExecuteResponse = client.post(&format!("/plugins/{name}/execute"), &body).await?;
    format_or_json(format, &response, || {
        println!("success={} exit_code={} duration_ms={}", response.success, response.exit_code, response.duration_ms);
        if !response.stdout.is_empty() {
            println!("--- stdout ---\n{}", response.stdout);
        }
        if !response.stderr.is_empty() {
            println!("--- stderr ---\n{}", response.stderr);
        }
        if let Some(error) = &response.error {
            println!("error: {error}");
        }
    })
}

async fn reset(client: &DaemonClient, name: &str) -> Result<()> {
    client.post_empty(&format!("/plugins/{name}/reset")).await?;
    println!("Plugin {name} reset to ACTIVE");
    Ok(())
}

async fn pause(client: &DaemonClient, name: &str, minutes: u64) -> Result<()> {
    let body = PluginPauseRequest { minutes };
    client.post_no_response(&format!("/plugins/{name}/pause"), &body).await?;
    println!("Plugin {name} paused for {minutes}m");
    Ok(())
}
