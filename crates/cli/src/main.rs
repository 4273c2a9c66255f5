// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `corectl`: the admin CLI for `core-runtimed`, talking to its two
//! HTTP surfaces (§6.1) — Plugin Manager and Goal Scheduler.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::DaemonClient;
use commands::{container, goal, plugin};
use output::OutputFormat;

const DEFAULT_PLUGIN_MANAGER_ADDR: &str = "http://127.0.0.1:8081";
const DEFAULT_GOAL_SCHEDULER_ADDR: &str = "http://127.0.0.1:8082";

#[derive(Parser)]
#[command(name = "corectl", about = "Admin CLI for the core event-driven runtime")]
struct Cli {
    /// Plugin Manager admin surface base URL
    #[arg(long, env = "CORE_PLUGIN_MANAGER_URL", default_value = DEFAULT_PLUGIN_MANAGER_ADDR)]
    plugin_manager_url: String,

    /// Goal Scheduler admin surface base URL
    #[arg(long, env = "CORE_GOAL_SCHEDULER_URL", default_value = DEFAULT_GOAL_SCHEDULER_ADDR)]
    goal_scheduler_url: String,

    /// Bearer token for both surfaces
    #[arg(long, env = "CORE_AUTH_TOKEN")]
    token: Option<String>,

    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plugin Manager operations
    Plugin(plugin::PluginArgs),
    /// Goal Scheduler operations
    Goal(goal::GoalArgs),
    /// Sandbox container operations
    Container(container::ContainerArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Plugin(args) => {
            let client = DaemonClient::new(cli.plugin_manager_url.clone(), cli.token.clone());
            plugin::handle(args, &client, cli.format).await
        }
        Command::Goal(args) => {
            let client = DaemonClient::new(cli.goal_scheduler_url.clone(), cli.token.clone());
            goal::handle(args, &client, cli.format).await
        }
        Command::Container(args) => {
            let client = DaemonClient::new(cli.plugin_manager_url.clone(), cli.token.clone());
            container::handle(args, &client, cli.format).await
        }
    };

    if let Err(error) = &result {
        if client::is_connection_refused(error) {
            anyhow::bail!("could not reach core-runtimed — is the daemon running?");
        }
    }
    result
}
