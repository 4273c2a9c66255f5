// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `corectl container` — sandbox container administration, served off
//! the Plugin Manager surface (§6.1).

use anyhow::Result;
use clap::{Args, Subcommand};
use core_wire::{ContainerCleanupRequest, ContainerCleanupResponse, ContainerStatsResponse};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct ContainerArgs {
    #[command(subcommand)]
    pub command: ContainerCommand,
}

#[derive(Subcommand)]
pub enum ContainerCommand {
    /// Remove exited plugin containers
    Cleanup {
        /// Also remove containers still running
        #[arg(long)]
        force: bool,
    },
    /// Show current container counts by plugin
    Stats,
}

pub async fn handle(args: ContainerArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    match args.command {
        ContainerCommand::Cleanup { force } => cleanup(client, format, force).await,
        ContainerCommand::Stats => stats(client, format).await,
    }
}

async fn cleanup(client: &DaemonClient, format: OutputFormat, force: bool) -> Result<()> {
    let body = ContainerCleanupRequest { force };
    let response: ContainerCleanupResponse = client.post("/containers/cleanup", &body).await?;
    format_or_json(format, &response, || println!("removed {} container(s)", response.removed))
}

async fn stats(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let response: ContainerStatsResponse = client.get("/containers/stats").await?;
    format_or_json(format, &response, || {
        println!("total={} running={} exited={} oldest_age_seconds={}", response.total, response.running, response.exited, response.oldest_age_seconds);
        for (plugin, count) in &response.by_plugin {
            println!("  {plugin}: {count}");
        }
    })
}
