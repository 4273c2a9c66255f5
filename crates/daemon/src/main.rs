// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `core-runtimed`: the daemon binary that wires the Event Bus, Circuit
//! Breaker, Sandbox Executor, Container Watchdog, Plugin Manager, and
//! Goal Scheduler together (§2) and exposes their two admin HTTP
//! surfaces (§4.9, §6.1).

mod config;
mod error;
mod http;
mod logging;

use error::DaemonError;

use std::sync::Arc;

use clap::Parser;
use core_adapters::{ContainerSandbox, ContainerWatchdog, Sandbox};
use core_domain::SystemClock;
use core_engine::goal_scheduler::BusStepExecutor;
use core_engine::{CircuitBreaker, EventBus, GoalScheduler, PluginManager};
use core_storage::{RedisBreakerStore, RedisGoalStore, RedisSubstrate, SnapshotStore};

#[derive(Parser, Debug)]
#[command(name = "core-runtimed", about = "Core event-driven runtime daemon")]
struct Cli {
    /// Path to a YAML config file. Defaults to `$CORE_CONFIG`, then compiled-in defaults.
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    let cli = Cli::parse();
    let config = config::load(cli.config)?;
    logging::init(&config.log_level, &config.log_format);

    tracing::info!(substrate_url = %config.substrate_url, "starting core-runtimed");

    let clock = Arc::new(SystemClock);

    let substrate = Arc::new(RedisSubstrate::connect(&config.substrate_url).await?);
    let snapshot_store = SnapshotStore::new(config.snapshot_root.clone());
    let bus = Arc::new(EventBus::new(substrate.clone(), snapshot_store, clock.clone(), config.bus.clone()));

    // `RedisSubstrate` keeps its `ConnectionManager` private, so the
    // breaker and goal stores open their own independent connection.
    let redis_client = redis::Client::open(config.substrate_url.clone())?;
    let conn = redis_client.get_connection_manager().await?;
    let breaker_store = Arc::new(RedisBreakerStore::new(conn.clone()));
    let goal_store = Arc::new(RedisGoalStore::new(conn));

    let breaker = Arc::new(CircuitBreaker::new(breaker_store, bus.clone(), clock.clone(), config.breaker.clone()));

    let sandbox: Arc<dyn Sandbox> = Arc::new(ContainerSandbox::new(config.sandbox.clone()));
    let watchdog = Arc::new(ContainerWatchdog::new(config.sandbox.runtime.clone(), 3600));

    let plugin_manager =
        Arc::new(PluginManager::new(breaker.clone(), sandbox, watchdog.clone(), config.plugin_manager.clone()));
    plugin_manager.start(&bus).await?;

    let step_executor = BusStepExecutor::new(bus.clone());
    step_executor.install();

    let goal_scheduler = Arc::new(GoalScheduler::new(
        goal_store,
        bus.clone(),
        step_executor,
        clock.clone(),
        config.goal_scheduler.clone(),
    ));
    goal_scheduler.start().await?;

    let mut consumer_handles = Vec::new();
    for topic in config.bus.streams.keys().cloned().collect::<Vec<_>>() {
        let bus = bus.clone();
        consumer_handles.push(tokio::spawn(async move { bus.run_consumer(&topic).await }));
    }

    let plugin_http = http::plugin_manager::router(
        http::plugin_manager::AppState { plugin_manager: plugin_manager.clone(), breaker: breaker.clone(), watchdog },
        config.auth_token.clone(),
    );
    let goal_http = http::goal_scheduler::router(
        http::goal_scheduler::AppState { scheduler: goal_scheduler.clone() },
        config.auth_token.clone(),
    );

    let plugin_listener = tokio::net::TcpListener::bind(&config.http_plugin_manager_addr).await?;
    let goal_listener = tokio::net::TcpListener::bind(&config.http_goal_scheduler_addr).await?;
    tracing::info!(addr = %config.http_plugin_manager_addr, "plugin manager admin surface listening");
    tracing::info!(addr = %config.http_goal_scheduler_addr, "goal scheduler admin surface listening");

    let plugin_server = tokio::spawn(async move { axum::serve(plugin_listener, plugin_http).await });
    let goal_server = tokio::spawn(async move { axum::serve(goal_listener, goal_http).await });

    let scheduler_loop = {
        let goal_scheduler = goal_scheduler.clone();
        tokio::spawn(async move { goal_scheduler.run().await })
    };

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sighup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received ctrl-c, shutting down");
                break;
            }
            _ = sighup.recv() => {
                tracing::info!("received SIGHUP, reloading plugins and goals");
                if let Err(error) = plugin_manager.reload(&bus) {
                    tracing::error!(%error, "plugin reload failed");
                }
                if let Err(error) = goal_scheduler.reload() {
                    tracing::error!(%error, "goal reload failed");
                }
            }
        }
    }

    plugin_manager.stop().await;
    goal_scheduler.shutdown().await;
    plugin_server.abort();
    goal_server.abort();
    scheduler_loop.abort();
    for handle in consumer_handles {
        handle.abort();
    }

    Ok(())
}
