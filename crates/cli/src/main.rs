// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lattice: run sub-commands and service entry points.

mod agent;
mod catalog;
mod commands;
mod config;
mod context;
mod dagfile;
mod exit;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "lattice", version, about = "Distributed DAG workflow engine")]
struct Cli {
    /// Configuration file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Suppress informational output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a workflow (or enqueue it when the queue is at capacity).
    Start(commands::start::StartArgs),
    /// Add a run to the workflow's queue.
    Enqueue(commands::enqueue::EnqueueArgs),
    /// Remove a queued run.
    Dequeue(commands::dequeue::DequeueArgs),
    /// Stop the running instance and start a fresh run.
    Restart(commands::restart::RestartArgs),
    /// Re-execute an existing run as a new attempt.
    Retry(commands::retry::RetryArgs),
    /// Deliver graceful cancellation to a running instance.
    Stop(commands::stop::StopArgs),
    /// Print the current status of a workflow as JSON.
    Status(commands::status::StatusArgs),
    /// Serve the coordinator gRPC broker.
    Coordinator(commands::coordinator::CoordinatorArgs),
    /// Run a worker: poll coordinators and execute tasks.
    Worker(commands::worker::WorkerArgs),
    /// Run the queue and cron schedulers.
    Scheduler(commands::scheduler::SchedulerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.quiet { "warn" } else { "info" };
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_writer(writer)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(cli));
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit::code_for(&e)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = context::Context::resolve(cli.config.clone(), cli.quiet)?;
    match cli.command {
        Command::Start(args) => commands::start::run(&ctx, args).await,
        Command::Enqueue(args) => commands::enqueue::run(&ctx, args).await,
        Command::Dequeue(args) => commands::dequeue::run(&ctx, args).await,
        Command::Restart(args) => commands::restart::run(&ctx, args).await,
        Command::Retry(args) => commands::retry::run(&ctx, args).await,
        Command::Stop(args) => commands::stop::run(&ctx, args).await,
        Command::Status(args) => commands::status::run(&ctx, args).await,
        Command::Coordinator(args) => commands::coordinator::run(&ctx, args).await,
        Command::Worker(args) => commands::worker::run(&ctx, args).await,
        Command::Scheduler(args) => commands::scheduler::run(&ctx, args).await,
    }
}
