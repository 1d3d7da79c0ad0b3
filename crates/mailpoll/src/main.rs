//! `mailpoll` - trigger jobs from a mailbox.
//!
//! Reads a `key=value` script, searches the mailbox it names and hands every
//! matching message to a job: logged, or run as a shell command.

#![forbid(unsafe_code)]

mod cli;

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mailpoll_core::{
    CommandDispatcher, CycleReport, ImapConnector, JobDispatcher, LogDispatcher, PollCycle,
    TracingSink,
};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Command, LiveArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpoll=info,mailpoll_core=info,mailpoll_imap=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let connector = ImapConnector::new();
    let sink = TracingSink;
    let mut cycle = PollCycle::new(&connector, &sink).with_prefix(&cli.prefix);
    if let Some(cause) = &cli.cause {
        cycle = cycle.with_cause(cause);
    }

    match cli.command {
        Command::TestConnection(args) => {
            let script = read_script(args.script.as_deref())?;
            let validation = cycle.test_connection(&script).await;
            println!("{}", validation.message);
            Ok(if validation.is_ok() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Poll(live) => {
            let script = read_script(live.script.script.as_deref())?;
            let dispatcher = dispatcher(&live);
            let report = cycle.poll(&script, dispatcher.as_ref()).await;
            log_report(&report);
            Ok(if report.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Watch { live, interval } => {
            let script = read_script(live.script.script.as_deref())?;
            let dispatcher = dispatcher(&live);
            watch(&cycle, &script, dispatcher.as_ref(), Duration::from_secs(interval)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_script(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display())),
        _ => {
            let mut script = String::new();
            std::io::stdin()
                .read_to_string(&mut script)
                .context("Failed to read script from stdin")?;
            Ok(script)
        }
    }
}

fn dispatcher(live: &LiveArgs) -> Box<dyn JobDispatcher> {
    match &live.exec {
        Some(command) => Box::new(CommandDispatcher::new(command)),
        None => Box::new(LogDispatcher),
    }
}

fn log_report(report: &CycleReport) {
    if report.success {
        info!(
            matches = report.matches,
            dispatched = report.dispatched,
            marked = report.marked,
            "poll finished"
        );
    } else {
        tracing::error!(dispatched = report.dispatched, "poll failed");
    }
}

/// Runs a cycle per tick until Ctrl-C. Cycles never overlap.
async fn watch(
    cycle: &PollCycle<'_>,
    script: &str,
    dispatcher: &dyn JobDispatcher,
    every: Duration,
) -> Result<()> {
    info!(interval_secs = every.as_secs(), "watching mailbox");

    let mut ticks = interval(every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let report = cycle.poll(script, dispatcher).await;
                log_report(&report);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("interrupted, stopping");
                return Ok(());
            }
        }
    }
}
