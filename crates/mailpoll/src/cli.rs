//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Poll a mailbox and trigger a job for every matching message.
#[derive(Debug, Parser)]
#[command(name = "mailpoll", version, about)]
pub struct Cli {
    /// Prefix for the message properties handed to jobs.
    #[arg(long, global = true, default_value = "pmt_")]
    pub prefix: String,

    /// Cause attached to every trigger event.
    #[arg(long, global = true)]
    pub cause: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, search and report without dispatching or marking anything.
    TestConnection(ScriptArgs),
    /// Run one live cycle.
    Poll(LiveArgs),
    /// Run live cycles on a fixed interval until interrupted.
    Watch {
        #[command(flatten)]
        live: LiveArgs,
        /// Seconds between cycles.
        #[arg(long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },
}

#[derive(Debug, Args)]
pub struct ScriptArgs {
    /// Script file with one `key=value` per line. Reads stdin when absent or `-`.
    pub script: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct LiveArgs {
    #[command(flatten)]
    pub script: ScriptArgs,

    /// Shell command to run per match; properties arrive as environment variables.
    /// Without it, events are logged.
    #[arg(long)]
    pub exec: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_with_exec() {
        let cli = Cli::try_parse_from([
            "mailpoll",
            "watch",
            "poll.conf",
            "--exec",
            "make deploy",
            "--interval",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.prefix, "pmt_");
        match cli.command {
            Command::Watch { live, interval } => {
                assert_eq!(interval, 60);
                assert_eq!(live.exec.as_deref(), Some("make deploy"));
                assert_eq!(live.script.script, Some(PathBuf::from("poll.conf")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn script_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["mailpoll", "test-connection", "--prefix", "job_"]).unwrap();
        assert_eq!(cli.prefix, "job_");
        assert!(matches!(cli.command, Command::TestConnection(ScriptArgs { script: None })));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Cli::try_parse_from(["mailpoll", "watch", "--interval", "0"]).is_err());
    }
}
