//! Job dispatch.
//!
//! One [`TriggerEvent`] is produced per matched message. What happens to it
//! is up to the [`JobDispatcher`]: log it, or run a command.

use std::collections::BTreeMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;

use crate::{Error, Result};

/// Cause attached to events when none is configured.
pub const DEFAULT_CAUSE: &str = "An email matching the filter criteria was found.";

/// Environment variable carrying the cause for [`CommandDispatcher`].
pub const CAUSE_VARIABLE: &str = "MAILPOLL_CAUSE";

/// A request to run a job for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerEvent {
    /// Why the job runs.
    pub cause: String,
    /// Prefixed message properties.
    pub parameters: BTreeMap<String, String>,
}

impl TriggerEvent {
    /// Creates an event with [`DEFAULT_CAUSE`].
    #[must_use]
    pub fn new(parameters: BTreeMap<String, String>) -> Self {
        Self {
            cause: DEFAULT_CAUSE.to_string(),
            parameters,
        }
    }

    /// Replaces the cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = cause.into();
        self
    }
}

/// Receives trigger events.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Schedules the job. Returning does not mean the job has finished.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dispatch`] if the job could not be scheduled.
    async fn dispatch(&self, event: &TriggerEvent) -> Result<()>;
}

/// Writes each event as JSON to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

#[async_trait]
impl JobDispatcher for LogDispatcher {
    async fn dispatch(&self, event: &TriggerEvent) -> Result<()> {
        let json = serde_json::to_string(event).map_err(|e| Error::Dispatch(e.to_string()))?;
        tracing::info!(target: "mailpoll::dispatch", event = %json, "trigger");
        Ok(())
    }
}

/// Runs a shell command per event.
///
/// The parameters become environment variables, the cause goes in
/// [`CAUSE_VARIABLE`]. The command is started with `sh -c` and not awaited.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    command: String,
}

impl CommandDispatcher {
    /// Creates a dispatcher for `command`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Returns the command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    fn build(&self, event: &TriggerEvent) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c")
            .arg(&self.command)
            .envs(&event.parameters)
            .env(CAUSE_VARIABLE, &event.cause)
            .stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl JobDispatcher for CommandDispatcher {
    async fn dispatch(&self, event: &TriggerEvent) -> Result<()> {
        let child = self
            .build(event)
            .spawn()
            .map_err(|e| Error::Dispatch(format!("{}: {e}", self.command)))?;
        tracing::info!(
            target: "mailpoll::dispatch",
            pid = child.id(),
            command = %self.command,
            "job started"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn event() -> TriggerEvent {
        let mut params = BTreeMap::new();
        params.insert("pmt_subject".to_string(), "jenkins > deploy".to_string());
        params.insert("pmt_uid".to_string(), "42".to_string());
        TriggerEvent::new(params)
    }

    #[test]
    fn default_cause() {
        assert_eq!(event().cause, DEFAULT_CAUSE);
        assert_eq!(event().with_cause("custom").cause, "custom");
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["cause"], DEFAULT_CAUSE);
        assert_eq!(json["parameters"]["pmt_uid"], "42");
    }

    #[tokio::test]
    async fn log_dispatcher_accepts_events() {
        LogDispatcher.dispatch(&event()).await.unwrap();
    }

    #[test]
    fn command_carries_parameters_as_environment() {
        let dispatcher = CommandDispatcher::new("echo $pmt_subject");
        let cmd = dispatcher.build(&event());
        let envs: BTreeMap<_, _> = cmd
            .as_std()
            .get_envs()
            .filter_map(|(k, v)| Some((k.to_str()?.to_string(), v?.to_str()?.to_string())))
            .collect();

        assert_eq!(envs["pmt_subject"], "jenkins > deploy");
        assert_eq!(envs[CAUSE_VARIABLE], DEFAULT_CAUSE);
        assert_eq!(cmd.as_std().get_program(), "sh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_dispatcher_spawns() {
        CommandDispatcher::new("true").dispatch(&event()).await.unwrap();
    }
}
