//! The poll cycle.
//!
//! ```text
//! validate ─→ connect ─→ select ─→ search ─→ dispatch + mark ─→ close
//!                          │
//!                          └─→ list folders ─→ close (error)
//! ```
//!
//! Every path that got a session ends with exactly one
//! [`MailboxSession::close`].

mod transcript;

use chrono::{DateTime, Utc};

use crate::config::{ConfigKey, Configuration, apply_defaults, missing_required};
use crate::criteria::Criteria;
use crate::dispatch::{DEFAULT_CAUSE, JobDispatcher, TriggerEvent};
use crate::log::{LogLevel, LogSink};
use crate::mailbox::{ConnectRequest, MailboxConnector, MailboxSession, extract_properties};
use crate::{Error, Result};

use transcript::Transcript;

/// Property prefix used unless [`PollCycle::with_prefix`] says otherwise.
pub const DEFAULT_PREFIX: &str = "pmt_";

/// Message returned for a blank script.
pub const NO_OP: &str = "no-op";

/// How matches are handled.
#[derive(Clone, Copy)]
pub enum Mode<'a> {
    /// Count matches; never dispatch or mark.
    DryRun,
    /// Dispatch each match, then mark it read.
    Live(&'a dyn JobDispatcher),
}

impl Mode<'_> {
    /// Returns true for [`Mode::DryRun`].
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        matches!(self, Self::DryRun)
    }
}

impl std::fmt::Debug for Mode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => f.write_str("DryRun"),
            Self::Live(_) => f.write_str("Live"),
        }
    }
}

/// Outcome kind of a connection test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// The cycle completed.
    Ok,
    /// The cycle failed.
    Error,
}

/// Result of a dry run: a kind plus the newline-joined transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Ok or error.
    pub kind: ValidationKind,
    /// Diagnostic text.
    pub message: String,
}

impl Validation {
    /// Creates an ok validation.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::Ok,
            message: message.into(),
        }
    }

    /// Creates an error validation.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::Error,
            message: message.into(),
        }
    }

    /// Returns true for [`ValidationKind::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.kind == ValidationKind::Ok
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// False if the cycle ended on a fatal error or folder recovery.
    pub success: bool,
    /// Diagnostic lines in order.
    pub diagnostics: Vec<String>,
    /// Number of messages the search returned.
    pub matches: usize,
    /// Number of events handed to the dispatcher.
    pub dispatched: usize,
    /// Number of messages marked read.
    pub marked: usize,
    /// `diagnostics` joined with newlines.
    pub message: String,
}

impl CycleReport {
    fn finished(success: bool, diagnostics: Vec<String>, tally: Tally) -> Self {
        let message = diagnostics.join("\n");
        Self {
            success,
            diagnostics,
            matches: tally.matches,
            dispatched: tally.dispatched,
            marked: tally.marked,
            message,
        }
    }

    /// Converts to the dry-run result.
    #[must_use]
    pub fn into_validation(self) -> Validation {
        if self.success {
            Validation::ok(self.message)
        } else {
            Validation::error(self.message)
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    matches: usize,
    dispatched: usize,
    marked: usize,
}

enum Flow {
    Scanned,
    FolderListed,
}

/// Runs poll cycles against one connector.
pub struct PollCycle<'a> {
    connector: &'a dyn MailboxConnector,
    sink: &'a dyn LogSink,
    prefix: String,
    cause: String,
}

impl std::fmt::Debug for PollCycle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCycle")
            .field("prefix", &self.prefix)
            .field("cause", &self.cause)
            .finish_non_exhaustive()
    }
}

impl<'a> PollCycle<'a> {
    /// Creates a cycle runner with the default prefix and cause.
    #[must_use]
    pub fn new(connector: &'a dyn MailboxConnector, sink: &'a dyn LogSink) -> Self {
        Self {
            connector,
            sink,
            prefix: DEFAULT_PREFIX.to_string(),
            cause: DEFAULT_CAUSE.to_string(),
        }
    }

    /// Sets the property prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the cause attached to trigger events.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = cause.into();
        self
    }

    /// Runs a dry cycle and reports whether the mailbox is usable.
    pub async fn test_connection(&self, script: &str) -> Validation {
        self.run(script, Mode::DryRun).await.into_validation()
    }

    /// Runs a live cycle.
    pub async fn poll(&self, script: &str, dispatcher: &dyn JobDispatcher) -> CycleReport {
        self.run(script, Mode::Live(dispatcher)).await
    }

    /// Runs a cycle in `mode` against the current time.
    pub async fn run(&self, script: &str, mode: Mode<'_>) -> CycleReport {
        self.run_at(script, mode, Utc::now()).await
    }

    /// Runs a cycle with `now` as the reference for `receivedXMinutesAgo`.
    pub async fn run_at(&self, script: &str, mode: Mode<'_>, now: DateTime<Utc>) -> CycleReport {
        let mut transcript = Transcript::new(self.sink);
        let mut tally = Tally::default();

        if script.trim().is_empty() {
            transcript.info(NO_OP);
            return CycleReport::finished(true, transcript.into_lines(), tally);
        }

        let (config, criteria) = match self.prepare(script, now, &transcript) {
            Ok(prepared) => prepared,
            Err(e) => return Self::failed(transcript, &e, tally),
        };

        transcript.info("Connecting to the mailbox...");
        let request = ConnectRequest::from_config(&config);
        let mut session = match self.connector.connect(&request).await {
            Ok(session) => session,
            Err(e) => return Self::failed(transcript, &e, tally),
        };

        let outcome = self
            .scan(
                session.as_mut(),
                &config,
                &criteria,
                mode,
                &mut transcript,
                &mut tally,
            )
            .await;
        session.close().await;

        match outcome {
            Ok(Flow::Scanned) => {
                tracing::info!(
                    matches = tally.matches,
                    dispatched = tally.dispatched,
                    marked = tally.marked,
                    dry_run = mode.is_dry_run(),
                    "cycle complete"
                );
                CycleReport::finished(true, transcript.into_lines(), tally)
            }
            Ok(Flow::FolderListed) => CycleReport::finished(false, transcript.into_lines(), tally),
            Err(e) => Self::failed(transcript, &e, tally),
        }
    }

    fn prepare(
        &self,
        script: &str,
        now: DateTime<Utc>,
        transcript: &Transcript<'_>,
    ) -> Result<(Configuration, Criteria)> {
        let mut config = Configuration::parse(script)?;
        apply_defaults(&mut config);

        let missing = missing_required(&config);
        if !missing.is_empty() {
            for key in &missing {
                transcript.log_only(LogLevel::Error, &key.required_message());
            }
            return Err(Error::MissingRequiredFields(missing));
        }

        let criteria = Criteria::build(&config, now)?;
        tracing::debug!(prefix = %self.prefix, "configuration resolved");
        Ok((config, criteria))
    }

    async fn scan(
        &self,
        session: &mut dyn MailboxSession,
        config: &Configuration,
        criteria: &Criteria,
        mode: Mode<'_>,
        transcript: &mut Transcript<'_>,
        tally: &mut Tally,
    ) -> Result<Flow> {
        transcript.info("Connected to mailbox. Searching for messages where:");
        for description in criteria.descriptions() {
            transcript.info(format!("- {description}"));
        }
        transcript.info("...");

        let selected = match config.value(ConfigKey::Folder) {
            Some(folder) => session.select_folder(folder).await,
            None => Err(Error::FolderNotFound(String::new())),
        };
        match selected {
            Ok(()) => {}
            Err(Error::FolderNotFound(folder)) => {
                tracing::info!(folder = %folder, "folder not found, listing folders");
                return Self::list_folders(session, transcript).await;
            }
            Err(e) => return Err(e),
        }

        transcript.info("Searching folder...");
        let messages = session.search(criteria).await?;
        tally.matches = messages.len();
        if mode.is_dry_run() {
            for message in &messages {
                transcript.info(format!(
                    "Matched uid {}: {}",
                    message.uid,
                    message.subject.as_deref().unwrap_or("(no subject)")
                ));
            }
        }
        transcript.info(format!("Found matching email(s) : {}.", messages.len()));

        let Mode::Live(dispatcher) = mode else {
            return Ok(Flow::Scanned);
        };

        for message in &messages {
            let event = TriggerEvent::new(extract_properties(message, &self.prefix))
                .with_cause(self.cause.clone());

            transcript.info("Changes found. Scheduling a build.");
            dispatcher.dispatch(&event).await?;
            tally.dispatched += 1;

            match session.mark_processed(message).await {
                Ok(()) => tally.marked += 1,
                Err(e) if !e.is_fatal() => transcript.warn(e.to_string()),
                Err(e) => return Err(e),
            }
        }

        Ok(Flow::Scanned)
    }

    async fn list_folders(
        session: &mut dyn MailboxSession,
        transcript: &mut Transcript<'_>,
    ) -> Result<Flow> {
        transcript.info("Please set the 'folder=XXX' parameter to one of the following values: ");
        let names = session.list_folder_names().await?;
        transcript.info(format!("Folders: [{}]", names.join(", ")));
        Ok(Flow::FolderListed)
    }

    fn failed(mut transcript: Transcript<'_>, error: &Error, tally: Tally) -> CycleReport {
        transcript.error(format!("Error : {error}"));
        CycleReport::finished(false, transcript.into_lines(), tally)
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

    #[test]
    fn validation_from_report() {
        let report = CycleReport {
            success: true,
            message: "done".to_string(),
            ..CycleReport::default()
        };
        assert_eq!(report.into_validation(), Validation::ok("done"));

        let report = CycleReport::default();
        assert_eq!(report.into_validation().kind, ValidationKind::Error);
    }

    #[test]
    fn report_message_joins_diagnostics() {
        let report = CycleReport::finished(
            true,
            vec!["a".to_string(), "b".to_string()],
            Tally::default(),
        );
        assert_eq!(report.message, "a\nb");
    }

    #[test]
    fn mode_debug_hides_dispatcher() {
        let dispatcher = crate::dispatch::LogDispatcher;
        assert_eq!(format!("{:?}", Mode::Live(&dispatcher)), "Live");
        assert!(Mode::DryRun.is_dry_run());
    }
}
