//! # mailpoll-core
//!
//! The poll cycle behind `mailpoll`: inspect a mailbox for messages that
//! match a filter, hand each one to a job dispatcher and mark it read.
//!
//! This crate provides:
//! - Script parsing with defaults and required-field validation
//! - Search criteria construction
//! - The [`MailboxConnector`]/[`MailboxSession`] seam and its IMAP implementation
//! - Per-message property extraction
//! - The [`PollCycle`] orchestrator with dry-run and live modes
//!
//! ```no_run
//! use mailpoll_core::{ImapConnector, LogDispatcher, PollCycle, TracingSink};
//!
//! # async fn run() {
//! let connector = ImapConnector::new();
//! let sink = TracingSink;
//! let cycle = PollCycle::new(&connector, &sink);
//!
//! let script = "host=imap.example.com\nusername=ci\npassword=secret";
//! let validation = cycle.test_connection(script).await;
//! println!("{}", validation.message);
//!
//! let report = cycle.poll(script, &LogDispatcher).await;
//! println!("dispatched {}", report.dispatched);
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod criteria;
pub mod cycle;
pub mod dispatch;
mod error;
pub mod headers;
pub mod log;
pub mod mailbox;

pub use config::{ConfigKey, Configuration, apply_defaults, missing_required};
pub use criteria::{Criteria, SearchPredicate};
pub use cycle::{CycleReport, Mode, PollCycle, Validation, ValidationKind};
pub use dispatch::{CommandDispatcher, DEFAULT_CAUSE, JobDispatcher, LogDispatcher, TriggerEvent};
pub use error::{Error, Result};
pub use log::{LogLevel, LogSink, MemorySink, TracingSink};
pub use mailbox::{
    ConnectRequest, ImapConnector, MailboxConnector, MailboxSession, Message, extract_properties,
};
