//! Poll cycle tests against a scripted mailbox.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use mailpoll_core::{
    ConnectRequest, Criteria, Error, JobDispatcher, LogLevel, MailboxConnector, MailboxSession,
    MemorySink, Message, Mode, PollCycle, Result, TriggerEvent, ValidationKind,
};

const SCRIPT: &str = "host=mail.x.com\nstoreName=imaps\nusername=u\npassword=p";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap()
}

fn message(uid: u32, subject: &str) -> Message {
    Message {
        uid,
        sequence: uid,
        subject: Some(subject.to_string()),
        from: vec!["Jenkins <ci@example.com>".to_string()],
        received: Some(now().fixed_offset() - chrono::TimeDelta::hours(1)),
        ..Message::default()
    }
}

/// Where the scripted store should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Connect,
    Select,
    List,
    Search,
    MarkAll,
}

type Calls = Arc<Mutex<Vec<String>>>;

#[derive(Clone)]
struct FakeStore {
    folders: Vec<String>,
    messages: Vec<Message>,
    fault: Option<Fault>,
    failing_marks: Vec<u32>,
    calls: Calls,
}

impl FakeStore {
    fn new(messages: Vec<Message>) -> Self {
        Self {
            folders: vec!["INBOX".to_string(), "Sent".to_string(), "Builds".to_string()],
            messages,
            fault: None,
            failing_marks: Vec::new(),
            calls: Calls::default(),
        }
    }

    fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl MailboxConnector for FakeStore {
    async fn connect(&self, request: &ConnectRequest) -> Result<Box<dyn MailboxSession>> {
        self.record(format!("connect:{}", request.host));
        if self.fault == Some(Fault::Connect) {
            return Err(Error::Connection("connection refused".to_string()));
        }
        Ok(Box::new(FakeSession {
            store: self.clone(),
        }))
    }
}

struct FakeSession {
    store: FakeStore,
}

#[async_trait]
impl MailboxSession for FakeSession {
    async fn select_folder(&mut self, name: &str) -> Result<()> {
        self.store.record(format!("select:{name}"));
        if self.store.fault == Some(Fault::Select) {
            return Err(Error::Connection("connection reset".to_string()));
        }
        if self.store.folders.iter().any(|f| f == name) {
            Ok(())
        } else {
            Err(Error::FolderNotFound(name.to_string()))
        }
    }

    async fn list_folder_names(&mut self) -> Result<Vec<String>> {
        self.store.record("list");
        if self.store.fault == Some(Fault::List) {
            return Err(Error::Connection("LIST failed".to_string()));
        }
        Ok(self.store.folders.clone())
    }

    async fn search(&mut self, criteria: &Criteria) -> Result<Vec<Message>> {
        self.store.record("search");
        if self.store.fault == Some(Fault::Search) {
            return Err(Error::Search("BAD search".to_string()));
        }
        Ok(self
            .store
            .messages
            .iter()
            .filter(|m| criteria.matches(m))
            .cloned()
            .collect())
    }

    async fn mark_processed(&mut self, message: &Message) -> Result<()> {
        self.store.record(format!("mark:{}", message.uid));
        if self.store.fault == Some(Fault::MarkAll) || self.store.failing_marks.contains(&message.uid)
        {
            return Err(Error::Mark(format!("uid {}: NO read-only", message.uid)));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.store.record("close");
    }
}

struct RecordingDispatcher {
    calls: Calls,
    events: Mutex<Vec<TriggerEvent>>,
    fail: bool,
}

impl RecordingDispatcher {
    fn new(store: &FakeStore) -> Self {
        Self {
            calls: Arc::clone(&store.calls),
            events: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing(store: &FakeStore) -> Self {
        Self {
            fail: true,
            ..Self::new(store)
        }
    }

    fn events(&self) -> Vec<TriggerEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: &TriggerEvent) -> Result<()> {
        let uid = event.parameters.get("pmt_uid").cloned().unwrap_or_default();
        self.calls.lock().unwrap().push(format!("dispatch:{uid}"));
        if self.fail {
            return Err(Error::Dispatch("job queue unavailable".to_string()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[tokio::test]
async fn dry_run_with_no_matches_succeeds() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();
    let cycle = PollCycle::new(&store, &sink);

    let report = cycle.run_at(SCRIPT, Mode::DryRun, now()).await;
    assert!(report.success);
    assert!(report.message.ends_with("Found matching email(s) : 0."));
    assert_eq!(
        &report.diagnostics[..5],
        &[
            "Connecting to the mailbox...",
            "Connected to mailbox. Searching for messages where:",
            "- [flag is unread]",
            "- [subject contains jenkins >]",
            "- [received date is greater than Sat, 7 Mar 2026 12:00:00 +0000]",
        ]
    );
    assert_eq!(store.calls(), vec!["connect:mail.x.com", "select:INBOX", "search", "close"]);
}

#[tokio::test]
async fn test_connection_reports_ok() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();
    let validation = PollCycle::new(&store, &sink).test_connection(SCRIPT).await;

    assert_eq!(validation.kind, ValidationKind::Ok);
    assert!(validation.message.contains("Searching folder..."));
}

#[tokio::test]
async fn missing_folder_lists_every_folder() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();
    let script = format!("{SCRIPT}\nfolder=Archive");

    let validation = PollCycle::new(&store, &sink).test_connection(&script).await;
    assert_eq!(validation.kind, ValidationKind::Error);
    assert!(validation.message.contains(
        "Please set the 'folder=XXX' parameter to one of the following values: \nFolders: [INBOX, Sent, Builds]"
    ));
    assert_eq!(store.count("close"), 1);
    assert_eq!(store.count("search"), 0);
}

#[tokio::test]
async fn live_run_dispatches_then_marks_each_match() {
    let mut store = FakeStore::new(vec![
        message(10, "jenkins > deploy api"),
        message(11, "jenkins > deploy web"),
    ]);
    store.failing_marks = vec![11];
    let sink = MemorySink::new();
    let dispatcher = RecordingDispatcher::new(&store);

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::Live(&dispatcher), now())
        .await;

    assert!(report.success);
    assert_eq!(report.matches, 2);
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.marked, 1);
    assert_eq!(
        store.calls()[3..],
        ["dispatch:10", "mark:10", "dispatch:11", "mark:11", "close"]
    );

    let events = dispatcher.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.parameters.keys().all(|k| k.starts_with("pmt_"))));
    assert_eq!(events[1].parameters["pmt_subject"], "jenkins > deploy web");
    assert_eq!(events[0].cause, "An email matching the filter criteria was found.");

    assert_eq!(
        report
            .diagnostics
            .iter()
            .filter(|l| *l == "Changes found. Scheduling a build.")
            .count(),
        2
    );
    assert_eq!(
        sink.lines_at(LogLevel::Warn),
        vec!["Failed to mark message as read: uid 11: NO read-only"]
    );
}

#[tokio::test]
async fn every_mark_failing_still_dispatches_all() {
    let store = FakeStore::new(vec![
        message(1, "jenkins > a"),
        message(2, "jenkins > b"),
        message(3, "jenkins > c"),
    ])
    .with_fault(Fault::MarkAll);
    let sink = MemorySink::new();
    let dispatcher = RecordingDispatcher::new(&store);

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::Live(&dispatcher), now())
        .await;

    assert!(report.success);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.marked, 0);
    assert_eq!(store.count("mark:"), 3);
}

#[tokio::test]
async fn dry_run_never_dispatches_or_marks() {
    let store = FakeStore::new(vec![message(1, "jenkins > a"), message(2, "jenkins > b")]);
    let sink = MemorySink::new();

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::DryRun, now())
        .await;

    assert!(report.success);
    assert_eq!(report.matches, 2);
    assert_eq!(report.dispatched, 0);
    assert_eq!(store.count("mark:"), 0);
    assert_eq!(store.count("dispatch:"), 0);
    assert_eq!(
        report.diagnostics[report.diagnostics.len() - 3..],
        [
            "Matched uid 1: jenkins > a",
            "Matched uid 2: jenkins > b",
            "Found matching email(s) : 2.",
        ]
    );
}

#[tokio::test]
async fn close_runs_once_whatever_fails() {
    for fault in [Fault::Select, Fault::List, Fault::Search, Fault::MarkAll] {
        let store = FakeStore::new(vec![message(1, "jenkins > a")]).with_fault(fault);
        let sink = MemorySink::new();
        let dispatcher = RecordingDispatcher::new(&store);
        let script = if fault == Fault::List {
            format!("{SCRIPT}\nfolder=Missing")
        } else {
            SCRIPT.to_string()
        };

        PollCycle::new(&store, &sink)
            .run_at(&script, Mode::Live(&dispatcher), now())
            .await;
        assert_eq!(store.count("close"), 1, "fault {fault:?}");
    }
}

#[tokio::test]
async fn dispatch_failure_is_fatal_and_leaves_message_unread() {
    let store = FakeStore::new(vec![message(1, "jenkins > a"), message(2, "jenkins > b")]);
    let sink = MemorySink::new();
    let dispatcher = RecordingDispatcher::failing(&store);

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::Live(&dispatcher), now())
        .await;

    assert!(!report.success);
    assert_eq!(report.dispatched, 0);
    assert_eq!(store.count("mark:"), 0);
    assert_eq!(store.count("close"), 1);
    assert_eq!(
        report.diagnostics.last().unwrap(),
        "Error : Dispatch failed: job queue unavailable"
    );
}

#[tokio::test]
async fn connect_failure_never_opens_a_session() {
    let store = FakeStore::new(Vec::new()).with_fault(Fault::Connect);
    let sink = MemorySink::new();

    let validation = PollCycle::new(&store, &sink).test_connection(SCRIPT).await;
    assert_eq!(validation.kind, ValidationKind::Error);
    assert!(validation.message.ends_with("Error : Connection failed: connection refused"));
    assert_eq!(store.count("close"), 0);
    assert_eq!(sink.lines_at(LogLevel::Error).len(), 1);
}

#[tokio::test]
async fn search_failure_is_reported() {
    let store = FakeStore::new(Vec::new()).with_fault(Fault::Search);
    let sink = MemorySink::new();

    let validation = PollCycle::new(&store, &sink).test_connection(SCRIPT).await;
    assert_eq!(validation.kind, ValidationKind::Error);
    assert!(validation.message.ends_with("Error : Search failed: BAD search"));
}

#[tokio::test]
async fn listing_failure_after_missing_folder_is_reported() {
    let store = FakeStore::new(Vec::new()).with_fault(Fault::List);
    let sink = MemorySink::new();
    let script = format!("{SCRIPT}\nfolder=Archive");

    let validation = PollCycle::new(&store, &sink).test_connection(&script).await;
    assert_eq!(validation.kind, ValidationKind::Error);
    assert!(validation.message.ends_with("Error : Connection failed: LIST failed"));
}

#[tokio::test]
async fn all_missing_fields_reported_at_once() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();

    let validation = PollCycle::new(&store, &sink)
        .test_connection("username=u\nfolder=INBOX")
        .await;

    assert_eq!(validation.kind, ValidationKind::Error);
    assert_eq!(
        validation.message,
        "Error : [Email property 'host' is required!, Email property 'password' is required!]"
    );
    assert!(store.calls().is_empty());
    assert_eq!(
        sink.lines_at(LogLevel::Error)[..2],
        [
            "Email property 'host' is required!",
            "Email property 'password' is required!"
        ]
    );
}

#[tokio::test]
async fn blank_script_is_a_no_op() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();
    let dispatcher = RecordingDispatcher::new(&store);

    let report = PollCycle::new(&store, &sink).poll("  \n ", &dispatcher).await;
    assert!(report.success);
    assert_eq!(report.message, "no-op");
    assert_eq!(report.diagnostics, ["no-op"]);
    assert!(store.calls().is_empty());
    assert_eq!(sink.lines(), ["no-op"]);
}

#[tokio::test]
async fn invalid_age_fails_before_connecting() {
    let store = FakeStore::new(Vec::new());
    let sink = MemorySink::new();
    let script = format!("{SCRIPT}\nreceivedXMinutesAgo=soon");

    let validation = PollCycle::new(&store, &sink).test_connection(&script).await;
    assert_eq!(validation.kind, ValidationKind::Error);
    assert!(validation.message.starts_with("Error : invalid configuration"));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn custom_prefix_and_cause() {
    let store = FakeStore::new(vec![message(5, "jenkins > a")]);
    let sink = MemorySink::new();
    let dispatcher = RecordingDispatcher::new(&store);

    PollCycle::new(&store, &sink)
        .with_prefix("mail_")
        .with_cause("Mail arrived")
        .run_at(SCRIPT, Mode::Live(&dispatcher), now())
        .await;

    let events = dispatcher.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].cause, "Mail arrived");
    assert_eq!(events[0].parameters["mail_uid"], "5");
}

#[tokio::test]
async fn old_messages_are_filtered_out() {
    let mut old = message(7, "jenkins > stale");
    old.received = Some(now().fixed_offset() - chrono::TimeDelta::days(3));
    let store = FakeStore::new(vec![old, message(8, "jenkins > fresh")]);
    let sink = MemorySink::new();

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::DryRun, now())
        .await;
    assert_eq!(report.matches, 1);
}

#[tokio::test]
async fn sink_receives_every_diagnostic() {
    let store = FakeStore::new(vec![message(1, "jenkins > a")]);
    let sink = MemorySink::new();

    let report = PollCycle::new(&store, &sink)
        .run_at(SCRIPT, Mode::DryRun, now())
        .await;
    assert_eq!(sink.lines(), report.diagnostics);
}
