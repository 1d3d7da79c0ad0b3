//! # mailpoll-imap
//!
//! A small async IMAP client covering the commands a mailbox poller needs:
//! LOGIN, STARTTLS, LIST, SELECT, UID SEARCH, UID FETCH, UID STORE, CLOSE and
//! LOGOUT.
//!
//! ## Connection States
//!
//! The client uses the type-state pattern so that only commands valid for
//! the current IMAP state can be issued:
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select() ──→ Selected
//!                                       ↑                           │
//!                                       └──────── close() ──────────┘
//! ```
//!
//! `logout()` ends the session from any state.
//!
//! A rejected SELECT hands the authenticated client back through
//! [`SelectOutcome::Rejected`] so the caller can still run LIST on the same
//! connection.
//!
//! ## Example
//!
//! ```ignore
//! use mailpoll_imap::{Client, Config, SearchCriteria, SelectOutcome, Security};
//!
//! let config = Config::new("imap.example.com").with_security(Security::Implicit);
//! let stream = mailpoll_imap::connection::connect(&config).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.login("user", "secret").await?;
//!
//! if let SelectOutcome::Selected(mut client, status) = client.select("INBOX").await? {
//!     println!("{} messages", status.exists);
//!     let uids = client.uid_search(&SearchCriteria::Unseen).await?;
//!     println!("{} unseen", uids.len());
//!     client.logout().await?;
//! }
//! ```

#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, FramedStream, ImapStream, NotAuthenticated,
    ProtocolTrace, SelectOutcome, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{Address, Envelope, FetchItem, Response, ResponseParser, UntaggedResponse};
pub use types::{
    Capability, Flag, Flags, ListResponse, Mailbox, MailboxAttribute, MailboxStatus, ResponseCode,
    SeqNum, Status, Uid, UidSet,
};
