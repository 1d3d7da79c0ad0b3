//! Protocol values shared by the command builder, the parser and the client.

#![allow(clippy::missing_const_for_fn)]

mod mailbox;
mod message;
mod server;

pub use mailbox::{ListResponse, Mailbox, MailboxAttribute, MailboxStatus};
pub use message::{Flag, Flags, SeqNum, Uid, UidSet};
pub use server::{Capability, ResponseCode, Status};
