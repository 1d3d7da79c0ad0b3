//! Transport, framing and the type-state client.

mod client;
mod config;
mod framed;
mod stream;

pub use client::{Authenticated, Client, MailboxAccess, NotAuthenticated, SelectOutcome, Selected};
pub use config::{Config, ProtocolTrace, Security};
pub use framed::FramedStream;
pub use stream::{ImapStream, connect, tls_connector};
