//! The client, with its IMAP state tracked in the type.
//!
//! `Client<S, NotAuthenticated>` can only log in, `Client<S, Authenticated>`
//! can select, and `Client<S, Selected>` can search, fetch, store and close
//! the mailbox. Each transition consumes the old value.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::marker::PhantomData;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::authenticated::SelectOutcome;
pub use self::states::{Authenticated, MailboxAccess, NotAuthenticated, Selected};
use super::config::ProtocolTrace;
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ListResponse, ResponseCode, Status};
use crate::{Error, Result};

/// A connection in IMAP state `State`.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tags: TagGenerator,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) trace: ProtocolTrace,
    _state: PhantomData<State>,
}

impl<S, State> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &std::any::type_name::<State>())
            .field("capabilities", &self.capabilities)
            .field("commands_sent", &self.tags.issued())
            .finish_non_exhaustive()
    }
}

/// Everything the server sent for one command.
#[derive(Debug)]
pub(crate) struct Reply {
    /// Untagged data, in arrival order.
    pub data: Vec<UntaggedResponse>,
    pub status: Status,
    pub code: Option<ResponseCode>,
    pub text: String,
}

impl Reply {
    /// Turns anything but OK into the matching error.
    pub fn ok(self) -> Result<Vec<UntaggedResponse>> {
        match self.status {
            Status::Ok | Status::PreAuth => Ok(self.data),
            Status::No => Err(Error::No {
                code: self.code,
                text: self.text,
            }),
            Status::Bad => Err(Error::Bad(self.text)),
            Status::Bye => Err(Error::Bye(self.text)),
        }
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: FramedStream<S>, trace: ProtocolTrace) -> Self {
        Self {
            stream,
            tags: TagGenerator::default(),
            capabilities: Vec::new(),
            trace,
            _state: PhantomData,
        }
    }

    pub(crate) fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            capabilities: self.capabilities,
            trace: self.trace,
            _state: PhantomData,
        }
    }

    /// Capabilities from the greeting or the latest CAPABILITY data.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// True if `capability` was advertised.
    #[must_use]
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Asks for the capability list again and remembers it.
    pub async fn capability(&mut self) -> Result<&[Capability]> {
        let data = self.execute(&Command::Capability).await?.ok()?;
        self.absorb_capabilities(&data);
        Ok(&self.capabilities)
    }

    /// LOGOUT. The untagged BYE before the completion is normal.
    pub async fn logout(mut self) -> Result<()> {
        self.execute(&Command::Logout).await?.ok().map(drop)
    }

    /// Sends `command` and gathers the server's answer up to the tagged
    /// completion. Untagged lines that fail to parse are logged and dropped.
    ///
    /// Literals go out as `{n+}` when the server has LITERAL+. Otherwise
    /// the client waits for a continuation before each literal, and a
    /// completion in its place (usually NO or BAD) ends the command there.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Reply> {
        let tag = self.tags.next_tag();
        if self.trace.enabled {
            tracing::debug!("C: {}", command.redacted(&tag, self.trace.reveal_auth));
        }

        let literal_plus = self.has_capability(&Capability::LiteralPlus);
        let mut pieces = command.encode(&tag, literal_plus).into_iter().peekable();
        let mut data = Vec::new();
        while let Some(piece) = pieces.next() {
            self.stream.write_command(&piece).await?;
            if pieces.peek().is_some() {
                if let Some(reply) = self.read_reply(&tag, &mut data, true).await? {
                    return Ok(reply);
                }
            }
        }

        self.read_reply(&tag, &mut data, false)
            .await?
            .ok_or_else(|| Error::Protocol(format!("unexpected continuation for {tag}")))
    }

    /// Reads until the completion for `tag`, collecting untagged data.
    /// Returns `None` on a continuation when `continuation_expected`.
    async fn read_reply(
        &mut self,
        tag: &str,
        data: &mut Vec<UntaggedResponse>,
        continuation_expected: bool,
    ) -> Result<Option<Reply>> {
        loop {
            let raw = self.stream.read_response().await?;
            if self.trace.enabled {
                tracing::debug!("S: {}", String::from_utf8_lossy(&raw).trim_end());
            }

            match ResponseParser::parse(&raw) {
                Ok(Response::Tagged {
                    tag: got,
                    status,
                    code,
                    text,
                }) if got == tag => {
                    return Ok(Some(Reply {
                        data: std::mem::take(data),
                        status,
                        code,
                        text,
                    }));
                }
                Ok(Response::Tagged { tag: got, .. }) => {
                    return Err(Error::Protocol(format!(
                        "completion for {got} while waiting for {tag}"
                    )));
                }
                Ok(Response::Untagged(item)) => data.push(item),
                Ok(Response::Continuation { .. }) if continuation_expected => return Ok(None),
                Ok(Response::Continuation { .. }) => {
                    return Err(Error::Protocol(format!("unexpected continuation for {tag}")));
                }
                Err(e) if raw.starts_with(tag.as_bytes()) => return Err(e),
                Err(e) => tracing::warn!(error = %e, "skipping unparseable response"),
            }
        }
    }

    pub(crate) fn absorb_capabilities(&mut self, data: &[UntaggedResponse]) {
        if let Some(latest) = data.iter().rev().find_map(|item| match item {
            UntaggedResponse::Capability(caps) => Some(caps),
            _ => None,
        }) {
            self.capabilities.clone_from(latest);
        }
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
    State: MailboxAccess,
{
    /// LIST `pattern` under `reference`, in server order.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let data = self
            .execute(&Command::List {
                reference: reference.to_owned(),
                pattern: pattern.to_owned(),
            })
            .await?
            .ok()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::List(entry) => Some(entry),
                _ => None,
            })
            .collect())
    }
}
