//! Greeting, STARTTLS and LOGIN.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::Command;
use crate::connection::config::{Config, ProtocolTrace, Security};
use crate::connection::framed::FramedStream;
use crate::connection::stream::{self, ImapStream};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::{Capability, ResponseCode, Status};
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Reads the greeting from an already connected stream. No tracing and
    /// no read limit.
    pub async fn from_stream(stream: S) -> Result<Self> {
        Self::from_framed(FramedStream::new(stream), ProtocolTrace::default()).await
    }

    /// Reads the greeting and keeps any capabilities it lists.
    pub async fn from_framed(mut framed: FramedStream<S>, trace: ProtocolTrace) -> Result<Self> {
        let raw = framed.read_response().await?;
        if trace.enabled {
            tracing::debug!("S: {}", String::from_utf8_lossy(&raw).trim_end());
        }

        let Response::Untagged(UntaggedResponse::Status { status, code, text }) =
            ResponseParser::parse(&raw)?
        else {
            return Err(Error::Protocol(format!(
                "greeting is not a status: {}",
                String::from_utf8_lossy(&raw).trim_end()
            )));
        };

        let mut client = Self::new(framed, trace);
        match (status, code) {
            (Status::Bye, _) => Err(Error::Bye(text)),
            (Status::Ok | Status::PreAuth, Some(ResponseCode::Capability(caps))) => {
                client.capabilities = caps;
                Ok(client)
            }
            (Status::Ok | Status::PreAuth, _) => Ok(client),
            (other, _) => Err(Error::Protocol(format!("greeting status {other:?}: {text}"))),
        }
    }

    /// LOGIN with a username and password.
    ///
    /// Refused when the server advertised `LOGINDISABLED`. A wrong password
    /// comes back as [`Error::No`] carrying the server's text.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        if self.has_capability(&Capability::LoginDisabled) {
            return Err(Error::InvalidState(
                "server disabled LOGIN on this connection".to_owned(),
            ));
        }

        let reply = self
            .execute(&Command::Login {
                username: username.to_owned(),
                password: password.to_owned(),
            })
            .await?;
        if let Some(ResponseCode::Capability(caps)) = &reply.code {
            self.capabilities.clone_from(caps);
        }
        let data = reply.ok()?;
        self.absorb_capabilities(&data);

        Ok(self.transition())
    }
}

impl Client<ImapStream, NotAuthenticated> {
    /// Dials `config`, reads the greeting and runs STARTTLS when asked to.
    pub async fn open(config: &Config) -> Result<Self> {
        let stream = stream::connect(config).await?;
        let framed = FramedStream::new(stream).with_timeout(config.io_timeout);
        let client = Self::from_framed(framed, config.trace).await?;

        match config.security {
            Security::StartTls => client.starttls(&config.host).await,
            Security::None | Security::Implicit => Ok(client),
        }
    }

    /// STARTTLS, the handshake, then a fresh CAPABILITY, since anything
    /// learned in plaintext no longer counts.
    pub async fn starttls(mut self, host: &str) -> Result<Self> {
        self.execute(&Command::StartTls).await?.ok()?;

        let limit = self.stream.timeout();
        let tls = self.stream.into_inner()?.upgrade_to_tls(host).await?;
        let mut framed = FramedStream::new(tls);
        if let Some(limit) = limit {
            framed = framed.with_timeout(limit);
        }

        let mut client = Self::new(framed, self.trace);
        client.tags = self.tags;
        client.capability().await?;
        Ok(client)
    }
}
