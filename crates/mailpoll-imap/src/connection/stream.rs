//! TCP and TLS transports.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::{Config, Security};
use crate::{Error, Result};

/// The socket under a client: plain TCP, or TLS over TCP.
pub enum ImapStream {
    /// Unencrypted.
    Plain(TcpStream),
    /// Encrypted. Boxed; the TLS state is large.
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Runs the TLS handshake on a plain stream (after STARTTLS).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the stream is already encrypted, otherwise
    /// whatever the handshake fails with.
    pub async fn upgrade_to_tls(self, host: &str) -> Result<Self> {
        let Self::Plain(tcp) = self else {
            return Err(Error::InvalidState("TLS is already active".to_string()));
        };
        Ok(Self::Tls(Box::new(handshake(host, tcp).await?)))
    }

    /// True once encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

macro_rules! forward {
    ($this:expr, $stream:ident => $call:expr) => {
        match $this.get_mut() {
            ImapStream::Plain($stream) => {
                let $stream = Pin::new($stream);
                $call
            }
            ImapStream::Tls($stream) => {
                let $stream = Pin::new($stream);
                $call
            }
        }
    };
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        forward!(self, s => s.poll_read(cx, buf))
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        forward!(self, s => s.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        forward!(self, s => s.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        forward!(self, s => s.poll_shutdown(cx))
    }
}

/// Connector trusting the Mozilla root set bundled in `webpki-roots`.
#[must_use]
pub fn tls_connector() -> TlsConnector {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

async fn handshake(host: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::ServerName(host.to_string()))?;
    Ok(tls_connector().connect(name, tcp).await?)
}

/// Dials the server; for [`Security::Implicit`] also completes the TLS
/// handshake. Bounded as a whole by `connect_timeout`.
///
/// # Errors
///
/// [`Error::Timeout`] when the limit passes, [`Error::Io`] or
/// [`Error::ServerName`] otherwise.
pub async fn connect(config: &Config) -> Result<ImapStream> {
    let limit = config.connect_timeout;
    tokio::time::timeout(limit, dial(config))
        .await
        .unwrap_or(Err(Error::Timeout(limit)))
}

async fn dial(config: &Config) -> Result<ImapStream> {
    let tcp = TcpStream::connect((config.host.as_str(), config.port())).await?;
    if config.security == Security::Implicit {
        Ok(ImapStream::Tls(Box::new(handshake(&config.host, tcp).await?)))
    } else {
        Ok(ImapStream::Plain(tcp))
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
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;

    async fn free_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn refused_connection_is_io_error() {
        let config = Config::new("127.0.0.1")
            .with_security(Security::None)
            .with_port(free_port().await)
            .with_connect_timeout(Duration::from_secs(5));

        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_connection_lost());
    }

    #[tokio::test]
    async fn plain_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = Config::new("127.0.0.1")
            .with_security(Security::None)
            .with_port(listener.local_addr().unwrap().port());

        let stream = connect(&config).await.unwrap();
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn bad_server_name_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let tcp = TcpStream::connect(("127.0.0.1", port)).await.unwrap();

        let err = ImapStream::Plain(tcp).upgrade_to_tls("not a host!").await.err().unwrap();
        assert!(matches!(err, Error::ServerName(name) if name == "not a host!"));
    }
}
