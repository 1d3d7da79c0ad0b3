//! Splits the byte stream into whole responses.
//!
//! A response is one CRLF-terminated line, extended by the payload and the
//! continuation line of every `{n}` literal it ends with.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

const INITIAL_CAPACITY: usize = 8 * 1024;

/// Longest single line accepted.
const MAX_LINE: usize = 1024 * 1024;

/// Largest literal accepted. Envelopes are far below this.
const MAX_LITERAL: usize = 16 * 1024 * 1024;

/// A stream plus the bytes read from it that do not yet form a response.
pub struct FramedStream<S> {
    stream: S,
    pending: BytesMut,
    read_timeout: Option<Duration>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream` with no read limit.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            pending: BytesMut::with_capacity(INITIAL_CAPACITY),
            read_timeout: None,
        }
    }

    /// Fails any [`read_response`](Self::read_response) that takes longer
    /// than `limit`.
    #[must_use]
    pub const fn with_timeout(mut self, limit: Duration) -> Self {
        self.read_timeout = Some(limit);
        self
    }

    /// The read limit, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Next complete response, literals included.
    ///
    /// Bytes already read stay buffered if the limit expires.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.next_frame())
                .await
                .unwrap_or(Err(Error::Timeout(limit))),
            None => self.next_frame().await,
        }
    }

    async fn next_frame(&mut self) -> Result<Vec<u8>> {
        loop {
            if let Some(len) = frame_len(&self.pending)? {
                return Ok(self.pending.split_to(len).to_vec());
            }
            if self.stream.read_buf(&mut self.pending).await? == 0 {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }
        }
    }

    /// Sends one serialized command and flushes it.
    pub async fn write_command(&mut self, command: &[u8]) -> Result<()> {
        self.stream.write_all(command).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Gives the stream back for a TLS upgrade.
    ///
    /// Anything the server sent past the last response would otherwise be
    /// read as if it had arrived over TLS, so it is refused.
    pub fn into_inner(self) -> Result<S> {
        if self.pending.is_empty() {
            Ok(self.stream)
        } else {
            Err(Error::Protocol(format!(
                "{} unread bytes before the TLS handshake",
                self.pending.len()
            )))
        }
    }
}

/// Length of the first complete response at the start of `buf`, or `None`
/// until enough bytes have arrived.
fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
    let mut start = 0;
    loop {
        let rest = &buf[start..];
        let Some(cr) = rest.windows(2).position(|pair| pair == b"\r\n") else {
            return if rest.len() > MAX_LINE {
                Err(Error::Protocol("line exceeds 1 MiB".to_owned()))
            } else {
                Ok(None)
            };
        };
        if cr > MAX_LINE {
            return Err(Error::Protocol("line exceeds 1 MiB".to_owned()));
        }

        let line_end = start + cr + 2;
        let Some(size) = literal_len(&buf[start..line_end]) else {
            return Ok(Some(line_end));
        };
        if size > MAX_LITERAL {
            return Err(Error::Protocol(format!(
                "literal of {size} bytes exceeds {MAX_LITERAL}"
            )));
        }

        start = line_end + size;
        if start > buf.len() {
            return Ok(None);
        }
    }
}

/// Size announced by a trailing `{n}` or `{n+}` on a CRLF-terminated line.
fn literal_len(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"}\r\n")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let open = body.iter().rposition(|&b| b == b'{')?;
    let digits = &body[open + 1..];

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
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
    use tokio_test::io::Builder;

    use super::*;

    #[test]
    fn announced_literal_sizes() {
        assert_eq!(literal_len(b"* 1 FETCH (BODY[] {2048}\r\n"), Some(2048));
        assert_eq!(literal_len(b"A1 LOGIN {4+}\r\n"), Some(4));
        assert_eq!(literal_len(b"x {0}\r\n"), Some(0));
        assert_eq!(literal_len(b"* OK {braces} in text\r\n"), None);
        assert_eq!(literal_len(b"x {12}"), None);
        assert_eq!(literal_len(b"x {}\r\n"), None);
    }

    #[test]
    fn frame_waits_for_the_whole_literal() {
        assert_eq!(frame_len(b"* OK hi\r\nnext").unwrap(), Some(9));
        assert_eq!(frame_len(b"* OK h").unwrap(), None);
        assert_eq!(frame_len(b"* 1 FETCH (X {3}\r\nab").unwrap(), None);
        assert_eq!(frame_len(b"* 1 FETCH (X {3}\r\nabc)\r\n").unwrap(), Some(24));
    }

    #[test]
    fn oversized_literal_is_refused() {
        assert!(frame_len(b"* 1 FETCH (X {999999999}\r\n").is_err());
    }

    #[tokio::test]
    async fn responses_are_split_at_crlf() {
        let mock = Builder::new()
            .read(b"* 3 EXI")
            .read(b"STS\r\n* 1 RECENT\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(framed.read_response().await.unwrap(), b"* 3 EXISTS\r\n");
        assert_eq!(framed.read_response().await.unwrap(), b"* 1 RECENT\r\n");
    }

    #[tokio::test]
    async fn lone_newline_stays_inside_the_line() {
        let mock = Builder::new().read(b"* OK one\ntwo\r\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK one\ntwo\r\n");
    }

    #[tokio::test]
    async fn literal_spans_reads() {
        let mock = Builder::new()
            .read(b"* 4 FETCH (ENVELOPE (NIL {6}\r\n")
            .read(b"Build)")
            .read(b" NIL NIL NIL NIL NIL NIL NIL NIL))\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        let response = framed.read_response().await.unwrap();
        assert!(response.starts_with(b"* 4 FETCH (ENVELOPE (NIL {6}\r\nBuild)"));
        assert!(response.ends_with(b"NIL))\r\n"));
    }

    #[tokio::test]
    async fn closed_connection_is_connection_lost() {
        let mock = Builder::new().read(b"* OK half a li").build();
        let mut framed = FramedStream::new(mock);
        assert!(framed.read_response().await.unwrap_err().is_connection_lost());
    }

    #[tokio::test]
    async fn commands_are_written_whole() {
        let mock = Builder::new().write(b"A0007 LOGOUT\r\n").build();
        let mut framed = FramedStream::new(mock);
        framed.write_command(b"A0007 LOGOUT\r\n").await.unwrap();
    }

    #[tokio::test]
    async fn unread_bytes_block_the_upgrade() {
        let mock = Builder::new()
            .read(b"A0001 OK Begin TLS\r\n* OK injected\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        framed.read_response().await.unwrap();
        assert!(matches!(framed.into_inner(), Err(Error::Protocol(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let (client, _server) = tokio::io::duplex(64);
        let mut framed = FramedStream::new(client).with_timeout(Duration::from_secs(5));

        let err = framed.read_response().await.unwrap_err();
        assert!(matches!(err, Error::Timeout(limit) if limit == Duration::from_secs(5)));
    }
}
