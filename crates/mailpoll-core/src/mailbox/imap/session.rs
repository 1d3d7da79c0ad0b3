//! A logged-in IMAP connection behind [`MailboxSession`].

use std::collections::HashMap;
use std::mem;

use async_trait::async_trait;
use mailpoll_imap::{
    Authenticated, Client, FetchAttribute, Flag, ImapStream, SelectOutcome, Selected, Uid, UidSet,
};
use tokio::io::{AsyncRead, AsyncWrite};

use super::message_from_fetch;
use crate::criteria::Criteria;
use crate::mailbox::{MailboxSession, Message};
use crate::{Error, Result};

const FETCH_ITEMS: [FetchAttribute; 5] = [
    FetchAttribute::Uid,
    FetchAttribute::Flags,
    FetchAttribute::InternalDate,
    FetchAttribute::Envelope,
    FetchAttribute::Rfc822Size,
];

enum State<S> {
    Authenticated(Client<S, Authenticated>),
    Selected {
        client: Client<S, Selected>,
        folder: String,
    },
    Closed,
}

/// IMAP session over any async stream.
pub struct ImapSession<S = ImapStream> {
    state: State<S>,
}

impl<S> std::fmt::Debug for ImapSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Authenticated(_) => "authenticated".to_string(),
            State::Selected { folder, .. } => format!("selected({folder})"),
            State::Closed => "closed".to_string(),
        };
        f.debug_struct("ImapSession").field("state", &state).finish()
    }
}

impl<S> ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps an authenticated client.
    #[must_use]
    pub const fn new(client: Client<S, Authenticated>) -> Self {
        Self {
            state: State::Authenticated(client),
        }
    }

    /// Returns the selected folder, if any.
    #[must_use]
    pub fn selected_folder(&self) -> Option<&str> {
        match &self.state {
            State::Selected { folder, .. } => Some(folder),
            _ => None,
        }
    }

    /// Returns true once the session has been closed or the connection lost.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    async fn authenticated(&mut self) -> Result<Client<S, Authenticated>> {
        match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => Ok(client),
            State::Selected { client, .. } => client
                .close()
                .await
                .map_err(|e| Error::Connection(e.to_string())),
            State::Closed => Err(Error::Connection("session is closed".to_string())),
        }
    }

    fn selected(&mut self) -> Option<&mut Client<S, Selected>> {
        match &mut self.state {
            State::Selected { client, .. } => Some(client),
            _ => None,
        }
    }

    async fn folder_exists(&mut self, name: &str) -> Result<bool> {
        Ok(self.list_folder_names().await?.iter().any(|f| f == name))
    }
}

#[async_trait]
impl<S> MailboxSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn select_folder(&mut self, name: &str) -> Result<()> {
        let client = self.authenticated().await?;
        let outcome = client
            .select(name)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        match outcome {
            SelectOutcome::Selected(client, status) => {
                tracing::debug!(
                    folder = name,
                    exists = status.exists,
                    read_only = status.read_only,
                    "folder selected"
                );
                self.state = State::Selected {
                    client,
                    folder: name.to_string(),
                };
                Ok(())
            }
            SelectOutcome::Rejected { client, code, text } => {
                self.state = State::Authenticated(client);
                if code.as_ref().is_some_and(|c| c.is_missing_mailbox()) {
                    return Err(Error::FolderNotFound(name.to_string()));
                }
                // Servers without NONEXISTENT: fall back to LIST.
                match self.folder_exists(name).await {
                    Ok(false) => Err(Error::FolderNotFound(name.to_string())),
                    Ok(true) | Err(_) => Err(Error::Connection(format!(
                        "cannot open folder '{name}': {text}"
                    ))),
                }
            }
        }
    }

    async fn list_folder_names(&mut self) -> Result<Vec<String>> {
        let listed = match &mut self.state {
            State::Authenticated(client) => client.list("", "*").await,
            State::Selected { client, .. } => client.list("", "*").await,
            State::Closed => return Err(Error::Connection("session is closed".to_string())),
        };

        let entries = listed.map_err(|e| Error::Connection(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.mailbox.as_str().to_string())
            .collect())
    }

    async fn search(&mut self, criteria: &Criteria) -> Result<Vec<Message>> {
        let client = self
            .selected()
            .ok_or_else(|| Error::Search("no folder selected".to_string()))?;

        let uids = client
            .uid_search(&criteria.to_search_key())
            .await
            .map_err(|e| Error::Search(e.to_string()))?;
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let set: UidSet = uids.iter().copied().collect();
        let fetched = client
            .uid_fetch(&set, &FETCH_ITEMS)
            .await
            .map_err(|e| Error::Search(e.to_string()))?;

        let mut by_uid: HashMap<u32, Message> = fetched
            .into_iter()
            .filter_map(|(seq, items)| message_from_fetch(seq, items))
            .map(|m| (m.uid, m))
            .collect();

        let messages: Vec<Message> = uids
            .iter()
            .filter_map(|uid| by_uid.remove(&uid.get()))
            .filter(|m| criteria.matches(m))
            .collect();

        tracing::debug!(
            candidates = uids.len(),
            matched = messages.len(),
            "search complete"
        );
        Ok(messages)
    }

    async fn mark_processed(&mut self, message: &Message) -> Result<()> {
        let uid = Uid::new(message.uid)
            .ok_or_else(|| Error::Mark(format!("invalid uid {}", message.uid)))?;
        let client = self
            .selected()
            .ok_or_else(|| Error::Mark("no folder selected".to_string()))?;

        client
            .uid_store(&UidSet::single(uid), &[Flag::Seen])
            .await
            .map_err(|e| Error::Mark(format!("uid {uid}: {e}")))
    }

    async fn close(&mut self) {
        let result = match mem::replace(&mut self.state, State::Closed) {
            State::Authenticated(client) => client.logout().await,
            State::Selected { client, .. } => client.logout().await,
            State::Closed => return,
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "logout failed");
        }
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
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};

    use chrono::{TimeZone, Utc};
    use tokio::io::ReadBuf;

    use super::*;
    use crate::config::{Configuration, apply_defaults};

    struct MockStream {
        responses: Cursor<Vec<u8>>,
        sent: Arc<Mutex<Vec<u8>>>,
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let pos = usize::try_from(self.responses.position()).unwrap();
            let data = self.responses.get_ref();
            if pos < data.len() {
                let remaining = &data[pos..];
                let n = remaining.len().min(buf.remaining());
                buf.put_slice(&remaining[..n]);
                self.responses.set_position((pos + n) as u64);
            }
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            self.sent.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Greeting and LOGIN (A0000) are prepended to `script`.
    async fn session(script: &str) -> (ImapSession<MockStream>, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let data = format!("* OK ready\r\nA0000 OK LOGIN completed\r\n{script}");
        let stream = MockStream {
            responses: Cursor::new(data.into_bytes()),
            sent: Arc::clone(&sent),
        };
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.login("ci", "secret").await.unwrap();
        (ImapSession::new(client), sent)
    }

    fn sent_lines(sent: &Arc<Mutex<Vec<u8>>>) -> Vec<String> {
        String::from_utf8(sent.lock().unwrap().clone())
            .unwrap()
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn criteria() -> Criteria {
        let mut config = Configuration::parse("host=h\nusername=u\npassword=p").unwrap();
        apply_defaults(&mut config);
        Criteria::build(&config, Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap()).unwrap()
    }

    const SELECT_OK: &str = "* 2 EXISTS\r\nA0001 OK [READ-WRITE] SELECT completed\r\n";

    #[tokio::test]
    async fn select_search_and_mark() {
        let script = format!(
            "{SELECT_OK}\
             * SEARCH 12 10\r\n\
             A0002 OK SEARCH completed\r\n\
             * 1 FETCH (UID 10 FLAGS () INTERNALDATE \"08-Mar-2026 09:00:00 +0000\" RFC822.SIZE 100 ENVELOPE (NIL \"jenkins > a\" NIL NIL NIL NIL NIL NIL NIL NIL))\r\n\
             * 2 FETCH (UID 12 FLAGS () INTERNALDATE \"08-Mar-2026 10:00:00 +0000\" RFC822.SIZE 200 ENVELOPE (NIL \"jenkins > b\" NIL NIL NIL NIL NIL NIL NIL NIL))\r\n\
             A0003 OK FETCH completed\r\n\
             A0004 OK STORE completed\r\n\
             * BYE\r\n\
             A0005 OK LOGOUT completed\r\n"
        );
        let (mut session, sent) = session(&script).await;

        session.select_folder("INBOX").await.unwrap();
        assert_eq!(session.selected_folder(), Some("INBOX"));

        let messages = session.search(&criteria()).await.unwrap();
        let uids: Vec<u32> = messages.iter().map(|m| m.uid).collect();
        assert_eq!(uids, vec![12, 10]);
        assert_eq!(messages[0].subject.as_deref(), Some("jenkins > b"));

        session.mark_processed(&messages[0]).await.unwrap();
        session.close().await;
        assert!(session.is_closed());

        let lines = sent_lines(&sent);
        assert_eq!(lines[1], "A0001 SELECT INBOX");
        assert!(lines[2].starts_with("A0002 UID SEARCH UNSEEN SUBJECT \"jenkins >\" SINCE "));
        assert_eq!(
            lines[3],
            "A0003 UID FETCH 10,12 (UID FLAGS INTERNALDATE ENVELOPE RFC822.SIZE)"
        );
        assert_eq!(lines[4], "A0004 UID STORE 12 +FLAGS.SILENT (\\Seen)");
        assert_eq!(lines[5], "A0005 LOGOUT");
    }

    #[tokio::test]
    async fn selecting_again_closes_the_previous_folder() {
        let script = format!(
            "{SELECT_OK}\
             A0002 OK CLOSE completed\r\n\
             * 0 EXISTS\r\n\
             A0003 OK SELECT completed\r\n"
        );
        let (mut session, sent) = session(&script).await;

        session.select_folder("INBOX").await.unwrap();
        session.select_folder("Builds").await.unwrap();
        assert_eq!(session.selected_folder(), Some("Builds"));

        let lines = sent_lines(&sent);
        assert_eq!(&lines[1..], ["A0001 SELECT INBOX", "A0002 CLOSE", "A0003 SELECT Builds"]);
    }

    #[tokio::test]
    async fn failed_close_leaves_the_session_closed() {
        let script = format!("{SELECT_OK}A0002 BAD CLOSE not allowed\r\n");
        let (mut session, _) = session(&script).await;

        session.select_folder("INBOX").await.unwrap();
        let err = session.select_folder("Builds").await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn nonexistent_code_means_folder_not_found() {
        let script = "A0001 NO [NONEXISTENT] Unknown Mailbox: Archive\r\n";
        let (mut session, _) = session(script).await;

        let err = session.select_folder("Archive").await.unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(name) if name == "Archive"));
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn plain_no_falls_back_to_list() {
        let script = "A0001 NO Mailbox does not exist\r\n\
                      * LIST (\\HasNoChildren) \"/\" INBOX\r\n\
                      * LIST (\\HasNoChildren) \"/\" Sent\r\n\
                      A0002 OK LIST completed\r\n\
                      * LIST (\\HasNoChildren) \"/\" INBOX\r\n\
                      * LIST (\\HasNoChildren) \"/\" Sent\r\n\
                      A0003 OK LIST completed\r\n";
        let (mut session, _) = session(script).await;

        let err = session.select_folder("Archive").await.unwrap_err();
        assert!(matches!(err, Error::FolderNotFound(_)));

        let names = session.list_folder_names().await.unwrap();
        assert_eq!(names, vec!["INBOX", "Sent"]);
    }

    #[tokio::test]
    async fn no_for_existing_folder_is_connection_error() {
        let script = "A0001 NO [NOPERM] Access denied\r\n\
                      * LIST () \"/\" Locked\r\n\
                      A0002 OK LIST completed\r\n";
        let (mut session, _) = session(script).await;

        let err = session.select_folder("Locked").await.unwrap_err();
        assert!(matches!(err, Error::Connection(m) if m.contains("Access denied")));
    }

    #[tokio::test]
    async fn empty_search_skips_fetch() {
        let script = format!("{SELECT_OK}* SEARCH\r\nA0002 OK SEARCH completed\r\n");
        let (mut session, sent) = session(&script).await;

        session.select_folder("INBOX").await.unwrap();
        assert!(session.search(&criteria()).await.unwrap().is_empty());
        assert_eq!(sent_lines(&sent).len(), 3);
    }

    #[tokio::test]
    async fn store_rejection_is_mark_error() {
        let script = format!("{SELECT_OK}A0002 NO [CANNOT] read-only mailbox\r\n");
        let (mut session, _) = session(&script).await;

        session.select_folder("INBOX").await.unwrap();
        let message = Message {
            uid: 7,
            ..Message::default()
        };
        let err = session.mark_processed(&message).await.unwrap_err();
        assert!(matches!(err, Error::Mark(m) if m.starts_with("uid 7")));
    }

    #[tokio::test]
    async fn search_requires_selection() {
        let (mut session, _) = session("").await;
        let err = session.search(&criteria()).await.unwrap_err();
        assert!(matches!(err, Error::Search(_)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut session, sent) = session("* BYE\r\nA0001 OK LOGOUT completed\r\n").await;
        session.close().await;
        session.close().await;
        assert!(session.is_closed());
        assert_eq!(sent_lines(&sent).len(), 2);
    }

    #[tokio::test]
    async fn close_tolerates_dropped_connection() {
        let (mut session, _) = session("").await;
        session.close().await;
        assert!(session.is_closed());
    }
}
