//! Whole conversations against a scripted server on an in-memory pipe.

#![allow(clippy::unwrap_used)]

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;

use mailpoll_imap::{
    Capability, Client, Error, FetchAttribute, FetchItem, Flag, MailboxAttribute, ResponseCode,
    SearchCriteria, SelectOutcome, Uid, UidSet,
};

const GREETING: &str = "* OK [CAPABILITY IMAP4rev1 AUTH=PLAIN] ready\r\n";

/// Starts a server that sends `greeting`, then for each step reads one
/// command line, checks it and answers. It hangs up after the last step.
fn server(greeting: &'static str, steps: Vec<(&'static str, &'static str)>) -> (DuplexStream, JoinHandle<()>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let handle = tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(server);
        let mut lines = BufReader::new(read).lines();

        write.write_all(greeting.as_bytes()).await.unwrap();
        for (expected, reply) in steps {
            let command = lines.next_line().await.unwrap().unwrap();
            assert_eq!(command, expected);
            write.write_all(reply.as_bytes()).await.unwrap();
        }
    });
    (client, handle)
}

async fn logged_in(
    steps: Vec<(&'static str, &'static str)>,
) -> (Client<DuplexStream, mailpoll_imap::Authenticated>, JoinHandle<()>) {
    let mut all = vec![("A0000 LOGIN ci secret", "A0000 OK LOGIN completed\r\n")];
    all.extend(steps);
    let (stream, handle) = server(GREETING, all);
    let client = Client::from_stream(stream).await.unwrap();
    (client.login("ci", "secret").await.unwrap(), handle)
}

#[tokio::test]
async fn greeting_capabilities_are_kept() {
    let (stream, handle) = server(GREETING, Vec::new());
    let client = Client::from_stream(stream).await.unwrap();

    assert_eq!(
        client.capabilities(),
        [Capability::Imap4Rev1, Capability::Auth("PLAIN".to_string())]
    );
    handle.await.unwrap();
}

#[tokio::test]
async fn bye_greeting_is_refused() {
    let (stream, handle) = server("* BYE too many connections from your IP\r\n", Vec::new());
    let err = Client::from_stream(stream).await.unwrap_err();

    assert!(matches!(err, Error::Bye(text) if text == "too many connections from your IP"));
    handle.await.unwrap();
}

#[tokio::test]
async fn rejected_login_carries_the_server_text() {
    let (stream, handle) = server(
        GREETING,
        vec![(
            "A0000 LOGIN ci wrong",
            "A0000 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n",
        )],
    );
    let client = Client::from_stream(stream).await.unwrap();

    match client.login("ci", "wrong").await.unwrap_err() {
        Error::No { code, text } => {
            assert_eq!(code, Some(ResponseCode::AuthenticationFailed));
            assert_eq!(text, "Invalid credentials (Failure)");
        }
        other => panic!("expected NO, got {other:?}"),
    }
    handle.await.unwrap();
}

#[tokio::test]
async fn login_disabled_is_refused_locally() {
    let (stream, handle) = server("* OK [CAPABILITY IMAP4rev1 STARTTLS LOGINDISABLED] hi\r\n", Vec::new());
    let client = Client::from_stream(stream).await.unwrap();

    let err = client.login("ci", "secret").await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    handle.await.unwrap();
}

#[tokio::test]
async fn login_completion_refreshes_capabilities() {
    let (stream, handle) = server(
        GREETING,
        vec![(
            "A0000 LOGIN ci secret",
            "A0000 OK [CAPABILITY IMAP4rev1 IDLE MOVE] Logged in\r\n",
        )],
    );
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("ci", "secret").await.unwrap();

    assert!(client.has_capability(&Capability::Other("MOVE".to_string())));
    assert!(!client.has_capability(&Capability::Auth("PLAIN".to_string())));
    handle.await.unwrap();
}

#[tokio::test]
async fn missing_folder_then_list_on_the_same_connection() {
    let (client, handle) = logged_in(vec![
        (
            "A0001 SELECT Builds",
            "A0001 NO [NONEXISTENT] Unknown Mailbox: Builds\r\n",
        ),
        (
            "A0002 LIST \"\" *",
            "* LIST (\\HasNoChildren) \"/\" INBOX\r\n\
             * LIST (\\HasNoChildren) \"/\" \"Sent Items\"\r\n\
             * LIST (\\Noselect \\HasChildren) \"/\" Archive\r\n\
             A0002 OK LIST completed\r\n",
        ),
        (
            "A0003 LOGOUT",
            "* BYE logging out\r\nA0003 OK LOGOUT completed\r\n",
        ),
    ])
    .await;

    let SelectOutcome::Rejected { mut client, code, text } = client.select("Builds").await.unwrap()
    else {
        panic!("SELECT should have been refused");
    };
    assert!(code.is_some_and(|c| c.is_missing_mailbox()));
    assert_eq!(text, "Unknown Mailbox: Builds");

    let folders = client.list("", "*").await.unwrap();
    let names: Vec<&str> = folders.iter().map(|f| f.mailbox.as_str()).collect();
    assert_eq!(names, ["INBOX", "Sent Items", "Archive"]);
    assert!(folders[2].attributes.contains(&MailboxAttribute::NoSelect));

    client.logout().await.unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn bad_select_is_an_error() {
    let (client, handle) = logged_in(vec![(
        "A0001 SELECT INBOX",
        "A0001 BAD command unknown or arguments invalid\r\n",
    )])
    .await;

    assert!(matches!(client.select("INBOX").await, Err(Error::Bad(_))));
    handle.await.unwrap();
}

#[tokio::test]
async fn search_fetch_and_mark_seen() {
    let (client, handle) = logged_in(vec![
        (
            "A0001 SELECT INBOX",
            "* 2 EXISTS\r\n* OK [UIDVALIDITY 7] UIDs valid\r\nA0001 OK [READ-WRITE] SELECT completed\r\n",
        ),
        (
            "A0002 UID SEARCH UNSEEN SUBJECT \"jenkins >\"",
            "* SEARCH 12 10\r\nA0002 OK SEARCH completed\r\n",
        ),
        (
            "A0003 UID FETCH 10,12 (UID FLAGS ENVELOPE)",
            "* 1 FETCH (UID 10 FLAGS () RFC822.SIZE 512 ENVELOPE (NIL \"jenkins > build #1\" \
             ((\"Jenkins\" NIL \"ci\" \"example.com\")) NIL NIL NIL NIL NIL NIL \"<1@example.com>\"))\r\n\
             * 2 FETCH (UID 12 FLAGS (\\Flagged) ENVELOPE (NIL {18}\r\n\
             jenkins > build #2 NIL NIL NIL NIL NIL NIL NIL NIL))\r\n\
             A0003 OK FETCH completed\r\n",
        ),
        (
            "A0004 UID STORE 10 +FLAGS.SILENT (\\Seen)",
            "A0004 OK STORE completed\r\n",
        ),
    ])
    .await;

    let SelectOutcome::Selected(mut client, status) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };
    assert_eq!(status.exists, 2);
    assert_eq!(status.uid_validity, Some(7));
    assert!(!status.read_only);

    let criteria = SearchCriteria::And(vec![
        SearchCriteria::Unseen,
        SearchCriteria::Subject("jenkins >".to_string()),
    ]);
    let uids = client.uid_search(&criteria).await.unwrap();
    assert_eq!(uids.iter().map(|u| u.get()).collect::<Vec<_>>(), [12, 10]);

    let set: UidSet = uids.iter().copied().collect();
    let fetched = client
        .uid_fetch(
            &set,
            &[FetchAttribute::Uid, FetchAttribute::Flags, FetchAttribute::Envelope],
        )
        .await
        .unwrap();
    assert_eq!(fetched.len(), 2);

    let subject = |items: &[FetchItem]| {
        items.iter().find_map(|item| match item {
            FetchItem::Envelope(envelope) => envelope.subject.clone(),
            _ => None,
        })
    };
    assert_eq!(subject(&fetched[0].1).as_deref(), Some("jenkins > build #1"));
    assert!(fetched[0].1.contains(&FetchItem::Rfc822Size(512)));
    assert_eq!(subject(&fetched[1].1).as_deref(), Some("jenkins > build #2"));

    client
        .uid_store(&UidSet::single(Uid::new(10).unwrap()), &[Flag::Seen])
        .await
        .unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn empty_sets_send_nothing() {
    let (client, handle) = logged_in(vec![("A0001 SELECT INBOX", "A0001 OK SELECT completed\r\n")]).await;
    let SelectOutcome::Selected(mut client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };

    let fetched = client
        .uid_fetch(&UidSet::default(), &[FetchAttribute::Uid])
        .await
        .unwrap();
    assert!(fetched.is_empty());
    client
        .uid_store(&UidSet::default(), &[Flag::Seen])
        .await
        .unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn garbage_untagged_line_does_not_end_the_command() {
    let (client, handle) = logged_in(vec![
        ("A0001 SELECT INBOX", "A0001 OK SELECT completed\r\n"),
        (
            "A0002 UID SEARCH UNSEEN",
            "* SEARCH 4\r\n* \x01\x02 noise\r\nA0002 OK done\r\n",
        ),
    ])
    .await;
    let SelectOutcome::Selected(mut client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };

    let uids = client.uid_search(&SearchCriteria::Unseen).await.unwrap();
    assert_eq!(uids, [Uid::new(4).unwrap()]);
    handle.await.unwrap();
}

#[tokio::test]
async fn hang_up_mid_command_is_connection_lost() {
    let (stream, handle) = server(GREETING, vec![("A0000 LOGIN ci secret", "* 1 EXISTS\r\n")]);
    let client = Client::from_stream(stream).await.unwrap();

    let err = client.login("ci", "secret").await.unwrap_err();
    assert!(err.is_connection_lost());
    handle.await.unwrap();
}

#[tokio::test]
async fn close_then_select_another_folder() {
    let (client, handle) = logged_in(vec![
        ("A0001 SELECT INBOX", "A0001 OK [READ-WRITE] SELECT completed\r\n"),
        ("A0002 CLOSE", "A0002 OK CLOSE completed\r\n"),
        ("A0003 SELECT Builds", "* 4 EXISTS\r\nA0003 OK SELECT completed\r\n"),
    ])
    .await;

    let SelectOutcome::Selected(client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };
    let client = client.close().await.unwrap();
    let SelectOutcome::Selected(_, status) = client.select("Builds").await.unwrap() else {
        panic!("Builds should open");
    };
    assert_eq!(status.exists, 4);
    handle.await.unwrap();
}

const CYRILLIC: &str = "сборка >";

#[tokio::test]
async fn eight_bit_search_waits_for_continuation() {
    let (client, handle) = logged_in(vec![
        ("A0001 SELECT INBOX", "A0001 OK SELECT completed\r\n"),
        (
            "A0002 UID SEARCH CHARSET UTF-8 SUBJECT {14}",
            "+ Ready for literal data\r\n",
        ),
        (CYRILLIC, "* SEARCH 3\r\nA0002 OK SEARCH completed\r\n"),
    ])
    .await;
    let SelectOutcome::Selected(mut client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };

    let uids = client
        .uid_search(&SearchCriteria::Subject(CYRILLIC.to_string()))
        .await
        .unwrap();
    assert_eq!(uids, [Uid::new(3).unwrap()]);
    handle.await.unwrap();
}

#[tokio::test]
async fn refused_literal_ends_the_command() {
    let (client, handle) = logged_in(vec![
        ("A0001 SELECT INBOX", "A0001 OK SELECT completed\r\n"),
        (
            "A0002 UID SEARCH CHARSET UTF-8 SUBJECT {14}",
            "A0002 BAD [BADCHARSET (US-ASCII)] charset not supported\r\n",
        ),
    ])
    .await;
    let SelectOutcome::Selected(mut client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };

    let err = client
        .uid_search(&SearchCriteria::Subject(CYRILLIC.to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Bad(_)));
    handle.await.unwrap();
}

#[tokio::test]
async fn literal_plus_sends_everything_at_once() {
    let (stream, handle) = server(
        "* OK [CAPABILITY IMAP4rev1 LITERAL+] ready\r\n",
        vec![
            ("A0000 LOGIN ci secret", "A0000 OK LOGIN completed\r\n"),
            ("A0001 SELECT INBOX", "A0001 OK SELECT completed\r\n"),
            ("A0002 UID SEARCH CHARSET UTF-8 SUBJECT {14+}", ""),
            (CYRILLIC, "* SEARCH\r\nA0002 OK SEARCH completed\r\n"),
        ],
    );
    let client = Client::from_stream(stream).await.unwrap();
    let client = client.login("ci", "secret").await.unwrap();
    let SelectOutcome::Selected(mut client, _) = client.select("INBOX").await.unwrap() else {
        panic!("INBOX should open");
    };

    let uids = client
        .uid_search(&SearchCriteria::Subject(CYRILLIC.to_string()))
        .await
        .unwrap();
    assert!(uids.is_empty());
    handle.await.unwrap();
}
