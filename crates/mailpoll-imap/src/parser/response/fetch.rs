//! The parenthesized attribute list of `* n FETCH`.

use crate::Result;
use crate::parser::lexer::{Lexer, Token};
use crate::types::Uid;

use super::helpers::flag_list;
use super::types::{Address, Envelope, FetchItem};

/// `"(" att SP value *(SP att SP value) ")"`. Attributes without a
/// [`FetchItem`] variant are stepped over.
pub fn items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::Open)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::Close => return Ok(items),
            Token::Eof => return Err(lexer.error("FETCH list never closed")),
            Token::Atom(name) => name.to_ascii_uppercase(),
            _ => continue,
        };

        let item = match name.as_str() {
            "UID" => {
                lexer.space()?;
                let n = lexer.number()?;
                Uid::new(n)
                    .map(FetchItem::Uid)
                    .ok_or_else(|| lexer.error("UID 0 in FETCH"))?
            }
            "FLAGS" => {
                lexer.space()?;
                FetchItem::Flags(flag_list(lexer)?)
            }
            "INTERNALDATE" => {
                lexer.space()?;
                match lexer.nstring()? {
                    Some(date) => FetchItem::InternalDate(date),
                    None => continue,
                }
            }
            "RFC822.SIZE" => {
                lexer.space()?;
                FetchItem::Rfc822Size(lexer.number()?)
            }
            "ENVELOPE" => {
                lexer.space()?;
                FetchItem::Envelope(Box::new(envelope(lexer)?))
            }
            _ => {
                skip_value(lexer)?;
                continue;
            }
        };
        items.push(item);
    }
}

/// The ten-field envelope structure.
pub fn envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(Token::Open)?;

    let date = lexer.nstring()?;
    lexer.space()?;
    let subject = lexer.nstring()?;

    let mut lists: [Vec<Address>; 6] = Default::default();
    for list in &mut lists {
        lexer.space()?;
        *list = addresses(lexer)?;
    }
    let [from, sender, reply_to, to, cc, bcc] = lists;

    lexer.space()?;
    let in_reply_to = lexer.nstring()?;
    lexer.space()?;
    let message_id = lexer.nstring()?;
    lexer.expect(Token::Close)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

/// `NIL` or a parenthesized run of addresses. Group start and end markers
/// are left out.
pub fn addresses(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => return Ok(Vec::new()),
        Token::Open => {}
        other => return Err(lexer.error(&format!("{other:?} where an address list belongs"))),
    }

    let mut found = Vec::new();
    loop {
        match lexer.peek() {
            Some(b')') => {
                lexer.bump();
                return Ok(found);
            }
            Some(b' ') => {
                lexer.bump();
            }
            Some(b'(') => {
                let address = address(lexer)?;
                if !address.is_group_marker() {
                    found.push(address);
                }
            }
            _ => return Err(lexer.error("address list never closed")),
        }
    }
}

fn address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(Token::Open)?;
    let mut parts: [Option<String>; 4] = Default::default();
    for (i, part) in parts.iter_mut().enumerate() {
        if i > 0 {
            lexer.space()?;
        }
        *part = lexer.nstring()?;
    }
    lexer.expect(Token::Close)?;

    let [name, adl, mailbox, host] = parts;
    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}

/// Steps over one attribute value: an optional `[section]`, then an atom,
/// string, literal or balanced parenthesized group.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek() == Some(b'[') {
        while !matches!(lexer.bump(), Some(b']') | None) {}
    }
    lexer.eat(b' ');

    let mut depth = 0usize;
    while let Some(byte) = lexer.peek() {
        match byte {
            b' ' | b')' if depth == 0 => break,
            b'(' => depth += 1,
            b')' => depth -= 1,
            // Strings and literals may hold unbalanced parentheses.
            b'"' | b'{' => {
                lexer.next_token()?;
                continue;
            }
            _ => {}
        }
        lexer.bump();
    }
    Ok(())
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
    use super::*;

    fn fetch(input: &[u8]) -> Vec<FetchItem> {
        items(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn uid_flags_and_size() {
        let got = fetch(b"(FLAGS (\\Seen \\Flagged) UID 88 RFC822.SIZE 4031)");
        assert!(matches!(&got[0], FetchItem::Flags(f) if f.is_seen() && f.len() == 2));
        assert!(matches!(got[1], FetchItem::Uid(uid) if uid.get() == 88));
        assert_eq!(got[2], FetchItem::Rfc822Size(4031));
    }

    #[test]
    fn uid_zero_fails() {
        assert!(items(&mut Lexer::new(b"(UID 0)")).is_err());
    }

    #[test]
    fn unterminated_list_fails() {
        assert!(items(&mut Lexer::new(b"(UID 5")).is_err());
    }

    #[test]
    fn nil_internal_date_is_dropped() {
        assert!(fetch(b"(INTERNALDATE NIL)").is_empty());
    }

    #[test]
    fn unmodelled_items_are_stepped_over() {
        let got = fetch(
            b"(MODSEQ (624140003) BODY[HEADER.FIELDS (X-JOB)] {12}\r\nX-Job: (a\r\n\r UID 7)",
        );
        assert_eq!(got.len(), 1);
        assert!(matches!(got[0], FetchItem::Uid(uid) if uid.get() == 7));
    }

    #[test]
    fn envelope_fields() {
        let raw = b"(\"Sun, 8 Mar 2026 11:58:03 +0000\" \"[jenkins] nightly #311 passed\" \
            ((\"Jenkins CI\" NIL \"ci\" \"build.example.org\")) \
            ((NIL NIL \"ci\" \"build.example.org\")) \
            ((NIL NIL \"noreply\" \"build.example.org\")) \
            ((NIL NIL \"dev\" \"example.org\")(\"Release Team\" NIL \"release\" \"example.org\")) \
            NIL NIL \"<root@example.org>\" \"<311.nightly@build.example.org>\")";
        let envelope = envelope(&mut Lexer::new(raw)).unwrap();

        assert_eq!(
            envelope.subject.as_deref(),
            Some("[jenkins] nightly #311 passed")
        );
        assert_eq!(envelope.from[0].name.as_deref(), Some("Jenkins CI"));
        assert_eq!(
            envelope.reply_to[0].email().as_deref(),
            Some("noreply@build.example.org")
        );
        assert_eq!(envelope.to.len(), 2);
        assert_eq!(envelope.to[1].mailbox.as_deref(), Some("release"));
        assert!(envelope.cc.is_empty() && envelope.bcc.is_empty());
        assert_eq!(envelope.in_reply_to.as_deref(), Some("<root@example.org>"));
        assert_eq!(
            envelope.message_id.as_deref(),
            Some("<311.nightly@build.example.org>")
        );
    }

    #[test]
    fn group_syntax_is_flattened() {
        let raw = b"((NIL NIL \"ops\" NIL)(NIL NIL \"pager\" \"example.org\")(NIL NIL NIL NIL))";
        let list = addresses(&mut Lexer::new(raw)).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].email().as_deref(), Some("pager@example.org"));
    }

    #[test]
    fn subject_may_arrive_as_literal() {
        let raw = b"(NIL {9}\r\nBuild (1) NIL NIL NIL NIL NIL NIL NIL NIL)";
        let envelope = envelope(&mut Lexer::new(raw)).unwrap();
        assert_eq!(envelope.subject.as_deref(), Some("Build (1)"));
        assert!(envelope.from.is_empty());
    }
}
