//! Byte cursor that splits one server response into [`Token`]s.

#![allow(clippy::missing_errors_doc)]

mod token;

pub use token::Token;

use crate::{Error, Result};

/// Cursor over one complete response, literal payloads included.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Starts at the first byte of `input`.
    #[must_use]
    pub const fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Byte offset of the cursor.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Unread input.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        self.input.get(self.pos..).unwrap_or_default()
    }

    /// True once every byte has been consumed.
    #[must_use]
    pub const fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Byte under the cursor.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Consumes and returns the byte under the cursor.
    pub fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes `byte` if it is next. Returns whether it was.
    pub fn eat(&mut self, byte: u8) -> bool {
        let hit = self.peek() == Some(byte);
        if hit {
            self.pos += 1;
        }
        hit
    }

    /// Moves forward `n` bytes, stopping at the end.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.input.len().min(self.pos.saturating_add(n));
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Result<Token<'a>> {
        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        if let Some(token) = Token::punctuation(byte) {
            self.pos += 1;
            return Ok(token);
        }

        match byte {
            b'\r' if self.input.get(self.pos + 1) == Some(&b'\n') => {
                self.pos += 2;
                Ok(Token::Crlf)
            }
            b'"' => self.quoted(),
            b'{' => self.literal(),
            _ if is_atom_char(byte) => self.word(),
            _ => Err(self.error(&format!("unexpected byte {byte:#04x}"))),
        }
    }

    fn quoted(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let mut text = Vec::new();

        loop {
            let byte = self
                .bump()
                .ok_or_else(|| self.error("quoted string never closed"))?;
            match byte {
                b'"' => return Ok(Token::Quoted(String::from_utf8_lossy(&text).into_owned())),
                b'\\' => match self.bump() {
                    Some(escaped @ (b'"' | b'\\')) => text.push(escaped),
                    Some(other) => {
                        return Err(self.error(&format!("bad escape \\{}", char::from(other))));
                    }
                    None => return Err(self.error("quoted string never closed")),
                },
                _ => text.push(byte),
            }
        }
    }

    fn literal(&mut self) -> Result<Token<'a>> {
        self.pos += 1;
        let digits = self.take_while(|b| b.is_ascii_digit());
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| self.error("literal size is not a number"))?;

        self.eat(b'+');
        if !(self.eat(b'}') && self.eat(b'\r') && self.eat(b'\n')) {
            return Err(self.error("literal size must be followed by }CRLF"));
        }

        let input = self.input;
        let payload = input
            .get(self.pos..self.pos.saturating_add(size))
            .ok_or_else(|| self.error("literal shorter than announced"))?;
        self.pos += size;

        Ok(Token::Literal(payload.to_vec()))
    }

    fn word(&mut self) -> Result<Token<'a>> {
        let raw = self.take_while(is_atom_char);
        let word = std::str::from_utf8(raw).map_err(|_| self.error("atom is not UTF-8"))?;

        if word.bytes().all(|b| b.is_ascii_digit()) {
            word.parse()
                .map(Token::Number)
                .map_err(|_| self.error("number overflows u32"))
        } else if word.eq_ignore_ascii_case("NIL") {
            Ok(Token::Nil)
        } else {
            Ok(Token::Atom(word))
        }
    }

    fn take_while(&mut self, keep: impl Fn(u8) -> bool) -> &'a [u8] {
        let input = self.input;
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    /// Everything up to the next CRLF, which is consumed but not returned.
    pub fn rest_of_line(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .windows(2)
            .position(|pair| pair == b"\r\n")
            .unwrap_or(rest.len());
        self.skip(len);
        if self.peek() == Some(b'\r') {
            self.skip(2);
        }
        String::from_utf8_lossy(&rest[..len]).into_owned()
    }

    /// Parse error located at the cursor.
    #[must_use]
    pub fn error(&self, message: &str) -> Error {
        Error::Parse {
            position: self.pos,
            message: message.to_owned(),
        }
    }

    /// Consumes a token of the same variant as `wanted`.
    #[allow(clippy::needless_pass_by_value)]
    pub fn expect(&mut self, wanted: Token<'_>) -> Result<()> {
        let found = self.next_token()?;
        if std::mem::discriminant(&found) == std::mem::discriminant(&wanted) {
            Ok(())
        } else {
            Err(self.error(&format!("wanted {wanted:?}, found {found:?}")))
        }
    }

    /// Consumes exactly one space.
    pub fn space(&mut self) -> Result<()> {
        self.expect(Token::Space)
    }

    /// Atom, number, quoted string or literal, as text.
    pub fn astring(&mut self) -> Result<String> {
        let token = self.next_token()?;
        match token {
            Token::Nil => Ok("NIL".to_owned()),
            other => {
                let shown = format!("{other:?}");
                other
                    .into_text()
                    .ok_or_else(|| self.error(&format!("wanted a string, found {shown}")))
            }
        }
    }

    /// `NIL`, quoted string or literal.
    pub fn nstring(&mut self) -> Result<Option<String>> {
        match self.next_token()? {
            Token::Nil => Ok(None),
            token @ (Token::Quoted(_) | Token::Literal(_)) => Ok(token.into_text()),
            other => Err(self.error(&format!("wanted NIL or a string, found {other:?}"))),
        }
    }

    /// Unsigned number.
    pub fn number(&mut self) -> Result<u32> {
        match self.next_token()? {
            Token::Number(n) => Ok(n),
            other => Err(self.error(&format!("wanted a number, found {other:?}"))),
        }
    }

    /// Bare atom.
    pub fn atom(&mut self) -> Result<&'a str> {
        match self.next_token()? {
            Token::Atom(word) => Ok(word),
            other => Err(self.error(&format!("wanted an atom, found {other:?}"))),
        }
    }
}

/// Bytes allowed inside an atom.
///
/// `\` counts, so system flags like `\Seen` come out as a single atom.
#[must_use]
pub const fn is_atom_char(byte: u8) -> bool {
    matches!(byte, 0x21..=0x7E)
        && !matches!(byte, b'(' | b')' | b'{' | b'"' | b'%' | b'*' | b'[' | b']')
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

    fn lex(input: &[u8]) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(input);
        std::iter::from_fn(|| match lexer.next_token().unwrap() {
            Token::Eof => None,
            token => Some(token),
        })
        .collect()
    }

    #[test]
    fn status_line() {
        assert_eq!(
            lex(b"A0004 NO [TRYCREATE] nope\r\n"),
            vec![
                Token::Atom("A0004"),
                Token::Space,
                Token::Atom("NO"),
                Token::Space,
                Token::OpenBracket,
                Token::Atom("TRYCREATE"),
                Token::CloseBracket,
                Token::Space,
                Token::Atom("nope"),
                Token::Crlf,
            ]
        );
    }

    #[test]
    fn digits_become_numbers_and_nil_is_case_insensitive() {
        assert_eq!(
            lex(b"4096 Nil x1"),
            vec![
                Token::Number(4096),
                Token::Space,
                Token::Nil,
                Token::Space,
                Token::Atom("x1"),
            ]
        );
    }

    #[test]
    fn oversized_number_is_an_error() {
        assert!(Lexer::new(b"99999999999").next_token().is_err());
    }

    #[test]
    fn backslash_flags_stay_whole() {
        assert_eq!(
            lex(b"(\\Answered NonJunk)"),
            vec![
                Token::Open,
                Token::Atom("\\Answered"),
                Token::Space,
                Token::Atom("NonJunk"),
                Token::Close,
            ]
        );
    }

    #[test]
    fn quoted_escapes_are_resolved() {
        assert_eq!(
            lex(br#""a \"b\" c\\d""#),
            vec![Token::Quoted(r#"a "b" c\d"#.to_string())]
        );
    }

    #[test]
    fn bad_escape_and_open_quote_fail() {
        assert!(Lexer::new(br#""\n""#).next_token().is_err());
        assert!(matches!(
            Lexer::new(b"\"never closed").next_token(),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn literal_payload_may_contain_anything() {
        assert_eq!(
            lex(b"{7}\r\n(a\r\n\"b) X"),
            vec![
                Token::Literal(b"(a\r\n\"b)".to_vec()),
                Token::Space,
                Token::Atom("X"),
            ]
        );
    }

    #[test]
    fn short_literal_fails() {
        assert!(Lexer::new(b"{9}\r\nabc").next_token().is_err());
        assert!(Lexer::new(b"{3}abc").next_token().is_err());
    }

    #[test]
    fn rest_of_line_consumes_crlf() {
        let mut lexer = Lexer::new(b"free text [x]\r\nnext");
        assert_eq!(lexer.rest_of_line(), "free text [x]");
        assert_eq!(lexer.rest(), b"next");
    }

    #[test]
    fn astring_accepts_every_string_form() {
        let mut lexer = Lexer::new(b"INBOX 42 \"Sent Items\" {4}\r\nJunk");
        assert_eq!(lexer.astring().unwrap(), "INBOX");
        lexer.space().unwrap();
        assert_eq!(lexer.astring().unwrap(), "42");
        lexer.space().unwrap();
        assert_eq!(lexer.astring().unwrap(), "Sent Items");
        lexer.space().unwrap();
        assert_eq!(lexer.astring().unwrap(), "Junk");
        assert!(lexer.at_end());
    }

    #[test]
    fn nstring_rejects_atoms() {
        assert_eq!(Lexer::new(b"NIL").nstring().unwrap(), None);
        assert!(Lexer::new(b"bare").nstring().is_err());
    }
}
