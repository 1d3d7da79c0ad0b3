//! Building a command line piece by piece.

use chrono::NaiveDate;

use super::types::SearchCriteria;
use crate::types::Flag;

/// Space-separated command words, with quoting where the grammar needs it.
///
/// Text that cannot travel in a quoted string becomes a literal. With
/// `literal_plus` the literal is `{n+}` and the command stays one piece;
/// otherwise the command is cut after each `{n}` header and the caller must
/// wait for a continuation before sending the next piece.
#[derive(Debug)]
pub(super) struct Line {
    pieces: Vec<Vec<u8>>,
    bytes: Vec<u8>,
    literal_plus: bool,
}

impl Line {
    pub fn with_tag(tag: &str, literal_plus: bool) -> Self {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(tag.as_bytes());
        Self {
            pieces: Vec::new(),
            bytes,
            literal_plus,
        }
    }

    fn separate(&mut self) {
        if !self.bytes.is_empty() && !self.bytes.ends_with(b"(") {
            self.bytes.push(b' ');
        }
    }

    /// A keyword or any other text that is already valid as is.
    pub fn word(&mut self, word: &str) -> &mut Self {
        self.separate();
        self.bytes.extend_from_slice(word.as_bytes());
        self
    }

    /// An astring: bare when every byte is an atom byte, quoted when a
    /// quoted string can carry it, a literal otherwise.
    pub fn astring(&mut self, value: &str) -> &mut Self {
        if value.bytes().any(needs_literal) {
            return self.literal(value.as_bytes());
        }

        self.separate();
        if value.is_empty() || value.bytes().any(must_quote) {
            self.bytes.push(b'"');
            for byte in value.bytes() {
                if byte == b'"' || byte == b'\\' {
                    self.bytes.push(b'\\');
                }
                self.bytes.push(byte);
            }
            self.bytes.push(b'"');
        } else {
            self.bytes.extend_from_slice(value.as_bytes());
        }
        self
    }

    fn literal(&mut self, data: &[u8]) -> &mut Self {
        self.separate();
        let plus = if self.literal_plus { "+" } else { "" };
        self.bytes
            .extend_from_slice(format!("{{{}{plus}}}\r\n", data.len()).as_bytes());
        if !self.literal_plus {
            self.pieces.push(std::mem::take(&mut self.bytes));
        }
        self.bytes.extend_from_slice(data);
        self
    }

    /// `(a b c)`
    pub fn list<'w>(&mut self, words: impl IntoIterator<Item = &'w str>) -> &mut Self {
        self.separate();
        self.bytes.push(b'(');
        for word in words {
            self.word(word);
        }
        self.bytes.push(b')');
        self
    }

    pub fn date(&mut self, date: NaiveDate) -> &mut Self {
        self.word(&imap_date(date))
    }

    pub fn search(&mut self, criteria: &SearchCriteria) -> &mut Self {
        match criteria {
            SearchCriteria::Unseen => self.word("UNSEEN"),
            SearchCriteria::Subject(text) => self.word("SUBJECT").astring(text),
            SearchCriteria::Since(day) => self.word("SINCE").date(*day),
            SearchCriteria::And(keys) if keys.is_empty() => self.word("ALL"),
            SearchCriteria::And(keys) => keys.iter().fold(self, |line, key| line.search(key)),
        }
    }

    pub fn add_flags(&mut self, flags: &[Flag], silent: bool) -> &mut Self {
        self.word(if silent { "+FLAGS.SILENT" } else { "+FLAGS" })
            .list(flags.iter().map(Flag::as_str))
    }

    /// The pieces to send in order. Every piece but the last ends with a
    /// synchronizing literal header.
    pub fn finish(mut self) -> Vec<Vec<u8>> {
        self.bytes.extend_from_slice(b"\r\n");
        self.pieces.push(self.bytes);
        self.pieces
    }
}

/// Bytes that cannot appear in an atom, plus controls and space.
const fn must_quote(byte: u8) -> bool {
    !matches!(byte, 0x21..=0x7E)
        || matches!(
            byte,
            b'"' | b'\\' | b'(' | b')' | b'{' | b'%' | b'*' | b']'
        )
}

/// Quoted strings hold 7-bit text without CR, LF or NUL.
const fn needs_literal(byte: u8) -> bool {
    byte >= 0x80 || matches!(byte, b'\0' | b'\r' | b'\n')
}

/// `d-Mon-yyyy`, the day not zero-padded.
#[must_use]
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}
