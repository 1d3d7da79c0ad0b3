//! Lexical units of a server response.

/// One token. Atoms borrow from the input; strings and literals are owned
/// because unescaping or raw bytes may not be valid UTF-8 in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Bare word: status keywords, flags, tags, capability names.
    Atom(&'a str),
    /// Run of ASCII digits that fits a `u32`.
    Number(u32),
    /// `"..."` with `\"` and `\\` resolved.
    Quoted(String),
    /// Payload of a `{n}` literal.
    Literal(Vec<u8>),
    /// `NIL` in any case.
    Nil,
    /// `(`
    Open,
    /// `)`
    Close,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// ` `
    Space,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `\r\n`
    Crlf,
    /// Nothing left.
    Eof,
}

impl Token<'_> {
    /// Text of a string-valued token: atom, number, quoted string or literal.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Atom(s) => Some(s.to_owned()),
            Self::Number(n) => Some(n.to_string()),
            Self::Quoted(s) => Some(s),
            Self::Literal(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            _ => None,
        }
    }

    /// Single-byte punctuation for `byte`, if it is one.
    pub(super) const fn punctuation(byte: u8) -> Option<Self> {
        Some(match byte {
            b'(' => Self::Open,
            b')' => Self::Close,
            b'[' => Self::OpenBracket,
            b']' => Self::CloseBracket,
            b' ' => Self::Space,
            b'*' => Self::Star,
            b'+' => Self::Plus,
            _ => return None,
        })
    }
}
