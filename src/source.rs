// Copyright (c) 2018 Fabian Schuiki

//! The grammar source buffer.
//!
//! The whole grammar is kept in memory for the entire run. Semantic actions,
//! attributes and declarations are not copied out while parsing; instead the
//! parser records `Position` spans into the buffer and the code generators
//! copy the text once they emit it.

use std::fmt;
use std::str;

use errors::FatalError;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// The immutable text of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    text: String,
}

impl Source {
    /// Create a source buffer from a string.
    pub fn new<S: Into<String>>(text: S) -> Source {
        Source { text: text.into() }
    }

    /// Create a source buffer from raw file contents.
    ///
    /// A leading UTF-8 byte-order mark is skipped. A byte sequence that starts
    /// like a byte-order mark but is not one, or contents that are not valid
    /// UTF-8, are fatal.
    pub fn from_bytes(bytes: &[u8]) -> Result<Source, FatalError> {
        let body = if bytes.starts_with(&UTF8_BOM) {
            &bytes[3..]
        } else if !bytes.is_empty() && bytes[0] == UTF8_BOM[0] {
            return Err(FatalError::IllegalByteOrderMark);
        } else {
            bytes
        };
        match str::from_utf8(body) {
            Ok(s) => Ok(Source::new(s)),
            Err(e) => Err(FatalError::NotUtf8(e.valid_up_to())),
        }
    }

    /// The full text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text covered by a position.
    ///
    /// Fails if the span does not lie on character boundaries within the
    /// buffer.
    pub fn slice(&self, pos: &Position) -> Result<&str, FatalError> {
        self.text
            .get(pos.beg..pos.end)
            .ok_or(FatalError::PositionOutOfBounds(pos.beg, pos.end))
    }
}

/// A span of verbatim source text.
///
/// `beg` and `end` are byte offsets into the `Source`, `col` is the zero-based
/// column of the first character and `line` is one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset of the first character.
    pub beg: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Column of the first character.
    pub col: usize,
    /// Line of the first character.
    pub line: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(beg: usize, end: usize, col: usize, line: usize) -> Position {
        Position {
            beg: beg,
            end: end,
            col: col,
            line: line,
        }
    }

    /// Whether the span covers no text.
    pub fn is_empty(&self) -> bool {
        self.end <= self.beg
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} [{}..{}]", self.line, self.col, self.beg, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_is_skipped() {
        let src = Source::from_bytes(b"\xEF\xBB\xBFCOMPILER").unwrap();
        assert_eq!(src.text(), "COMPILER");
    }

    #[test]
    fn broken_bom_is_fatal() {
        assert_eq!(
            Source::from_bytes(b"\xEF\x00abc"),
            Err(FatalError::IllegalByteOrderMark)
        );
    }

    #[test]
    fn invalid_utf8_is_fatal() {
        assert_eq!(Source::from_bytes(b"ab\xFFcd"), Err(FatalError::NotUtf8(2)));
    }

    #[test]
    fn slicing() {
        let src = Source::new("abc (. x = 1; .) def");
        let pos = Position::new(7, 14, 7, 1);
        assert_eq!(src.slice(&pos).unwrap(), "x = 1; ");
        assert!(src.slice(&Position::new(7, 99, 0, 1)).is_err());
    }
}
