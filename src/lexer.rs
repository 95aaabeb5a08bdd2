// Copyright (c) 2018 Fabian Schuiki

//! A lexer for grammar descriptions.
//!
//! Tokens carry their kind as a plain number so the parser can test them
//! against bit sets. Anything the lexer does not understand becomes a
//! `NO_SYM` token rather than an error, since semantic actions may contain
//! arbitrary text that the parser skips token by token.

use std::iter::Peekable;
use std::str::CharIndices;

#[allow(missing_docs)]
pub mod kind {
    pub const EOF: usize = 0;
    pub const IDENT: usize = 1;
    pub const NUMBER: usize = 2;
    pub const STRING: usize = 3;
    pub const BAD_STRING: usize = 4;
    pub const CHAR: usize = 5;
    pub const COMPILER: usize = 6;
    pub const IGNORECASE: usize = 7;
    pub const CHARACTERS: usize = 8;
    pub const TOKENS: usize = 9;
    pub const PRAGMAS: usize = 10;
    pub const COMMENTS: usize = 11;
    pub const FROM: usize = 12;
    pub const TO: usize = 13;
    pub const NESTED: usize = 14;
    pub const IGNORE: usize = 15;
    pub const PRODUCTIONS: usize = 16;
    pub const EQUAL: usize = 17;
    pub const PERIOD: usize = 18;
    pub const END: usize = 19;
    pub const PLUS: usize = 20;
    pub const MINUS: usize = 21;
    pub const RANGE: usize = 22;
    pub const ANY: usize = 23;
    pub const LT: usize = 24;
    pub const GT: usize = 25;
    pub const LT_DOT: usize = 26;
    pub const DOT_GT: usize = 27;
    pub const PIPE: usize = 28;
    pub const WEAK: usize = 29;
    pub const LPAREN: usize = 30;
    pub const RPAREN: usize = 31;
    pub const LBRACK: usize = 32;
    pub const RBRACK: usize = 33;
    pub const LBRACE: usize = 34;
    pub const RBRACE: usize = 35;
    pub const SYNC: usize = 36;
    pub const IF: usize = 37;
    pub const CONTEXT: usize = 38;
    pub const SEM_BEG: usize = 39;
    pub const SEM_END: usize = 40;
    pub const NO_SYM: usize = 41;
    pub const DDT: usize = 42;
    pub const OPTION: usize = 43;
}

/// The highest token code that is not a pragma.
pub const MAX_T: usize = kind::NO_SYM;

/// The names of the token kinds, for diagnostics.
pub const NAMES: [&str; 44] = [
    "EOF",
    "ident",
    "number",
    "string",
    "badString",
    "char",
    "\"COMPILER\"",
    "\"IGNORECASE\"",
    "\"CHARACTERS\"",
    "\"TOKENS\"",
    "\"PRAGMAS\"",
    "\"COMMENTS\"",
    "\"FROM\"",
    "\"TO\"",
    "\"NESTED\"",
    "\"IGNORE\"",
    "\"PRODUCTIONS\"",
    "\"=\"",
    "\".\"",
    "\"END\"",
    "\"+\"",
    "\"-\"",
    "\"..\"",
    "\"ANY\"",
    "\"<\"",
    "\">\"",
    "\"<.\"",
    "\".>\"",
    "\"|\"",
    "\"WEAK\"",
    "\"(\"",
    "\")\"",
    "\"[\"",
    "\"]\"",
    "\"{\"",
    "\"}\"",
    "\"SYNC\"",
    "\"IF\"",
    "\"CONTEXT\"",
    "\"(.\"",
    "\".)\"",
    "???",
    "ddtSym",
    "optionSym",
];

/// A token of a grammar description.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    /// The token kind, one of the constants in `kind`.
    pub kind: usize,
    /// Byte offset of the first character.
    pub pos: usize,
    /// Byte offset one past the last character.
    pub end: usize,
    /// Zero-based column of the first character.
    pub col: usize,
    /// One-based line of the first character.
    pub line: usize,
    /// The text of the token.
    pub val: String,
}

impl Token {
    fn eof(pos: usize, col: usize, line: usize) -> Token {
        Token {
            kind: kind::EOF,
            pos: pos,
            end: pos,
            col: col,
            line: line,
            val: String::new(),
        }
    }
}

fn keyword(s: &str) -> Option<usize> {
    Some(match s {
        "COMPILER" => kind::COMPILER,
        "IGNORECASE" => kind::IGNORECASE,
        "CHARACTERS" => kind::CHARACTERS,
        "TOKENS" => kind::TOKENS,
        "PRAGMAS" => kind::PRAGMAS,
        "COMMENTS" => kind::COMMENTS,
        "FROM" => kind::FROM,
        "TO" => kind::TO,
        "NESTED" => kind::NESTED,
        "IGNORE" => kind::IGNORE,
        "PRODUCTIONS" => kind::PRODUCTIONS,
        "END" => kind::END,
        "ANY" => kind::ANY,
        "WEAK" => kind::WEAK,
        "SYNC" => kind::SYNC,
        "IF" => kind::IF,
        "CONTEXT" => kind::CONTEXT,
        _ => return None,
    })
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// A lexer for grammar descriptions.
pub struct Lexer<'a> {
    text: &'a str,
    input: Peekable<CharIndices<'a>>,
    line: usize,
    col: usize,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer.
    pub fn new(text: &'a str) -> Lexer<'a> {
        Lexer {
            text: text,
            input: text.char_indices().peekable(),
            line: 1,
            col: 0,
            done: false,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.input.next().map(|(_, c)| c);
        match c {
            Some('\n') => {
                self.line += 1;
                self.col = 0;
            }
            Some(_) => self.col += 1,
            None => (),
        }
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        let len = self.text.len();
        self.input.peek().map(|&(p, _)| p).unwrap_or(len)
    }

    /// Skip whitespace and comments. Returns false if a lone `/` was found,
    /// which has been consumed.
    fn skip_irrelevant(&mut self) -> bool {
        loop {
            match self.peek() {
                Some(c) if c == ' ' || c == '\t' || c == '\r' || c == '\n' || c == '\u{c}' => {
                    self.bump();
                }
                Some('/') => {
                    self.bump();
                    match self.peek() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.skip_block_comment();
                        }
                        _ => return false,
                    }
                }
                _ => return true,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let mut level = 1;
        while let Some(c) = self.bump() {
            match c {
                '*' if self.peek() == Some('/') => {
                    self.bump();
                    level -= 1;
                    if level == 0 {
                        return;
                    }
                }
                '/' if self.peek() == Some('*') => {
                    self.bump();
                    level += 1;
                }
                _ => (),
            }
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, f: F) {
        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            self.bump();
        }
    }

    /// The rest of a string literal after the opening quote.
    fn string(&mut self) -> usize {
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return kind::STRING;
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(c) if c != '\r' && c != '\n' => {
                            self.bump();
                        }
                        _ => (),
                    }
                }
                Some('\r') | Some('\n') | None => return kind::BAD_STRING,
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// The rest of a character literal after the opening apostrophe.
    fn character(&mut self) -> usize {
        match self.peek() {
            Some('\\') => {
                self.bump();
                match self.peek() {
                    Some(c) if c >= ' ' && c != '\u{7f}' => {
                        self.bump();
                    }
                    _ => return kind::NO_SYM,
                }
                self.take_while(|c| c.is_digit(16));
            }
            Some(c) if c != '\'' && c != '\r' && c != '\n' => {
                self.bump();
            }
            _ => return kind::NO_SYM,
        }
        if self.peek() == Some('\'') {
            self.bump();
            kind::CHAR
        } else {
            kind::NO_SYM
        }
    }

    /// The rest of a pragma after the dollar sign.
    fn pragma(&mut self) -> usize {
        let mut letters_only = true;
        let mut any = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                letters_only &= is_letter(c);
                any = true;
                self.bump();
            } else {
                break;
            }
        }
        if any && letters_only && self.peek() == Some('=') {
            self.bump();
            self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':');
            kind::OPTION
        } else {
            kind::DDT
        }
    }

    /// Read the next token. At the end of the input, EOF tokens are returned
    /// indefinitely.
    pub fn next_token(&mut self) -> Token {
        let relevant = self.skip_irrelevant();
        let (pos, col, line) = if relevant {
            (self.offset(), self.col, self.line)
        } else {
            // A lone slash has been consumed already.
            let end = self.offset();
            return Token {
                kind: kind::NO_SYM,
                pos: end - 1,
                end: end,
                col: self.col - 1,
                line: self.line,
                val: "/".into(),
            };
        };
        let c = match self.bump() {
            Some(c) => c,
            None => return Token::eof(pos, col, line),
        };
        let kind = match c {
            c if is_letter(c) => {
                self.take_while(|c| is_letter(c) || c.is_ascii_digit());
                let end = self.offset();
                keyword(&self.text[pos..end]).unwrap_or(kind::IDENT)
            }
            c if c.is_ascii_digit() => {
                self.take_while(|c| c.is_ascii_digit());
                kind::NUMBER
            }
            '"' => self.string(),
            '\'' => self.character(),
            '$' => self.pragma(),
            '=' => kind::EQUAL,
            '+' => kind::PLUS,
            '-' => kind::MINUS,
            '|' => kind::PIPE,
            ')' => kind::RPAREN,
            '[' => kind::LBRACK,
            ']' => kind::RBRACK,
            '{' => kind::LBRACE,
            '}' => kind::RBRACE,
            '>' => kind::GT,
            '.' => match self.peek() {
                Some('.') => {
                    self.bump();
                    kind::RANGE
                }
                Some('>') => {
                    self.bump();
                    kind::DOT_GT
                }
                Some(')') => {
                    self.bump();
                    kind::SEM_END
                }
                _ => kind::PERIOD,
            },
            '<' => if self.peek() == Some('.') {
                self.bump();
                kind::LT_DOT
            } else {
                kind::LT
            },
            '(' => if self.peek() == Some('.') {
                self.bump();
                kind::SEM_BEG
            } else {
                kind::LPAREN
            },
            _ => kind::NO_SYM,
        };
        let end = self.offset();
        Token {
            kind: kind,
            pos: pos,
            end: end,
            col: col,
            line: line,
            val: self.text[pos..end].to_string(),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        let t = self.next_token();
        if t.kind == kind::EOF {
            self.done = true;
            None
        } else {
            Some(t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::kind::*;

    fn lex<S: AsRef<str>>(input: S) -> Vec<usize> {
        Lexer::new(input.as_ref()).map(|t| t.kind).collect()
    }

    #[test]
    fn tokens1() {
        assert_eq!(
            lex("COMPILER Calc CHARACTERS digit = '0'..'9'."),
            vec![COMPILER, IDENT, CHARACTERS, IDENT, EQUAL, CHAR, RANGE, CHAR, PERIOD]
        );
    }

    #[test]
    fn tokens2() {
        assert_eq!(
            lex("Expr<out int n> = Term { WEAK \"+\" Term } (. n = 1; .)."),
            vec![
                IDENT, LT, IDENT, IDENT, IDENT, GT, EQUAL, IDENT, LBRACE, WEAK, STRING, IDENT,
                RBRACE, SEM_BEG, IDENT, EQUAL, NUMBER, NO_SYM, SEM_END, PERIOD,
            ]
        );
    }

    #[test]
    fn comment_single_line() {
        assert_eq!(lex("| // comment\n . // comment"), vec![PIPE, PERIOD]);
    }

    #[test]
    fn comment_nested() {
        assert_eq!(lex("| /* a /* b */ c */ ."), vec![PIPE, PERIOD]);
    }

    #[test]
    fn quoted_escapes() {
        let toks: Vec<Token> = Lexer::new("\"a\\\"b\" '\\'' '\\u0041'").collect();
        assert_eq!(toks[0].kind, STRING);
        assert_eq!(toks[0].val, "\"a\\\"b\"");
        assert_eq!(toks[1].kind, CHAR);
        assert_eq!(toks[2].kind, CHAR);
        assert_eq!(toks[2].val, "'\\u0041'");
    }

    #[test]
    fn bad_string() {
        assert_eq!(lex("\"abc\n x"), vec![BAD_STRING, IDENT]);
    }

    #[test]
    fn pragmas() {
        let toks: Vec<Token> = Lexer::new("$7AF $namespace=my_mod $checkEOF=false").collect();
        assert_eq!(toks[0].kind, DDT);
        assert_eq!(toks[1].kind, OPTION);
        assert_eq!(toks[1].val, "$namespace=my_mod");
        assert_eq!(toks[2].val, "$checkEOF=false");
    }

    #[test]
    fn positions() {
        let toks: Vec<Token> = Lexer::new("A\n  = b").collect();
        assert_eq!((toks[1].line, toks[1].col, toks[1].pos), (2, 2, 4));
        assert_eq!((toks[2].line, toks[2].col, toks[2].end), (2, 4, 7));
    }

    #[test]
    fn lifetimes_are_not_fatal() {
        assert_eq!(lex("&'a str"), vec![NO_SYM, NO_SYM, IDENT]);
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new("END .");
        assert_eq!(lexer.next_token().kind, END);
        assert_eq!(lexer.next_token().kind, PERIOD);
        assert_eq!(lexer.next_token().kind, EOF);
        assert_eq!(lexer.next_token().kind, EOF);
    }
}
