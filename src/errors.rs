// Copyright (c) 2018 Fabian Schuiki

//! Diagnostics.
//!
//! Errors in the grammar are collected in an `Errors` sink and processing goes
//! on, so that a single run reports as many problems as possible. Code is only
//! generated if the sink holds no errors at the end. Conditions that make it
//! impossible to go on at all are reported as a `FatalError` instead.

use std::error::Error;
use std::fmt;
use std::io;

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// An unexpected token in the grammar source.
    Syntax,
    /// A semantically invalid grammar.
    Semantic,
    /// A problem that does not prevent code generation.
    Warning,
}

/// A single message, optionally tied to a source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// The line the diagnostic refers to, 0 if it has no location.
    pub line: usize,
    /// The column the diagnostic refers to.
    pub col: usize,
    /// The severity.
    pub severity: Severity,
    /// The message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "-- line {} col {}: {}", self.line, self.col, self.message)
        }
    }
}

/// A sink for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Errors {
    diagnostics: Vec<Diagnostic>,
    count: usize,
}

impl Errors {
    /// Create an empty sink.
    pub fn new() -> Errors {
        Errors::default()
    }

    fn push(&mut self, line: usize, col: usize, severity: Severity, message: String) {
        debug!("diagnostic {:?} at {}:{}: {}", severity, line, col, message);
        if severity != Severity::Warning {
            self.count += 1;
        }
        self.diagnostics.push(Diagnostic {
            line: line,
            col: col,
            severity: severity,
            message: message,
        });
    }

    /// Report a syntax error.
    pub fn syn_err<S: Into<String>>(&mut self, line: usize, col: usize, msg: S) {
        self.push(line, col, Severity::Syntax, msg.into());
    }

    /// Report a semantic error at a location.
    pub fn sem_err<S: Into<String>>(&mut self, line: usize, col: usize, msg: S) {
        self.push(line, col, Severity::Semantic, msg.into());
    }

    /// Report a semantic error that has no location.
    pub fn error<S: Into<String>>(&mut self, msg: S) {
        self.push(0, 0, Severity::Semantic, msg.into());
    }

    /// Report a warning at a location.
    pub fn warning_at<S: Into<String>>(&mut self, line: usize, col: usize, msg: S) {
        self.push(line, col, Severity::Warning, msg.into());
    }

    /// Report a warning that has no location.
    pub fn warning<S: Into<String>>(&mut self, msg: S) {
        self.push(0, 0, Severity::Warning, msg.into());
    }

    /// The number of errors. Warnings are not counted.
    pub fn count(&self) -> usize {
        self.count
    }

    /// All diagnostics in the order they were reported.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The warnings among the diagnostics.
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    /// Whether any diagnostic's message contains the given text.
    pub fn mentions(&self, text: &str) -> bool {
        self.diagnostics.iter().any(|d| d.message.contains(text))
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for d in &self.diagnostics {
            writeln!(f, "{}", d)?;
        }
        write!(f, "{} errors detected", self.count)
    }
}

/// An error that aborts the run immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// The grammar or another input file could not be read.
    CannotOpen(String, String),
    /// The file starts with a malformed byte-order mark.
    IllegalByteOrderMark,
    /// The file is not valid UTF-8 after the given byte offset.
    NotUtf8(usize),
    /// A source span lies outside the buffer.
    PositionOutOfBounds(usize, usize),
    /// A frame file could not be found.
    MissingFrame(String),
    /// A frame file ended before the given marker.
    IncompleteFrame(String, String),
    /// A generated file could not be written.
    CannotWrite(String, String),
    /// Log output could not be set up.
    Logging(String),
}

impl FatalError {
    /// Wrap an I/O error encountered while reading `path`.
    pub fn open(path: &str, err: io::Error) -> FatalError {
        FatalError::CannotOpen(path.into(), err.to_string())
    }

    /// Wrap an I/O error encountered while writing `path`.
    pub fn write(path: &str, err: io::Error) -> FatalError {
        FatalError::CannotWrite(path.into(), err.to_string())
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FatalError::CannotOpen(ref path, ref why) => {
                write!(f, "cannot open file {}: {}", path, why)
            }
            FatalError::IllegalByteOrderMark => write!(f, "illegal byte order mark"),
            FatalError::NotUtf8(at) => write!(f, "grammar is not valid UTF-8 after byte {}", at),
            FatalError::PositionOutOfBounds(beg, end) => {
                write!(f, "buffer out of bounds access, position {}..{}", beg, end)
            }
            FatalError::MissingFrame(ref name) => write!(f, "cannot find frame file {}", name),
            FatalError::IncompleteFrame(ref name, ref marker) => write!(
                f,
                "incomplete or corrupt frame file {} (missing {})",
                name, marker
            ),
            FatalError::CannotWrite(ref path, ref why) => {
                write!(f, "cannot generate {}: {}", path, why)
            }
            FatalError::Logging(ref why) => write!(f, "cannot set up logging: {}", why),
        }
    }
}

impl Error for FatalError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format() {
        let mut errs = Errors::new();
        errs.sem_err(3, 7, "undefined name");
        errs.warning("  A deletable");
        assert_eq!(format!("{}", errs.diagnostics()[0]), "-- line 3 col 7: undefined name");
        assert_eq!(format!("{}", errs.diagnostics()[1]), "  A deletable");
        assert_eq!(errs.count(), 1);
        assert_eq!(errs.warnings().len(), 1);
    }
}
