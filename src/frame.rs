// Copyright (c) 2018 Fabian Schuiki

//! Frame templates.
//!
//! The generated scanner and parser are produced by copying a frame file and
//! splicing generated code in at marker lines such as `-->productions`. Each
//! marker occupies a line of its own, possibly indented; the marker line itself
//! is not copied.

use std::fs;
use std::path::{Path, PathBuf};

use errors::FatalError;

/// The name of the scanner frame.
pub const SCANNER_FRAME: &str = "Scanner.frame";
/// The name of the parser frame.
pub const PARSER_FRAME: &str = "Parser.frame";
/// The name of the optional copyright notice prepended to generated files.
pub const COPYRIGHT_FRAME: &str = "Copyright.frame";

static BUILTIN_SCANNER: &str = include_str!("../frames/Scanner.frame");
static BUILTIN_PARSER: &str = include_str!("../frames/Parser.frame");

/// The directories frames are looked up in, in order. If a frame is found in
/// none of them, the frames built into the generator are used.
#[derive(Debug, Clone, Default)]
pub struct FrameDirs {
    /// An explicitly requested frame directory.
    pub frames: Option<PathBuf>,
    /// The directory of the grammar.
    pub source: Option<PathBuf>,
}

impl FrameDirs {
    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        self.frames
            .iter()
            .chain(self.source.iter())
            .map(|dir| dir.join(name))
            .collect()
    }

    /// Find and load a frame by name.
    pub fn load(&self, name: &str) -> Result<Frame, FatalError> {
        for path in self.candidates(name) {
            if path.is_file() {
                debug!("using frame {}", path.display());
                return Frame::read(&path);
            }
        }
        Frame::builtin(name)
    }

    /// Load the copyright notice, if there is one.
    pub fn copyright(&self) -> Result<Option<String>, FatalError> {
        for path in self.candidates(COPYRIGHT_FRAME) {
            if path.is_file() {
                let text = fs::read_to_string(&path)
                    .map_err(|e| FatalError::open(&path.to_string_lossy(), e))?;
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

/// A frame file being copied.
#[derive(Debug, Clone)]
pub struct Frame {
    name: String,
    text: String,
    pos: usize,
}

impl Frame {
    /// Create a frame from its text.
    pub fn new<S: Into<String>, T: Into<String>>(name: S, text: T) -> Frame {
        Frame {
            name: name.into(),
            text: text.into(),
            pos: 0,
        }
    }

    /// Read a frame from disk.
    pub fn read(path: &Path) -> Result<Frame, FatalError> {
        let text =
            fs::read_to_string(path).map_err(|e| FatalError::open(&path.to_string_lossy(), e))?;
        Ok(Frame::new(path.to_string_lossy(), text))
    }

    /// The frame built into the generator.
    pub fn builtin(name: &str) -> Result<Frame, FatalError> {
        match name {
            SCANNER_FRAME => Ok(Frame::new(name, BUILTIN_SCANNER)),
            PARSER_FRAME => Ok(Frame::new(name, BUILTIN_PARSER)),
            _ => Err(FatalError::MissingFrame(name.into())),
        }
    }

    /// The name the frame was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the next line that consists of `marker`, returning the text up
    /// to it and the position after the marker line.
    fn find(&self, marker: &str) -> Result<(usize, usize), FatalError> {
        let mut at = self.pos;
        for line in self.text[self.pos..].split_inclusive('\n') {
            if line.trim() == marker {
                return Ok((at, at + line.len()));
            }
            at += line.len();
        }
        Err(FatalError::IncompleteFrame(
            self.name.clone(),
            marker.into(),
        ))
    }

    /// Skip the frame up to and including the `marker` line.
    pub fn skip_part(&mut self, marker: &str) -> Result<(), FatalError> {
        let (_, after) = self.find(marker)?;
        self.pos = after;
        Ok(())
    }

    /// Copy the frame up to the `marker` line into `out`, skipping the marker
    /// line itself.
    pub fn copy_part(&mut self, marker: &str, out: &mut String) -> Result<(), FatalError> {
        let (before, after) = self.find(marker)?;
        out.push_str(&self.text[self.pos..before]);
        self.pos = after;
        Ok(())
    }

    /// Copy the rest of the frame into `out`.
    pub fn copy_rest(&mut self, out: &mut String) {
        out.push_str(&self.text[self.pos..]);
        self.pos = self.text.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_split_the_frame() {
        let mut f = Frame::new("t", "header\n-->begin\na\n-->one\nb\n  -->two  \nc\n");
        let mut out = String::new();
        f.skip_part("-->begin").unwrap();
        f.copy_part("-->one", &mut out).unwrap();
        out.push_str("X\n");
        f.copy_part("-->two", &mut out).unwrap();
        f.copy_rest(&mut out);
        assert_eq!(out, "a\nX\nb\nc\n");
    }

    #[test]
    fn marker_must_be_alone_on_its_line() {
        let mut f = Frame::new("t", "x = 1; // -->two\n    -->two\ny\n");
        let mut out = String::new();
        f.copy_part("-->two", &mut out).unwrap();
        assert_eq!(out, "x = 1; // -->two\n");
        f.copy_rest(&mut out);
        assert_eq!(out, "x = 1; // -->two\ny\n");
    }

    #[test]
    fn missing_marker_is_fatal() {
        let mut f = Frame::new("t", "-->begin\nno markers here\n");
        f.skip_part("-->begin").unwrap();
        let mut out = String::new();
        assert_eq!(
            f.copy_part("-->productions", &mut out),
            Err(FatalError::IncompleteFrame("t".into(), "-->productions".into()))
        );
    }

    #[test]
    fn builtin_frames_have_all_markers() {
        let mut f = Frame::builtin(SCANNER_FRAME).unwrap();
        let mut out = String::new();
        f.skip_part("-->begin").unwrap();
        for m in &[
            "-->namespace",
            "-->declarations",
            "-->initialization",
            "-->casing1",
            "-->casing2",
            "-->comments",
            "-->literals",
            "-->scan1",
            "-->scan2",
            "-->scan3",
        ] {
            f.copy_part(m, &mut out).unwrap();
        }
        let mut f = Frame::builtin(PARSER_FRAME).unwrap();
        f.skip_part("-->begin").unwrap();
        for m in &[
            "-->namespace",
            "-->constants",
            "-->declarations",
            "-->pragmas",
            "-->productions",
            "-->parseRoot",
            "-->initialization",
            "-->errors",
        ] {
            f.copy_part(m, &mut out).unwrap();
        }
        assert_eq!(
            Frame::builtin("Other.frame").unwrap_err(),
            FatalError::MissingFrame("Other.frame".into())
        );
    }
}
