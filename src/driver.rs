// Copyright (c) 2018 Fabian Schuiki

//! The generator pipeline.
//!
//! A grammar is parsed, its terminal sets are computed, it is checked, and
//! if no errors were found the scanner and parser are generated. All of this
//! happens in memory; `write_output` puts the results on disk.

use std::fs;
use std::path::{Path, PathBuf};

use check::grammar_ok;
use errors::{Errors, FatalError};
use frame::{FrameDirs, PARSER_FRAME, SCANNER_FRAME};
use parser::parse_into;
use parser_gen::write_parser;
use scanner_gen::write_scanner;
use sets::comp_symbol_sets;
use source::Source;
use tab::Tab;

/// The name of the generated scanner.
pub const SCANNER_FILE: &str = "scanner.rs";
/// The name of the generated parser.
pub const PARSER_FILE: &str = "parser.rs";
/// The name of the trace file.
pub const TRACE_FILE: &str = "trace.txt";

/// Settings that do not come from the grammar itself.
#[derive(Debug, Clone)]
pub struct Options {
    /// Where to look for frame files.
    pub frames: FrameDirs,
    /// Wrap the generated code in a module of this name.
    pub namespace: Option<String>,
    /// Debug switches, in the same notation as the `$` pragma.
    pub trace: Option<String>,
    /// Whether the parser checks that the input ends after the grammar
    /// symbol. If unset, the grammar decides.
    pub check_eof: Option<bool>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            frames: FrameDirs::default(),
            namespace: None,
            trace: None,
            check_eof: None,
        }
    }
}

/// The result of running the generator.
#[derive(Debug)]
pub struct Output {
    /// Everything that was reported about the grammar.
    pub errors: Errors,
    /// The generated scanner, unless the scanner is written by hand or
    /// generation was suppressed.
    pub scanner: Option<String>,
    /// The generated parser, unless generation was suppressed.
    pub parser: Option<String>,
    /// The debug dumps requested by the debug switches.
    pub trace: String,
}

impl Output {
    /// A one-line description of what was generated.
    pub fn summary(&self) -> String {
        match (&self.parser, &self.scanner) {
            (&Some(_), &Some(_)) => "parser + scanner generated".into(),
            (&Some(_), &None) => "parser generated".into(),
            _ => format!("{} errors detected", self.errors.count()),
        }
    }
}

/// Run the generator on a grammar.
///
/// Problems with the grammar end up in `Output::errors`, and suppress code
/// generation. Only problems that make it impossible to go on, such as a
/// missing or broken frame file, are returned as `Err`.
pub fn generate(src: &Source, opts: &Options) -> Result<Output, FatalError> {
    let mut tab = Tab::new();
    tab.ns_name = opts.namespace.clone();
    if let Some(ref flags) = opts.trace {
        tab.set_ddt(flags);
    }

    debug!("parsing grammar");
    let parsed = parse_into(src.text(), tab);
    let mut tab = parsed.tab;
    let mut dfa = parsed.dfa;
    let mut errors = parsed.errors;
    let gen_scanner = parsed.gen_scanner;
    if let Some(check_eof) = opts.check_eof {
        tab.check_eof = check_eof;
    }
    if gen_scanner && dfa.dirty {
        dfa.make_deterministic(&tab, &mut errors);
    }

    let mut scanner = None;
    let mut parser = None;
    if errors.count() == 0 {
        debug!("checking grammar {}", tab.gram_name);
        comp_symbol_sets(&mut tab, &mut errors);
        if tab.ddt[7] {
            tab.xref();
        }
        if grammar_ok(&tab, &mut errors) {
            let copyright = opts.frames.copyright()?;
            let frame = opts.frames.load(PARSER_FRAME)?;
            parser = Some(write_parser(
                &mut tab,
                src,
                frame,
                copyright.as_ref().map(|s| s.as_str()),
            )?);
            if gen_scanner {
                let frame = opts.frames.load(SCANNER_FRAME)?;
                scanner = Some(write_scanner(
                    &tab,
                    &dfa,
                    frame,
                    copyright.as_ref().map(|s| s.as_str()),
                )?);
                if tab.ddt[0] {
                    dfa.print_states(&mut tab);
                }
            }
        }
    }
    if tab.ddt[6] {
        tab.print_symbol_table();
    }
    debug!(
        "{} errors, {} warnings",
        errors.count(),
        errors.warnings().len()
    );
    Ok(Output {
        errors: errors,
        scanner: scanner,
        parser: parser,
        trace: tab.trace,
    })
}

/// Write `text` next to the destination `name` without touching it yet.
fn stage_file(dir: &Path, name: &str, text: &str) -> Result<PathBuf, FatalError> {
    let staged = dir.join(format!("{}.new", name));
    fs::write(&staged, text).map_err(|e| FatalError::write(&staged.to_string_lossy(), e))?;
    Ok(staged)
}

/// Move a staged file into place. With `backup` the previous version is kept
/// as `<name>.old`.
fn commit_file(dir: &Path, name: &str, staged: &Path, backup: bool) -> Result<(), FatalError> {
    let path = dir.join(name);
    let path_str = path.to_string_lossy().into_owned();
    if backup && path.is_file() {
        let old = dir.join(format!("{}.old", name));
        fs::copy(&path, &old).map_err(|e| FatalError::write(&path_str, e))?;
    }
    fs::rename(staged, &path).map_err(|e| FatalError::write(&path_str, e))?;
    debug!("wrote {}", path_str);
    Ok(())
}

/// Write the generated files and the trace into `dir`.
///
/// All files are written in full before any of them replaces its previous
/// version. If one cannot be written, the directory is left as it was.
pub fn write_output(dir: &Path, out: &Output) -> Result<(), FatalError> {
    let mut files: Vec<(&str, &str, bool)> = Vec::new();
    if let Some(ref text) = out.parser {
        files.push((PARSER_FILE, text.as_str(), true));
    }
    if let Some(ref text) = out.scanner {
        files.push((SCANNER_FILE, text.as_str(), true));
    }
    if !out.trace.is_empty() {
        files.push((TRACE_FILE, out.trace.as_str(), false));
    }
    let mut staged = Vec::new();
    for &(name, text, backup) in &files {
        match stage_file(dir, name, text) {
            Ok(path) => staged.push((name, path, backup)),
            Err(e) => {
                for (_, path, _) in staged {
                    let _ = fs::remove_file(path);
                }
                return Err(e);
            }
        }
    }
    for (name, path, backup) in staged {
        commit_file(dir, name, &path, backup)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Output {
        generate(&Source::new(src), &Options::default()).unwrap()
    }

    #[test]
    fn errors_suppress_generation() {
        let out = run("COMPILER T PRODUCTIONS T = A. END T.");
        assert!(out.errors.mentions("  No production for A"));
        assert_eq!(out.parser, None);
        assert_eq!(out.scanner, None);
        assert_eq!(out.summary(), "1 errors detected");
    }

    #[test]
    fn hand_written_scanner() {
        let out = run("COMPILER T TOKENS ident number PRODUCTIONS T = ident number. END T.");
        assert_eq!(out.errors.count(), 0, "{}", out.errors);
        assert!(out.parser.is_some());
        assert_eq!(out.scanner, None);
        assert_eq!(out.summary(), "parser generated");
    }

    #[test]
    fn options_override_the_grammar() {
        let opts = Options {
            namespace: Some("outer".into()),
            trace: Some("S".into()),
            check_eof: Some(false),
            ..Options::default()
        };
        let src = Source::new("$namespace=inner COMPILER T PRODUCTIONS T = \"a\". END T.");
        let out = generate(&src, &opts).unwrap();
        let parser = out.parser.unwrap();
        assert!(parser.contains("pub mod outer {"));
        assert!(!parser.contains("self.expect(0);"));
        assert!(out.trace.contains("Symbol Table:"));
    }

    #[test]
    fn keywords_added_in_productions() {
        let out = run(
            "COMPILER T CHARACTERS letter = 'a'..'z'. TOKENS ident = letter {letter}. \
             PRODUCTIONS T = \"begin\" ident \"<=\" ident \"<\". END T.",
        );
        assert_eq!(out.errors.count(), 0, "{}", out.errors);
        let scanner = out.scanner.unwrap();
        assert!(scanner.contains("\"begin\" => t.kind = 2,"));
        assert!(!scanner.contains("\"<=\" => t.kind"));
    }

    #[test]
    fn failed_write_leaves_no_partial_output() {
        let dir = ::std::env::temp_dir().join(format!("cocogen-partial-{}", ::std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        // A directory in the way of the staged scanner makes its write fail.
        fs::create_dir_all(dir.join("scanner.rs.new")).unwrap();
        let out = run(
            "COMPILER T CHARACTERS letter = 'a'..'z'. \
             TOKENS ident = letter {letter}. PRODUCTIONS T = ident. END T.",
        );
        assert!(out.scanner.is_some());
        assert!(write_output(&dir, &out).is_err());
        assert!(!dir.join(PARSER_FILE).exists());
        assert!(!dir.join("parser.rs.new").exists());
        assert!(!dir.join(SCANNER_FILE).exists());
        fs::remove_dir_all(dir.join("scanner.rs.new")).unwrap();
        write_output(&dir, &out).unwrap();
        assert!(dir.join(PARSER_FILE).is_file());
        assert!(dir.join(SCANNER_FILE).is_file());
        assert!(!dir.join("parser.rs.new").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
