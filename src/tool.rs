// Copyright (c) 2018 Fabian Schuiki
#[macro_use]
extern crate clap;
extern crate cocogen;
#[macro_use]
extern crate log;
extern crate memmap;
extern crate stderrlog;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use clap::{App, Arg};
use cocogen::driver::{generate, write_output, Options};
use cocogen::errors::FatalError;
use cocogen::frame::FrameDirs;
use cocogen::source::Source;
use memmap::Mmap;

fn main() {
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about("Generates a scanner and a recursive-descent parser from an attributed grammar")
        .arg(
            Arg::with_name("GRAMMAR")
                .help("The grammar file to process")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("DIR")
                .help("Directory for the generated files [default: directory of the grammar]")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("frames")
                .long("frames")
                .value_name("DIR")
                .help("Directory containing Scanner.frame and Parser.frame")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("namespace")
                .long("namespace")
                .value_name("NAME")
                .help("Wrap the generated code in a module of this name")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("trace")
                .long("trace")
                .value_name("FLAGS")
                .help("Debug switches, e.g. AFGS or 0126")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-check-eof")
                .long("no-check-eof")
                .help("Do not require the input to end after the grammar symbol"),
        )
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help("Increase message verbosity"),
        )
        .get_matches();

    if let Err(e) = init_logging(matches.occurrences_of("verbosity") as usize) {
        eprintln!("-- {}", e);
        process::exit(2);
    }

    let grammar = PathBuf::from(matches.value_of("GRAMMAR").expect("GRAMMAR is required"));
    let src_dir = grammar
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let out_dir = matches
        .value_of("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| src_dir.clone());
    let opts = Options {
        frames: FrameDirs {
            frames: matches.value_of("frames").map(PathBuf::from),
            source: Some(src_dir),
        },
        namespace: matches.value_of("namespace").map(String::from),
        trace: matches.value_of("trace").map(String::from),
        check_eof: if matches.is_present("no-check-eof") {
            Some(false)
        } else {
            None
        },
    };

    match run(&grammar, &out_dir, &opts) {
        Ok(true) => (),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("-- {}", e);
            process::exit(2);
        }
    }
}

/// Send log messages to stderr. Without `-v` only warnings and errors are
/// shown.
fn init_logging(verbosity: usize) -> Result<(), FatalError> {
    stderrlog::new()
        .module(module_path!())
        .verbosity(verbosity + 1)
        .init()
        .map_err(|e| FatalError::Logging(e.to_string()))
}

/// Map the grammar file into memory and decode it.
fn read_source(path: &Path) -> Result<Source, FatalError> {
    let path_str = path.to_string_lossy().into_owned();
    let file = File::open(path).map_err(|e| FatalError::open(&path_str, e))?;
    let len = file
        .metadata()
        .map_err(|e| FatalError::open(&path_str, e))?
        .len();
    if len == 0 {
        return Source::from_bytes(&[]);
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| FatalError::open(&path_str, e))?;
    Source::from_bytes(&mmap)
}

/// Process one grammar. Returns whether it was free of errors.
fn run(grammar: &Path, out_dir: &Path, opts: &Options) -> Result<bool, FatalError> {
    info!("reading {}", grammar.display());
    let src = read_source(grammar)?;
    let out = generate(&src, opts)?;
    for d in out.errors.diagnostics() {
        println!("{}", d);
    }
    write_output(out_dir, &out)?;
    if !out.trace.is_empty() {
        info!("trace output written to {}", out_dir.join("trace.txt").display());
    }
    println!("{}", out.summary());
    Ok(out.errors.count() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_is_set_up_once() {
        assert_eq!(init_logging(0), Ok(()));
        match init_logging(2) {
            Err(FatalError::Logging(_)) => (),
            other => panic!("second logger accepted: {:?}", other),
        }
    }
}
