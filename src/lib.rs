// Copyright (c) 2018 Fabian Schuiki

//! A compiler generator for attributed LL(1) grammars.
//!
//! A grammar describes the tokens of a language and its syntax, annotated
//! with semantic actions. From it a table-driven scanner and a
//! recursive-descent parser are generated as Rust source code.

#![deny(missing_docs)]

extern crate bit_set;
extern crate indexmap;
#[macro_use]
extern crate log;

pub mod charset;
pub mod check;
pub mod dfa;
pub mod driver;
pub mod errors;
pub mod frame;
pub mod lexer;
pub mod parser;
pub mod parser_gen;
pub mod scanner_gen;
pub mod sets;
pub mod source;
pub mod tab;

/// A pretty printer.
pub struct Pretty<C, T> {
    ctx: C,
    item: T,
}

impl<C, T> Pretty<C, T> {
    pub(crate) fn new(ctx: C, item: T) -> Pretty<C, T> {
        Pretty { ctx, item }
    }
}
