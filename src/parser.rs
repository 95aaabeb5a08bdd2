// Copyright (c) 2018 Fabian Schuiki

//! A parser for grammar descriptions.
//!
//! The parser reads a grammar description and builds the grammar model and
//! the scanner automaton while it goes. It recovers from syntax errors by
//! skipping to synchronization points, and reports semantic errors without
//! stopping, so a single run reports as many problems as possible.

use std::mem;

use charset::{CharSet, MAX_CHAR};
use dfa::Dfa;
use errors::Errors;
use lexer::kind::*;
use lexer::{Lexer, Token, MAX_T, NAMES};
use source::Position;
use tab::{unescape, Graph, NodeKind, SymbolId, SymbolKind, Tab, TokenKind};

/// Syntax errors are only reported once this many tokens have been read
/// successfully since the last one.
const MIN_ERR_DIST: usize = 2;

macro_rules! set {
    ($($k:expr),*) => { 0u64 $(| (1u64 << $k))* };
}

const ANY_TOKEN: u64 = ((1u64 << (MAX_T + 1)) - 1) & !1;
const SYNC_ALL: u64 = set![
    EOF, IDENT, STRING, CHAR, PRAGMAS, COMMENTS, IGNORE, PRODUCTIONS, EQUAL, SEM_BEG
];
const ANY_BEFORE_COMPILER: u64 = ANY_TOKEN & !set![COMPILER];
const ANY_IN_DECLS: u64 =
    ANY_TOKEN & !set![IGNORECASE, CHARACTERS, TOKENS, PRAGMAS, COMMENTS, IGNORE, PRODUCTIONS];
const BEFORE_PRODUCTIONS: u64 = set![EOF, PRODUCTIONS];
const TOKEN_DECL_SYNC: u64 = set![
    EOF, IDENT, STRING, CHAR, PRAGMAS, COMMENTS, IGNORE, PRODUCTIONS, EQUAL, SEM_BEG
];
const TOKEN_DECL_END: u64 = set![IDENT, STRING, CHAR, PRAGMAS, COMMENTS, IGNORE, PRODUCTIONS, SEM_BEG];
const ANY_IN_ATTR: u64 = ANY_TOKEN & !set![BAD_STRING, GT];
const ANY_IN_ATTR_DOT: u64 = ANY_TOKEN & !set![BAD_STRING, DOT_GT];
const ANY_IN_SEM: u64 = ANY_TOKEN & !set![BAD_STRING, SEM_BEG, SEM_END];
const ANY_IN_COND: u64 = ANY_TOKEN & !set![LPAREN, RPAREN];
const FACTOR_START: u64 = set![IDENT, STRING, CHAR, ANY, WEAK, LPAREN, LBRACK, LBRACE, SYNC, SEM_BEG];
const TERM_START: u64 = FACTOR_START | set![IF];
const EXPR_FOLLOW: u64 = set![PERIOD, RPAREN, RBRACK, RBRACE];
const TERM_FOLLOW: u64 = EXPR_FOLLOW | set![PIPE];
const AFTER_EQUAL: u64 = TERM_START | TERM_FOLLOW | SYNC_ALL;
const AFTER_PERIOD: u64 = set![IDENT, END] | SYNC_ALL;
const TOKEN_FACTOR_START: u64 = set![IDENT, STRING, CHAR, LPAREN, LBRACK, LBRACE];
const TOKEN_EXPR_FOLLOW: u64 = set![
    COMMENTS, TO, NESTED, IGNORE, PRODUCTIONS, PERIOD, RPAREN, RBRACK, RBRACE
];

const ERR_COCO: usize = 44;
const ERR_TOKEN_DECL_SYNC: usize = 45;
const ERR_TOKEN_DECL: usize = 46;
const ERR_ATTR_DECL: usize = 47;
const ERR_SIM_SET: usize = 48;
const ERR_SYM: usize = 49;
const ERR_TERM: usize = 50;
const ERR_FACTOR: usize = 51;
const ERR_ATTRIBS: usize = 52;
const ERR_TOKEN_FACTOR: usize = 53;

fn syn_message(n: usize) -> String {
    if n < NAMES.len() {
        return format!("{} expected", NAMES[n]);
    }
    match n {
        ERR_COCO => "this symbol not expected in Coco",
        ERR_TOKEN_DECL_SYNC => "this symbol not expected in TokenDecl",
        ERR_TOKEN_DECL => "invalid TokenDecl",
        ERR_ATTR_DECL => "invalid AttrDecl",
        ERR_SIM_SET => "invalid SimSet",
        ERR_SYM => "invalid Sym",
        ERR_TERM => "invalid Term",
        ERR_FACTOR => "invalid Factor",
        ERR_ATTRIBS => "invalid Attribs",
        ERR_TOKEN_FACTOR => "invalid TokenFactor",
        _ => "error",
    }.to_string()
}

/// Whether a symbol was written as an identifier or as a quoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymKind {
    Ident,
    Literal,
}

/// What a token definition consists of.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenString {
    Unset,
    Literal(String),
    Structured,
}

/// The result of parsing a grammar description.
#[derive(Debug)]
pub struct Parsed {
    /// The grammar model.
    pub tab: Tab,
    /// The scanner automaton.
    pub dfa: Dfa,
    /// The diagnostics collected while parsing.
    pub errors: Errors,
    /// Whether a scanner can be generated. False if some token is declared
    /// without a definition, which means the scanner is written by hand.
    pub gen_scanner: bool,
}

/// Parse a grammar description.
pub fn parse(text: &str) -> Parsed {
    parse_into(text, Tab::new())
}

/// Parse a grammar description into a preconfigured grammar model.
///
/// Debug switches and a namespace set in `tab` are in effect while parsing.
/// A namespace given this way takes precedence over a `$namespace` pragma.
pub fn parse_into(text: &str, tab: Tab) -> Parsed {
    let mut p = Parser::new(text, tab);
    p.get();
    p.coco();
    p.expect(EOF);
    Parsed {
        tab: p.tab,
        dfa: p.dfa,
        errors: p.errors,
        gen_scanner: p.gen_scanner,
    }
}

struct Parser<'a> {
    scanner: Lexer<'a>,
    t: Token,
    la: Token,
    err_dist: usize,
    errors: Errors,
    tab: Tab,
    dfa: Dfa,
    gen_scanner: bool,
    token_string: TokenString,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, tab: Tab) -> Parser<'a> {
        let dummy = Token {
            kind: EOF,
            pos: 0,
            end: 0,
            col: 0,
            line: 1,
            val: String::new(),
        };
        Parser {
            scanner: Lexer::new(text),
            t: dummy.clone(),
            la: dummy,
            err_dist: MIN_ERR_DIST,
            errors: Errors::new(),
            tab: tab,
            dfa: Dfa::new(),
            gen_scanner: true,
            token_string: TokenString::Unset,
        }
    }

    // ---------------------------------------------------------------------
    // Token handling and error recovery

    fn syn_err(&mut self, n: usize) {
        if self.err_dist >= MIN_ERR_DIST {
            self.errors.syn_err(self.la.line, self.la.col + 1, syn_message(n));
        }
        self.err_dist = 0;
    }

    fn sem_err<S: Into<String>>(&mut self, msg: S) {
        self.errors.sem_err(self.t.line, self.t.col + 1, msg);
    }

    fn get(&mut self) {
        loop {
            let next = self.scanner.next_token();
            if next.kind <= MAX_T {
                self.t = mem::replace(&mut self.la, next);
                self.err_dist += 1;
                return;
            }
            trace!("pragma {}", next.val);
            if next.kind == DDT {
                self.tab.set_ddt(&next.val);
            }
            if next.kind == OPTION {
                self.tab.set_option(&next.val);
            }
        }
    }

    fn start_of(&self, set: u64) -> bool {
        self.la.kind <= MAX_T && set & (1u64 << self.la.kind) != 0
    }

    fn expect(&mut self, n: usize) {
        if self.la.kind == n {
            self.get();
        } else {
            self.syn_err(n);
        }
    }

    fn expect_weak(&mut self, n: usize, follow: u64) {
        if self.la.kind == n {
            self.get();
        } else {
            self.syn_err(n);
            while !self.start_of(follow) {
                self.get();
            }
        }
    }

    fn weak_separator(&mut self, n: usize, sy_fol: u64, rep_fol: u64) -> bool {
        if self.la.kind == n {
            self.get();
            true
        } else if self.start_of(rep_fol) {
            false
        } else {
            self.syn_err(n);
            while !(self.start_of(sy_fol) || self.start_of(rep_fol) || self.start_of(SYNC_ALL)) {
                self.get();
            }
            self.start_of(sy_fol)
        }
    }

    fn sem_errs(&mut self, issues: Vec<String>) {
        for msg in issues {
            self.sem_err(msg);
        }
    }

    // ---------------------------------------------------------------------
    // Productions

    fn coco(&mut self) {
        if self.start_of(ANY_BEFORE_COMPILER) {
            self.get();
            let (beg, line) = (self.t.pos, self.t.line);
            while self.start_of(ANY_BEFORE_COMPILER) {
                self.get();
            }
            self.tab.use_pos = Some(Position::new(beg, self.la.pos, 0, line));
        }
        self.expect(COMPILER);
        self.gen_scanner = true;
        self.tab.ignored = CharSet::single(' ' as u32);
        self.expect(IDENT);
        let gram_name = self.t.val.clone();
        self.tab.gram_name = gram_name.clone();
        let (beg, line) = (self.la.pos, self.la.line);
        while self.start_of(ANY_IN_DECLS) {
            self.get();
        }
        self.tab.sem_decl_pos = Some(Position::new(beg, self.la.pos, 0, line));
        if self.la.kind == IGNORECASE {
            self.get();
            self.dfa.ignore_case = true;
        }
        if self.la.kind == CHARACTERS {
            self.get();
            while self.la.kind == IDENT {
                self.set_decl();
            }
        }
        if self.la.kind == TOKENS {
            self.get();
            while self.start_of(set![IDENT, STRING, CHAR]) {
                self.token_decl(SymbolKind::Terminal);
            }
        }
        if self.la.kind == PRAGMAS {
            self.get();
            while self.start_of(set![IDENT, STRING, CHAR]) {
                self.token_decl(SymbolKind::Pragma);
            }
        }
        while self.la.kind == COMMENTS {
            self.get();
            let mut nested = false;
            self.expect(FROM);
            let g1 = self.token_expr();
            self.expect(TO);
            let g2 = self.token_expr();
            if self.la.kind == NESTED {
                self.get();
                nested = true;
            }
            if let Err(issues) = self.dfa.new_comment(&self.tab, g1.l, g2.l, nested) {
                self.sem_errs(issues);
            }
        }
        while self.la.kind == IGNORE {
            self.get();
            let s = self.set();
            self.tab.ignored.union_with(&s);
        }
        while !self.start_of(BEFORE_PRODUCTIONS) {
            self.syn_err(ERR_COCO);
            self.get();
        }
        self.expect(PRODUCTIONS);
        if self.gen_scanner {
            self.dfa.make_deterministic(&self.tab, &mut self.errors);
        }
        self.tab.delete_nodes();
        while self.la.kind == IDENT {
            self.production();
        }
        self.expect(END);
        self.expect(IDENT);
        if gram_name != self.t.val {
            self.sem_err("name does not match grammar name");
        }
        let gram_sy = match self.tab.find_sym(&gram_name) {
            Some(s) if self.tab[s].kind == SymbolKind::Nonterminal => Some(s),
            _ => None,
        };
        self.tab.gram_sy = gram_sy;
        match gram_sy {
            None => self.sem_err("missing production for grammar name"),
            Some(sym) => if self.tab[sym].attr_pos.is_some() {
                self.sem_err("grammar symbol must not have attributes");
            },
        }
        let no_sym = self.tab.new_sym(SymbolKind::Terminal, "???", 0);
        self.tab.no_sym = Some(no_sym);
        ::sets::setup_anys(&mut self.tab);
        self.tab.renumber_pragmas();
        if self.tab.ddt[2] {
            self.tab.print_nodes();
        }
        self.expect(PERIOD);
    }

    fn production(&mut self) {
        self.get();
        let (name, line) = (self.t.val.clone(), self.t.line);
        let (sym, undef) = match self.tab.find_sym(&name) {
            None => (self.tab.new_sym(SymbolKind::Nonterminal, name, line), true),
            Some(sym) => {
                if self.tab[sym].kind == SymbolKind::Nonterminal {
                    if self.tab[sym].graph.is_some() {
                        self.sem_err("name declared twice");
                    }
                } else {
                    self.sem_err("this symbol kind not allowed on left side of production");
                }
                self.tab[sym].line = line;
                (sym, false)
            }
        };
        let no_attrs = self.tab[sym].attr_pos.is_none();
        self.tab[sym].attr_pos = None;
        if self.la.kind == LT || self.la.kind == LT_DOT {
            let pos = self.attr_decl();
            self.tab[sym].attr_pos = pos;
        }
        if !undef && no_attrs != self.tab[sym].attr_pos.is_none() {
            self.sem_err("attribute mismatch between declaration and use of this symbol");
        }
        if self.la.kind == SEM_BEG {
            let pos = self.sem_text();
            self.tab[sym].sem_pos = Some(pos);
        }
        self.expect_weak(EQUAL, AFTER_EQUAL);
        let g = self.expression();
        self.tab[sym].graph = Some(g.l);
        self.tab.finish(g);
        self.expect_weak(PERIOD, AFTER_PERIOD);
    }

    fn set_decl(&mut self) {
        self.expect(IDENT);
        let name = self.t.val.clone();
        if self.tab.find_char_class(&name).is_some() {
            self.sem_err("name declared twice");
        }
        self.expect(EQUAL);
        let s = self.set();
        if s.is_empty() {
            self.sem_err("character set must not be empty");
        }
        self.tab.new_char_class(name, s);
        self.expect(PERIOD);
    }

    fn set(&mut self) -> CharSet {
        let mut s = self.sim_set();
        while self.la.kind == PLUS || self.la.kind == MINUS {
            if self.la.kind == PLUS {
                self.get();
                let s2 = self.sim_set();
                s.union_with(&s2);
            } else {
                self.get();
                let s2 = self.sim_set();
                s.subtract(&s2);
            }
        }
        s
    }

    fn sim_set(&mut self) -> CharSet {
        let mut s = CharSet::new();
        match self.la.kind {
            IDENT => {
                self.get();
                match self.tab.find_char_class(&self.t.val) {
                    Some(c) => s.union_with(self.tab.char_class_set(c)),
                    None => self.sem_err("undefined name"),
                }
            }
            STRING => {
                self.get();
                let body = self.t.val[1..self.t.val.len() - 1].to_string();
                if let Some(text) = self.literal(&body) {
                    for ch in text.chars() {
                        s.insert(self.fold(ch) as u32);
                    }
                }
            }
            CHAR => {
                let n1 = self.character();
                s.insert(n1);
                if self.la.kind == RANGE {
                    self.get();
                    let n2 = self.character();
                    for ch in n1..n2 + 1 {
                        s.insert(ch);
                    }
                }
            }
            ANY => {
                self.get();
                s.fill();
            }
            _ => self.syn_err(ERR_SIM_SET),
        }
        s
    }

    fn fold(&self, ch: char) -> char {
        if self.dfa.ignore_case {
            ch.to_lowercase().next().unwrap_or(ch)
        } else {
            ch
        }
    }

    fn character(&mut self) -> u32 {
        self.expect(CHAR);
        let val = self.t.val.clone();
        let mut n = 0;
        if val.len() >= 2 {
            match unescape(&val[1..val.len() - 1]) {
                Ok(ref s) if s.chars().count() == 1 => {
                    n = s.chars().next().map(|c| c as u32).unwrap_or(0);
                }
                _ => self.sem_err("unacceptable character value"),
            }
        }
        if n > MAX_CHAR {
            self.sem_err("unacceptable character value");
        }
        if self.dfa.ignore_case && n >= 'A' as u32 && n <= 'Z' as u32 {
            n += 32;
        }
        n
    }

    fn token_decl(&mut self, typ: SymbolKind) {
        let (name, kind) = self.sym();
        let sym = match self.tab.find_sym(&name) {
            Some(_) => {
                self.sem_err("name declared twice");
                None
            }
            None => {
                let sym = self.tab.new_sym(typ, name.clone(), self.t.line);
                self.tab[sym].token_kind = TokenKind::Fixed;
                Some(sym)
            }
        };
        self.token_string = TokenString::Unset;
        while !self.start_of(TOKEN_DECL_SYNC) {
            self.syn_err(ERR_TOKEN_DECL_SYNC);
            self.get();
        }
        if self.la.kind == EQUAL {
            self.get();
            let g = self.token_expr();
            self.expect(PERIOD);
            if kind == SymKind::Literal {
                self.sem_err("a literal must not be declared with a structure");
            }
            self.tab.finish(g);
            if let Some(sym) = sym {
                match mem::replace(&mut self.token_string, TokenString::Unset) {
                    TokenString::Literal(lit) => {
                        if self.tab.literals.contains_key(&lit) {
                            self.sem_err("token string declared twice");
                        } else {
                            self.tab.literals.insert(lit.clone(), sym);
                            self.match_literal(&lit, sym);
                        }
                    }
                    _ => {
                        let result = self.dfa.convert_to_states(&mut self.tab, g.l, sym);
                        if let Err(issues) = result {
                            self.sem_errs(issues);
                        }
                    }
                }
            }
        } else if self.start_of(TOKEN_DECL_END) {
            if kind == SymKind::Ident {
                self.gen_scanner = false;
            } else if let Some(sym) = sym {
                let lit = self.tab[sym].name.clone();
                if !self.tab.literals.contains_key(&lit) {
                    self.tab.literals.insert(lit.clone(), sym);
                }
                self.match_literal(&lit, sym);
            }
        } else {
            self.syn_err(ERR_TOKEN_DECL);
        }
        if self.la.kind == SEM_BEG {
            let pos = self.sem_text();
            if typ != SymbolKind::Pragma {
                self.sem_err("semantic action not allowed here");
            }
            if let Some(sym) = sym {
                self.tab[sym].sem_pos = Some(pos);
            }
        }
    }

    /// Thread a quoted literal into the automaton.
    fn match_literal(&mut self, quoted: &str, sym: SymbolId) {
        if let Some(text) = self.literal(&quoted[1..quoted.len() - 1]) {
            if let Err(msg) = self.dfa.match_literal(&mut self.tab, &text, sym) {
                self.sem_err(msg);
            }
        }
    }

    /// Resolve the escapes of a literal body. Characters the scanner cannot
    /// represent are an error.
    fn literal(&mut self, body: &str) -> Option<String> {
        match unescape(body) {
            Ok(ref text) if text.chars().any(|c| c as u32 > MAX_CHAR) => {
                self.sem_err("unacceptable character value");
                None
            }
            Ok(text) => Some(text),
            Err(msg) => {
                self.sem_err(msg);
                None
            }
        }
    }

    fn attr_text(&mut self, close: usize, any: u64) -> Option<Position> {
        self.get();
        let (beg, col, line) = (self.la.pos, self.la.col, self.la.line);
        while self.start_of(any | set![BAD_STRING]) {
            if self.la.kind == BAD_STRING {
                self.get();
                self.sem_err("bad string in attributes");
            } else {
                self.get();
            }
        }
        self.expect(close);
        if self.t.pos > beg {
            Some(Position::new(beg, self.t.pos, col, line))
        } else {
            None
        }
    }

    fn attr_decl(&mut self) -> Option<Position> {
        match self.la.kind {
            LT => self.attr_text(GT, ANY_IN_ATTR),
            LT_DOT => self.attr_text(DOT_GT, ANY_IN_ATTR_DOT),
            _ => {
                self.syn_err(ERR_ATTR_DECL);
                None
            }
        }
    }

    fn attribs(&mut self) -> Option<Position> {
        match self.la.kind {
            LT => self.attr_text(GT, ANY_IN_ATTR),
            LT_DOT => self.attr_text(DOT_GT, ANY_IN_ATTR_DOT),
            _ => {
                self.syn_err(ERR_ATTRIBS);
                None
            }
        }
    }

    fn expression(&mut self) -> Graph {
        let mut g = self.term();
        let mut first = true;
        while self.weak_separator(PIPE, TERM_START | TERM_FOLLOW, EXPR_FOLLOW) {
            let g2 = self.term();
            if first {
                g = self.tab.make_first_alt(g);
                first = false;
            }
            g = self.tab.make_alternative(g, g2);
        }
        g
    }

    fn term(&mut self) -> Graph {
        let mut g: Option<Graph> = None;
        if self.start_of(TERM_START) {
            if self.la.kind == IF {
                let rslv = self.tab.new_node(NodeKind::Resolver, None, self.la.line);
                let pos = self.resolver();
                self.tab[rslv].pos = Some(pos);
                g = Some(Graph::single(rslv));
            }
            let g2 = self.factor();
            g = Some(match g {
                Some(g) => self.tab.make_sequence(g, g2),
                None => g2,
            });
            while self.start_of(FACTOR_START) {
                let g2 = self.factor();
                g = g.map(|g| self.tab.make_sequence(g, g2));
            }
        } else if self.start_of(TERM_FOLLOW) {
            g = Some(Graph::single(self.tab.new_node(NodeKind::Eps, None, 0)));
        } else {
            self.syn_err(ERR_TERM);
        }
        match g {
            Some(g) => g,
            None => Graph::single(self.tab.new_node(NodeKind::Eps, None, 0)),
        }
    }

    fn factor(&mut self) -> Graph {
        let mut weak = false;
        match self.la.kind {
            IDENT | STRING | CHAR | WEAK => {
                if self.la.kind == WEAK {
                    self.get();
                    weak = true;
                }
                let (name, kind) = self.sym();
                let mut sym = self.tab.find_sym(&name);
                if sym.is_none() && kind == SymKind::Literal {
                    sym = self.tab.literals.get(&name).cloned();
                }
                let undef = sym.is_none();
                let sym = match sym {
                    Some(sym) => sym,
                    None => if kind == SymKind::Ident {
                        self.tab.new_sym(SymbolKind::Nonterminal, name, 0)
                    } else if self.gen_scanner {
                        let sym = self.tab.new_sym(SymbolKind::Terminal, name.clone(), self.t.line);
                        self.tab.literals.insert(name.clone(), sym);
                        self.match_literal(&name, sym);
                        sym
                    } else {
                        self.sem_err("undefined string in production");
                        self.tab.eof_sy
                    },
                };
                let mut typ = match self.tab[sym].kind {
                    SymbolKind::Terminal => NodeKind::Terminal,
                    SymbolKind::Nonterminal => NodeKind::Nonterminal,
                    SymbolKind::Pragma => {
                        self.sem_err("this symbol kind is not allowed in a production");
                        NodeKind::Terminal
                    }
                };
                if weak {
                    if typ == NodeKind::Terminal {
                        typ = NodeKind::WeakTerminal;
                    } else {
                        self.sem_err("only terminals may be weak");
                    }
                }
                let p = self.tab.new_node(typ, Some(sym), self.t.line);
                if self.la.kind == LT || self.la.kind == LT_DOT {
                    let pos = self.attribs();
                    self.tab[p].pos = pos;
                    if kind != SymKind::Ident {
                        self.sem_err("a literal must not have attributes");
                    }
                }
                if undef {
                    self.tab[sym].attr_pos = self.tab[p].pos;
                } else if self.tab[p].pos.is_none() != self.tab[sym].attr_pos.is_none() {
                    self.sem_err("attribute mismatch between declaration and use of this symbol");
                }
                Graph::single(p)
            }
            LPAREN => {
                self.get();
                let g = self.expression();
                self.expect(RPAREN);
                g
            }
            LBRACK => {
                self.get();
                let g = self.expression();
                self.expect(RBRACK);
                self.tab.make_option(g)
            }
            LBRACE => {
                self.get();
                let g = self.expression();
                self.expect(RBRACE);
                self.tab.make_iteration(g)
            }
            SEM_BEG => {
                let pos = self.sem_text();
                let p = self.tab.new_node(NodeKind::Sem, None, 0);
                self.tab[p].pos = Some(pos);
                Graph::single(p)
            }
            ANY => {
                self.get();
                Graph::single(self.tab.new_node(NodeKind::Any, None, 0))
            }
            SYNC => {
                self.get();
                Graph::single(self.tab.new_node(NodeKind::Sync, None, 0))
            }
            _ => {
                self.syn_err(ERR_FACTOR);
                Graph::single(self.tab.new_node(NodeKind::Eps, None, 0))
            }
        }
    }

    fn resolver(&mut self) -> Position {
        self.expect(IF);
        self.expect(LPAREN);
        let (beg, col, line) = (self.la.pos, self.la.col, self.la.line);
        self.condition();
        Position::new(beg, self.t.pos, col, line)
    }

    fn condition(&mut self) {
        while self.start_of(ANY_IN_COND | set![LPAREN]) {
            if self.la.kind == LPAREN {
                self.get();
                self.condition();
            } else {
                self.get();
            }
        }
        self.expect(RPAREN);
    }

    fn token_expr(&mut self) -> Graph {
        let mut g = self.token_term();
        let mut first = true;
        while self.weak_separator(PIPE, TOKEN_FACTOR_START, TOKEN_EXPR_FOLLOW) {
            let g2 = self.token_term();
            if first {
                g = self.tab.make_first_alt(g);
                first = false;
            }
            g = self.tab.make_alternative(g, g2);
        }
        g
    }

    fn token_term(&mut self) -> Graph {
        let mut g = self.token_factor();
        while self.start_of(TOKEN_FACTOR_START) {
            let g2 = self.token_factor();
            g = self.tab.make_sequence(g, g2);
        }
        if self.la.kind == CONTEXT {
            self.get();
            self.expect(LPAREN);
            let g2 = self.token_expr();
            self.tab.set_context_trans(Some(g2.l));
            self.dfa.has_ctx_moves = true;
            g = self.tab.make_sequence(g, g2);
            self.expect(RPAREN);
        }
        g
    }

    fn token_factor(&mut self) -> Graph {
        let g = match self.la.kind {
            IDENT | STRING | CHAR => {
                let (name, kind) = self.sym();
                if kind == SymKind::Ident {
                    let c = match self.tab.find_char_class(&name) {
                        Some(c) => c,
                        None => {
                            self.sem_err("undefined name");
                            self.tab.new_char_class(name, CharSet::new())
                        }
                    };
                    let p = self.tab.new_node_val(NodeKind::CharClass, c as u32, 0);
                    self.token_string = TokenString::Structured;
                    Some(Graph::single(p))
                } else {
                    let g = self.str_to_graph(&name);
                    self.token_string = match self.token_string {
                        TokenString::Unset => TokenString::Literal(name),
                        _ => TokenString::Structured,
                    };
                    g
                }
            }
            LPAREN => {
                self.get();
                let g = self.token_expr();
                self.expect(RPAREN);
                Some(g)
            }
            LBRACK => {
                self.get();
                let g = self.token_expr();
                self.expect(RBRACK);
                self.token_string = TokenString::Structured;
                Some(self.tab.make_option(g))
            }
            LBRACE => {
                self.get();
                let g = self.token_expr();
                self.expect(RBRACE);
                self.token_string = TokenString::Structured;
                Some(self.tab.make_iteration(g))
            }
            _ => {
                self.syn_err(ERR_TOKEN_FACTOR);
                None
            }
        };
        match g {
            Some(g) => g,
            None => Graph::single(self.tab.new_node(NodeKind::Eps, None, 0)),
        }
    }

    fn str_to_graph(&mut self, quoted: &str) -> Option<Graph> {
        let line = self.t.line;
        let text = self.literal(&quoted[1..quoted.len() - 1])?;
        let g = self.tab.str_to_graph(&text, line);
        if g.is_none() {
            self.sem_err("empty token not allowed");
        }
        g
    }

    fn sym(&mut self) -> (String, SymKind) {
        match self.la.kind {
            IDENT => {
                self.get();
                (self.t.val.clone(), SymKind::Ident)
            }
            STRING | CHAR => {
                self.get();
                let val = &self.t.val;
                let mut name = if self.t.kind == STRING {
                    val.clone()
                } else {
                    format!("\"{}\"", &val[1..val.len() - 1])
                };
                if self.dfa.ignore_case {
                    name = name.to_lowercase();
                }
                if name.contains(' ') {
                    self.sem_err("literal tokens must not contain blanks");
                }
                (name, SymKind::Literal)
            }
            _ => {
                self.syn_err(ERR_SYM);
                ("???".into(), SymKind::Ident)
            }
        }
    }

    fn sem_text(&mut self) -> Position {
        self.expect(SEM_BEG);
        let (beg, col, line) = (self.la.pos, self.la.col, self.la.line);
        while self.start_of(ANY_IN_SEM | set![BAD_STRING, SEM_BEG]) {
            match self.la.kind {
                BAD_STRING => {
                    self.get();
                    self.sem_err("bad string in semantic action");
                }
                SEM_BEG => {
                    self.get();
                    self.sem_err("missing end of previous semantic action");
                }
                _ => self.get(),
            }
        }
        self.expect(SEM_END);
        Position::new(beg, self.t.pos, col, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tab::TokenKind;

    const MINIMAL: &str = "COMPILER T CHARACTERS letter = 'a'..'z'. \
                           TOKENS ident = letter {letter}. PRODUCTIONS T = ident. END T.";

    #[test]
    fn minimal_grammar() {
        let p = parse(MINIMAL);
        assert_eq!(p.errors.count(), 0, "{}", p.errors);
        assert!(p.gen_scanner);
        let t = p.tab.gram_sy.unwrap();
        assert_eq!(p.tab[t].name, "T");
        let ident = p.tab.find_sym("ident").unwrap();
        assert_eq!(p.tab[ident].n, 1);
        assert_eq!(p.tab[ident].token_kind, TokenKind::Class);
        assert_eq!(p.tab.terminal(2).name, "???");
        assert_eq!(p.dfa.simulate(&p.tab, "abc"), vec![(1, "abc".to_string())]);
    }

    #[test]
    fn duplicate_token_string() {
        let p = parse(
            "COMPILER T TOKENS a = \"x\". b = \"x\". PRODUCTIONS T = a. END T.",
        );
        let dups = p.errors
            .diagnostics()
            .iter()
            .filter(|d| d.message == "token string declared twice")
            .count();
        assert_eq!(dups, 1);
    }

    #[test]
    fn undefined_char_class_continues() {
        let p = parse(
            "COMPILER T TOKENS ident = letter. \
             PRODUCTIONS T = ident | \"x\" \"y\". END T.",
        );
        assert!(p.errors.mentions("undefined name"));
        assert!(p.tab.find_sym("\"y\"").is_some());
        assert!(p.tab.gram_sy.is_some());
    }

    #[test]
    fn semantic_text_positions() {
        let src = "COMPILER T (. use x; .) PRODUCTIONS T<. n: u32 .> (. let a = 1; .) = \"t\". END T.";
        let p = parse(src);
        let t = p.tab.gram_sy.unwrap();
        let attr = p.tab[t].attr_pos.unwrap();
        assert_eq!(&src[attr.beg..attr.end], "n: u32 ");
        let sem = p.tab[t].sem_pos.unwrap();
        assert_eq!(&src[sem.beg..sem.end], "let a = 1; ");
        let decl = p.tab.sem_decl_pos.unwrap();
        assert_eq!(&src[decl.beg..decl.end], "(. use x; .) ");
    }

    #[test]
    fn syntax_errors_are_recovered() {
        let p = parse("COMPILER T PRODUCTIONS T = \"a\" ) . U = \"b\". END T.");
        assert!(p.errors.count() >= 1);
        assert!(p.tab.find_sym("U").is_some());
    }

    #[test]
    fn pragmas_are_applied() {
        let p = parse("$namespace=calc $F COMPILER T PRODUCTIONS T = \"a\". END T.");
        assert_eq!(p.tab.ns_name, Some("calc".to_string()));
        assert!(p.tab.ddt[1]);
    }

    #[test]
    fn name_mismatch() {
        let p = parse("COMPILER T PRODUCTIONS T = \"a\". END U.");
        assert!(p.errors.mentions("name does not match grammar name"));
    }

    #[test]
    fn weak_and_attribute_errors() {
        let p = parse(
            "COMPILER T PRODUCTIONS T = WEAK A A<x>. A = \"a\". END T.",
        );
        assert!(p.errors.mentions("only terminals may be weak"));
        assert!(p.errors.mentions("attribute mismatch between declaration and use of this symbol"));
    }

    fn unacceptable(src: &str) -> usize {
        parse(src)
            .errors
            .diagnostics()
            .iter()
            .filter(|d| d.message == "unacceptable character value")
            .count()
    }

    #[test]
    fn characters_beyond_the_alphabet() {
        assert_eq!(
            unacceptable("COMPILER T PRODUCTIONS T = \"\u{1F600}\". END T."),
            1
        );
        assert_eq!(
            unacceptable(
                "COMPILER T CHARACTERS e = '\u{1F600}'. TOKENS x = e. PRODUCTIONS T = x. END T."
            ),
            1
        );
        assert_eq!(
            unacceptable(
                "COMPILER T CHARACTERS e = \"ab\u{1F600}\". TOKENS x = e. PRODUCTIONS T = x. END T."
            ),
            1
        );
        assert_eq!(
            unacceptable("COMPILER T TOKENS x = \"a\u{1F600}\" 'b'. PRODUCTIONS T = x. END T."),
            1
        );
        assert_eq!(
            unacceptable("COMPILER T CHARACTERS e = '\u{FFFF}'. TOKENS x = e. PRODUCTIONS T = x. END T."),
            0
        );
    }
}
