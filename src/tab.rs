// Copyright (c) 2018 Fabian Schuiki

//! The grammar model.
//!
//! `Tab` owns the symbol table, the character classes and every node of every
//! production graph. Nodes live in a single arena and refer to each other by
//! `NodeId`. A production graph is threaded through three links:
//!
//! - `sub` points to the first node of the body of an alternative, option or
//!   iteration node,
//! - `down` points to the next alternative of an alternative node,
//! - `next` points to the successor. The last node of a nested body has its
//!   `up` flag set, and its `next` leads back out of the structure: to the
//!   successor of an alternative or option, or to the iteration node itself.

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::ops::{Index, IndexMut};

use bit_set::BitSet;
use indexmap::IndexMap;

use charset::CharSet;
use source::Position;
use Pretty;

/// A unique symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub usize);

/// A unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// The kind of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A token.
    Terminal,
    /// A token that may appear anywhere and is handled by a semantic action.
    Pragma,
    /// A symbol with a production.
    Nonterminal,
}

/// How the scanner recognizes a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A token with a fixed spelling and no overlap with other tokens.
    Fixed,
    /// A token defined through character classes, e.g. an identifier.
    Class,
    /// A literal that is also matched by a class token, e.g. a keyword.
    Literal,
    /// A class token that also matches literal tokens.
    ClassLiteral,
}

/// A terminal, pragma or nonterminal.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// The kind of symbol.
    pub kind: SymbolKind,
    /// The name. Literal tokens keep their quotes, e.g. `"while"`.
    pub name: String,
    /// The number of the symbol. Terminals and pragmas are numbered in one
    /// space, which yields the token codes; nonterminals in another.
    pub n: usize,
    /// The line of the declaration.
    pub line: usize,
    /// The formal attributes of a nonterminal.
    pub attr_pos: Option<Position>,
    /// The semantic action of a pragma or at the start of a production.
    pub sem_pos: Option<Position>,
    /// The root of the production graph.
    pub graph: Option<NodeId>,
    /// How the scanner recognizes this token.
    pub token_kind: TokenKind,
    /// Whether the nonterminal can derive the empty string.
    pub deletable: bool,
    /// Whether `first` has been computed.
    pub first_ready: bool,
    /// The terminals a derivation of this nonterminal can start with.
    pub first: BitSet,
    /// The terminals that can follow this nonterminal.
    pub follow: BitSet,
    /// Nonterminals whose followers have to be added to `follow`.
    pub nts: BitSet,
}

impl Symbol {
    fn new(kind: SymbolKind, name: String, line: usize) -> Symbol {
        Symbol {
            kind: kind,
            name: name,
            n: 0,
            line: line,
            attr_pos: None,
            sem_pos: None,
            graph: None,
            token_kind: TokenKind::Fixed,
            deletable: false,
            first_ready: false,
            first: BitSet::new(),
            follow: BitSet::new(),
            nts: BitSet::new(),
        }
    }

    /// Whether this is a literal token, i.e. its name is a quoted string.
    pub fn is_literal(&self) -> bool {
        self.name.starts_with('"')
    }
}

/// The kind of a production graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A terminal symbol.
    Terminal,
    /// A nonterminal symbol.
    Nonterminal,
    /// A weak terminal symbol.
    WeakTerminal,
    /// A character class in a token definition.
    CharClass,
    /// A single character in a token definition.
    Char,
    /// Any terminal not expected otherwise at this point.
    Any,
    /// The empty alternative.
    Eps,
    /// A synchronization point for error recovery.
    Sync,
    /// A semantic action.
    Sem,
    /// An alternative.
    Alt,
    /// A repetition `{...}`.
    Iter,
    /// An option `[...]`.
    Opt,
    /// A resolver `IF(...)`.
    Resolver,
}

impl NodeKind {
    /// The short name used in dumps.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Terminal => "t",
            NodeKind::Nonterminal => "nt",
            NodeKind::WeakTerminal => "wt",
            NodeKind::CharClass => "clas",
            NodeKind::Char => "chr",
            NodeKind::Any => "any",
            NodeKind::Eps => "eps",
            NodeKind::Sync => "sync",
            NodeKind::Sem => "sem",
            NodeKind::Alt => "alt",
            NodeKind::Iter => "iter",
            NodeKind::Opt => "opt",
            NodeKind::Resolver => "rslv",
        }
    }
}

/// How a character transition of a token is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Trans {
    /// The character becomes part of the token.
    Normal,
    /// The character is trailing context and is given back after the match.
    Context,
}

/// A node of a production graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// The id of this node.
    pub n: NodeId,
    /// The kind of node.
    pub kind: NodeKind,
    /// The successor.
    pub next: Option<NodeId>,
    /// The next alternative of an alternative node.
    pub down: Option<NodeId>,
    /// The body of an alternative, option or iteration.
    pub sub: Option<NodeId>,
    /// Whether `next` leads out of the enclosing structure.
    pub up: bool,
    /// The symbol of terminal and nonterminal nodes.
    pub sym: Option<SymbolId>,
    /// The character of a char node or the class index of a class node.
    pub val: u32,
    /// The transition code of char and class nodes.
    pub code: Trans,
    /// The terminals accepted by an ANY node or synchronized on by a SYNC node.
    pub set: BitSet,
    /// Actual attributes, semantic action or resolver text.
    pub pos: Option<Position>,
    /// The source line.
    pub line: usize,
    /// The automaton state assigned during token conversion.
    pub state: Option<usize>,
}

/// A graph under construction.
///
/// `l` is the entry node. `r` is the head of the list of end nodes, linked
/// through `next`; appending a successor to the graph sets the `next` link of
/// every node on that list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graph {
    /// The entry node.
    pub l: NodeId,
    /// The head of the end node list.
    pub r: NodeId,
}

impl Graph {
    /// A graph consisting of a single node.
    pub fn single(node: NodeId) -> Graph {
        Graph { l: node, r: node }
    }
}

/// A named character class.
#[derive(Debug, Clone)]
pub struct CharClass {
    /// The index of the class.
    pub n: usize,
    /// The name of the class.
    pub name: String,
    /// The characters of the class.
    pub set: CharSet,
}

/// The grammar model.
#[derive(Debug, Clone)]
pub struct Tab {
    symbols: Vec<Symbol>,
    nodes: Vec<Node>,
    /// The terminals in numbering order.
    pub terminals: Vec<SymbolId>,
    /// The pragmas in declaration order.
    pub pragmas: Vec<SymbolId>,
    /// The nonterminals in numbering order.
    pub nonterminals: Vec<SymbolId>,
    /// The character classes.
    pub classes: Vec<CharClass>,
    /// The literal token strings and the symbols they declare.
    pub literals: IndexMap<String, SymbolId>,
    /// The characters the scanner skips.
    pub ignored: CharSet,
    /// The end-of-file terminal, always number 0.
    pub eof_sy: SymbolId,
    /// The terminal for invalid input, always the last terminal.
    pub no_sym: Option<SymbolId>,
    /// The start symbol.
    pub gram_sy: Option<SymbolId>,
    /// The name after `COMPILER`.
    pub gram_name: String,
    /// The union of all SYNC sets, plus EOF.
    pub all_sync_sets: BitSet,
    /// The debug switches set by DDT pragmas.
    pub ddt: [bool; 10],
    /// The module to wrap the generated code in.
    pub ns_name: Option<String>,
    /// Whether the generated parser expects EOF after the start symbol.
    pub check_eof: bool,
    /// Text before `COMPILER`, copied to the top of the generated parser.
    pub use_pos: Option<Position>,
    /// Global declarations following `COMPILER name`.
    pub sem_decl_pos: Option<Position>,
    /// Dumps requested by DDT switches.
    pub trace: String,
}

impl Tab {
    /// Create an empty grammar model containing only the EOF terminal.
    pub fn new() -> Tab {
        let mut tab = Tab {
            symbols: Vec::new(),
            nodes: Vec::new(),
            terminals: Vec::new(),
            pragmas: Vec::new(),
            nonterminals: Vec::new(),
            classes: Vec::new(),
            literals: IndexMap::new(),
            ignored: CharSet::new(),
            eof_sy: SymbolId(0),
            no_sym: None,
            gram_sy: None,
            gram_name: String::new(),
            all_sync_sets: BitSet::new(),
            ddt: [false; 10],
            ns_name: None,
            check_eof: true,
            use_pos: None,
            sem_decl_pos: None,
            trace: String::new(),
        };
        tab.eof_sy = tab.new_sym(SymbolKind::Terminal, "EOF", 0);
        tab
    }

    // ---------------------------------------------------------------------
    // Symbols

    /// Declare a new symbol.
    ///
    /// Terminals and nonterminals get the next number of their numbering
    /// space. Pragmas are numbered after all terminals by
    /// `renumber_pragmas` once the grammar is complete.
    pub fn new_sym<S: Into<String>>(&mut self, kind: SymbolKind, name: S, line: usize) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        let mut sym = Symbol::new(kind, name.into(), line);
        match kind {
            SymbolKind::Terminal => {
                sym.n = self.terminals.len();
                self.terminals.push(id);
            }
            SymbolKind::Pragma => self.pragmas.push(id),
            SymbolKind::Nonterminal => {
                sym.n = self.nonterminals.len();
                self.nonterminals.push(id);
            }
        }
        trace!("new {:?} symbol {} as {:?}", kind, sym.name, id);
        self.symbols.push(sym);
        id
    }

    /// Find a terminal or nonterminal by name.
    pub fn find_sym(&self, name: &str) -> Option<SymbolId> {
        self.terminals
            .iter()
            .chain(self.nonterminals.iter())
            .cloned()
            .find(|&id| self[id].name == name)
    }

    /// The terminal with token code `n`.
    pub fn terminal(&self, n: usize) -> &Symbol {
        &self[self.terminals[n]]
    }

    /// Give pragmas the token codes following the terminals.
    pub fn renumber_pragmas(&mut self) {
        let mut n = self.terminals.len();
        for i in 0..self.pragmas.len() {
            let id = self.pragmas[i];
            self[id].n = n;
            n += 1;
        }
    }

    /// Create an empty set of terminals.
    pub fn term_set(&self) -> BitSet {
        BitSet::with_capacity(self.terminals.len())
    }

    // ---------------------------------------------------------------------
    // Nodes and graphs

    /// The number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Drop all nodes. Used once the token graphs have been converted to the
    /// automaton, so that production nodes are numbered from scratch.
    pub fn delete_nodes(&mut self) {
        self.nodes.clear();
    }

    /// Allocate a new node.
    pub fn new_node(&mut self, kind: NodeKind, sym: Option<SymbolId>, line: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            n: id,
            kind: kind,
            next: None,
            down: None,
            sub: None,
            up: false,
            sym: sym,
            val: 0,
            code: Trans::Normal,
            set: BitSet::new(),
            pos: None,
            line: line,
            state: None,
        });
        id
    }

    /// Allocate a char or class node carrying `val`.
    pub fn new_node_val(&mut self, kind: NodeKind, val: u32, line: usize) -> NodeId {
        let id = self.new_node(kind, None, line);
        self[id].val = val;
        id
    }

    fn new_node_sub(&mut self, kind: NodeKind, sub: NodeId) -> NodeId {
        let line = self[sub].line;
        let id = self.new_node(kind, None, line);
        self[id].sub = Some(sub);
        id
    }

    /// Turn `g` into the first alternative of an alternative chain.
    pub fn make_first_alt(&mut self, g: Graph) -> Graph {
        let l = self.new_node_sub(NodeKind::Alt, g.l);
        self[g.r].up = true;
        self[l].next = Some(g.r);
        Graph::single(l)
    }

    /// Append `g2` as a further alternative to the chain started in `g1`.
    pub fn make_alternative(&mut self, g1: Graph, g2: Graph) -> Graph {
        let l2 = self.new_node_sub(NodeKind::Alt, g2.l);
        self[l2].up = true;
        self[g2.r].up = true;
        let mut p = g1.l;
        while let Some(d) = self[p].down {
            p = d;
        }
        self[p].down = Some(l2);
        let mut p = g1.r;
        while let Some(n) = self[p].next {
            p = n;
        }
        self[p].next = Some(l2);
        self[l2].next = Some(g2.r);
        g1
    }

    /// Concatenate two graphs.
    pub fn make_sequence(&mut self, g1: Graph, g2: Graph) -> Graph {
        let mut p = self[g1.r].next;
        self[g1.r].next = Some(g2.l);
        while let Some(q) = p {
            p = self[q].next;
            self[q].next = Some(g2.l);
        }
        Graph { l: g1.l, r: g2.r }
    }

    /// Wrap a graph in an iteration `{...}`.
    pub fn make_iteration(&mut self, g: Graph) -> Graph {
        let l = self.new_node_sub(NodeKind::Iter, g.l);
        self[g.r].up = true;
        let mut p = Some(g.r);
        while let Some(q) = p {
            p = self[q].next;
            self[q].next = Some(l);
        }
        Graph::single(l)
    }

    /// Wrap a graph in an option `[...]`.
    pub fn make_option(&mut self, g: Graph) -> Graph {
        let l = self.new_node_sub(NodeKind::Opt, g.l);
        self[g.r].up = true;
        self[l].next = Some(g.r);
        Graph::single(l)
    }

    /// Terminate all open ends of a finished graph.
    pub fn finish(&mut self, g: Graph) {
        let mut p = Some(g.r);
        while let Some(q) = p {
            p = self[q].next;
            self[q].next = None;
        }
    }

    /// Build the chain of char nodes spelling out `s`.
    ///
    /// Returns `None` for the empty string.
    pub fn str_to_graph(&mut self, s: &str, line: usize) -> Option<Graph> {
        let mut g: Option<Graph> = None;
        for ch in s.chars() {
            let p = self.new_node_val(NodeKind::Char, ch as u32, line);
            g = Some(match g {
                None => Graph::single(p),
                Some(g) => {
                    self[g.r].next = Some(p);
                    Graph { l: g.l, r: p }
                }
            });
        }
        g
    }

    /// Mark every character transition reachable from `p` as trailing context.
    pub fn set_context_trans(&mut self, p: Option<NodeId>) {
        let mut p = p;
        while let Some(q) = p {
            match self[q].kind {
                NodeKind::Char | NodeKind::CharClass => self[q].code = Trans::Context,
                NodeKind::Opt | NodeKind::Iter => {
                    let sub = self[q].sub;
                    self.set_context_trans(sub);
                }
                NodeKind::Alt => {
                    let (sub, down) = (self[q].sub, self[q].down);
                    self.set_context_trans(sub);
                    self.set_context_trans(down);
                }
                _ => (),
            }
            if self[q].up {
                break;
            }
            p = self[q].next;
        }
    }

    /// Whether the graph starting at `p` can derive the empty string.
    pub fn del_graph(&self, p: Option<NodeId>) -> bool {
        let mut p = p;
        while let Some(q) = p {
            if !self.del_node(q) {
                return false;
            }
            p = self[q].next;
        }
        true
    }

    /// Whether the body starting at `p` can derive the empty string, looking
    /// no further than the end of the enclosing structure.
    pub fn del_sub_graph(&self, p: Option<NodeId>) -> bool {
        let mut p = p;
        while let Some(q) = p {
            if !self.del_node(q) {
                return false;
            }
            if self[q].up {
                return true;
            }
            p = self[q].next;
        }
        true
    }

    /// Whether a single node can derive the empty string.
    pub fn del_node(&self, p: NodeId) -> bool {
        let node = &self[p];
        match node.kind {
            NodeKind::Nonterminal => node.sym.map(|s| self[s].deletable).unwrap_or(false),
            NodeKind::Alt => {
                self.del_sub_graph(node.sub) || (node.down.is_some() && self.del_sub_graph(node.down))
            }
            NodeKind::Iter
            | NodeKind::Opt
            | NodeKind::Sem
            | NodeKind::Eps
            | NodeKind::Resolver
            | NodeKind::Sync => true,
            _ => false,
        }
    }

    // ---------------------------------------------------------------------
    // Character classes

    /// Declare a character class.
    pub fn new_char_class<S: Into<String>>(&mut self, name: S, set: CharSet) -> usize {
        let n = self.classes.len();
        self.classes.push(CharClass {
            n: n,
            name: name.into(),
            set: set,
        });
        n
    }

    /// Find a character class by name.
    pub fn find_char_class(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.name == name)
    }

    /// The characters of class `n`.
    pub fn char_class_set(&self, n: usize) -> &CharSet {
        &self.classes[n].set
    }

    // ---------------------------------------------------------------------
    // Debug switches and options

    /// Apply a DDT pragma such as `$FX` or `$17`.
    pub fn set_ddt(&mut self, s: &str) {
        for ch in s.trim_start_matches('$').chars() {
            let ch = ch.to_ascii_uppercase();
            if let Some(d) = ch.to_digit(10) {
                self.ddt[d as usize] = true;
                continue;
            }
            let i = match ch {
                'A' => 0,
                'F' => 1,
                'G' => 2,
                'I' => 3,
                'J' => 4,
                'S' => 6,
                'X' => 7,
                'P' => 8,
                _ => continue,
            };
            self.ddt[i] = true;
        }
    }

    /// Apply an option pragma such as `$namespace=calc`.
    pub fn set_option(&mut self, s: &str) {
        let mut parts = s.splitn(2, '=');
        let name = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        match name {
            "$namespace" => {
                if self.ns_name.is_none() && !value.is_empty() {
                    self.ns_name = Some(value.into());
                }
            }
            "$checkEOF" => self.check_eof = value == "true",
            _ => debug!("ignoring unknown option {}", name),
        }
    }

    // ---------------------------------------------------------------------
    // Dumps

    /// Append the syntax graph to the trace.
    pub fn print_nodes(&mut self) {
        let mut out = String::new();
        let _ = writeln!(out, "Graph nodes:");
        let _ = writeln!(out, "----------------------------------------------------");
        let _ = writeln!(out, "   n type name          next  down   sub   pos  line");
        let _ = writeln!(out, "                               val  code");
        let _ = writeln!(out, "----------------------------------------------------");
        for node in &self.nodes {
            let link = |p: Option<NodeId>| p.map(|p| p.0 as isize).unwrap_or(0);
            let _ = write!(out, "{:4} {:<4} ", node.n.0, node.kind.name());
            match node.kind {
                NodeKind::Terminal | NodeKind::Nonterminal | NodeKind::WeakTerminal => {
                    let name = node.sym.map(|s| self[s].name.as_str()).unwrap_or("");
                    let _ = write!(out, "{:<12} {:5} ", name, link(node.next));
                    let pos = node.pos.map(|p| p.beg as isize).unwrap_or(0);
                    let _ = write!(out, "{:>19}", pos);
                }
                NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
                    let next = if node.up { -link(node.next) } else { link(node.next) };
                    let _ = write!(
                        out,
                        "{:12} {:5} {:5} {:5}      ",
                        "",
                        next,
                        link(node.down),
                        link(node.sub)
                    );
                }
                NodeKind::Char | NodeKind::CharClass => {
                    let code = match node.code {
                        Trans::Normal => "",
                        Trans::Context => "context",
                    };
                    let _ = write!(
                        out,
                        "{:12} {:5} {:5} {:>8}      ",
                        "",
                        link(node.next),
                        node.val,
                        code
                    );
                }
                NodeKind::Sem | NodeKind::Resolver => {
                    let pos = node.pos.map(|p| p.beg as isize).unwrap_or(0);
                    let _ = write!(out, "{:12} {:5} {:>17}  ", "", link(node.next), pos);
                }
                _ => {
                    let _ = write!(out, "{:12} {:5} {:19}", "", link(node.next), "");
                }
            }
            let _ = writeln!(out, "{:5}", node.line);
        }
        let _ = writeln!(out);
        self.trace.push_str(&out);
    }

    /// Append the symbol table to the trace.
    pub fn print_symbol_table(&mut self) {
        let mut out = String::new();
        let _ = writeln!(out, "Symbol Table:");
        let _ = writeln!(out, "------------");
        let _ = writeln!(out);
        let _ = writeln!(out, " nr name          typ  hasAt graph  del    line tokenKind");
        let all: Vec<SymbolId> = self.terminals
            .iter()
            .chain(self.pragmas.iter())
            .chain(self.nonterminals.iter())
            .cloned()
            .collect();
        for id in all {
            let sym = &self[id];
            let typ = match sym.kind {
                SymbolKind::Terminal => "t",
                SymbolKind::Pragma => "pr",
                SymbolKind::Nonterminal => "nt",
            };
            let _ = writeln!(
                out,
                "{:3} {:<14} {:<4} {:<5} {:5} {:<5} {:5} {:?}",
                sym.n,
                sym.name,
                typ,
                sym.attr_pos.is_some(),
                sym.graph.map(|g| g.0 as isize).unwrap_or(-1),
                sym.deletable,
                sym.line,
                sym.token_kind
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Literal Tokens:");
        let _ = writeln!(out, "--------------");
        for (lit, &id) in &self.literals {
            let _ = writeln!(out, "_{} =  {}.", self[id].name, lit);
        }
        let _ = writeln!(out);
        self.trace.push_str(&out);
    }

    /// Append the cross reference list to the trace.
    pub fn xref(&mut self) {
        let mut xref: BTreeMap<String, Vec<isize>> = BTreeMap::new();
        for &id in &self.nonterminals {
            xref.entry(self[id].name.clone())
                .or_insert_with(Vec::new)
                .push(-(self[id].line as isize));
        }
        for node in &self.nodes {
            match node.kind {
                NodeKind::Terminal | NodeKind::WeakTerminal | NodeKind::Nonterminal => {
                    if let Some(s) = node.sym {
                        xref.entry(self[s].name.clone())
                            .or_insert_with(Vec::new)
                            .push(node.line as isize);
                    }
                }
                _ => (),
            }
        }
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "Cross reference list:");
        let _ = writeln!(out, "--------------------");
        let _ = writeln!(out);
        for (name, lines) in &xref {
            let _ = write!(out, "  {:<12}", name);
            let mut col = 14;
            for line in lines {
                if col + 5 > 80 {
                    let _ = writeln!(out);
                    let _ = write!(out, "{:14}", "");
                    col = 14;
                }
                let _ = write!(out, "{:5}", line);
                col += 5;
            }
            let _ = writeln!(out);
        }
        let _ = writeln!(out);
        self.trace.push_str(&out);
    }

    /// Render a set of terminals by name.
    pub fn pretty_set<'a>(&'a self, set: &'a BitSet) -> Pretty<&'a Tab, &'a BitSet> {
        Pretty::new(self, set)
    }
}

impl Index<SymbolId> for Tab {
    type Output = Symbol;
    fn index(&self, idx: SymbolId) -> &Symbol {
        &self.symbols[idx.0]
    }
}

impl IndexMut<SymbolId> for Tab {
    fn index_mut(&mut self, idx: SymbolId) -> &mut Symbol {
        &mut self.symbols[idx.0]
    }
}

impl Index<NodeId> for Tab {
    type Output = Node;
    fn index(&self, idx: NodeId) -> &Node {
        &self.nodes[idx.0]
    }
}

impl IndexMut<NodeId> for Tab {
    fn index_mut(&mut self, idx: NodeId) -> &mut Node {
        &mut self.nodes[idx.0]
    }
}

impl SymbolId {
    /// Get a pretty printer for this symbol.
    pub fn pretty(self, tab: &Tab) -> Pretty<&Tab, Self> {
        Pretty::new(tab, self)
    }
}

impl<'a> fmt::Display for Pretty<&'a Tab, SymbolId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ctx[self.item].name)
    }
}

impl<'a> fmt::Display for Pretty<&'a Tab, &'a BitSet> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for &id in &self.ctx.terminals {
            if self.item.contains(self.ctx[id].n) {
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                write!(f, "{}", self.ctx[id].name)?;
            }
        }
        Ok(())
    }
}

/// Resolve the escape sequences of a string or character literal body.
pub fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let e = match chars.next() {
            Some(e) => e,
            None => return Err("bad escape sequence in string or character".into()),
        };
        out.push(match e {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'r' => '\r',
            'n' => '\n',
            't' => '\t',
            'v' => '\u{b}',
            '0' => '\0',
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'u' | 'x' => {
                let digits: String = chars.clone().take(4).take_while(|c| c.is_digit(16)).collect();
                if digits.is_empty() {
                    return Err("bad escape sequence in string or character".into());
                }
                for _ in 0..digits.len() {
                    chars.next();
                }
                match u32::from_str_radix(&digits, 16).ok().and_then(::std::char::from_u32) {
                    Some(c) => c,
                    None => return Err("bad escape sequence in string or character".into()),
                }
            }
            _ => return Err("bad escape sequence in string or character".into()),
        });
    }
    Ok(out)
}
