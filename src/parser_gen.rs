// Copyright (c) 2018 Fabian Schuiki

//! Generation of the parser.
//!
//! Every nonterminal becomes a method that walks its syntax graph. Decisions
//! test the lookahead token against the terminal sets computed for the graph,
//! either inline or through a table of sets emitted at the end of the parser.

use std::fmt::Write;

use bit_set::BitSet;

use errors::FatalError;
use frame::Frame;
use sets::{expected, expected0, first};
use source::{Position, Source};
use tab::{NodeId, NodeKind, SymbolId, Tab};

/// Sets with at most this many terminals are tested inline.
const MAX_TERM: usize = 3;

fn same(a: &BitSet, b: &BitSet) -> bool {
    a.iter().eq(b.iter())
}

fn indent_str(n: usize) -> String {
    "    ".repeat(n)
}

/// Remove up to `n` leading blanks or tabs from `line`.
fn strip_blanks(line: &str, n: usize) -> &str {
    let mut rest = line;
    for _ in 0..n {
        if rest.starts_with(' ') || rest.starts_with('\t') {
            rest = &rest[1..];
        } else {
            break;
        }
    }
    rest
}

/// The kinds of syntax errors the generated parser reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrKind {
    Alt,
    Sync,
}

/// The state of a parser generation.
struct ParserGen<'a> {
    tab: &'a Tab,
    src: &'a Source,
    /// The nonterminal whose production is being generated.
    cur: SymbolId,
    /// The interned condition sets. Set 0 is the union of all SYNC sets.
    sym_sets: Vec<BitSet>,
    /// The arms of the error message `match`.
    err: String,
    error_nr: usize,
}

impl<'a> ParserGen<'a> {
    fn new(tab: &'a Tab, src: &'a Source) -> ParserGen<'a> {
        let mut gen = ParserGen {
            tab: tab,
            src: src,
            cur: tab.eof_sy,
            sym_sets: vec![tab.all_sync_sets.clone()],
            err: String::new(),
            error_nr: 0,
        };
        for &sym in &tab.terminals {
            let msg = format!("{} expected", tab[sym].name);
            gen.err.push_str(&format!(
                "            {} => String::from({:?}),\n",
                tab[sym].n,
                msg
            ));
        }
        gen.error_nr = tab.terminals.len() - 1;
        gen
    }

    fn gen_error_msg(&mut self, kind: ErrKind) -> usize {
        self.error_nr += 1;
        let name = &self.tab[self.cur].name;
        let msg = match kind {
            ErrKind::Alt => format!("invalid {}", name),
            ErrKind::Sync => format!("this symbol not expected in {}", name),
        };
        self.err.push_str(&format!(
            "            {} => String::from({:?}),\n",
            self.error_nr,
            msg
        ));
        self.error_nr
    }

    fn new_cond_set(&mut self, s: &BitSet) -> usize {
        for i in 1..self.sym_sets.len() {
            if same(s, &self.sym_sets[i]) {
                return i;
            }
        }
        self.sym_sets.push(s.clone());
        self.sym_sets.len() - 1
    }

    /// Copy a span of the grammar into the output. With a nonzero indent
    /// every line is indented and the text is terminated by a newline.
    /// Continuation lines lose the indentation the first line had in the
    /// grammar.
    fn copy_source_part(&self, pos: Option<Position>, indent: usize) -> Result<String, FatalError> {
        let mut out = String::new();
        let pos = match pos {
            Some(pos) => pos,
            None => return Ok(out),
        };
        let text = self.src.slice(&pos)?.trim_end();
        if text.is_empty() {
            return Ok(out);
        }
        for (i, line) in text.split('\n').enumerate() {
            let line = line.trim_end_matches('\r');
            let line = if i == 0 { line } else { strip_blanks(line, pos.col) };
            if i > 0 {
                out.push('\n');
            }
            if !line.is_empty() {
                out.push_str(&indent_str(indent));
                out.push_str(line);
            }
        }
        if indent > 0 {
            out.push('\n');
        }
        Ok(out)
    }

    fn gen_cond(&mut self, s: &BitSet, p: Option<NodeId>) -> Result<String, FatalError> {
        if let Some(q) = p {
            if self.tab[q].kind == NodeKind::Resolver {
                return Ok(format!("({})", self.copy_source_part(self.tab[q].pos, 0)?));
            }
        }
        let n = s.len();
        Ok(if n == 0 {
            "false".into()
        } else if n <= MAX_TERM {
            s.iter()
                .map(|t| format!("self.la.kind == {}", t))
                .collect::<Vec<_>>()
                .join(" || ")
        } else {
            format!("self.start_of({})", self.new_cond_set(s))
        })
    }

    fn use_switch(&self, p: NodeId) -> bool {
        let tab = self.tab;
        if tab[p].kind != NodeKind::Alt {
            return false;
        }
        let mut n_alts = 0;
        let mut s1 = tab.term_set();
        let mut p = Some(p);
        while let Some(a) = p {
            let s2 = expected0(tab, tab[a].sub, self.cur);
            if !s1.is_disjoint(&s2) {
                return false;
            }
            s1.union_with(&s2);
            n_alts += 1;
            if let Some(sub) = tab[a].sub {
                if tab[sub].kind == NodeKind::Resolver {
                    return false;
                }
            }
            p = tab[a].down;
        }
        n_alts > 5
    }

    fn gen_code(
        &mut self,
        p: Option<NodeId>,
        indent: usize,
        is_checked: &BitSet,
        out: &mut String,
    ) -> Result<(), FatalError> {
        let tab = self.tab;
        let ind = indent_str(indent);
        let mut is_checked = is_checked.clone();
        let mut p = p;
        while let Some(q) = p {
            let node = &tab[q];
            trace!("generating {} node {}", node.kind.name(), q.0);
            match node.kind {
                NodeKind::Nonterminal => {
                    if let Some(sym) = node.sym {
                        let attrs = self.copy_source_part(node.pos, 0)?;
                        out.push_str(&format!("{}self.{}({});\n", ind, tab[sym].name, attrs));
                    }
                }
                NodeKind::Terminal => {
                    if let Some(sym) = node.sym {
                        let n = tab[sym].n;
                        if is_checked.contains(n) {
                            out.push_str(&format!("{}self.get();\n", ind));
                        } else {
                            out.push_str(&format!("{}self.expect({});\n", ind, n));
                        }
                    }
                }
                NodeKind::WeakTerminal => {
                    if let Some(sym) = node.sym {
                        let mut s1 = expected(tab, node.next, self.cur);
                        s1.union_with(&tab.all_sync_sets);
                        let k = self.new_cond_set(&s1);
                        out.push_str(&format!("{}self.expect_weak({}, {});\n", ind, tab[sym].n, k));
                    }
                }
                NodeKind::Any => {
                    let acc = node.set.len();
                    if tab.terminals.len() == acc + 1 || (acc > 0 && same(&node.set, &is_checked)) {
                        out.push_str(&format!("{}self.get();\n", ind));
                    } else {
                        let e = self.gen_error_msg(ErrKind::Alt);
                        if acc > 0 {
                            let cond = self.gen_cond(&node.set, Some(q))?;
                            out.push_str(&format!("{}if {} {{\n", ind, cond));
                            out.push_str(&format!("{}    self.get();\n", ind));
                            out.push_str(&format!("{}}} else {{\n", ind));
                            out.push_str(&format!("{}    self.syn_err({});\n", ind, e));
                            out.push_str(&format!("{}}}\n", ind));
                        } else {
                            out.push_str(&format!(
                                "{}self.syn_err({}); // ANY node that matches no symbol\n",
                                ind, e
                            ));
                        }
                    }
                }
                NodeKind::Eps | NodeKind::Resolver | NodeKind::Char | NodeKind::CharClass => (),
                NodeKind::Sem => {
                    out.push_str(&self.copy_source_part(node.pos, indent)?);
                }
                NodeKind::Sync => {
                    let e = self.gen_error_msg(ErrKind::Sync);
                    let cond = self.gen_cond(&node.set, Some(q))?;
                    out.push_str(&format!("{}while !({}) {{\n", ind, cond));
                    out.push_str(&format!("{}    self.syn_err({});\n", ind, e));
                    out.push_str(&format!("{}    self.get();\n", ind));
                    out.push_str(&format!("{}}}\n", ind));
                }
                NodeKind::Alt => self.gen_alternatives(q, indent, &is_checked, out)?,
                NodeKind::Iter => {
                    let mut body = node.sub;
                    let s1;
                    let cond;
                    match node.sub {
                        Some(sub) if tab[sub].kind == NodeKind::WeakTerminal => {
                            let sy_fol = expected(tab, tab[sub].next, self.cur);
                            let rep_fol = expected(tab, node.next, self.cur);
                            let n = tab[sub].sym.map(|s| tab[s].n).unwrap_or(0);
                            cond = format!(
                                "self.weak_separator({}, {}, {})",
                                n,
                                self.new_cond_set(&sy_fol),
                                self.new_cond_set(&rep_fol)
                            );
                            s1 = tab.term_set();
                            body = if tab[sub].up { None } else { tab[sub].next };
                        }
                        _ => {
                            s1 = first(tab, node.sub);
                            cond = self.gen_cond(&s1, node.sub)?;
                        }
                    }
                    out.push_str(&format!("{}while {} {{\n", ind, cond));
                    self.gen_code(body, indent + 1, &s1, out)?;
                    out.push_str(&format!("{}}}\n", ind));
                }
                NodeKind::Opt => {
                    let s1 = first(tab, node.sub);
                    let cond = self.gen_cond(&s1, node.sub)?;
                    out.push_str(&format!("{}if {} {{\n", ind, cond));
                    self.gen_code(node.sub, indent + 1, &s1, out)?;
                    out.push_str(&format!("{}}}\n", ind));
                }
            }
            match node.kind {
                NodeKind::Eps | NodeKind::Sem | NodeKind::Sync => (),
                _ => is_checked.clear(),
            }
            if node.up {
                break;
            }
            p = node.next;
        }
        Ok(())
    }

    fn gen_alternatives(
        &mut self,
        p: NodeId,
        indent: usize,
        is_checked: &BitSet,
        out: &mut String,
    ) -> Result<(), FatalError> {
        let tab = self.tab;
        let ind = indent_str(indent);
        let equal = same(&first(tab, Some(p)), is_checked);
        let use_switch = self.use_switch(p);
        if use_switch {
            out.push_str(&format!("{}match self.la.kind {{\n", ind));
        }
        let mut p2 = Some(p);
        while let Some(a) = p2 {
            let sub = tab[a].sub;
            let s1 = expected(tab, sub, self.cur);
            if use_switch {
                if !s1.is_empty() {
                    let labels: Vec<String> = s1.iter().map(|t| t.to_string()).collect();
                    out.push_str(&format!("{}    {} => {{\n", ind, labels.join(" | ")));
                    self.gen_code(sub, indent + 2, &s1, out)?;
                    out.push_str(&format!("{}    }}\n", ind));
                }
            } else {
                if a == p {
                    let cond = self.gen_cond(&s1, sub)?;
                    out.push_str(&format!("{}if {} {{\n", ind, cond));
                } else if tab[a].down.is_none() && equal {
                    out.push_str(&format!("{}}} else {{\n", ind));
                } else {
                    let cond = self.gen_cond(&s1, sub)?;
                    out.push_str(&format!("{}}} else if {} {{\n", ind, cond));
                }
                self.gen_code(sub, indent + 1, &s1, out)?;
            }
            p2 = tab[a].down;
        }
        if equal {
            if use_switch {
                out.push_str(&format!("{}    _ => {{}}\n", ind));
            }
            out.push_str(&format!("{}}}\n", ind));
        } else {
            let e = self.gen_error_msg(ErrKind::Alt);
            if use_switch {
                out.push_str(&format!("{}    _ => self.syn_err({}),\n", ind, e));
                out.push_str(&format!("{}}}\n", ind));
            } else {
                out.push_str(&format!("{}}} else {{\n", ind));
                out.push_str(&format!("{}    self.syn_err({});\n", ind, e));
                out.push_str(&format!("{}}}\n", ind));
            }
        }
        Ok(())
    }

    fn gen_namespace(&self) -> String {
        match self.tab.ns_name {
            Some(ref ns) => format!(
                "pub mod {} {{\n\nuse super::super::scanner::{}::{{Scanner, Token}};\n",
                ns, ns
            ),
            None => "use super::scanner::{Scanner, Token};\n".into(),
        }
    }

    fn gen_tokens(&self) -> String {
        let tab = self.tab;
        let mut out = String::new();
        out.push_str("/// The token kinds.\n");
        out.push_str("#[allow(non_upper_case_globals)]\n");
        out.push_str("pub mod kind {\n");
        for &sym in tab.terminals.iter().chain(tab.pragmas.iter()) {
            let name = &tab[sym].name;
            if name.starts_with(|c: char| c.is_alphabetic())
                && name.chars().all(|c| c.is_alphanumeric() || c == '_')
            {
                out.push_str(&format!("    pub const _{}: usize = {};\n", name, tab[sym].n));
            }
        }
        out.push_str("}\n\n");
        out.push_str(&format!(
            "/// The largest terminal code.\npub const MAX_T: usize = {};\n",
            tab.terminals.len() - 1
        ));
        out
    }

    fn gen_code_pragmas(&self) -> Result<String, FatalError> {
        let mut out = String::new();
        for &sym in &self.tab.pragmas {
            out.push_str(&format!("            if self.la.kind == {} {{\n", self.tab[sym].n));
            out.push_str(&self.copy_source_part(self.tab[sym].sem_pos, 4)?);
            out.push_str("            }\n");
        }
        Ok(out)
    }

    fn gen_productions(&mut self) -> Result<String, FatalError> {
        let tab = self.tab;
        let mut out = String::new();
        for &sym in &tab.nonterminals {
            self.cur = sym;
            debug!("generating production {}", tab[sym].name);
            let attrs = self.copy_source_part(tab[sym].attr_pos, 0)?;
            if attrs.is_empty() {
                out.push_str(&format!("    fn {}(&mut self) {{\n", tab[sym].name));
            } else {
                out.push_str(&format!("    fn {}(&mut self, {}) {{\n", tab[sym].name, attrs));
            }
            out.push_str(&self.copy_source_part(tab[sym].sem_pos, 2)?);
            self.gen_code(tab[sym].graph, 2, &tab.term_set(), &mut out)?;
            out.push_str("    }\n\n");
        }
        Ok(out)
    }

    fn gen_parse_root(&self) -> String {
        let mut out = format!("        self.{}();\n", self.tab.gram_name);
        if self.tab.check_eof {
            out.push_str("        self.expect(0);\n");
        }
        out
    }

    fn init_sets(&self) -> String {
        let num_terms = self.tab.terminals.len();
        let mut out = format!(
            "static SET: [[bool; MAX_T + 1]; {}] = [\n",
            self.sym_sets.len()
        );
        for s in &self.sym_sets {
            let row: Vec<&str> = (0..num_terms)
                .map(|t| if s.contains(t) { "T" } else { "x" })
                .collect();
            out.push_str(&format!("    [{}],\n", row.join(", ")));
        }
        out.push_str("];\n");
        out
    }
}

/// Generate the parser from the parser frame.
///
/// The terminal sets must have been computed. With the statistics switch
/// set, a summary is appended to the trace.
pub fn write_parser(
    tab: &mut Tab,
    src: &Source,
    mut frame: Frame,
    copyright: Option<&str>,
) -> Result<String, FatalError> {
    debug!("generating parser for {}", tab.gram_name);
    let mut out = String::new();
    let num_sets = {
        let mut gen = ParserGen::new(tab, src);
        if let Some(text) = copyright {
            out.push_str(text);
        }
        frame.skip_part("-->begin")?;
        let using = gen.copy_source_part(tab.use_pos, 0)?;
        if !using.is_empty() {
            out.push_str(&using);
            out.push('\n');
        }
        frame.copy_part("-->namespace", &mut out)?;
        out.push_str(&gen.gen_namespace());
        frame.copy_part("-->constants", &mut out)?;
        out.push_str(&gen.gen_tokens());
        frame.copy_part("-->declarations", &mut out)?;
        out.push_str(&gen.copy_source_part(tab.sem_decl_pos, 1)?);
        frame.copy_part("-->pragmas", &mut out)?;
        out.push_str(&gen.gen_code_pragmas()?);
        frame.copy_part("-->productions", &mut out)?;
        out.push_str(&gen.gen_productions()?);
        frame.copy_part("-->parseRoot", &mut out)?;
        out.push_str(&gen.gen_parse_root());
        frame.copy_part("-->initialization", &mut out)?;
        out.push_str(&gen.init_sets());
        frame.copy_part("-->errors", &mut out)?;
        out.push_str(&gen.err);
        frame.copy_rest(&mut out);
        if tab.ns_name.is_some() {
            out.push_str("}\n");
        }
        gen.sym_sets.len()
    };
    if tab.ddt[8] {
        write_statistics(tab, num_sets);
    }
    Ok(out)
}

/// Append the size of the grammar to the trace.
fn write_statistics(tab: &mut Tab, num_sets: usize) {
    let mut s = String::new();
    let _ = writeln!(s);
    let _ = writeln!(s, "{} terminals", tab.terminals.len());
    let _ = writeln!(
        s,
        "{} symbols",
        tab.terminals.len() + tab.pragmas.len() + tab.nonterminals.len()
    );
    let _ = writeln!(s, "{} nodes", tab.node_count());
    let _ = writeln!(s, "{} sets", num_sets);
    tab.trace.push_str(&s);
}

#[cfg(test)]
mod tests {
    use super::*;
    use check::grammar_ok;
    use frame::PARSER_FRAME;
    use parser::parse;
    use sets::comp_symbol_sets;

    fn generate(src: &str) -> String {
        let mut p = parse(src);
        assert_eq!(p.errors.count(), 0, "{}", p.errors);
        comp_symbol_sets(&mut p.tab, &mut p.errors);
        assert!(grammar_ok(&p.tab, &mut p.errors), "{}", p.errors);
        let source = Source::new(src);
        let frame = Frame::builtin(PARSER_FRAME).unwrap();
        write_parser(&mut p.tab, &source, frame, None).unwrap()
    }

    #[test]
    fn strip_leading_blanks() {
        assert_eq!(strip_blanks("    x", 2), "  x");
        assert_eq!(strip_blanks("\t x", 4), "x");
        assert_eq!(strip_blanks("x", 4), "x");
    }

    #[test]
    fn minimal_parser() {
        let out = generate(
            "COMPILER T CHARACTERS letter = 'a'..'z'. \
             TOKENS ident = letter {letter}. PRODUCTIONS T = ident. END T.",
        );
        assert!(out.contains("use super::scanner::{Scanner, Token};"));
        assert!(out.contains("    pub const _ident: usize = 1;"));
        assert!(out.contains("pub const MAX_T: usize = 2;"));
        assert!(out.contains("    fn T(&mut self) {\n        self.expect(1);\n    }\n"));
        assert!(out.contains("        self.T();\n        self.expect(0);\n"));
        assert!(out.contains("            1 => String::from(\"ident expected\"),"));
        assert!(out.contains("static SET: [[bool; MAX_T + 1]; 1] = [\n    [T, x, x],\n];"));
        assert!(!out.contains("-->"));
    }

    #[test]
    fn alternatives_and_options() {
        let out = generate(
            "COMPILER A PRODUCTIONS A = [\"a\"] ( \"b\" | \"c\" B ) { \"d\" }. \
             B = \"e\" | . END A.",
        );
        assert!(out.contains(
            "        if self.la.kind == 1 {\n            self.get();\n        }\n"
        ));
        assert!(out.contains("        if self.la.kind == 2 {\n            self.get();\n"));
        assert!(out.contains("        } else if self.la.kind == 3 {\n            self.get();\n            self.B();\n"));
        assert!(out.contains("        } else {\n            self.syn_err("));
        assert!(out.contains("        while self.la.kind == 4 {\n            self.get();\n        }\n"));
        assert!(out.contains("String::from(\"invalid A\")"));
    }

    #[test]
    fn switch_for_many_alternatives() {
        let out = generate(
            "COMPILER A PRODUCTIONS A = \"a\" | \"b\" | \"c\" | \"d\" | \"e\" | \"f\". END A.",
        );
        assert!(out.contains("        match self.la.kind {\n            1 => {\n                self.get();\n            }\n"));
        assert!(out.contains("            _ => self.syn_err("));
    }

    #[test]
    fn weak_separators_and_sync() {
        let out = generate(
            "COMPILER A PRODUCTIONS A = SYNC \"x\" { WEAK \",\" \"x\" } \";\". END A.",
        );
        assert!(out.contains("        while !(self.la.kind == 0 || self.la.kind == 1) {\n"));
        assert!(out.contains("String::from(\"this symbol not expected in A\")"));
        assert!(out.contains("        while self.weak_separator(2, "));
    }

    #[test]
    fn semantic_actions_are_copied() {
        let out = generate(
            "use std::fmt; COMPILER A pub count: usize, PRODUCTIONS \
             A (. let mut k = 0; .) = \"a\" (. k += 1; .) B<&mut k>. \
             B<m: &mut usize> = IF (self.count > 0) \"b\" | \"c\". END A.",
        );
        assert!(out.starts_with("use std::fmt;\n"));
        assert!(out.contains("    pub count: usize,\n}"));
        assert!(out.contains("    fn A(&mut self) {\n        let mut k = 0;\n"));
        assert!(out.contains("        k += 1;\n        self.B(&mut k);\n"));
        assert!(out.contains("    fn B(&mut self, m: &mut usize) {\n"));
        assert!(out.contains("        if (self.count > 0) {\n"));
    }
}
