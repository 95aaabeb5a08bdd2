// Copyright (c) 2018 Fabian Schuiki

//! Generation of the scanner.
//!
//! The automaton is emitted as a `match` over state numbers inside a loop.
//! Each state either consumes a character and moves on, or stops and reports
//! the token it recognizes. The start state is emitted as a lookup from the
//! first character to a state.

use charset::CharSet;
use dfa::{delimiter_repr, Comment, Dfa, State};
use errors::FatalError;
use frame::Frame;
use tab::{unescape, SymbolId, Tab, TokenKind, Trans};

/// Render a character as a `u32` expression.
fn ch(c: u32) -> String {
    if c < ' ' as u32 || c >= 127 || c == '\'' as u32 || c == '\\' as u32 {
        format!("{}", c)
    } else {
        format!("'{}' as u32", c as u8 as char)
    }
}

/// Render a condition testing `self.ch` against a single character.
fn ch_cond(c: u32) -> String {
    format!("self.ch == {}", ch(c))
}

/// Render a condition testing `self.ch` against a set of characters.
fn put_range(s: &CharSet) -> String {
    let parts: Vec<String> = s.ranges()
        .into_iter()
        .map(|(lo, hi)| {
            if lo == hi {
                ch_cond(lo)
            } else if lo == 0 {
                format!("self.ch <= {}", ch(hi))
            } else {
                format!("self.ch >= {} && self.ch <= {}", ch(lo), ch(hi))
            }
        })
        .collect();
    if parts.is_empty() {
        "false".into()
    } else {
        parts.join(" || ")
    }
}

/// Render a set of characters as a `match` pattern.
fn put_pattern(s: &CharSet) -> String {
    s.ranges()
        .into_iter()
        .map(|(lo, hi)| {
            if lo == hi {
                format!("{}", lo)
            } else {
                format!("{}..={}", lo, hi)
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

struct ScannerGen<'a> {
    tab: &'a Tab,
    dfa: &'a Dfa,
}

impl<'a> ScannerGen<'a> {
    /// The quoted literal a terminal is spelled with.
    fn sym_name(&self, sym: SymbolId) -> String {
        let name = &self.tab[sym].name;
        if name.starts_with(|c: char| c.is_alphabetic()) {
            for (lit, &s) in &self.tab.literals {
                if s == sym {
                    return lit.clone();
                }
            }
        }
        name.clone()
    }

    fn gen_declarations(&self) -> String {
        let max_t = self.tab.terminals.len() - 1;
        let no_sym = self.tab.no_sym.map(|s| self.tab[s].n).unwrap_or(max_t);
        let mut out = String::new();
        out.push_str(&format!("const MAX_T: usize = {};\n", max_t));
        out.push_str(&format!("const NO_SYM: usize = {};\n", no_sym));
        out
    }

    fn gen_start_table(&self) -> String {
        let mut out = String::new();
        if let Some(start) = self.dfa.states().first() {
            for action in &start.actions {
                out.push_str(&format!(
                    "        {} => {},\n",
                    put_pattern(&action.set),
                    action.target()
                ));
            }
        }
        out
    }

    fn gen_casing1(&self) -> String {
        if self.dfa.ignore_case {
            let mut out = String::new();
            out.push_str("        if let Some(c) = ::std::char::from_u32(self.ch) {\n");
            out.push_str("            self.ch = c.to_lowercase().next().unwrap_or(c) as u32;\n");
            out.push_str("        }\n");
            out
        } else {
            String::new()
        }
    }

    fn gen_casing2(&self) -> String {
        if self.dfa.ignore_case {
            "            self.tval[self.tlen] = self.val_ch;\n".into()
        } else {
            "            self.tval[self.tlen] = ::std::char::from_u32(self.ch).unwrap_or('\\u{fffd}');\n"
                .into()
        }
    }

    fn gen_com_body(&self, com: &Comment, out: &mut String) {
        out.push_str("        loop {\n");
        out.push_str(&format!("            if {} {{\n", ch_cond(com.stop[0])));
        if com.stop.len() == 1 {
            out.push_str("                level -= 1;\n");
            out.push_str("                if level == 0 {\n");
            out.push_str("                    self.old_eols = self.line - line0;\n");
            out.push_str("                    self.next_ch();\n");
            out.push_str("                    return true;\n");
            out.push_str("                }\n");
            out.push_str("                self.next_ch();\n");
        } else {
            out.push_str("                self.next_ch();\n");
            out.push_str(&format!("                if {} {{\n", ch_cond(com.stop[1])));
            out.push_str("                    level -= 1;\n");
            out.push_str("                    if level == 0 {\n");
            out.push_str("                        self.old_eols = self.line - line0;\n");
            out.push_str("                        self.next_ch();\n");
            out.push_str("                        return true;\n");
            out.push_str("                    }\n");
            out.push_str("                    self.next_ch();\n");
            out.push_str("                }\n");
        }
        if com.nested {
            out.push_str(&format!("            }} else if {} {{\n", ch_cond(com.start[0])));
            if com.start.len() == 1 {
                out.push_str("                level += 1;\n");
                out.push_str("                self.next_ch();\n");
            } else {
                out.push_str("                self.next_ch();\n");
                out.push_str(&format!("                if {} {{\n", ch_cond(com.start[1])));
                out.push_str("                    level += 1;\n");
                out.push_str("                    self.next_ch();\n");
                out.push_str("                }\n");
            }
        }
        out.push_str("            } else if self.ch == EOF {\n");
        out.push_str("                return false;\n");
        out.push_str("            } else {\n");
        out.push_str("                self.next_ch();\n");
        out.push_str("            }\n");
        out.push_str("        }\n");
    }

    fn gen_comment(&self, com: &Comment, i: usize) -> String {
        let mut out = format!(
            "    // {} to {}\n",
            delimiter_repr(&com.start),
            delimiter_repr(&com.stop)
        );
        out.push_str(&format!("    fn comment{}(&mut self) -> bool {{\n", i));
        out.push_str("        let mut level = 1;\n");
        out.push_str("        let (pos0, line0, col0) = (self.pos, self.line, self.col);\n");
        out.push_str("        self.next_ch();\n");
        if com.start.len() == 1 {
            self.gen_com_body(com, &mut out);
        } else {
            out.push_str(&format!("        if {} {{\n", ch_cond(com.start[1])));
            out.push_str("            self.next_ch();\n");
            let mut body = String::new();
            self.gen_com_body(com, &mut body);
            for line in body.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("        } else {\n");
            out.push_str("            self.next = pos0;\n");
            out.push_str("            self.next_ch();\n");
            out.push_str("            self.line = line0;\n");
            out.push_str("            self.col = col0;\n");
            out.push_str("        }\n");
            out.push_str("        false\n");
        }
        out.push_str("    }\n\n");
        out
    }

    fn gen_comments(&self) -> String {
        let mut out = String::new();
        for (i, com) in self.dfa.comments.iter().enumerate() {
            out.push_str(&self.gen_comment(com, i));
        }
        out
    }

    fn gen_literals(&self) -> String {
        let mut out = String::new();
        if self.dfa.ignore_case {
            out.push_str("        match t.val.to_lowercase().as_str() {\n");
        } else {
            out.push_str("        match t.val.as_str() {\n");
        }
        let syms = self.tab.terminals.iter().chain(self.tab.pragmas.iter());
        for &sym in syms {
            if self.tab[sym].token_kind != TokenKind::Literal {
                continue;
            }
            let name = self.sym_name(sym);
            let mut text = match unescape(&name[1..name.len() - 1]) {
                Ok(text) => text,
                Err(_) => continue,
            };
            if self.dfa.ignore_case {
                text = text.to_lowercase();
            }
            out.push_str(&format!(
                "            {:?} => t.kind = {},\n",
                text,
                self.tab[sym].n
            ));
        }
        out.push_str("            _ => {}\n");
        out.push_str("        }\n");
        out
    }

    fn gen_scan1(&self) -> String {
        let mut ignored = self.tab.ignored.clone();
        ignored.subtract(&CharSet::single(' ' as u32));
        if ignored.is_empty() {
            String::new()
        } else {
            format!("            || ({})\n", put_range(&ignored))
        }
    }

    fn gen_scan2(&self) -> String {
        let mut out = String::new();
        if !self.dfa.comments.is_empty() {
            let conds: Vec<String> = self.dfa
                .comments
                .iter()
                .enumerate()
                .map(|(i, com)| format!("{} && self.comment{}()", ch_cond(com.start[0]), i))
                .collect();
            out.push_str(&format!("        if {} {{\n", conds.join(" || ")));
            out.push_str("            return self.next_token();\n");
            out.push_str("        }\n");
        }
        if self.dfa.has_ctx_moves {
            out.push_str("        let mut apx = 0;\n");
        }
        out
    }

    fn write_state(&self, state: &State, out: &mut String) {
        let end_of = state.end_of;
        out.push_str(&format!("                {} => {{\n", state.nr));
        if let Some(e) = end_of {
            if !state.actions.is_empty() {
                out.push_str(&format!(
                    "                    rec_end = self.pos;\n                    rec_kind = {};\n",
                    self.tab[e].n
                ));
            }
        }
        let mut ctx_end = state.ctx;
        for (i, action) in state.actions.iter().enumerate() {
            let cond = if action.is_char() {
                ch_cond(action.set.first().unwrap_or(0))
            } else {
                put_range(&action.set)
            };
            if i == 0 {
                out.push_str(&format!("                    if {} {{\n", cond));
            } else {
                out.push_str(&format!("                    }} else if {} {{\n", cond));
            }
            if action.tc == Trans::Context {
                out.push_str("                        apx += 1;\n");
                ctx_end = false;
            } else if state.ctx {
                out.push_str("                        apx = 0;\n");
            }
            out.push_str("                        self.add_ch();\n");
            out.push_str(&format!("                        state = {};\n", action.target()));
        }
        let indent = if state.actions.is_empty() {
            "                    "
        } else {
            out.push_str("                    } else {\n");
            "                        "
        };
        if ctx_end {
            out.push_str(&format!("{}self.tlen -= apx;\n", indent));
            out.push_str(&format!("{}self.set_scanner_behind_t(&t);\n", indent));
        }
        match end_of {
            None => {
                out.push_str(&format!("{}state = 0;\n", indent));
            }
            Some(e) => {
                out.push_str(&format!("{}t.kind = {};\n", indent, self.tab[e].n));
                if self.tab[e].token_kind == TokenKind::ClassLiteral {
                    out.push_str(&format!(
                        "{}t.val = self.tval[..self.tlen].iter().collect();\n",
                        indent
                    ));
                    out.push_str(&format!("{}self.check_literal(&mut t);\n", indent));
                    out.push_str(&format!("{}return t;\n", indent));
                } else {
                    out.push_str(&format!("{}break;\n", indent));
                }
            }
        }
        if !state.actions.is_empty() {
            out.push_str("                    }\n");
        }
        out.push_str("                }\n");
    }

    fn gen_states(&self) -> String {
        let mut out = String::new();
        for state in self.dfa.states().iter().skip(1) {
            self.write_state(state, &mut out);
        }
        out
    }
}

/// Generate the scanner from the scanner frame.
///
/// The automaton must be deterministic.
pub fn write_scanner(
    tab: &Tab,
    dfa: &Dfa,
    mut frame: Frame,
    copyright: Option<&str>,
) -> Result<String, FatalError> {
    debug!("generating scanner with {} states", dfa.states().len());
    let gen = ScannerGen { tab: tab, dfa: dfa };
    let mut out = String::new();
    if let Some(text) = copyright {
        out.push_str(text);
    }
    frame.skip_part("-->begin")?;
    frame.copy_part("-->namespace", &mut out)?;
    if let Some(ref ns) = tab.ns_name {
        out.push_str(&format!("pub mod {} {{\n\n", ns));
    }
    frame.copy_part("-->declarations", &mut out)?;
    out.push_str(&gen.gen_declarations());
    frame.copy_part("-->initialization", &mut out)?;
    out.push_str(&gen.gen_start_table());
    frame.copy_part("-->casing1", &mut out)?;
    out.push_str(&gen.gen_casing1());
    frame.copy_part("-->casing2", &mut out)?;
    out.push_str(&gen.gen_casing2());
    frame.copy_part("-->comments", &mut out)?;
    out.push_str(&gen.gen_comments());
    frame.copy_part("-->literals", &mut out)?;
    out.push_str(&gen.gen_literals());
    frame.copy_part("-->scan1", &mut out)?;
    out.push_str(&gen.gen_scan1());
    frame.copy_part("-->scan2", &mut out)?;
    out.push_str(&gen.gen_scan2());
    frame.copy_part("-->scan3", &mut out)?;
    out.push_str(&gen.gen_states());
    frame.copy_rest(&mut out);
    if tab.ns_name.is_some() {
        out.push_str("}\n");
    }
    Ok(out)
}
