// Copyright (c) 2018 Fabian Schuiki

//! The scanner automaton.
//!
//! Token graphs are converted into a nondeterministic automaton one token at a
//! time, and literal tokens are threaded into it character by character. Once
//! all tokens are known, `make_deterministic` splits overlapping transitions,
//! melts states reached on the same character, drops unreachable and
//! duplicate final states, and merges transitions to the same target.
//!
//! State 0 is the start state. Every transition is labeled with the set of
//! characters it accepts.

use std::fmt::Write;

use bit_set::BitSet;
use indexmap::IndexMap;

use charset::{char_repr, CharSet};
use errors::Errors;
use tab::{NodeId, NodeKind, SymbolId, Tab, TokenKind, Trans};

/// A transition out of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// The characters that trigger the transition.
    pub set: CharSet,
    /// Whether the characters are part of the token or trailing context.
    pub tc: Trans,
    /// The target states, sorted. After `make_deterministic` there is exactly
    /// one.
    pub targets: Vec<usize>,
}

impl Action {
    /// Whether the transition is triggered by a single character.
    pub fn is_char(&self) -> bool {
        self.set.len() == 1
    }

    /// The first target state.
    pub fn target(&self) -> usize {
        self.targets[0]
    }

    fn add_target(&mut self, t: usize) {
        if let Err(i) = self.targets.binary_search(&t) {
            self.targets.insert(i, t);
        }
    }

    fn add_targets(&mut self, ts: &[usize]) {
        for &t in ts {
            self.add_target(t);
        }
    }
}

/// A state of the automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// The number of the state.
    pub nr: usize,
    /// The outgoing transitions. Multi-character transitions come first.
    pub actions: Vec<Action>,
    /// The token recognized if the scanner stops in this state.
    pub end_of: Option<SymbolId>,
    /// Whether the state is reached through trailing context.
    pub ctx: bool,
}

impl State {
    fn add_action(&mut self, act: Action) {
        let pos = if act.is_char() {
            self.actions.len()
        } else {
            self.actions
                .iter()
                .position(|a| a.is_char())
                .unwrap_or(self.actions.len())
        };
        self.actions.insert(pos, act);
    }

    /// The transition taken on `ch`, if any.
    pub fn find_action(&self, ch: u32) -> Option<usize> {
        self.actions.iter().position(|a| a.set.contains(ch))
    }
}

/// A comment delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// The opening delimiter, one or two characters.
    pub start: Vec<u32>,
    /// The closing delimiter, one or two characters.
    pub stop: Vec<u32>,
    /// Whether comments of this kind may nest.
    pub nested: bool,
}

/// The scanner automaton under construction.
#[derive(Debug, Clone)]
pub struct Dfa {
    states: Vec<State>,
    last_sim_state: usize,
    melted: IndexMap<BitSet, usize>,
    cur_sy: Option<SymbolId>,
    /// The comment kinds, in declaration order.
    pub comments: Vec<Comment>,
    /// Whether the scanner is case insensitive.
    pub ignore_case: bool,
    /// Whether some token uses trailing context.
    pub has_ctx_moves: bool,
    /// Whether literals were added since the last `make_deterministic`.
    pub dirty: bool,
}

impl Dfa {
    /// Create an automaton with only the start state.
    pub fn new() -> Dfa {
        let mut dfa = Dfa {
            states: Vec::new(),
            last_sim_state: 0,
            melted: IndexMap::new(),
            cur_sy: None,
            comments: Vec::new(),
            ignore_case: false,
            has_ctx_moves: false,
            dirty: false,
        };
        dfa.new_state();
        dfa
    }

    /// All states. State 0 is the start state.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    fn new_state(&mut self) -> usize {
        let nr = self.states.len();
        self.states.push(State {
            nr: nr,
            actions: Vec::new(),
            end_of: None,
            ctx: false,
        });
        nr
    }

    fn new_transition(&mut self, tab: &mut Tab, from: usize, to: usize, set: CharSet, class: bool, tc: Trans) {
        if tc == Trans::Context {
            self.has_ctx_moves = true;
        }
        self.states[from].add_action(Action {
            set: set,
            tc: tc,
            targets: vec![to],
        });
        if class {
            if let Some(sy) = self.cur_sy {
                tab[sy].token_kind = TokenKind::Class;
            }
        }
    }

    fn node_set(tab: &Tab, p: NodeId) -> CharSet {
        match tab[p].kind {
            NodeKind::CharClass => tab.char_class_set(tab[p].val as usize).clone(),
            _ => CharSet::single(tab[p].val),
        }
    }

    // ---------------------------------------------------------------------
    // Token graphs

    /// Assign a state to every node of a token graph.
    ///
    /// There will be a transition from `n.state` to `n.next.state` on the
    /// characters of `n`. All nodes of an alternative chain share a state. A
    /// node after a character, option or alternative gets a fresh state, and
    /// so does an iteration that starts a nested structure or follows
    /// another iteration.
    fn number_nodes(&mut self, tab: &mut Tab, p: Option<NodeId>, state: Option<usize>, renum_iter: bool) {
        let q = match p {
            Some(q) => q,
            None => return,
        };
        if tab[q].state.is_some() {
            return;
        }
        let state = match state {
            Some(s) if !(tab[q].kind == NodeKind::Iter && renum_iter) => s,
            _ => self.new_state(),
        };
        tab[q].state = Some(state);
        if tab.del_graph(Some(q)) {
            self.states[state].end_of = self.cur_sy;
        }
        let (next, sub, down) = (tab[q].next, tab[q].sub, tab[q].down);
        match tab[q].kind {
            NodeKind::CharClass | NodeKind::Char => self.number_nodes(tab, next, None, false),
            NodeKind::Opt => {
                self.number_nodes(tab, next, None, false);
                self.number_nodes(tab, sub, Some(state), true);
            }
            NodeKind::Iter => {
                self.number_nodes(tab, next, Some(state), true);
                self.number_nodes(tab, sub, Some(state), true);
            }
            NodeKind::Alt => {
                self.number_nodes(tab, next, None, false);
                self.number_nodes(tab, sub, Some(state), true);
                self.number_nodes(tab, down, Some(state), renum_iter);
            }
            _ => (),
        }
    }

    fn the_state(&mut self, tab: &Tab, p: Option<NodeId>) -> usize {
        match p.and_then(|q| tab[q].state) {
            Some(s) => s,
            None => {
                let s = self.new_state();
                self.states[s].end_of = self.cur_sy;
                s
            }
        }
    }

    fn step(&mut self, tab: &mut Tab, from: usize, p: Option<NodeId>, stepped: &mut BitSet, issues: &mut Vec<String>) {
        let q = match p {
            Some(q) => q,
            None => return,
        };
        stepped.insert(q.0);
        let (kind, next, sub, down) = (tab[q].kind, tab[q].next, tab[q].sub, tab[q].down);
        match kind {
            NodeKind::CharClass | NodeKind::Char => {
                let to = self.the_state(tab, next);
                let set = Dfa::node_set(tab, q);
                let code = tab[q].code;
                self.new_transition(tab, from, to, set, kind == NodeKind::CharClass, code);
            }
            NodeKind::Alt => {
                self.step(tab, from, sub, stepped, issues);
                self.step(tab, from, down, stepped, issues);
            }
            NodeKind::Iter => {
                if tab.del_sub_graph(sub) {
                    issues.push("contents of {...} must not be deletable".into());
                    return;
                }
                if let Some(n) = next {
                    if !stepped.contains(n.0) {
                        self.step(tab, from, next, stepped, issues);
                    }
                }
                self.step(tab, from, sub, stepped, issues);
                if let Some(own) = tab[q].state {
                    if own != from {
                        let mut fresh = BitSet::with_capacity(tab.node_count());
                        self.step(tab, own, Some(q), &mut fresh, issues);
                    }
                }
            }
            NodeKind::Opt => {
                if let Some(n) = next {
                    if !stepped.contains(n.0) {
                        self.step(tab, from, next, stepped, issues);
                    }
                }
                self.step(tab, from, sub, stepped, issues);
            }
            _ => (),
        }
    }

    fn find_trans(
        &mut self,
        tab: &mut Tab,
        p: Option<NodeId>,
        start: bool,
        marked: &mut BitSet,
        issues: &mut Vec<String>,
    ) {
        let q = match p {
            Some(q) => q,
            None => return,
        };
        if marked.contains(q.0) {
            return;
        }
        marked.insert(q.0);
        if start {
            if let Some(s) = tab[q].state {
                let mut stepped = BitSet::with_capacity(tab.node_count());
                self.step(tab, s, Some(q), &mut stepped, issues);
            }
        }
        let (next, sub, down) = (tab[q].next, tab[q].sub, tab[q].down);
        match tab[q].kind {
            NodeKind::CharClass | NodeKind::Char => self.find_trans(tab, next, true, marked, issues),
            NodeKind::Opt => {
                self.find_trans(tab, next, true, marked, issues);
                self.find_trans(tab, sub, false, marked, issues);
            }
            NodeKind::Iter => {
                self.find_trans(tab, next, false, marked, issues);
                self.find_trans(tab, sub, false, marked, issues);
            }
            NodeKind::Alt => {
                self.find_trans(tab, sub, false, marked, issues);
                self.find_trans(tab, down, false, marked, issues);
            }
            _ => (),
        }
    }

    /// Add the token graph starting at `p` for the token `sym`.
    pub fn convert_to_states(&mut self, tab: &mut Tab, p: NodeId, sym: SymbolId) -> Result<(), Vec<String>> {
        debug!("converting token {} to states", tab[sym].name);
        self.cur_sy = Some(sym);
        if tab.del_graph(Some(p)) {
            return Err(vec!["token might be empty".into()]);
        }
        let mut issues = Vec::new();
        self.number_nodes(tab, Some(p), Some(0), true);
        let mut marked = BitSet::with_capacity(tab.node_count());
        self.find_trans(tab, Some(p), true, &mut marked, &mut issues);
        if tab[p].kind == NodeKind::Iter {
            let mut stepped = BitSet::with_capacity(tab.node_count());
            self.step(tab, 0, Some(p), &mut stepped, &mut issues);
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Thread the literal `s` for token `sym` into the automaton.
    ///
    /// If `s` is already recognized by a class token such as an identifier,
    /// both tokens are marked so the scanner looks the literal up after
    /// recognizing the class token. Otherwise a chain of states spelling out
    /// `s` is added.
    pub fn match_literal(&mut self, tab: &mut Tab, s: &str, sym: SymbolId) -> Result<(), String> {
        let chars: Vec<u32> = s.chars().map(|c| c as u32).collect();
        let mut state = 0;
        let mut last: Option<Trans> = None;
        let mut i = 0;
        while i < chars.len() {
            match self.states[state].find_action(chars[i]) {
                Some(a) => {
                    last = Some(self.states[state].actions[a].tc);
                    state = self.states[state].actions[a].target();
                }
                None => break,
            }
            i += 1;
        }
        if i != chars.len() || self.states[state].end_of.is_none() {
            state = 0;
            i = 0;
            last = None;
            self.dirty = true;
        }
        while i < chars.len() {
            let to = self.new_state();
            self.new_transition(tab, state, to, CharSet::single(chars[i]), false, Trans::Normal);
            state = to;
            i += 1;
        }
        match self.states[state].end_of {
            None => {
                self.states[state].end_of = Some(sym);
                Ok(())
            }
            Some(matched) => {
                if tab[matched].token_kind == TokenKind::Fixed || last == Some(Trans::Context) {
                    Err(format!(
                        "tokens {} and {} cannot be distinguished",
                        tab[sym].name, tab[matched].name
                    ))
                } else {
                    tab[matched].token_kind = TokenKind::ClassLiteral;
                    tab[sym].token_kind = TokenKind::Literal;
                    Ok(())
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Determinization

    fn split_actions(&mut self, state: usize, a: usize, b: usize) {
        let seta = self.states[state].actions[a].set.clone();
        let setb = self.states[state].actions[b].set.clone();
        if seta == setb {
            let tb = self.states[state].actions[b].targets.clone();
            self.states[state].actions[a].add_targets(&tb);
            self.states[state].actions.remove(b);
        } else if seta.includes(&setb) {
            let mut setc = seta;
            setc.subtract(&setb);
            let ta = self.states[state].actions[a].targets.clone();
            self.states[state].actions[b].add_targets(&ta);
            self.states[state].actions[a].set = setc;
        } else if setb.includes(&seta) {
            let mut setc = setb;
            setc.subtract(&seta);
            let tb = self.states[state].actions[b].targets.clone();
            self.states[state].actions[a].add_targets(&tb);
            self.states[state].actions[b].set = setc;
        } else {
            let mut setc = seta.clone();
            setc.intersect_with(&setb);
            let mut seta = seta;
            let mut setb = setb;
            seta.subtract(&setc);
            setb.subtract(&setc);
            let mut c = Action {
                set: setc,
                tc: Trans::Normal,
                targets: Vec::new(),
            };
            c.add_targets(&self.states[state].actions[a].targets);
            c.add_targets(&self.states[state].actions[b].targets);
            self.states[state].actions[a].set = seta;
            self.states[state].actions[b].set = setb;
            self.states[state].add_action(c);
        }
    }

    /// Split overlapping transitions of a state until no two of them share a
    /// character.
    fn make_unique(&mut self, state: usize) {
        'restart: loop {
            let n = self.states[state].actions.len();
            for a in 0..n {
                for b in a + 1..n {
                    let overlap = {
                        let acts = &self.states[state].actions;
                        acts[a].set.intersects(&acts[b].set)
                    };
                    if overlap {
                        self.split_actions(state, a, b);
                        continue 'restart;
                    }
                }
            }
            break;
        }
    }

    fn find_ctx_states(&mut self) {
        let mut ctx = Vec::new();
        for state in &self.states {
            for a in &state.actions {
                if a.tc == Trans::Context {
                    ctx.extend(a.targets.iter().cloned());
                }
            }
        }
        for s in ctx {
            self.states[s].ctx = true;
        }
    }

    fn melted_set(&self, nr: usize) -> Option<&BitSet> {
        self.melted.iter().find(|&(_, &s)| s == nr).map(|(set, _)| set)
    }

    fn get_target_states(
        &self,
        tab: &Tab,
        targets: &[usize],
        errors: &mut Errors,
    ) -> (BitSet, Option<SymbolId>, bool) {
        let mut set = BitSet::with_capacity(self.states.len());
        let mut end_of: Option<SymbolId> = None;
        let mut ctx = false;
        for &t in targets {
            if t <= self.last_sim_state {
                set.insert(t);
            } else if let Some(m) = self.melted_set(t) {
                set.union_with(m);
            }
            if let Some(e) = self.states[t].end_of {
                match end_of {
                    Some(prev) if prev != e => errors.error(format!(
                        "Tokens {} and {} cannot be distinguished",
                        tab[prev].name, tab[e].name
                    )),
                    _ => end_of = Some(e),
                }
            }
            if self.states[t].ctx {
                ctx = true;
            }
        }
        (set, end_of, ctx)
    }

    fn melt_with(&mut self, into: usize, from: usize) {
        let actions = self.states[from].actions.clone();
        for a in actions {
            self.states[into].add_action(a);
        }
    }

    fn melt_states(&mut self, tab: &Tab, state: usize, errors: &mut Errors) {
        let mut a = 0;
        while a < self.states[state].actions.len() {
            if self.states[state].actions[a].targets.len() > 1 {
                let targets = self.states[state].actions[a].targets.clone();
                let (set, end_of, ctx) = self.get_target_states(tab, &targets, errors);
                let melt = match self.melted.get(&set) {
                    Some(&m) => m,
                    None => {
                        let s = self.new_state();
                        self.states[s].end_of = end_of;
                        self.states[s].ctx = ctx;
                        for &t in &targets {
                            self.melt_with(s, t);
                        }
                        self.make_unique(s);
                        trace!("melted states {:?} into {}", targets, s);
                        self.melted.insert(set, s);
                        s
                    }
                };
                self.states[state].actions[a].targets = vec![melt];
            }
            a += 1;
        }
    }

    fn find_used_states(&self) -> BitSet {
        let mut used = BitSet::with_capacity(self.states.len());
        let mut todo = vec![0];
        while let Some(s) = todo.pop() {
            if used.contains(s) {
                continue;
            }
            used.insert(s);
            for a in &self.states[s].actions {
                todo.extend(a.targets.iter().cloned());
            }
        }
        used
    }

    /// Drop unreachable states and merge equivalent final states, then
    /// renumber the remaining states densely.
    fn delete_redundant_states(&mut self) {
        let n = self.states.len();
        let mut used = self.find_used_states();
        let mut new_state: Vec<usize> = (0..n).collect();
        for s1 in 1..n {
            let st1 = &self.states[s1];
            if used.contains(s1) && st1.end_of.is_some() && st1.actions.is_empty() && !st1.ctx {
                for s2 in s1 + 1..n {
                    let st2 = &self.states[s2];
                    if used.contains(s2) && st1.end_of == st2.end_of && st2.actions.is_empty() && !st2.ctx
                    {
                        used.remove(s2);
                        new_state[s2] = s1;
                    }
                }
            }
        }
        let mut renumber = vec![0; n];
        let mut kept = Vec::new();
        for (i, state) in self.states.drain(..).enumerate() {
            if used.contains(i) {
                renumber[i] = kept.len();
                kept.push(state);
            }
        }
        for (i, state) in kept.iter_mut().enumerate() {
            state.nr = i;
            for a in &mut state.actions {
                for t in &mut a.targets {
                    *t = renumber[new_state[*t]];
                }
            }
        }
        self.states = kept;
        self.melted.clear();
    }

    /// Merge transitions of a state that lead to the same target.
    fn combine_shifts(&mut self) {
        for state in &mut self.states {
            let mut a = 0;
            while a < state.actions.len() {
                let mut b = a + 1;
                while b < state.actions.len() {
                    if state.actions[a].targets == state.actions[b].targets
                        && state.actions[a].tc == state.actions[b].tc
                    {
                        let other = state.actions.remove(b);
                        state.actions[a].set.union_with(&other.set);
                    } else {
                        b += 1;
                    }
                }
                a += 1;
            }
        }
    }

    /// Turn the automaton into a deterministic one.
    ///
    /// Tokens that end up recognized in the same state are reported as
    /// indistinguishable.
    pub fn make_deterministic(&mut self, tab: &Tab, errors: &mut Errors) {
        debug!("making automaton with {} states deterministic", self.states.len());
        self.last_sim_state = self.states.len() - 1;
        self.find_ctx_states();
        for s in 0..self.states.len() {
            self.make_unique(s);
        }
        let mut s = 0;
        while s < self.states.len() {
            self.melt_states(tab, s, errors);
            s += 1;
        }
        self.delete_redundant_states();
        self.combine_shifts();
        self.dirty = false;
        debug!("automaton has {} states", self.states.len());
    }

    // ---------------------------------------------------------------------
    // Comments

    fn comment_str(tab: &Tab, p: Option<NodeId>, issues: &mut Vec<String>) -> Vec<u32> {
        let mut s = Vec::new();
        let mut p = p;
        while let Some(q) = p {
            match tab[q].kind {
                NodeKind::Char => s.push(tab[q].val),
                NodeKind::CharClass => {
                    let set = tab.char_class_set(tab[q].val as usize);
                    if set.len() != 1 {
                        issues.push("character set contains more than 1 character".into());
                    }
                    s.push(set.first().unwrap_or(0));
                }
                _ => issues.push("comment delimiters may not be structured".into()),
            }
            p = tab[q].next;
        }
        if s.is_empty() || s.len() > 2 {
            issues.push("comment delimiters must be 1 or 2 characters long".into());
            s = vec!['?' as u32];
        }
        s
    }

    /// Declare a comment kind from the graphs of its delimiters.
    pub fn new_comment(&mut self, tab: &Tab, from: NodeId, to: NodeId, nested: bool) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();
        let start = Dfa::comment_str(tab, Some(from), &mut issues);
        let stop = Dfa::comment_str(tab, Some(to), &mut issues);
        self.comments.push(Comment {
            start: start,
            stop: stop,
            nested: nested,
        });
        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    // ---------------------------------------------------------------------
    // Inspection

    /// Append the automaton to the trace.
    pub fn print_states(&self, tab: &mut Tab) {
        let mut out = String::new();
        let _ = writeln!(out);
        let _ = writeln!(out, "---------- states ----------");
        for state in &self.states {
            match state.end_of {
                Some(e) => {
                    let _ = write!(out, "E({:>12})", tab[e].name);
                }
                None => {
                    let _ = write!(out, "{:15}", "");
                }
            }
            let _ = write!(out, "{:3}:", state.nr);
            if state.actions.is_empty() {
                let _ = writeln!(out);
            }
            for (i, a) in state.actions.iter().enumerate() {
                if i == 0 {
                    let _ = write!(out, " ");
                } else {
                    let _ = write!(out, "{:20}", "");
                }
                let _ = write!(out, "{}", a.set);
                for t in &a.targets {
                    let _ = write!(out, " {:3}", t);
                }
                if a.tc == Trans::Context {
                    let _ = write!(out, " context");
                }
                let _ = writeln!(out);
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "---------- character classes ----------");
        for class in &tab.classes {
            let _ = writeln!(out, "{:<10}: {}", class.name, class.set);
        }
        let _ = writeln!(out);
        tab.trace.push_str(&out);
    }

    /// Run the automaton over `input` the way the generated scanner does, and
    /// return the recognized tokens as pairs of token code and text.
    ///
    /// Characters in the ignore set are skipped between tokens. Input that no
    /// token matches yields the code of the invalid-input terminal. EOF is not
    /// included.
    pub fn simulate(&self, tab: &Tab, input: &str) -> Vec<(usize, String)> {
        let chars: Vec<char> = input.chars().collect();
        let no_sym = tab.no_sym.map(|s| tab[s].n).unwrap_or(tab.terminals.len());
        let fold = |c: char| -> u32 {
            if self.ignore_case {
                c.to_lowercase().next().unwrap_or(c) as u32
            } else {
                c as u32
            }
        };
        let mut tokens = Vec::new();
        let mut pos = 0;
        loop {
            while pos < chars.len() && tab.ignored.contains(chars[pos] as u32) {
                pos += 1;
            }
            if pos >= chars.len() {
                break;
            }
            let start = pos;
            let mut state = 0;
            let mut rec: Option<(usize, usize)> = None;
            let mut apx = 0;
            let kind = loop {
                let st = &self.states[state];
                if let Some(e) = st.end_of {
                    rec = Some((pos, tab[e].n));
                }
                let next = if pos < chars.len() {
                    st.find_action(fold(chars[pos]))
                } else {
                    None
                };
                match next {
                    Some(a) => {
                        let act = &st.actions[a];
                        if act.tc == Trans::Context {
                            apx += 1;
                        } else if st.ctx {
                            apx = 0;
                        }
                        state = act.target();
                        pos += 1;
                    }
                    None => {
                        if st.end_of.is_some() && st.ctx {
                            pos -= apx;
                            rec = Some((pos, rec.map(|r| r.1).unwrap_or(no_sym)));
                        }
                        match rec {
                            Some((end, kind)) if end > start => {
                                pos = end;
                                break kind;
                            }
                            _ => {
                                pos = start + 1;
                                break no_sym;
                            }
                        }
                    }
                }
            };
            let text: String = chars[start..pos].iter().collect();
            let kind = self.check_literal(tab, kind, &text);
            tokens.push((kind, text));
        }
        tokens
    }

    fn check_literal(&self, tab: &Tab, kind: usize, text: &str) -> usize {
        let is_class_lit = tab.terminals
            .get(kind)
            .map(|&s| tab[s].token_kind == TokenKind::ClassLiteral)
            .unwrap_or(false);
        if !is_class_lit {
            return kind;
        }
        let key = if self.ignore_case {
            format!("\"{}\"", text.to_lowercase())
        } else {
            format!("\"{}\"", text)
        };
        match tab.literals.get(&key) {
            Some(&s) => tab[s].n,
            None => kind,
        }
    }
}

/// Render a comment delimiter for diagnostics.
pub fn delimiter_repr(s: &[u32]) -> String {
    s.iter().map(|&c| char_repr(c)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tab::{Graph, SymbolKind};

    fn class(tab: &mut Tab, name: &str, set: CharSet) -> Graph {
        let c = tab.new_char_class(name, set);
        Graph::single(tab.new_node_val(NodeKind::CharClass, c as u32, 1))
    }

    /// ident = letter {letter | digit}.
    fn ident(tab: &mut Tab, dfa: &mut Dfa) -> SymbolId {
        let sym = tab.new_sym(SymbolKind::Terminal, "ident", 1);
        let letter = class(tab, "letter", CharSet::range('a' as u32, 'z' as u32));
        let letter2 = Graph::single(tab.new_node_val(NodeKind::CharClass, 0, 1));
        let digit = class(tab, "digit", CharSet::range('0' as u32, '9' as u32));
        let alt = tab.make_first_alt(letter2);
        let alt = tab.make_alternative(alt, digit);
        let it = tab.make_iteration(alt);
        let g = tab.make_sequence(letter, it);
        tab.finish(g);
        dfa.convert_to_states(tab, g.l, sym).unwrap();
        sym
    }

    fn setup() -> (Tab, Dfa) {
        let mut tab = Tab::new();
        tab.ignored = CharSet::single(' ' as u32);
        (tab, Dfa::new())
    }

    fn finish(tab: &mut Tab, dfa: &mut Dfa) -> Errors {
        let no = tab.new_sym(SymbolKind::Terminal, "???", 0);
        tab.no_sym = Some(no);
        let mut errors = Errors::new();
        dfa.make_deterministic(tab, &mut errors);
        errors
    }

    fn is_deterministic(dfa: &Dfa) -> bool {
        dfa.states().iter().all(|s| {
            s.actions.iter().all(|a| a.targets.len() == 1)
                && s.actions.iter().enumerate().all(|(i, a)| {
                    s.actions[i + 1..].iter().all(|b| !a.set.intersects(&b.set))
                })
        })
    }

    #[test]
    fn identifiers() {
        let (mut tab, mut dfa) = setup();
        let id = ident(&mut tab, &mut dfa);
        let errors = finish(&mut tab, &mut dfa);
        assert_eq!(errors.count(), 0);
        assert!(is_deterministic(&dfa));
        assert_eq!(tab[id].token_kind, TokenKind::Class);
        assert_eq!(
            dfa.simulate(&tab, "abc x1"),
            vec![(1, "abc".to_string()), (1, "x1".to_string())]
        );
    }

    #[test]
    fn keywords_become_literals() {
        let (mut tab, mut dfa) = setup();
        let id = ident(&mut tab, &mut dfa);
        let kw = tab.new_sym(SymbolKind::Terminal, "\"if\"", 2);
        tab.literals.insert("\"if\"".into(), kw);
        dfa.match_literal(&mut tab, "if", kw).unwrap();
        let errors = finish(&mut tab, &mut dfa);
        assert_eq!(errors.count(), 0);
        assert_eq!(tab[id].token_kind, TokenKind::ClassLiteral);
        assert_eq!(tab[kw].token_kind, TokenKind::Literal);
        assert_eq!(
            dfa.simulate(&tab, "if iff"),
            vec![(2, "if".to_string()), (1, "iff".to_string())]
        );
    }

    #[test]
    fn fixed_literals_share_prefixes() {
        let (mut tab, mut dfa) = setup();
        let lt = tab.new_sym(SymbolKind::Terminal, "\"<\"", 1);
        let le = tab.new_sym(SymbolKind::Terminal, "\"<=\"", 1);
        dfa.match_literal(&mut tab, "<", lt).unwrap();
        dfa.match_literal(&mut tab, "<=", le).unwrap();
        let errors = finish(&mut tab, &mut dfa);
        assert_eq!(errors.count(), 0);
        assert!(is_deterministic(&dfa));
        assert_eq!(
            dfa.simulate(&tab, "<=<"),
            vec![(2, "<=".to_string()), (1, "<".to_string())]
        );
    }

    #[test]
    fn indistinguishable_fixed_tokens() {
        let (mut tab, mut dfa) = setup();
        let a = tab.new_sym(SymbolKind::Terminal, "a", 1);
        let b = tab.new_sym(SymbolKind::Terminal, "b", 1);
        let ga = tab.str_to_graph("x", 1).unwrap();
        tab.finish(ga);
        dfa.convert_to_states(&mut tab, ga.l, a).unwrap();
        assert_eq!(
            dfa.match_literal(&mut tab, "x", b),
            Err("tokens b and a cannot be distinguished".to_string())
        );
    }

    #[test]
    fn overlapping_classes_are_reported() {
        // a = 'x' {'x'}. b = 'x' {'x'}.
        let (mut tab, mut dfa) = setup();
        for name in &["a", "b"] {
            let sym = tab.new_sym(SymbolKind::Terminal, *name, 1);
            let g1 = tab.str_to_graph("x", 1).unwrap();
            let g2 = tab.str_to_graph("x", 1).unwrap();
            let it = tab.make_iteration(g2);
            let g = tab.make_sequence(g1, it);
            tab.finish(g);
            dfa.convert_to_states(&mut tab, g.l, sym).unwrap();
        }
        let errors = finish(&mut tab, &mut dfa);
        assert!(errors.mentions("Tokens a and b cannot be distinguished"));
    }

    #[test]
    fn trailing_context() {
        // num = digit {digit} CONTEXT(".").
        let (mut tab, mut dfa) = setup();
        let num = tab.new_sym(SymbolKind::Terminal, "num", 1);
        let digit = class(&mut tab, "digit", CharSet::range('0' as u32, '9' as u32));
        let digit2 = Graph::single(tab.new_node_val(NodeKind::CharClass, 0, 1));
        let it = tab.make_iteration(digit2);
        let g = tab.make_sequence(digit, it);
        let dot = tab.str_to_graph(".", 1).unwrap();
        tab.set_context_trans(Some(dot.l));
        let g = tab.make_sequence(g, dot);
        tab.finish(g);
        dfa.convert_to_states(&mut tab, g.l, num).unwrap();
        let dotsym = tab.new_sym(SymbolKind::Terminal, "\".\"", 1);
        dfa.match_literal(&mut tab, ".", dotsym).unwrap();
        let errors = finish(&mut tab, &mut dfa);
        assert_eq!(errors.count(), 0);
        assert!(dfa.has_ctx_moves);
        assert_eq!(
            dfa.simulate(&tab, "12."),
            vec![(1, "12".to_string()), (2, ".".to_string())]
        );
    }

    #[test]
    fn empty_token() {
        let (mut tab, mut dfa) = setup();
        let sym = tab.new_sym(SymbolKind::Terminal, "e", 1);
        let g = tab.str_to_graph("x", 1).unwrap();
        let g = tab.make_option(g);
        tab.finish(g);
        assert_eq!(
            dfa.convert_to_states(&mut tab, g.l, sym),
            Err(vec!["token might be empty".to_string()])
        );
    }

    #[test]
    fn comments() {
        let (mut tab, mut dfa) = setup();
        let from = tab.str_to_graph("/*", 1).unwrap();
        let to = tab.str_to_graph("*/", 1).unwrap();
        tab.finish(from);
        tab.finish(to);
        dfa.new_comment(&tab, from.l, to.l, true).unwrap();
        assert_eq!(dfa.comments[0].start, vec!['/' as u32, '*' as u32]);
        assert!(dfa.comments[0].nested);
        let long = tab.str_to_graph("abc", 1).unwrap();
        tab.finish(long);
        assert!(dfa.new_comment(&tab, long.l, to.l, false).is_err());
        assert_eq!(delimiter_repr(&dfa.comments[0].stop), "'*' '/'");
    }
}
