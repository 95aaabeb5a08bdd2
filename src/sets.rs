// Copyright (c) 2018 Fabian Schuiki

//! Terminal set computation.
//!
//! This module computes which nonterminals are deletable, and the first,
//! follow, ANY and SYNC sets of a grammar. All sets are bit sets over the
//! token codes of the terminals.
//!
//! Graph walks keep a set of visited nodes. A walk along a `next` chain
//! continues past a node only as long as that node can derive the empty
//! string, and stops at the end of the enclosing structure where `up` is set.

use std::fmt::Write;

use bit_set::BitSet;

use errors::Errors;
use tab::{NodeId, NodeKind, SymbolId, Tab};

/// Compute all terminal sets of a grammar.
///
/// The ANY nodes must have been initialized with `setup_anys` beforehand.
pub fn comp_symbol_sets(tab: &mut Tab, errors: &mut Errors) {
    comp_deletable_symbols(tab, errors);
    comp_first_sets(tab);
    comp_any_sets(tab);
    comp_follow_sets(tab);
    comp_sync_sets(tab);
    if tab.ddt[1] {
        print_first_follow(tab);
    }
    if tab.ddt[4] {
        print_any_sync(tab);
    }
}

/// Let every ANY node accept all terminals except EOF.
pub fn setup_anys(tab: &mut Tab) {
    let mut all = tab.term_set();
    for n in 0..tab.terminals.len() {
        all.insert(n);
    }
    let eof = tab[tab.eof_sy].n;
    all.remove(eof);
    for i in 0..tab.node_count() {
        if tab[NodeId(i)].kind == NodeKind::Any {
            tab[NodeId(i)].set = all.clone();
        }
    }
}

/// Determine which nonterminals can derive the empty string.
///
/// Iterates to a fixpoint and warns about every deletable nonterminal.
pub fn comp_deletable_symbols(tab: &mut Tab, errors: &mut Errors) {
    loop {
        let mut changed = false;
        for i in 0..tab.nonterminals.len() {
            let id = tab.nonterminals[i];
            if !tab[id].deletable && tab[id].graph.is_some() && tab.del_graph(tab[id].graph) {
                tab[id].deletable = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    for &id in &tab.nonterminals {
        if tab[id].deletable {
            errors.warning(format!("  {} deletable", tab[id].name));
        }
    }
}

/// The terminals a derivation of the graph at `p` can start with.
pub fn first(tab: &Tab, p: Option<NodeId>) -> BitSet {
    let mut mark = BitSet::with_capacity(tab.node_count());
    first0(tab, p, &mut mark)
}

fn first0(tab: &Tab, p: Option<NodeId>, mark: &mut BitSet) -> BitSet {
    let mut fs = tab.term_set();
    let mut p = p;
    while let Some(q) = p {
        if mark.contains(q.0) {
            break;
        }
        mark.insert(q.0);
        let node = &tab[q];
        match node.kind {
            NodeKind::Nonterminal => {
                if let Some(sym) = node.sym {
                    if tab[sym].first_ready {
                        fs.union_with(&tab[sym].first);
                    } else {
                        let sub = first0(tab, tab[sym].graph, mark);
                        fs.union_with(&sub);
                    }
                }
            }
            NodeKind::Terminal | NodeKind::WeakTerminal => {
                if let Some(sym) = node.sym {
                    fs.insert(tab[sym].n);
                }
            }
            NodeKind::Any => fs.union_with(&node.set),
            NodeKind::Alt => {
                let sub = first0(tab, node.sub, mark);
                fs.union_with(&sub);
                let down = first0(tab, node.down, mark);
                fs.union_with(&down);
            }
            NodeKind::Iter | NodeKind::Opt => {
                let sub = first0(tab, node.sub, mark);
                fs.union_with(&sub);
            }
            _ => (),
        }
        if !tab.del_node(q) {
            break;
        }
        p = node.next;
    }
    fs
}

/// Compute the first set of every nonterminal.
pub fn comp_first_sets(tab: &mut Tab) {
    for i in 0..tab.nonterminals.len() {
        let id = tab.nonterminals[i];
        tab[id].first = tab.term_set();
        tab[id].first_ready = false;
    }
    for i in 0..tab.nonterminals.len() {
        let id = tab.nonterminals[i];
        let fs = first(tab, tab[id].graph);
        trace!("first({}) = {}", tab[id].name, tab.pretty_set(&fs));
        tab[id].first = fs;
        tab[id].first_ready = true;
    }
}

/// The terminals that may be seen at `p`: its first set, plus the followers
/// of `cur` if everything from `p` on can be skipped.
pub fn expected(tab: &Tab, p: Option<NodeId>, cur: SymbolId) -> BitSet {
    let mut s = first(tab, p);
    if tab.del_graph(p) {
        s.union_with(&tab[cur].follow);
    }
    s
}

/// Like `expected`, but a resolver expects nothing since it decides on its
/// own.
pub fn expected0(tab: &Tab, p: Option<NodeId>, cur: SymbolId) -> BitSet {
    match p {
        Some(q) if tab[q].kind == NodeKind::Resolver => tab.term_set(),
        _ => expected(tab, p, cur),
    }
}

fn comp_follow(tab: &mut Tab, p: Option<NodeId>, cur: SymbolId, visited: &mut BitSet) {
    let mut p = p;
    while let Some(q) = p {
        if visited.contains(q.0) {
            break;
        }
        visited.insert(q.0);
        let (kind, sym, next, sub, down) = {
            let n = &tab[q];
            (n.kind, n.sym, n.next, n.sub, n.down)
        };
        match kind {
            NodeKind::Nonterminal => {
                if let Some(sym) = sym {
                    let s = first(tab, next);
                    tab[sym].follow.union_with(&s);
                    if tab.del_graph(next) {
                        let n = tab[cur].n;
                        tab[sym].nts.insert(n);
                    }
                }
            }
            NodeKind::Opt | NodeKind::Iter => comp_follow(tab, sub, cur, visited),
            NodeKind::Alt => {
                comp_follow(tab, sub, cur, visited);
                comp_follow(tab, down, cur, visited);
            }
            _ => (),
        }
        p = next;
    }
}

fn complete(tab: &mut Tab, sym: SymbolId, cur: SymbolId, visited: &mut BitSet) {
    let n = tab[sym].n;
    if visited.contains(n) {
        return;
    }
    visited.insert(n);
    for i in 0..tab.nonterminals.len() {
        let s = tab.nonterminals[i];
        if tab[sym].nts.contains(tab[s].n) {
            complete(tab, s, cur, visited);
            let follow = tab[s].follow.clone();
            tab[sym].follow.union_with(&follow);
            if sym == cur {
                let sn = tab[s].n;
                tab[sym].nts.remove(sn);
            }
        }
    }
}

/// Compute the follow set of every nonterminal.
///
/// First collects the direct followers and the nonterminals whose followers
/// propagate, then closes over the propagation. The start symbol is followed
/// by EOF.
pub fn comp_follow_sets(tab: &mut Tab) {
    let num_nts = tab.nonterminals.len();
    for i in 0..num_nts {
        let id = tab.nonterminals[i];
        tab[id].follow = tab.term_set();
        tab[id].nts = BitSet::with_capacity(num_nts);
    }
    if let Some(gram) = tab.gram_sy {
        let eof = tab[tab.eof_sy].n;
        tab[gram].follow.insert(eof);
    }
    let mut visited = BitSet::with_capacity(tab.node_count());
    for i in 0..num_nts {
        let id = tab.nonterminals[i];
        let graph = tab[id].graph;
        comp_follow(tab, graph, id, &mut visited);
    }
    for i in 0..num_nts {
        let id = tab.nonterminals[i];
        let mut visited = BitSet::with_capacity(num_nts);
        complete(tab, id, id, &mut visited);
    }
}

/// The first ANY node a derivation of `p` can start with.
fn leading_any(tab: &Tab, p: Option<NodeId>) -> Option<NodeId> {
    let q = match p {
        Some(q) => q,
        None => return None,
    };
    let node = &tab[q];
    let mut a = None;
    match node.kind {
        NodeKind::Any => a = Some(q),
        NodeKind::Alt => {
            a = leading_any(tab, node.sub);
            if a.is_none() {
                a = leading_any(tab, node.down);
            }
        }
        NodeKind::Opt | NodeKind::Iter => a = leading_any(tab, node.sub),
        _ => (),
    }
    if a.is_none() && tab.del_node(q) && !node.up {
        a = leading_any(tab, node.next);
    }
    a
}

fn subtract_from_any(tab: &mut Tab, any: NodeId, s: &BitSet) {
    tab[any].set.difference_with(s);
}

/// Remove from ANY sets the terminals that are matched by an alternative
/// path at the same point.
///
/// In `[a] ANY`, `{a|b} ANY`, `[a][b] ANY`, `(a|) ANY` and `A ANY` with a
/// deletable `A = [a].`, the terminals `a` and `b` must not be matched by ANY.
fn find_as(tab: &mut Tab, p: Option<NodeId>) {
    let mut p = p;
    while let Some(q) = p {
        let (kind, sub, next, up, sym) = {
            let n = &tab[q];
            (n.kind, n.sub, n.next, n.up, n.sym)
        };
        match kind {
            NodeKind::Opt | NodeKind::Iter => {
                find_as(tab, sub);
                if let Some(a) = leading_any(tab, sub) {
                    let s = first(tab, next);
                    subtract_from_any(tab, a, &s);
                }
            }
            NodeKind::Alt => {
                let mut s1 = tab.term_set();
                let mut alt = Some(q);
                while let Some(r) = alt {
                    let (rsub, rdown) = (tab[r].sub, tab[r].down);
                    find_as(tab, rsub);
                    match leading_any(tab, rsub) {
                        Some(a) => {
                            let mut h = first(tab, rdown);
                            h.union_with(&s1);
                            subtract_from_any(tab, a, &h);
                        }
                        None => {
                            let f = first(tab, rsub);
                            s1.union_with(&f);
                        }
                    }
                    alt = rdown;
                }
            }
            _ => (),
        }
        if tab.del_node(q) {
            if let Some(a) = leading_any(tab, next) {
                let inner = if kind == NodeKind::Nonterminal {
                    sym.and_then(|s| tab[s].graph)
                } else {
                    sub
                };
                let s = first(tab, inner);
                subtract_from_any(tab, a, &s);
            }
        }
        if up {
            break;
        }
        p = next;
    }
}

/// Narrow the set of every ANY node.
pub fn comp_any_sets(tab: &mut Tab) {
    for i in 0..tab.nonterminals.len() {
        let graph = tab[tab.nonterminals[i]].graph;
        find_as(tab, graph);
    }
}

fn comp_sync(tab: &mut Tab, p: Option<NodeId>, cur: SymbolId, visited: &mut BitSet) {
    let mut p = p;
    while let Some(q) = p {
        if visited.contains(q.0) {
            break;
        }
        visited.insert(q.0);
        let (kind, sub, down, next) = {
            let n = &tab[q];
            (n.kind, n.sub, n.down, n.next)
        };
        match kind {
            NodeKind::Sync => {
                let mut s = expected(tab, next, cur);
                let eof = tab[tab.eof_sy].n;
                s.insert(eof);
                tab.all_sync_sets.union_with(&s);
                tab[q].set = s;
            }
            NodeKind::Alt => {
                comp_sync(tab, sub, cur, visited);
                comp_sync(tab, down, cur, visited);
            }
            NodeKind::Opt | NodeKind::Iter => comp_sync(tab, sub, cur, visited),
            _ => (),
        }
        p = next;
    }
}

/// Compute the set of every SYNC node and their union.
pub fn comp_sync_sets(tab: &mut Tab) {
    let mut all = tab.term_set();
    all.insert(tab[tab.eof_sy].n);
    tab.all_sync_sets = all;
    let mut visited = BitSet::with_capacity(tab.node_count());
    for i in 0..tab.nonterminals.len() {
        let id = tab.nonterminals[i];
        let graph = tab[id].graph;
        comp_sync(tab, graph, id, &mut visited);
    }
}

fn print_first_follow(tab: &mut Tab) {
    let mut out = String::new();
    let _ = writeln!(out, "First & follow symbols:");
    let _ = writeln!(out, "----------------------");
    let _ = writeln!(out);
    for &id in &tab.nonterminals {
        let _ = writeln!(out, "{}", tab[id].name);
        let _ = writeln!(out, "first:   {}", tab.pretty_set(&tab[id].first));
        let _ = writeln!(out, "follow:  {}", tab.pretty_set(&tab[id].follow));
        let _ = writeln!(out);
    }
    tab.trace.push_str(&out);
}

fn print_any_sync(tab: &mut Tab) {
    let mut out = String::new();
    let _ = writeln!(out, "ANY and SYNC sets:");
    let _ = writeln!(out, "-----------------");
    for i in 0..tab.node_count() {
        let node = &tab[NodeId(i)];
        if node.kind == NodeKind::Any || node.kind == NodeKind::Sync {
            let _ = writeln!(
                out,
                "{:4} {:<4}: {}",
                i,
                node.kind.name(),
                tab.pretty_set(&node.set)
            );
        }
    }
    let _ = writeln!(out);
    tab.trace.push_str(&out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tab::{Graph, SymbolKind};

    fn term(tab: &mut Tab, name: &str) -> Graph {
        let sym = match tab.find_sym(name) {
            Some(s) => s,
            None => tab.new_sym(SymbolKind::Terminal, name, 1),
        };
        Graph::single(tab.new_node(NodeKind::Terminal, Some(sym), 1))
    }

    fn nt(tab: &mut Tab, sym: SymbolId) -> Graph {
        Graph::single(tab.new_node(NodeKind::Nonterminal, Some(sym), 1))
    }

    fn define(tab: &mut Tab, sym: SymbolId, g: Graph) {
        let g = tab.make_first_alt(g);
        tab.finish(g);
        tab[sym].graph = Some(g.l);
    }

    fn names(tab: &Tab, set: &BitSet) -> String {
        format!("{}", tab.pretty_set(set))
    }

    #[test]
    fn empty_derivation_propagates_follow() {
        // S = A "b". A = [ "a" ].
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let a = tab.new_sym(SymbolKind::Nonterminal, "A", 2);
        tab.gram_sy = Some(s);
        let ga = nt(&mut tab, a);
        let gb = term(&mut tab, "b");
        let body = tab.make_sequence(ga, gb);
        define(&mut tab, s, body);
        let ta = term(&mut tab, "a");
        let opt = tab.make_option(ta);
        define(&mut tab, a, opt);

        let mut errors = Errors::new();
        setup_anys(&mut tab);
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(tab[a].deletable);
        assert!(!tab[s].deletable);
        assert!(errors.mentions("A deletable"));
        assert_eq!(names(&tab, &tab[a].first), "a");
        assert_eq!(names(&tab, &tab[s].first), "b a");
        assert_eq!(names(&tab, &tab[a].follow), "b");
        assert_eq!(names(&tab, &tab[s].follow), "EOF");
    }

    #[test]
    fn empty_only_nonterminal_has_empty_first() {
        // S = E "x". E = .
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let e = tab.new_sym(SymbolKind::Nonterminal, "E", 2);
        tab.gram_sy = Some(s);
        let ge = nt(&mut tab, e);
        let gx = term(&mut tab, "x");
        let body = tab.make_sequence(ge, gx);
        define(&mut tab, s, body);
        let eps = Graph::single(tab.new_node(NodeKind::Eps, None, 2));
        define(&mut tab, e, eps);

        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(tab[e].deletable);
        assert!(tab[e].first.is_empty());
        assert_eq!(names(&tab, &tab[e].follow), "x");
    }

    #[test]
    fn follow_propagates_through_tail_position() {
        // S = A "y". A = "a" B. B = "b".
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let a = tab.new_sym(SymbolKind::Nonterminal, "A", 2);
        let b = tab.new_sym(SymbolKind::Nonterminal, "B", 3);
        tab.gram_sy = Some(s);
        let ga = nt(&mut tab, a);
        let gy = term(&mut tab, "y");
        let body = tab.make_sequence(ga, gy);
        define(&mut tab, s, body);
        let ta = term(&mut tab, "a");
        let gb = nt(&mut tab, b);
        let body = tab.make_sequence(ta, gb);
        define(&mut tab, a, body);
        let tb = term(&mut tab, "b");
        define(&mut tab, b, tb);

        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert_eq!(names(&tab, &tab[b].follow), "y");
        assert_eq!(errors.diagnostics().len(), 0);
    }

    #[test]
    fn any_excludes_alternative_terminals() {
        // S = [ "a" ] ANY "b".
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        tab.gram_sy = Some(s);
        let ta = term(&mut tab, "a");
        let gb = term(&mut tab, "b");
        let opt = tab.make_option(ta);
        let any = Graph::single(tab.new_node(NodeKind::Any, None, 1));
        let g = tab.make_sequence(opt, any);
        let g = tab.make_sequence(g, gb);
        define(&mut tab, s, g);
        tab.new_sym(SymbolKind::Terminal, "???", 0);

        let mut errors = Errors::new();
        setup_anys(&mut tab);
        comp_symbol_sets(&mut tab, &mut errors);
        assert_eq!(names(&tab, &tab[any.l].set), "b ???");
    }

    #[test]
    fn sync_sets_contain_eof() {
        // S = SYNC "a".
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        tab.gram_sy = Some(s);
        let sync = Graph::single(tab.new_node(NodeKind::Sync, None, 1));
        let ta = term(&mut tab, "a");
        let g = tab.make_sequence(sync, ta);
        define(&mut tab, s, g);

        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert_eq!(names(&tab, &tab[sync.l].set), "EOF a");
        assert!(tab.all_sync_sets.contains(0));
        assert!(tab.all_sync_sets.contains(1));
    }
}
