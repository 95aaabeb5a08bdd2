// Copyright (c) 2018 Fabian Schuiki

//! Grammar checks.
//!
//! The structural checks find nonterminals without a production, unreachable
//! nonterminals, circular derivations and nonterminals that cannot derive a
//! string of terminals. Apart from unreachable nonterminals, which are only
//! reported, any of these prevents code generation. The LL(1) and resolver
//! checks run on structurally sound grammars and only ever warn.

use bit_set::BitSet;

use errors::Errors;
use sets::{expected, expected0, first};
use tab::{NodeId, NodeKind, SymbolId, Tab};

/// Run all checks. Returns false if the grammar is unfit for code generation.
pub fn grammar_ok(tab: &Tab, errors: &mut Errors) -> bool {
    if !nts_complete(tab, errors) {
        return false;
    }
    all_nt_reached(tab, errors);
    let ok = no_circular_productions(tab, errors) && all_nt_to_term(tab, errors);
    if ok {
        check_resolvers(tab, errors);
        check_ll1(tab, errors);
    }
    ok
}

/// Report nonterminals that are used but never defined.
pub fn nts_complete(tab: &Tab, errors: &mut Errors) -> bool {
    let mut complete = true;
    for &id in &tab.nonterminals {
        if tab[id].graph.is_none() {
            complete = false;
            errors.error(format!("  No production for {}", tab[id].name));
        }
    }
    complete
}

fn mark_reached_nts(tab: &Tab, p: Option<NodeId>, visited: &mut BitSet) {
    let mut p = p;
    while let Some(q) = p {
        let node = &tab[q];
        match node.kind {
            NodeKind::Nonterminal => {
                if let Some(sym) = node.sym {
                    if !visited.contains(tab[sym].n) {
                        visited.insert(tab[sym].n);
                        mark_reached_nts(tab, tab[sym].graph, visited);
                    }
                }
            }
            NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
                mark_reached_nts(tab, node.sub, visited);
                if node.kind == NodeKind::Alt {
                    mark_reached_nts(tab, node.down, visited);
                }
            }
            _ => (),
        }
        if node.up {
            break;
        }
        p = node.next;
    }
}

/// Warn about nonterminals that cannot be reached from the start symbol.
///
/// Returns whether all nonterminals are reachable.
pub fn all_nt_reached(tab: &Tab, errors: &mut Errors) -> bool {
    let gram = match tab.gram_sy {
        Some(g) => g,
        None => return true,
    };
    let mut visited = BitSet::with_capacity(tab.nonterminals.len());
    visited.insert(tab[gram].n);
    mark_reached_nts(tab, tab[gram].graph, &mut visited);
    let mut ok = true;
    for &id in &tab.nonterminals {
        if !visited.contains(tab[id].n) {
            ok = false;
            errors.warning(format!("  {} cannot be reached", tab[id].name));
        }
    }
    ok
}

/// Collect the nonterminals `p` can derive on its own, with everything else
/// around them deletable.
fn get_singles(tab: &Tab, p: Option<NodeId>, singles: &mut Vec<SymbolId>) {
    let q = match p {
        Some(q) => q,
        None => return,
    };
    let node = &tab[q];
    match node.kind {
        NodeKind::Nonterminal => {
            if node.up || tab.del_graph(node.next) {
                if let Some(sym) = node.sym {
                    singles.push(sym);
                }
            }
        }
        NodeKind::Alt | NodeKind::Iter | NodeKind::Opt => {
            if node.up || tab.del_graph(node.next) {
                get_singles(tab, node.sub, singles);
                if node.kind == NodeKind::Alt {
                    get_singles(tab, node.down, singles);
                }
            }
        }
        _ => (),
    }
    if !node.up && tab.del_node(q) {
        get_singles(tab, node.next, singles);
    }
}

/// Report derivations of the form `A =>+ A`.
///
/// Builds the relation "A can derive just B" and repeatedly prunes every
/// edge whose left side is never derived or whose right side derives
/// nothing. The edges that remain lie on cycles.
pub fn no_circular_productions(tab: &Tab, errors: &mut Errors) -> bool {
    let mut list: Vec<(SymbolId, SymbolId)> = Vec::new();
    for &id in &tab.nonterminals {
        let mut singles = Vec::new();
        get_singles(tab, tab[id].graph, &mut singles);
        for s in singles {
            list.push((id, s));
        }
    }
    loop {
        let before = list.len();
        let snapshot = list.clone();
        list.retain(|&(left, right)| {
            let on_right_side = snapshot.iter().any(|&(_, r)| r == left);
            let on_left_side = snapshot.iter().any(|&(l, _)| l == right);
            on_left_side && on_right_side
        });
        if list.len() == before {
            break;
        }
    }
    for &(left, right) in &list {
        errors.error(format!("  {} --> {}", tab[left].name, tab[right].name));
    }
    list.is_empty()
}

fn is_term(tab: &Tab, p: Option<NodeId>, mark: &BitSet) -> bool {
    let mut p = p;
    while let Some(q) = p {
        let node = &tab[q];
        if node.kind == NodeKind::Nonterminal {
            if let Some(sym) = node.sym {
                if !mark.contains(tab[sym].n) {
                    return false;
                }
            }
        }
        if node.kind == NodeKind::Alt && !is_term(tab, node.sub, mark)
            && (node.down.is_none() || !is_term(tab, node.down, mark))
        {
            return false;
        }
        if node.up {
            break;
        }
        p = node.next;
    }
    true
}

/// Report nonterminals all of whose derivations recurse forever.
pub fn all_nt_to_term(tab: &Tab, errors: &mut Errors) -> bool {
    let mut mark = BitSet::with_capacity(tab.nonterminals.len());
    loop {
        let mut changed = false;
        for &id in &tab.nonterminals {
            if !mark.contains(tab[id].n) && is_term(tab, tab[id].graph, &mark) {
                mark.insert(tab[id].n);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    let mut ok = true;
    for &id in &tab.nonterminals {
        if !mark.contains(tab[id].n) {
            ok = false;
            errors.error(format!("  {} cannot be derived to terminals", tab[id].name));
        }
    }
    ok
}

// -------------------------------------------------------------------------
// LL(1)

enum Ll1 {
    SeveralAlternatives,
    DeletableStructure,
    EmptyAny,
    DeletableContents,
}

fn ll1_error(tab: &Tab, errors: &mut Errors, cur: SymbolId, cond: Ll1, sym: Option<SymbolId>) {
    let mut s = format!("  LL1 warning in {}: ", tab[cur].name);
    if let Some(sym) = sym {
        s.push_str(&tab[sym].name);
        s.push_str(" is ");
    }
    s.push_str(match cond {
        Ll1::SeveralAlternatives => "start of several alternatives",
        Ll1::DeletableStructure => "start & successor of deletable structure",
        Ll1::EmptyAny => "an ANY node that matches no symbol",
        Ll1::DeletableContents => "contents of [...] or {...} must not be deletable",
    });
    errors.warning(s);
}

fn check_overlap(
    tab: &Tab,
    errors: &mut Errors,
    cur: SymbolId,
    s1: &BitSet,
    s2: &BitSet,
    several: bool,
) {
    for &id in &tab.terminals {
        let n = tab[id].n;
        if s1.contains(n) && s2.contains(n) {
            let cond = if several {
                Ll1::SeveralAlternatives
            } else {
                Ll1::DeletableStructure
            };
            ll1_error(tab, errors, cur, cond, Some(id));
        }
    }
}

fn check_alts(tab: &Tab, errors: &mut Errors, cur: SymbolId, p: Option<NodeId>) {
    let mut p = p;
    while let Some(q) = p {
        let node = &tab[q];
        match node.kind {
            NodeKind::Alt => {
                let mut s1 = tab.term_set();
                let mut alt = Some(q);
                while let Some(a) = alt {
                    let s2 = expected0(tab, tab[a].sub, cur);
                    check_overlap(tab, errors, cur, &s1, &s2, true);
                    s1.union_with(&s2);
                    check_alts(tab, errors, cur, tab[a].sub);
                    alt = tab[a].down;
                }
            }
            NodeKind::Opt | NodeKind::Iter => {
                if tab.del_sub_graph(node.sub) {
                    ll1_error(tab, errors, cur, Ll1::DeletableContents, None);
                } else {
                    let s1 = expected0(tab, node.sub, cur);
                    let s2 = expected(tab, node.next, cur);
                    check_overlap(tab, errors, cur, &s1, &s2, false);
                }
                check_alts(tab, errors, cur, node.sub);
            }
            NodeKind::Any => {
                if node.set.is_empty() {
                    ll1_error(tab, errors, cur, Ll1::EmptyAny, None);
                }
            }
            _ => (),
        }
        if node.up {
            break;
        }
        p = node.next;
    }
}

/// Warn about every choice point that one token of lookahead cannot decide.
pub fn check_ll1(tab: &Tab, errors: &mut Errors) {
    for &id in &tab.nonterminals {
        check_alts(tab, errors, id, tab[id].graph);
    }
}

// -------------------------------------------------------------------------
// Resolvers

fn res_err(tab: &Tab, errors: &mut Errors, p: NodeId, msg: &str) {
    let col = tab[p].pos.map(|pos| pos.col).unwrap_or(0);
    errors.warning_at(tab[p].line, col, msg);
}

fn check_res(tab: &Tab, errors: &mut Errors, cur: SymbolId, p: Option<NodeId>, rslv_allowed: bool) {
    let mut p = p;
    let mut rslv_allowed = rslv_allowed;
    while let Some(q) = p {
        let node = &tab[q];
        match node.kind {
            NodeKind::Alt => {
                let mut exp = tab.term_set();
                let mut alt = Some(q);
                while let Some(a) = alt {
                    exp.union_with(&expected0(tab, tab[a].sub, cur));
                    alt = tab[a].down;
                }
                let mut so_far = tab.term_set();
                let mut alt = Some(q);
                while let Some(a) = alt {
                    let sub = tab[a].sub;
                    match sub {
                        Some(s) if tab[s].kind == NodeKind::Resolver => {
                            let fs = expected(tab, tab[s].next, cur);
                            if !fs.is_disjoint(&so_far) {
                                res_err(
                                    tab,
                                    errors,
                                    s,
                                    "Warning: Resolver will never be evaluated. \
                                     Place it at previous conflicting alternative.",
                                );
                            }
                            if fs.is_disjoint(&exp) {
                                res_err(tab, errors, s, "Warning: Misplaced resolver: no LL(1) conflict.");
                            }
                        }
                        _ => so_far.union_with(&expected(tab, sub, cur)),
                    }
                    check_res(tab, errors, cur, sub, true);
                    alt = tab[a].down;
                }
            }
            NodeKind::Iter | NodeKind::Opt => {
                if let Some(s) = node.sub {
                    if tab[s].kind == NodeKind::Resolver {
                        let fs = first(tab, tab[s].next);
                        let fs_next = expected(tab, node.next, cur);
                        if fs.is_disjoint(&fs_next) {
                            res_err(tab, errors, s, "Warning: Misplaced resolver: no LL(1) conflict.");
                        }
                    }
                }
                check_res(tab, errors, cur, node.sub, true);
            }
            NodeKind::Resolver => {
                if !rslv_allowed {
                    res_err(tab, errors, q, "Warning: Misplaced resolver: no alternative.");
                }
            }
            _ => (),
        }
        if node.up {
            break;
        }
        p = node.next;
        rslv_allowed = false;
    }
}

/// Warn about resolvers that are misplaced or can never take effect.
pub fn check_resolvers(tab: &Tab, errors: &mut Errors) {
    for &id in &tab.nonterminals {
        check_res(tab, errors, id, tab[id].graph, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sets::comp_symbol_sets;
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

    #[test]
    fn ll1_conflict_warns() {
        // A = "x" "y" | "x" "z".
        let mut tab = Tab::new();
        let a = tab.new_sym(SymbolKind::Nonterminal, "A", 1);
        tab.gram_sy = Some(a);
        let x1 = term(&mut tab, "\"x\"");
        let y = term(&mut tab, "\"y\"");
        let x2 = term(&mut tab, "\"x\"");
        let z = term(&mut tab, "\"z\"");
        let g1 = tab.make_sequence(x1, y);
        let g2 = tab.make_sequence(x2, z);
        let g = tab.make_first_alt(g1);
        let g = tab.make_alternative(g, g2);
        tab.finish(g);
        tab[a].graph = Some(g.l);

        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(grammar_ok(&tab, &mut errors));
        assert_eq!(errors.count(), 0);
        assert!(errors.mentions("  LL1 warning in A: \"x\" is start of several alternatives"));
    }

    #[test]
    fn missing_production() {
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let b = tab.new_sym(SymbolKind::Nonterminal, "B", 1);
        tab.gram_sy = Some(s);
        let gb = nt(&mut tab, b);
        define(&mut tab, s, gb);
        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(!grammar_ok(&tab, &mut errors));
        assert!(errors.mentions("No production for B"));
    }

    #[test]
    fn circular_and_unproductive() {
        // S = A. A = S.
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let a = tab.new_sym(SymbolKind::Nonterminal, "A", 2);
        tab.gram_sy = Some(s);
        let ga = nt(&mut tab, a);
        define(&mut tab, s, ga);
        let gs = nt(&mut tab, s);
        define(&mut tab, a, gs);
        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(!no_circular_productions(&tab, &mut errors));
        assert!(errors.mentions("  S --> A"));
        assert!(errors.mentions("  A --> S"));
        assert!(!all_nt_to_term(&tab, &mut errors));
        assert!(errors.mentions("  S cannot be derived to terminals"));
    }

    #[test]
    fn unreachable_only_warns() {
        // S = "a". U = "b".
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let u = tab.new_sym(SymbolKind::Nonterminal, "U", 2);
        tab.gram_sy = Some(s);
        let ga = term(&mut tab, "a");
        define(&mut tab, s, ga);
        let gb = term(&mut tab, "b");
        define(&mut tab, u, gb);
        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(grammar_ok(&tab, &mut errors));
        assert_eq!(errors.count(), 0);
        assert!(errors.mentions("  U cannot be reached"));
    }

    #[test]
    fn deletable_option_contents() {
        // S = [ E ] "a". E = .
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        let e = tab.new_sym(SymbolKind::Nonterminal, "E", 2);
        tab.gram_sy = Some(s);
        let ge = nt(&mut tab, e);
        let opt = tab.make_option(ge);
        let ga = term(&mut tab, "a");
        let g = tab.make_sequence(opt, ga);
        define(&mut tab, s, g);
        let eps = Graph::single(tab.new_node(NodeKind::Eps, None, 2));
        define(&mut tab, e, eps);
        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        assert!(grammar_ok(&tab, &mut errors));
        assert!(errors.mentions("contents of [...] or {...} must not be deletable"));
    }

    #[test]
    fn misplaced_resolver() {
        // S = IF(true) "a".
        let mut tab = Tab::new();
        let s = tab.new_sym(SymbolKind::Nonterminal, "S", 1);
        tab.gram_sy = Some(s);
        let r = Graph::single(tab.new_node(NodeKind::Resolver, None, 1));
        let ga = term(&mut tab, "a");
        let seq = tab.make_sequence(ga, r);
        let gb = term(&mut tab, "b");
        let seq = tab.make_sequence(seq, gb);
        define(&mut tab, s, seq);
        let mut errors = Errors::new();
        comp_symbol_sets(&mut tab, &mut errors);
        check_resolvers(&tab, &mut errors);
        assert!(errors.mentions("Misplaced resolver: no alternative."));
    }
}
