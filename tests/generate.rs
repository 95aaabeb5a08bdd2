// Copyright (c) 2018 Fabian Schuiki

//! Run complete grammars through the generator.

extern crate cocogen;

use cocogen::driver::{generate, write_output, Options, Output};
use cocogen::errors::Errors;
use cocogen::parser::parse;
use cocogen::sets::comp_symbol_sets;
use cocogen::source::Source;

fn run(grammar: &str) -> Output {
    generate(&Source::new(grammar), &Options::default()).unwrap()
}

const EXPR: &str = r#"
COMPILER Expr
CHARACTERS
    digit = "0123456789".
    letter = 'a'..'z' + 'A'..'Z'.
    cr = '\r'.
    lf = '\n'.
    tab = '\t'.
TOKENS
    ident = letter {letter | digit}.
    number = digit {digit}.
COMMENTS FROM "/*" TO "*/" NESTED
IGNORE cr + lf + tab
PRODUCTIONS
    Expr = Term {("+" | "-") Term}.
    Term = Factor {("*" | "/") Factor}.
    Factor = ident | number | "(" Expr ")".
END Expr.
"#;

#[test]
fn expression_grammar() {
    let out = run(EXPR);
    assert_eq!(out.errors.count(), 0, "{}", out.errors);
    assert_eq!(out.summary(), "parser + scanner generated");
    let parser = out.parser.unwrap();
    assert!(parser.contains("fn Expr(&mut self) {"));
    assert!(parser.contains("fn Term(&mut self) {"));
    assert!(parser.contains("fn Factor(&mut self) {"));
    assert!(parser.contains("self.Expr();\n        self.expect(0);"));
    assert!(parser.contains("pub const _ident: usize = 1;"));
    assert!(parser.contains("pub const _number: usize = 2;"));
    let scanner = out.scanner.unwrap();
    assert!(scanner.contains("fn comment0(&mut self) -> bool {"));
    assert!(!scanner.contains("-->"));
}

#[test]
fn expression_tokens() {
    let mut p = parse(EXPR);
    assert_eq!(p.errors.count(), 0, "{}", p.errors);
    p.dfa.make_deterministic(&p.tab, &mut p.errors);
    assert_eq!(p.errors.count(), 0, "{}", p.errors);
    let kinds: Vec<usize> = p.dfa
        .simulate(&p.tab, "x1 + 42\t* (y)")
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    let n = |name: &str| p.tab[p.tab.find_sym(name).unwrap()].n;
    assert_eq!(
        kinds,
        vec![
            n("ident"),
            n("\"+\""),
            n("number"),
            n("\"*\""),
            n("\"(\""),
            n("ident"),
            n("\")\""),
        ]
    );
}

#[test]
fn automaton_is_deterministic() {
    let mut p = parse(EXPR);
    p.dfa.make_deterministic(&p.tab, &mut p.errors);
    for state in p.dfa.states() {
        for (i, a) in state.actions.iter().enumerate() {
            assert_eq!(a.targets.len(), 1);
            for b in &state.actions[i + 1..] {
                assert!(
                    !a.set.intersects(&b.set),
                    "overlapping transitions in state {}",
                    state.nr
                );
            }
        }
    }
}

#[test]
fn minimal_grammar() {
    let out = run(
        "COMPILER T CHARACTERS letter = 'a'..'z'. \
         TOKENS ident = letter {letter}. PRODUCTIONS T = ident. END T.",
    );
    assert_eq!(out.errors.count(), 0, "{}", out.errors);
    let parser = out.parser.unwrap();
    assert!(parser.contains("self.expect(1);"));
    assert!(parser.contains("self.expect(0);"));
}

#[test]
fn duplicate_token_string() {
    let out = run("COMPILER T TOKENS a = \"x\". b = \"x\". PRODUCTIONS T = a. END T.");
    let dups = out.errors
        .diagnostics()
        .iter()
        .filter(|d| d.message == "token string declared twice")
        .count();
    assert_eq!(dups, 1);
    assert_eq!(out.parser, None);
}

#[test]
fn undefined_character_class() {
    let out = run(
        "COMPILER T TOKENS ident = letter. \
         PRODUCTIONS T = ident | \"x\" \"y\". END T.",
    );
    assert!(out.errors.mentions("undefined name"));
    assert_eq!(out.parser, None);
}

#[test]
fn deletable_nonterminals() {
    let mut p = parse(
        "COMPILER S PRODUCTIONS S = A \"b\". A = [\"a\"]. END S.",
    );
    assert_eq!(p.errors.count(), 0, "{}", p.errors);
    let mut errors = Errors::new();
    comp_symbol_sets(&mut p.tab, &mut errors);
    assert!(errors.mentions("  A deletable"));
    let tab = &p.tab;
    let s = tab.find_sym("S").unwrap();
    let a = tab.find_sym("A").unwrap();
    let ta = tab[tab.find_sym("\"a\"").unwrap()].n;
    let tb = tab[tab.find_sym("\"b\"").unwrap()].n;
    assert!(tab[a].deletable);
    assert!(!tab[s].deletable);
    let first_s: Vec<usize> = tab[s].first.iter().collect();
    assert_eq!(first_s, vec![tb, ta]);
    let follow_a: Vec<usize> = tab[a].follow.iter().collect();
    assert_eq!(follow_a, vec![tb]);
}

#[test]
fn ll1_conflicts_still_generate() {
    let out = run("COMPILER A PRODUCTIONS A = \"x\" \"y\" | \"x\" \"z\". END A.");
    assert_eq!(out.errors.count(), 0, "{}", out.errors);
    assert!(out.errors.mentions("  LL1 warning in A: \"x\" is start of several alternatives"));
    assert!(out.parser.is_some());
    assert!(out.scanner.is_some());
}

#[test]
fn sync_sets_contain_eof() {
    let out = run(
        "COMPILER S PRODUCTIONS S = {Stat}. Stat = SYNC \"a\" \";\" | \"b\" \";\". END S.",
    );
    assert_eq!(out.errors.count(), 0, "{}", out.errors);
    let parser = out.parser.unwrap();
    // EOF is always part of the set a SYNC waits for.
    assert!(parser.contains("while !(self.la.kind == 0 || self.la.kind == 1) {"));
}

#[test]
fn output_is_written() {
    let dir = std::env::temp_dir().join(format!("cocogen-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let opts = Options {
        trace: Some("A".into()),
        ..Options::default()
    };
    let src = Source::new(
        "COMPILER T CHARACTERS letter = 'a'..'z'. \
         TOKENS ident = letter {letter}. PRODUCTIONS T = ident. END T.",
    );
    let out = generate(&src, &opts).unwrap();
    write_output(&dir, &out).unwrap();
    write_output(&dir, &out).unwrap();
    assert!(dir.join("parser.rs").is_file());
    assert!(dir.join("scanner.rs").is_file());
    assert!(dir.join("parser.rs.old").is_file());
    let trace = std::fs::read_to_string(dir.join("trace.txt")).unwrap();
    assert!(!trace.is_empty());
    std::fs::remove_dir_all(&dir).unwrap();
}

const LANGUAGE: &str = r#"
COMPILER Lang
CHARACTERS
    letter = 'a'..'z' + 'A'..'Z' + '_'.
    digit = '0'..'9'.
    hex = digit + 'a'..'f'.
    cr = '\r'.
    lf = '\n'.
    tab = '\t'.
TOKENS
    ident = letter {letter | digit}.
    number = digit {digit} | "0x" hex {hex}.
    float = digit {digit} '.' {digit}.
PRAGMAS
    option = '$' letter {letter}. (. self.options += 1; .)
COMMENTS FROM "//" TO lf
COMMENTS FROM "/*" TO "*/" NESTED
IGNORE cr + lf + tab
PRODUCTIONS
    Lang = {Stat}.
    Stat = SYNC
        ( ident "=" Expr WEAK ";"
        | "print" Expr {WEAK "," Expr} ";"
        | "while" Expr Block
        | "if" Expr Block ["else" Block]
        | "return" [Expr] ";"
        | "break" ";"
        | Block
        ).
    Block = "{" {Stat} "}".
    Expr = Term {("+" | "-" | "<" | "<=") Term}.
    Term = ident | number | float | "(" Expr ")".
END Lang.
"#;

#[test]
fn output_is_reproducible() {
    let first = run(LANGUAGE);
    assert_eq!(first.errors.count(), 0, "{}", first.errors);
    let parser = first.parser.clone().unwrap();
    assert!(parser.contains("match self.la.kind {"));
    assert!(parser.contains("self.expect_weak("));
    assert!(parser.contains("self.weak_separator("));
    for _ in 0..3 {
        let again = run(LANGUAGE);
        assert_eq!(again.parser, first.parser);
        assert_eq!(again.scanner, first.scanner);
        assert_eq!(again.trace, first.trace);
    }
}

#[test]
fn context_after_a_shorter_token() {
    let mut p = parse(
        "COMPILER T TOKENS a = 'x' CONTEXT('y'). b = 'x'. c = 'y'. \
         PRODUCTIONS T = a c b. END T.",
    );
    assert_eq!(p.errors.count(), 0, "{}", p.errors);
    p.dfa.make_deterministic(&p.tab, &mut p.errors);
    assert_eq!(p.errors.count(), 0, "{}", p.errors);
    let n = |name: &str| p.tab[p.tab.find_sym(name).unwrap()].n;
    // `x` is an `a` only when a `y` follows; the `y` is scanned again.
    assert_eq!(
        p.dfa.simulate(&p.tab, "xyx"),
        vec![
            (n("a"), "x".to_string()),
            (n("c"), "y".to_string()),
            (n("b"), "x".to_string()),
        ]
    );
}

#[test]
fn context_that_overlaps_a_token() {
    let mut p = parse(
        "COMPILER T TOKENS a = 'x' CONTEXT('y'). b = 'x' 'y'. \
         PRODUCTIONS T = a b. END T.",
    );
    p.dfa.make_deterministic(&p.tab, &mut p.errors);
    assert!(p.errors.mentions("cannot be distinguished"), "{}", p.errors);
}
