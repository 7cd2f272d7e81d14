use crate::GrammarBuilder;
use crate::Value;
use crate::build::{ascii_ident, int_num, lit};

fn parser() -> crate::Parser {
    let mut b = GrammarBuilder::new();
    b.token("number", int_num());
    b.main_rule(
        "pair",
        ascii_ident()
            .into_rule()
            .then(lit("="))
            .then(ascii_ident().into_rule().or(int_num())),
    );
    b.build().unwrap()
}

#[test]
fn scan_yields_every_rule_match() {
    let parser = parser();
    let input = "a=1 ... b=2 ;; c=3";

    let matches: Vec<String> = parser
        .find_all_matches(None, input, false)
        .unwrap()
        .map(|ast| ast.root().text().to_owned())
        .collect();
    assert_eq!(matches, vec!["a=1", "b=2", "c=3"]);
}

#[test]
fn scan_resumes_after_each_match() {
    let parser = parser();
    // The second pair starts inside the first match span and is skipped.
    let matches: Vec<String> = parser
        .find_all_matches(None, "x=12=3", false)
        .unwrap()
        .map(|ast| ast.root().text().to_owned())
        .collect();
    assert_eq!(matches, vec!["x=12"]);
}

#[test]
fn overlapping_scan_advances_one_char() {
    let parser = parser();
    let matches: Vec<usize> = parser
        .find_all_matches(None, "x=y=1", true)
        .unwrap()
        .map(|ast| ast.root().start())
        .collect();
    // Overlap re-enters inside the first match and finds `y=1` too.
    assert_eq!(matches, vec![0, 2]);
}

#[test]
fn token_scan_yields_values_with_positions() {
    let parser = parser();
    let found: Vec<(usize, Value)> = parser
        .find_all_token_matches("number", "a 12 b 345", false)
        .unwrap()
        .collect();
    assert_eq!(found, vec![(2, Value::Int(12)), (7, Value::Int(345))]);
}

#[test]
fn no_matches_is_an_empty_iterator() {
    let parser = parser();
    assert_eq!(parser.find_all_matches(None, "???", false).unwrap().count(), 0);
}
