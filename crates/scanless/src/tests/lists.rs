use crate::GrammarBuilder;
use crate::Value;
use crate::build::{ascii_ident, eof, lit, separated};

/// `list = "[" (id ",")* id? "]"` with a tolerated trailing comma.
fn parser() -> crate::Parser {
    let mut b = GrammarBuilder::new();
    b.skip_whitespaces();
    b.main_rule(
        "list",
        lit("[")
            .into_rule()
            .then(separated(ascii_ident(), lit(","), 0, None, true, false))
            .then(lit("]"))
            .then(eof())
            .value(|node| node.child(1).value()),
    );
    b.build().unwrap()
}

fn ids(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn trailing_separator_is_tolerated() {
    let ast = parser().parse("[a,b,c,]").unwrap();
    assert_eq!(ids(ast.value()), vec!["a", "b", "c"]);
}

#[test]
fn plain_list_parses() {
    let ast = parser().parse("[a, b, c]").unwrap();
    assert_eq!(ids(ast.value()), vec!["a", "b", "c"]);
}

#[test]
fn empty_and_singleton_lists_parse() {
    assert_eq!(ids(parser().parse("[]").unwrap().value()), Vec::<String>::new());
    assert_eq!(ids(parser().parse("[a]").unwrap().value()), vec!["a"]);
    assert_eq!(ids(parser().parse("[a,]").unwrap().value()), vec!["a"]);
}

#[test]
fn doubled_separator_fails() {
    assert!(parser().parse("[a,,b]").is_err());
}
