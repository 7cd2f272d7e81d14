use indoc::indoc;

use crate::GrammarBuilder;
use crate::build::{ascii_ident, eof, lit, rule_ref, token_ref};

/// Python-like statements: `def` headers open an indented block.
fn parser() -> crate::Parser {
    let mut b = GrammarBuilder::new();
    b.skip_whitespaces();
    b.indent_barriers("INDENT", "DEDENT");

    b.rule(
        "assign",
        ascii_ident().into_rule().then(lit("=")).then(ascii_ident()).then(lit(";")),
    );
    b.rule(
        "def",
        lit("def")
            .into_rule()
            .then(ascii_ident())
            .then(lit("("))
            .then(lit(")"))
            .then(lit(":"))
            .then(rule_ref("block")),
    );
    b.rule(
        "block",
        token_ref("INDENT")
            .into_rule()
            .then(rule_ref("stmt").one_or_more())
            .then(token_ref("DEDENT")),
    );
    b.rule("stmt", rule_ref("def").or(rule_ref("assign")).or(rule_ref("block")));
    b.main_rule("program", rule_ref("stmt").zero_or_more().then(eof()));
    b.build().unwrap()
}

#[test]
fn indented_block_nests_statements() {
    let input = indoc! {"
        def a():
            b = c;
            c = a;
        a = p;
    "};
    let ast = parser().parse(input).unwrap();

    let stmts = ast.root().child(0);
    assert_eq!(stmts.child_count(), 2);

    // The first statement is the def, carrying a block of two statements.
    let block = stmts.child(0).find_first("block").expect("def has a block");
    assert_eq!(block.child_count(), 3);
    assert_eq!(block.child(1).child_count(), 2);

    // The second statement is the trailing top-level assignment.
    assert!(stmts.child(1).find_first("assign").is_some());
    assert!(stmts.child(1).find_first("block").is_none());
}

#[test]
fn nested_blocks_close_level_by_level() {
    let input = indoc! {"
        def a():
            def b():
                c = d;
            d = e;
        e = f;
    "};
    let ast = parser().parse(input).unwrap();

    let stmts = ast.root().child(0);
    assert_eq!(stmts.child_count(), 2);
    let outer = stmts.child(0).find_first("block").unwrap();
    // Outer block: inner def plus the dedented assignment.
    assert_eq!(outer.child(1).child_count(), 2);
}

#[test]
fn missing_indent_fails() {
    let input = indoc! {"
        def a():
        b = c;
    "};
    assert!(parser().parse(input).is_err());
}

#[test]
fn dedent_where_indent_expected_is_a_barrier_mismatch() {
    // A grammar that demands a second INDENT right where the tokenizer
    // emits a DEDENT.
    let mut b = GrammarBuilder::new();
    b.skip_whitespaces();
    b.indent_barriers("INDENT", "DEDENT");
    b.main_rule(
        "program",
        ascii_ident()
            .into_rule()
            .then(token_ref("INDENT"))
            .then(ascii_ident())
            .then(token_ref("INDENT"))
            .then(ascii_ident()),
    );
    let parser = b.build().unwrap();

    let input = indoc! {"
        a
            b
        c
    "};
    let failure = match parser.parse(input) {
        Err(crate::Error::Parse(failure)) => failure,
        other => panic!("expected failure, got {other:?}"),
    };
    assert!(failure.rendered.contains("INDENT"));
}

#[test]
fn blocks_survive_a_reparse() {
    let input = indoc! {"
        def a():
            b = c;
    "};
    let ast = parser().parse(input).unwrap();

    let edited = indoc! {"
        def a():
            b = c;
            d = e;
    "};
    let again = ast.reparsed(edited).unwrap();
    let block = again.root().child(0).child(0).find_first("block").unwrap();
    assert_eq!(block.child(1).child_count(), 2);
}
