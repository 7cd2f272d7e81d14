use crate::GrammarBuilder;
use crate::build::{ascii_ident, eof, int_num, lit, rule_ref};
use crate::builder::Recover;

/// Statement list recovering past `;` anchors.
fn parser() -> crate::Parser {
    let mut b = GrammarBuilder::new();
    b.skip_whitespaces();
    b.rule(
        "stmt",
        ascii_ident()
            .into_rule()
            .then(lit("="))
            .then(int_num())
            .then(lit(";"))
            .recover(Recover::skip_after(lit(";")).repeating()),
    );
    b.main_rule("program", rule_ref("stmt").zero_or_more().then(eof()));
    b.build().unwrap()
}

#[test]
fn failed_statement_recovers_after_the_anchor() {
    let input = "x = ; y = 1;";
    let ast = parser().parse(input).unwrap();

    // The failed first statement was re-parsed as `y = 1;`.
    let stmts = ast.root().child(0);
    assert_eq!(stmts.child_count(), 1);
    assert_eq!(stmts.child(0).text(), "y = 1;");

    // Exactly one recovered error, at the gap where the number is missing.
    let errors = ast.recovered_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].position, input.find(';').unwrap());
    assert_eq!(ast.recovery_indices().len(), 1);
}

#[test]
fn clean_input_has_no_recovered_errors() {
    let ast = parser().parse("x = 1; y = 2;").unwrap();

    assert_eq!(ast.root().child(0).child_count(), 2);
    assert!(ast.recovered_errors().is_empty());
    assert!(ast.recovery_indices().is_empty());
}

#[test]
fn recovery_can_repeat_across_statements() {
    let input = "x = ; z = ; y = 3;";
    let ast = parser().parse(input).unwrap();

    let stmts = ast.root().child(0);
    assert_eq!(stmts.child_count(), 1);
    assert_eq!(stmts.child(0).text(), "y = 3;");
    // Recovery entered twice before a statement parsed.
    assert!(!ast.recovery_indices().is_empty());
}

#[test]
fn unrecoverable_input_still_fails() {
    // No anchor anywhere: recovery scans to the end and gives up.
    assert!(parser().parse("x = garbage").is_err());
}

#[test]
fn stop_rule_aborts_the_scan() {
    let build = |with_stop: bool| {
        let mut b = GrammarBuilder::new();
        b.skip_whitespaces();
        let mut recover = Recover::skip_after(lit(";"));
        if with_stop {
            recover = recover.until(lit("}"));
        }
        b.rule(
            "stmt",
            ascii_ident()
                .into_rule()
                .then(lit("="))
                .then(int_num())
                .then(lit(";"))
                .recover(recover),
        );
        b.main_rule("program", rule_ref("stmt").zero_or_more().then(eof()));
        b.build().unwrap()
    };

    // Without the stop, recovery scans across the `}` to the `;` anchor
    // and re-parses the tail statement. With it, the `}` aborts the scan.
    let input = "x = } ; y = 1;";
    assert!(build(false).parse(input).is_ok());
    assert!(build(true).parse(input).is_err());
}
