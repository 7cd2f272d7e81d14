use std::sync::Arc;

use scanless_core::{
    ErrorHandling, IndentTokenizer, LocalSettings, Recovery, Setting, SkipStrategy,
    TokenPatternKind,
};

use crate::engine::run::parse_text;
use crate::engine::support::{TestGrammar, ident, lit};
use crate::rule::RuleKind;

#[test]
fn sequence_builds_children_in_order() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let b = g.token_rule(lit("b"));
    let seq = g.named_rule("pair", RuleKind::Sequence { children: vec![a, b] });
    let g = g.finish(seq);

    let ast = parse_text(&g, seq, "ab", None).unwrap();
    let root = ast.root();
    assert_eq!(root.rule_name(), Some("pair"));
    assert_eq!(root.child_count(), 2);
    assert_eq!(root.child(0).text(), "a");
    assert_eq!(root.child(1).text(), "b");
    assert_eq!(root.text(), "ab");
}

#[test]
fn sequence_failure_is_local() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let b = g.token_rule(lit("b"));
    let seq = g.rule(RuleKind::Sequence { children: vec![a, b] });
    let g = g.finish(seq);

    let failure = parse_text(&g, seq, "ax", None).unwrap_err();
    assert_eq!(failure.position, 1);
    assert_eq!(failure.expected, vec!["'b'".to_owned()]);
}

#[test]
fn choice_takes_the_first_success() {
    let mut g = TestGrammar::new();
    let long = g.token_rule(lit("ab"));
    let short = g.token_rule(lit("a"));
    let choice = g.rule(RuleKind::Choice {
        children: vec![short, long],
    });
    let g = g.finish(choice);

    let ast = parse_text(&g, choice, "ab", None).unwrap();
    assert_eq!(ast.root().text(), "a");
    // The winner is wrapped as the single child.
    assert_eq!(ast.root().child_count(), 1);
}

#[test]
fn optional_never_fails() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let opt = g.rule(RuleKind::Optional { child: a });
    let g = g.finish(opt);

    let ast = parse_text(&g, opt, "b", None).unwrap();
    assert_eq!(ast.root().length(), 0);
    assert_eq!(ast.root().child_count(), 0);

    let ast = parse_text(&g, opt, "a", None).unwrap();
    assert_eq!(ast.root().length(), 1);
}

#[test]
fn repeat_enforces_min() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let rep = g.rule(RuleKind::Repeat {
        child: a,
        min: 2,
        max: Some(3),
    });
    let g = g.finish(rep);

    assert!(parse_text(&g, rep, "a", None).is_err());
    let ast = parse_text(&g, rep, "aaaa", None).unwrap();
    // Capped at max; the fourth 'a' is left unconsumed.
    assert_eq!(ast.root().child_count(), 3);
    assert_eq!(ast.root().length(), 3);
}

#[test]
fn separated_repeat_keeps_separators_only_when_asked() {
    let mut g = TestGrammar::new();
    let item = g.token_rule(ident());
    let comma = g.token_rule(lit(","));
    let plain = g.rule(RuleKind::SeparatedRepeat {
        item,
        separator: comma,
        min: 1,
        max: None,
        allow_trailing: false,
        include_separators: false,
    });
    let with_seps = g.rule(RuleKind::SeparatedRepeat {
        item,
        separator: comma,
        min: 1,
        max: None,
        allow_trailing: false,
        include_separators: true,
    });
    let g = g.finish(plain);

    let ast = parse_text(&g, plain, "a,b,c", None).unwrap();
    assert_eq!(ast.root().child_count(), 3);

    let ast = parse_text(&g, with_seps, "a,b,c", None).unwrap();
    assert_eq!(ast.root().child_count(), 5);
}

#[test]
fn whitespace_skip_applies_per_child() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let b = g.token_rule(lit("b"));
    let seq = g.rule(RuleKind::Sequence { children: vec![a, b] });
    g.default_skip(SkipStrategy::whitespaces());
    let g = g.finish(seq);

    let ast = parse_text(&g, seq, "  a   b", None).unwrap();
    assert_eq!(ast.root().child(1).text(), "b");
    assert_eq!(ast.root().child(1).start(), 6);
}

#[test]
fn no_skip_override_is_scoped() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let b = g.token_rule(lit("b"));
    let tight = g.rule(RuleKind::Sequence { children: vec![a, b] });
    g.set_settings(
        tight,
        LocalSettings {
            skip: Setting::local(SkipStrategy::none()),
            ..LocalSettings::default()
        },
    );
    g.default_skip(SkipStrategy::whitespaces());
    let g = g.finish(tight);

    // The override applies to self and children: no whitespace allowed.
    assert!(parse_text(&g, tight, "a b", None).is_err());
    assert!(parse_text(&g, tight, "ab", None).is_ok());
}

#[test]
fn no_record_suppresses_errors() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    g.set_settings(
        a,
        LocalSettings {
            error_handling: Setting::local(ErrorHandling::NoRecord),
            ..LocalSettings::default()
        },
    );
    let g = g.finish(a);

    let failure = parse_text(&g, a, "x", None).unwrap_err();
    // Nothing was recorded; the fallback failure points at the start.
    assert!(failure.expected.is_empty());
}

#[test]
fn throw_halts_the_parse() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    let hard = g.token_rule(lit("!"));
    g.set_settings(
        hard,
        LocalSettings {
            error_handling: Setting::local_for_self(ErrorHandling::Throw),
            ..LocalSettings::default()
        },
    );
    // choice would normally try the second alternative; Throw forbids it.
    let fallback = g.token_rule(lit("x"));
    let first = g.rule(RuleKind::Sequence {
        children: vec![a, hard],
    });
    let choice = g.rule(RuleKind::Choice {
        children: vec![first, fallback],
    });
    let g = g.finish(choice);

    // 'a' matches, '!' fails with Throw: the parse halts instead of
    // falling through to the second alternative.
    let failure = parse_text(&g, choice, "a?", None).unwrap_err();
    assert_eq!(failure.position, 1);
}

#[test]
fn memoized_rules_replay_their_result() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("ab"));
    g.rule_mut(a).flags.memoize = true;
    let left = g.rule(RuleKind::Sequence {
        children: vec![a],
    });
    let seq_tail = g.token_rule(lit("!"));
    let with_tail = g.rule(RuleKind::Sequence {
        children: vec![a, seq_tail],
    });
    // Ordered choice: the first alternative parses `a` then fails, the
    // second re-parses `a` at the same position through the cache.
    let choice = g.rule(RuleKind::Choice {
        children: vec![with_tail, left],
    });
    let g = g.finish(choice);

    let ast = parse_text(&g, choice, "ab", None).unwrap();
    assert_eq!(ast.root().text(), "ab");
    // Memoization must be observationally invisible.
    assert_eq!(ast.root().child(0).child(0).text(), "ab");
}

#[test]
fn custom_rule_drives_its_children() {
    let mut g = TestGrammar::new();
    let num = g.token_rule(TokenPatternKind::Number {
        kind: scanless_core::NumberKind::Int,
        flags: scanless_core::NumberFlags::default(),
    });
    let plus = g.token_rule(lit("+"));
    // Left-folding addition chain: num ('+' num)*
    let chain = g.rule(RuleKind::Custom {
        children: vec![num, plus],
        parse: Arc::new(|p: &mut crate::engine::rules::CustomParse<'_, '_, '_>| {
            let start = p.position();
            let Some(first) = p.parse_child(0)? else {
                return Ok(None);
            };
            let mut kids = vec![first];
            loop {
                let mark = p.mark();
                let Some(op) = p.parse_child(1)? else {
                    break;
                };
                match p.parse_child(0)? {
                    Some(rhs) => {
                        kids.push(op);
                        kids.push(rhs);
                    }
                    None => {
                        p.rewind(mark);
                        break;
                    }
                }
            }
            Ok(Some(p.finish(start, kids)))
        }),
    });
    let g = g.finish(chain);

    let ast = parse_text(&g, chain, "1+2+3", None).unwrap();
    assert_eq!(ast.root().child_count(), 5);
    assert_eq!(ast.root().text(), "1+2+3");
    // Trailing operator is rewound, not consumed.
    let ast = parse_text(&g, chain, "1+2+", None).unwrap();
    assert_eq!(ast.root().text(), "1+2");
}

#[test]
fn barrier_tokens_match_through_the_virtual_stream() {
    let mut g = TestGrammar::new();
    let indent = g.named_token(
        "INDENT",
        TokenPatternKind::Barrier {
            name: "INDENT".to_owned(),
        },
    );
    let dedent = g.named_token(
        "DEDENT",
        TokenPatternKind::Barrier {
            name: "DEDENT".to_owned(),
        },
    );
    let indent_rule = g.rule(RuleKind::Token { token: indent });
    let dedent_rule = g.rule(RuleKind::Token { token: dedent });
    let word = g.token_rule(ident());
    let body = g.rule(RuleKind::Sequence {
        children: vec![word, indent_rule, word, dedent_rule, word],
    });
    g.default_skip(SkipStrategy::whitespaces());
    g.barriers(IndentTokenizer::new(indent, dedent));
    let g = g.finish(body);

    let ast = parse_text(&g, body, "a\n  b\nc", None).unwrap();
    assert_eq!(ast.root().child_count(), 5);
    // The indent marker is zero-length at 'b'.
    assert_eq!(ast.root().child(1).length(), 0);
    assert_eq!(ast.root().child(1).start(), 4);
}

#[test]
fn barrier_mismatch_is_reported() {
    let mut g = TestGrammar::new();
    let indent = g.named_token(
        "INDENT",
        TokenPatternKind::Barrier {
            name: "INDENT".to_owned(),
        },
    );
    let dedent = g.named_token(
        "DEDENT",
        TokenPatternKind::Barrier {
            name: "DEDENT".to_owned(),
        },
    );
    let indent_rule = g.rule(RuleKind::Token { token: indent });
    let word = g.token_rule(ident());
    // Expecting INDENT where the stream has a DEDENT pending.
    let body = g.rule(RuleKind::Sequence {
        children: vec![word, indent_rule, word, indent_rule, word],
    });
    g.default_skip(SkipStrategy::whitespaces());
    g.barriers(IndentTokenizer::new(indent, dedent));
    let g = g.finish(body);

    let failure = parse_text(&g, body, "a\n  b\nc", None).unwrap_err();
    assert!(failure.rendered.contains("INDENT"));
}

#[test]
fn barrier_blocks_real_tokens_from_crossing() {
    let mut g = TestGrammar::new();
    let indent = g.named_token(
        "INDENT",
        TokenPatternKind::Barrier {
            name: "INDENT".to_owned(),
        },
    );
    let dedent = g.named_token(
        "DEDENT",
        TokenPatternKind::Barrier {
            name: "DEDENT".to_owned(),
        },
    );
    let word = g.token_rule(ident());
    let pair = g.rule(RuleKind::Sequence {
        children: vec![word, word],
    });
    g.default_skip(SkipStrategy::whitespaces());
    g.barriers(IndentTokenizer::new(indent, dedent));
    let g = g.finish(pair);

    // The second word sits past an unconsumed INDENT: the parse must fail
    // rather than silently cross the barrier.
    assert!(parse_text(&g, pair, "a\n  b", None).is_err());
}

#[test]
fn recovery_skips_to_the_anchor_and_reparses() {
    let mut g = TestGrammar::new();
    let word = g.token_rule(ident());
    let eq = g.token_rule(lit("="));
    let num = g.token_rule(TokenPatternKind::Number {
        kind: scanless_core::NumberKind::Int,
        flags: scanless_core::NumberFlags::default(),
    });
    let semi = g.token_rule(lit(";"));
    let stmt = g.named_rule(
        "stmt",
        RuleKind::Sequence {
            children: vec![word, eq, num, semi],
        },
    );
    let semi_anchor = g.token_rule(lit(";"));
    g.set_recovery(stmt, Recovery::skip_after(semi_anchor));
    let program = g.rule(RuleKind::Repeat {
        child: stmt,
        min: 1,
        max: None,
    });
    g.default_skip(SkipStrategy::whitespaces());
    let g = g.finish(program);

    let input = "x = ; y = 1;";
    let ast = parse_text(&g, program, input, None).unwrap();

    // One statement node: the recovered re-parse of `y = 1;`.
    assert_eq!(ast.root().child_count(), 1);
    assert_eq!(ast.root().child(0).text(), "y = 1;");
    assert_eq!(ast.recovery_indices(), &[input.find(" y").unwrap()]);

    // Exactly one recovered error, at the gap where the number was missing.
    let errors = ast.recovered_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].position, input.find(';').unwrap());
}

#[test]
fn find_next_recovery_rescans_forward() {
    let mut g = TestGrammar::new();
    let num = g.token_rule(TokenPatternKind::Number {
        kind: scanless_core::NumberKind::Int,
        flags: scanless_core::NumberFlags::default(),
    });
    g.set_recovery(num, Recovery::find_next());
    let eof = g.token_rule(TokenPatternKind::Eof);
    let main = g.rule(RuleKind::Sequence {
        children: vec![num, eof],
    });
    let g = g.finish(main);

    let ast = parse_text(&g, main, "abc42", None).unwrap();
    assert_eq!(ast.root().child(0).text(), "42");
    assert_eq!(ast.recovery_indices(), &[3]);
}

#[test]
fn walk_trace_records_the_parse_path() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    g.rule_mut(a).flags.record_walk = true;
    let rep = g.rule(RuleKind::Repeat {
        child: a,
        min: 0,
        max: None,
    });
    g.rule_mut(rep).flags.record_walk = true;
    g.debug_mut().walk_trace = Some(64);
    let g = g.finish(rep);

    let failure = parse_text(&g, rep, "aa", None);
    // Successful parse: the trace is internal, but must not break parsing.
    assert!(failure.is_ok());
}

#[test]
fn stack_traces_attach_to_error_records() {
    let mut g = TestGrammar::new();
    let a = g.token_rule(lit("a"));
    g.rule_mut(a).flags.record_stack = true;
    let b = g.token_rule(lit("b"));
    g.rule_mut(b).flags.record_stack = true;
    let seq = g.named_rule("pair", RuleKind::Sequence { children: vec![a, b] });
    g.rule_mut(seq).flags.record_stack = true;
    let g = g.finish(seq);

    let failure = parse_text(&g, seq, "ax", None).unwrap_err();
    assert!(failure.rendered.contains("rule stack"));
}

#[test]
fn reparsed_runs_the_same_rule_again() {
    let mut g = TestGrammar::new();
    let word = g.token_rule(ident());
    let g = g.finish(word);

    let ast = parse_text(&g, word, "abc", None).unwrap();
    let again = ast.reparsed("xyz").unwrap();
    assert_eq!(again.root().text(), "xyz");
    assert!(ast.reparsed("1").is_err());
}
