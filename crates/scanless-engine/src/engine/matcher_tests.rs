use std::sync::Arc;

use scanless_core::{
    CharComparison, CharPredicate, ChoiceLookahead, LiteralTrie, NumberFlags, NumberKind,
    TableEscaping, TokenId, TokenPatternKind, Value,
};

use crate::engine::context::FurthestError;
use crate::engine::matcher::match_token;
use crate::engine::support::{TestGrammar, lit, lit_choice};
use crate::grammar::Grammar;

fn single(kind: TokenPatternKind) -> (Arc<Grammar>, TokenId) {
    let mut g = TestGrammar::new();
    let id = g.token(kind);
    let main = g.token_rule(TokenPatternKind::Eof);
    (g.finish(main), id)
}

fn try_match(
    g: &Grammar,
    id: TokenId,
    input: &str,
    pos: usize,
) -> Option<(usize, Option<Value>)> {
    let mut err = FurthestError::at(pos);
    match_token(g, id, input, pos, input.len(), None, true, &mut err)
        .map(|m| (m.length, m.value))
}

#[test]
fn literal_value_is_the_declared_text() {
    let (g, id) = single(TokenPatternKind::Literal {
        text: "let".to_owned(),
        comparison: CharComparison::IgnoreCase,
    });

    let (len, value) = try_match(&g, id, "LET x", 0).unwrap();
    assert_eq!(len, 3);
    // The declared literal, not the captured slice.
    assert_eq!(value, Some(Value::Str("let".to_owned())));
    assert_eq!(try_match(&g, id, "le", 0), None);
}

#[test]
fn literal_char_matches_one_char() {
    let (g, id) = single(TokenPatternKind::LiteralChar {
        ch: '+',
        comparison: CharComparison::Sensitive,
    });

    assert_eq!(
        try_match(&g, id, "+", 0),
        Some((1, Some(Value::Str("+".to_owned()))))
    );
    assert_eq!(try_match(&g, id, "-", 0), None);
}

#[test]
fn literal_choice_takes_the_longest_match() {
    let (g, id) = single(lit_choice(&["<", "<=", "<<="]));

    assert_eq!(
        try_match(&g, id, "<<= 1", 0).unwrap().1,
        Some(Value::Str("<<=".to_owned()))
    );
    assert_eq!(
        try_match(&g, id, "<= 1", 0).unwrap().1,
        Some(Value::Str("<=".to_owned()))
    );
}

#[test]
fn keyword_choice_checks_the_boundary() {
    let literals = vec!["if".to_owned(), "in".to_owned()];
    let trie = LiteralTrie::from_literals(&literals, CharComparison::Sensitive);
    let (g, id) = single(TokenPatternKind::KeywordChoice {
        literals,
        trie,
        prohibited: CharPredicate::ascii_ident_continue(),
    });

    assert_eq!(try_match(&g, id, "if (x)", 0).unwrap().0, 2);
    assert_eq!(try_match(&g, id, "iffy", 0), None);
}

#[test]
fn identifier_captures_its_slice() {
    let (g, id) = single(crate::engine::support::ident());

    assert_eq!(
        try_match(&g, id, "foo_1 bar", 0),
        Some((5, Some(Value::Str("foo_1".to_owned()))))
    );
    assert_eq!(try_match(&g, id, "1foo", 0), None);
}

#[test]
fn number_converts_to_the_target_type() {
    let (g, float) = single(TokenPatternKind::Number {
        kind: NumberKind::Float,
        flags: NumberFlags {
            allow_sign: true,
            allow_exponent: true,
        },
    });
    assert_eq!(
        try_match(&g, float, "-1.5e2", 0),
        Some((6, Some(Value::Float(-150.0))))
    );

    let (g, int) = single(TokenPatternKind::Number {
        kind: NumberKind::Int,
        flags: NumberFlags::default(),
    });
    assert_eq!(try_match(&g, int, "42", 0), Some((2, Some(Value::Int(42)))));
    // Fraction is not consumed by an integer number.
    assert_eq!(try_match(&g, int, "42.5", 0).unwrap().0, 2);
}

#[test]
fn number_overflow_fails_with_a_message() {
    let (g, id) = single(TokenPatternKind::Number {
        kind: NumberKind::Int,
        flags: NumberFlags::default(),
    });

    let mut err = FurthestError::at(0);
    let input = "99999999999999999999";
    assert!(match_token(&g, id, input, 0, input.len(), None, true, &mut err).is_none());
    assert_eq!(err.kind, crate::engine::context::ErrorKind::Overflow);
    assert_eq!(err.message.as_deref(), Some("number out of range"));
}

#[test]
fn integer_number_dispatches_on_base_prefix() {
    let (g, id) = single(TokenPatternKind::IntegerNumber {
        kind: NumberKind::Int,
        allow_sign: true,
        default_base: 10,
        base_prefixes: vec![('x', 16), ('b', 2), ('o', 8)],
        group_separator: Some('_'),
    });

    assert_eq!(try_match(&g, id, "0xff", 0), Some((4, Some(Value::Int(255)))));
    assert_eq!(try_match(&g, id, "0b101", 0), Some((5, Some(Value::Int(5)))));
    assert_eq!(
        try_match(&g, id, "1_000_000", 0),
        Some((9, Some(Value::Int(1_000_000))))
    );
    assert_eq!(try_match(&g, id, "-0o17", 0), Some((5, Some(Value::Int(-15)))));
    // A lone zero is a plain decimal zero, not a prefix.
    assert_eq!(try_match(&g, id, "0x", 0), Some((1, Some(Value::Int(0)))));
    // The separator must sit between digits.
    assert_eq!(try_match(&g, id, "1_", 0).unwrap().0, 1);
}

#[test]
fn regex_matches_anchored() {
    let regex = regex_automata::meta::Regex::new("[a-z]+[0-9]*").unwrap();
    let (g, id) = single(TokenPatternKind::Regex {
        pattern: "[a-z]+[0-9]*".to_owned(),
        regex,
    });

    assert_eq!(
        try_match(&g, id, "abc12 rest", 0),
        Some((5, Some(Value::Str("abc12".to_owned()))))
    );
    // Anchored: no match scanning ahead.
    assert_eq!(try_match(&g, id, "  abc", 0), None);
}

#[test]
fn escaped_text_unescapes_and_excludes_the_stop() {
    let strategy = TableEscaping::new(
        vec![
            ("\\\"".to_owned(), "\"".to_owned()),
            ("\\n".to_owned(), "\n".to_owned()),
        ],
        vec!["\"".to_owned()],
        CharComparison::Sensitive,
    );
    let (g, id) = single(TokenPatternKind::EscapedText {
        strategy: Arc::new(strategy),
        allow_empty: true,
        consume_stop: true,
    });

    let input = r#"a\"b\nc" rest"#;
    let (len, value) = try_match(&g, id, input, 0).unwrap();
    // The stop quote extends the length but never the value.
    assert_eq!(len, 8);
    assert_eq!(value, Some(Value::Str("a\"b\nc".to_owned())));
}

#[test]
fn text_until_scans_to_the_stop_token() {
    let mut g = TestGrammar::new();
    let stop = g.token(lit(";"));
    let id = g.token(TokenPatternKind::TextUntil {
        stop,
        allow_empty: false,
        consume_stop: true,
        fail_on_eof: false,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(
        try_match(&g, id, "abc; rest", 0),
        Some((4, Some(Value::Str("abc".to_owned()))))
    );
    // EOF also stops when fail_on_eof is off.
    assert_eq!(
        try_match(&g, id, "abc", 0),
        Some((3, Some(Value::Str("abc".to_owned()))))
    );
    assert_eq!(try_match(&g, id, ";", 0), None);
}

#[test]
fn sequence_passage_combines_child_values() {
    let mut g = TestGrammar::new();
    let a = g.token(lit("a"));
    let b = g.token(lit("b"));
    let id = g.token(TokenPatternKind::Sequence {
        children: vec![a, b],
        passage: Some(Arc::new(|values: Vec<Value>| {
            let joined: String = values
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("+");
            Value::Str(joined)
        })),
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(
        try_match(&g, id, "ab", 0),
        Some((2, Some(Value::Str("a+b".to_owned()))))
    );
    // Failure is local: nothing matched on a partial sequence.
    assert_eq!(try_match(&g, id, "ax", 0), None);
}

#[test]
fn choice_is_ordered() {
    let mut g = TestGrammar::new();
    let long = g.token(lit("ab"));
    let short = g.token(lit("a"));
    let id = g.token(TokenPatternKind::Choice {
        children: vec![short, long],
        lookahead: None,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    // "a" is declared first and wins even though "ab" also matches.
    assert_eq!(try_match(&g, id, "ab", 0).unwrap().0, 1);
}

#[test]
fn choice_lookahead_filters_candidates_in_order() {
    let mut g = TestGrammar::new();
    let plus = g.token(lit("+"));
    let minus = g.token(lit("-"));
    let word = g.token(crate::engine::support::ident());
    let lookahead = ChoiceLookahead::new(
        vec![('+', vec![0, 2]), ('-', vec![1, 2])],
        vec![2],
    );
    let id = g.token(TokenPatternKind::Choice {
        children: vec![plus, minus, word],
        lookahead: Some(lookahead),
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(
        try_match(&g, id, "-x", 0).unwrap().1,
        Some(Value::Str("-".to_owned()))
    );
    // 'z' is not in the table: only the fallback candidate is tried.
    assert_eq!(
        try_match(&g, id, "zed", 0).unwrap().1,
        Some(Value::Str("zed".to_owned()))
    );
    assert_eq!(try_match(&g, id, "?", 0), None);
}

#[test]
fn optional_and_repeat_never_move_backwards() {
    let mut g = TestGrammar::new();
    let a = g.token(lit("a"));
    let opt = g.token(TokenPatternKind::Optional { child: a });
    let rep = g.token(TokenPatternKind::Repeat {
        child: a,
        min: 2,
        max: None,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(try_match(&g, opt, "b", 0).unwrap().0, 0);
    assert_eq!(try_match(&g, opt, "a", 0).unwrap().0, 1);
    assert_eq!(try_match(&g, rep, "aaab", 0).unwrap().0, 3);
    assert_eq!(try_match(&g, rep, "ab", 0), None);
}

#[test]
fn separated_repeat_rewinds_a_dangling_separator() {
    let mut g = TestGrammar::new();
    let item = g.token(crate::engine::support::ident());
    let comma = g.token(lit(","));
    let id = g.token(TokenPatternKind::SeparatedRepeat {
        item,
        separator: comma,
        min: 1,
        max: None,
        allow_trailing: false,
        include_separators: false,
    });
    let trailing = g.token(TokenPatternKind::SeparatedRepeat {
        item,
        separator: comma,
        min: 1,
        max: None,
        allow_trailing: true,
        include_separators: false,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    // Without allow_trailing the dangling comma is rewound.
    assert_eq!(try_match(&g, id, "a,b,", 0).unwrap().0, 3);
    // With allow_trailing the separator is kept.
    assert_eq!(try_match(&g, trailing, "a,b,", 0).unwrap().0, 4);

    let (_, value) = try_match(&g, id, "a,b,c", 0).unwrap();
    assert_eq!(
        value,
        Some(Value::Array(vec![
            Value::Str("a".to_owned()),
            Value::Str("b".to_owned()),
            Value::Str("c".to_owned()),
        ]))
    );
}

#[test]
fn between_keeps_the_body_value() {
    let mut g = TestGrammar::new();
    let open = g.token(lit("("));
    let body = g.token(crate::engine::support::ident());
    let close = g.token(lit(")"));
    let id = g.token(TokenPatternKind::Between { open, body, close });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(
        try_match(&g, id, "(x)", 0),
        Some((3, Some(Value::Str("x".to_owned()))))
    );
}

#[test]
fn map_return_and_fail_if_transform_values() {
    let mut g = TestGrammar::new();
    let num = g.token(TokenPatternKind::Number {
        kind: NumberKind::Int,
        flags: NumberFlags::default(),
    });
    let doubled = g.token(TokenPatternKind::Map {
        child: num,
        map: Arc::new(|v: Value| Value::Int(v.as_int().unwrap_or(0) * 2)),
    });
    let unit = g.token(TokenPatternKind::Return {
        child: num,
        value: Value::Bool(true),
    });
    let nonzero = g.token(TokenPatternKind::FailIf {
        child: num,
        condition: Arc::new(|v: &Value| v.as_int() == Some(0)),
        message: "zero is not allowed".to_owned(),
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(try_match(&g, doubled, "21", 0).unwrap().1, Some(Value::Int(42)));
    assert_eq!(try_match(&g, unit, "7", 0).unwrap().1, Some(Value::Bool(true)));
    assert_eq!(try_match(&g, nonzero, "5", 0).unwrap().0, 1);

    let mut err = FurthestError::at(0);
    assert!(match_token(&g, nonzero, "0", 0, 1, None, true, &mut err).is_none());
    assert_eq!(err.message.as_deref(), Some("zero is not allowed"));
}

#[test]
fn capture_text_trims_by_chars() {
    let mut g = TestGrammar::new();
    let inner = g.token(lit("<<x>>"));
    let id = g.token(TokenPatternKind::CaptureText {
        child: inner,
        trim_start: 2,
        trim_end: 2,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    assert_eq!(
        try_match(&g, id, "<<x>>", 0),
        Some((5, Some(Value::Str("x".to_owned()))))
    );
}

#[test]
fn capture_text_without_trims_is_the_exact_slice() {
    let mut g = TestGrammar::new();
    let word = g.token(crate::engine::support::ident());
    let id = g.token(TokenPatternKind::CaptureText {
        child: word,
        trim_start: 0,
        trim_end: 0,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    let input = "hello world";
    let (len, value) = try_match(&g, id, input, 0).unwrap();
    assert_eq!(value, Some(Value::Str(input[..len].to_owned())));
}

#[test]
fn skip_whitespaces_counts_the_skipped_span() {
    let mut g = TestGrammar::new();
    let word = g.token(crate::engine::support::ident());
    let id = g.token(TokenPatternKind::SkipWhitespaces { child: word });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    let (len, value) = try_match(&g, id, "   abc", 0).unwrap();
    assert_eq!(len, 6);
    assert_eq!(value, Some(Value::Str("abc".to_owned())));
}

#[test]
fn cond_branches_on_the_parameter() {
    let mut g = TestGrammar::new();
    let yes = g.token(lit("yes"));
    let no = g.token(lit("no"));
    let id = g.token(TokenPatternKind::Cond {
        condition: Arc::new(|param: Option<&scanless_core::Param>| {
            param.and_then(|p| p.downcast_ref::<bool>()).copied() == Some(true)
        }),
        then_token: yes,
        else_token: Some(no),
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    let on: scanless_core::Param = Arc::new(true);
    let off: scanless_core::Param = Arc::new(false);
    let mut err = FurthestError::at(0);
    assert!(match_token(&g, id, "yes", 0, 3, Some(&on), true, &mut err).is_some());
    assert!(match_token(&g, id, "no", 0, 2, Some(&off), true, &mut err).is_some());
    assert!(match_token(&g, id, "yes", 0, 3, Some(&off), true, &mut err).is_none());
}

#[test]
fn eof_and_newline_are_position_checks() {
    let (g, eof) = single(TokenPatternKind::Eof);
    assert_eq!(try_match(&g, eof, "ab", 2), Some((0, None)));
    assert_eq!(try_match(&g, eof, "ab", 1), None);

    let (g, nl) = single(TokenPatternKind::Newline);
    assert_eq!(try_match(&g, nl, "\r\nx", 0).unwrap().0, 2);
    assert_eq!(try_match(&g, nl, "\nx", 0).unwrap().0, 1);
    assert_eq!(try_match(&g, nl, "x", 0), None);
}

#[test]
fn furthest_error_keeps_the_deepest_failure() {
    let mut g = TestGrammar::new();
    let a = g.token(lit("a"));
    let b = g.token(lit("b"));
    let seq = g.token(TokenPatternKind::Sequence {
        children: vec![a, b],
        passage: None,
    });
    let main = g.token_rule(TokenPatternKind::Eof);
    let g = g.finish(main);

    let mut err = FurthestError::at(0);
    assert!(match_token(&g, seq, "ax", 0, 2, None, true, &mut err).is_none());
    // The failure position is where 'b' was expected, not the sequence start.
    assert_eq!(err.position, 1);
    assert_eq!(err.token, Some(b));
}

#[test]
fn matches_respect_the_barrier_limit() {
    let (g, id) = single(lit("abc"));
    // The literal would match, but the limit cuts the window short.
    let mut err = FurthestError::at(0);
    assert!(match_token(&g, id, "abcdef", 0, 2, None, true, &mut err).is_none());

    let (g, ws) = single(TokenPatternKind::Whitespaces);
    let mut err = FurthestError::at(0);
    let m = match_token(&g, ws, "    x", 0, 2, None, true, &mut err).unwrap();
    assert_eq!(m.length, 2);
}
