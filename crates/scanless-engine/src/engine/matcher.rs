//! The scannerless token matcher.
//!
//! One dispatch over [`TokenPatternKind`]; every arm obeys the same
//! contract: a match starts exactly at `pos`, never extends past `limit`
//! (the barrier position), and failure reports into the threaded
//! [`FurthestError`] when it is at least as far as the furthest failure
//! seen. `want_value` lets combinators skip value assembly for matches whose
//! value nobody will read.

use regex_automata::Anchored;
use regex_automata::Input;

use scanless_core::{
    CharComparison, NumberFlags, NumberKind, Param, ParsedElement, TokenId, TokenPatternKind,
    Value,
};

use crate::engine::context::{ErrorKind, FurthestError};
use crate::grammar::Grammar;

/// Match one token pattern against `input[pos..limit]`.
pub(crate) fn match_token(
    g: &Grammar,
    id: TokenId,
    input: &str,
    pos: usize,
    limit: usize,
    param: Option<&Param>,
    want_value: bool,
    err: &mut FurthestError,
) -> Option<ParsedElement> {
    let pattern = g.token(id);
    let hidden = pattern.hidden;
    match &pattern.kind {
        TokenPatternKind::LiteralChar { ch, comparison } => {
            match input[pos..limit].chars().next() {
                Some(c) if comparison.chars_eq(c, *ch) => Some(element(
                    pos,
                    c.len_utf8(),
                    want_value.then(|| Value::Str(ch.to_string())),
                )),
                _ => fail(err, pos, id, hidden),
            }
        }

        TokenPatternKind::Literal { text, comparison } => {
            match match_literal(input, pos, limit, text, *comparison) {
                Some(len) => Some(element(pos, len, want_value.then(|| Value::Str(text.clone())))),
                None => fail(err, pos, id, hidden),
            }
        }

        TokenPatternKind::LiteralChoice { literals, trie } => {
            match trie.longest_match(input, pos, limit) {
                Some((payload, len)) if len > 0 => Some(element(
                    pos,
                    len,
                    want_value.then(|| Value::Str(literals[payload as usize].clone())),
                )),
                _ => fail(err, pos, id, hidden),
            }
        }

        TokenPatternKind::KeywordChoice {
            literals,
            trie,
            prohibited,
        } => match trie.longest_match(input, pos, limit) {
            Some((payload, len)) if len > 0 => {
                // Boundary check against the real input, not the barrier
                // window: a keyword split by a barrier is still a keyword.
                let next = input[pos + len..].chars().next();
                if next.is_some_and(|c| prohibited.test(c)) {
                    fail(err, pos, id, hidden)
                } else {
                    Some(element(
                        pos,
                        len,
                        want_value.then(|| Value::Str(literals[payload as usize].clone())),
                    ))
                }
            }
            _ => fail(err, pos, id, hidden),
        },

        TokenPatternKind::Char { class } => match input[pos..limit].chars().next() {
            Some(c) if class.test(c) => Some(element(pos, c.len_utf8(), None)),
            _ => fail(err, pos, id, hidden),
        },

        TokenPatternKind::RepeatChars { class, min, max } => {
            let mut len = 0usize;
            let mut count = 0usize;
            for c in input[pos..limit].chars() {
                if !class.test(c) || max.is_some_and(|m| count == m) {
                    break;
                }
                len += c.len_utf8();
                count += 1;
            }
            if count < *min {
                fail(err, pos + len, id, hidden)
            } else {
                Some(element(pos, len, None))
            }
        }

        TokenPatternKind::Identifier {
            start,
            cont,
            min_len,
            max_len,
        } => {
            let mut chars = input[pos..limit].chars();
            let Some(first) = chars.next().filter(|c| start.test(*c)) else {
                return fail(err, pos, id, hidden);
            };
            let mut len = first.len_utf8();
            let mut count = 1usize;
            for c in chars {
                if !cont.test(c) || max_len.is_some_and(|m| count == m) {
                    break;
                }
                len += c.len_utf8();
                count += 1;
            }
            if count < *min_len {
                return fail(err, pos + len, id, hidden);
            }
            Some(element(
                pos,
                len,
                want_value.then(|| Value::Str(input[pos..pos + len].to_owned())),
            ))
        }

        TokenPatternKind::Number { kind, flags } => {
            match_number(input, pos, limit, *kind, *flags, want_value, id, hidden, err)
        }

        TokenPatternKind::IntegerNumber {
            kind,
            allow_sign,
            default_base,
            base_prefixes,
            group_separator,
        } => match_integer(
            input,
            pos,
            limit,
            *kind,
            *allow_sign,
            *default_base,
            base_prefixes,
            *group_separator,
            want_value,
            id,
            hidden,
            err,
        ),

        TokenPatternKind::Regex { regex, .. } => {
            let search = Input::new(input).range(pos..limit).anchored(Anchored::Yes);
            match regex.search_half(&search) {
                Some(half) => {
                    let len = half.offset() - pos;
                    Some(element(
                        pos,
                        len,
                        want_value.then(|| Value::Str(input[pos..pos + len].to_owned())),
                    ))
                }
                None => fail(err, pos, id, hidden),
            }
        }

        TokenPatternKind::EscapedText {
            strategy,
            allow_empty,
            consume_stop,
        } => {
            let mut out = String::new();
            let mut cur = pos;
            let mut stop_len = 0usize;
            while cur < limit {
                if let Some(len) = strategy.try_stop(input, cur, limit) {
                    if *consume_stop {
                        stop_len = len;
                    }
                    break;
                }
                if let Some(len) = strategy.try_escape(input, cur, limit, &mut out) {
                    cur += len;
                    continue;
                }
                let c = input[cur..].chars().next().expect("position inside input");
                if want_value {
                    out.push(c);
                }
                cur += c.len_utf8();
            }
            if !allow_empty && cur == pos {
                return fail(err, pos, id, hidden);
            }
            Some(element(
                pos,
                (cur - pos) + stop_len,
                want_value.then(|| Value::Str(out)),
            ))
        }

        TokenPatternKind::Whitespaces => {
            let len = scan_while(input, pos, limit, char::is_whitespace);
            if len == 0 {
                fail(err, pos, id, hidden)
            } else {
                Some(element(pos, len, None))
            }
        }

        TokenPatternKind::Spaces => {
            let len = scan_while(input, pos, limit, |c| c == ' ' || c == '\t');
            if len == 0 {
                fail(err, pos, id, hidden)
            } else {
                Some(element(pos, len, None))
            }
        }

        TokenPatternKind::Newline => {
            let window = &input[pos..limit];
            if window.starts_with("\r\n") {
                Some(element(pos, 2, None))
            } else if window.starts_with('\n') || window.starts_with('\r') {
                Some(element(pos, 1, None))
            } else {
                fail(err, pos, id, hidden)
            }
        }

        TokenPatternKind::Eof => {
            if pos == input.len() {
                Some(element(pos, 0, None))
            } else {
                fail(err, pos, id, hidden)
            }
        }

        TokenPatternKind::AllText => Some(element(
            pos,
            limit - pos,
            want_value.then(|| Value::Str(input[pos..limit].to_owned())),
        )),

        // Barrier tokens never match raw characters; the rule layer matches
        // them against the virtual-token stream.
        TokenPatternKind::Barrier { .. } => {
            err.observe(pos, id, ErrorKind::BarrierMismatch, None, hidden);
            None
        }

        TokenPatternKind::Sequence { children, passage } => {
            let mut cur = pos;
            let collect = want_value && passage.is_some();
            let mut values = collect.then(|| Vec::with_capacity(children.len()));
            for &child in children {
                let m = match_token(g, child, input, cur, limit, param, collect, err)?;
                cur = m.end();
                if let Some(values) = &mut values {
                    values.push(m.value.unwrap_or_default());
                }
            }
            let value = match (values, passage) {
                (Some(values), Some(passage)) => Some(passage(values)),
                _ => None,
            };
            Some(ParsedElement {
                start: pos,
                length: cur - pos,
                value,
            })
        }

        TokenPatternKind::Choice {
            children,
            lookahead,
        } => {
            let candidates: &[u32] = match lookahead {
                Some(table) => match input[pos..limit].chars().next() {
                    Some(c) => table.candidates(c),
                    None => table.fallback(),
                },
                None => &[],
            };
            if lookahead.is_some() {
                for &i in candidates {
                    let child = children[i as usize];
                    if let Some(m) =
                        match_token(g, child, input, pos, limit, param, want_value, err)
                    {
                        return Some(m);
                    }
                }
                if candidates.is_empty() {
                    return fail(err, pos, id, hidden);
                }
                None
            } else {
                for &child in children {
                    if let Some(m) =
                        match_token(g, child, input, pos, limit, param, want_value, err)
                    {
                        return Some(m);
                    }
                }
                if children.is_empty() {
                    return fail(err, pos, id, hidden);
                }
                None
            }
        }

        TokenPatternKind::Optional { child } => {
            let mut probe = FurthestError::at(pos);
            match match_token(g, *child, input, pos, limit, param, want_value, &mut probe) {
                Some(m) => Some(m),
                None => Some(element(pos, 0, None)),
            }
        }

        TokenPatternKind::Repeat { child, min, max } => {
            let mut cur = pos;
            let mut count = 0usize;
            let mut values = want_value.then(Vec::new);
            loop {
                if max.is_some_and(|m| count == m) {
                    break;
                }
                let Some(m) = match_token(g, *child, input, cur, limit, param, want_value, err)
                else {
                    break;
                };
                let progressed = m.length > 0;
                cur = m.end();
                count += 1;
                if let Some(values) = &mut values {
                    values.push(m.value.unwrap_or_default());
                }
                if !progressed {
                    break;
                }
            }
            if count < *min {
                return None;
            }
            Some(ParsedElement {
                start: pos,
                length: cur - pos,
                value: values.map(Value::Array),
            })
        }

        TokenPatternKind::SeparatedRepeat {
            item,
            separator,
            min,
            max,
            allow_trailing,
            include_separators,
        } => {
            let mut cur = pos;
            let mut items = 0usize;
            let mut values = want_value.then(Vec::new);
            let want_sep = want_value && *include_separators;

            if let Some(m) = match_token(g, *item, input, cur, limit, param, want_value, err) {
                cur = m.end();
                items = 1;
                if let Some(values) = &mut values {
                    values.push(m.value.unwrap_or_default());
                }
                while !max.is_some_and(|m| items == m) {
                    let before = cur;
                    let Some(sep) =
                        match_token(g, *separator, input, cur, limit, param, want_sep, err)
                    else {
                        break;
                    };
                    cur = sep.end();
                    match match_token(g, *item, input, cur, limit, param, want_value, err) {
                        Some(next) => {
                            cur = next.end();
                            items += 1;
                            if let Some(values) = &mut values {
                                if *include_separators {
                                    values.push(sep.value.unwrap_or_default());
                                }
                                values.push(next.value.unwrap_or_default());
                            }
                            if cur == before {
                                break;
                            }
                        }
                        None => {
                            if *allow_trailing {
                                if let Some(values) = &mut values
                                    && *include_separators
                                {
                                    values.push(sep.value.unwrap_or_default());
                                }
                            } else {
                                cur = before;
                            }
                            break;
                        }
                    }
                }
            }

            if items < *min {
                return None;
            }
            Some(ParsedElement {
                start: pos,
                length: cur - pos,
                value: values.map(Value::Array),
            })
        }

        TokenPatternKind::Between { open, body, close } => {
            let a = match_token(g, *open, input, pos, limit, param, false, err)?;
            let b = match_token(g, *body, input, a.end(), limit, param, want_value, err)?;
            let c = match_token(g, *close, input, b.end(), limit, param, false, err)?;
            Some(ParsedElement {
                start: pos,
                length: c.end() - pos,
                value: b.value,
            })
        }

        TokenPatternKind::First { a, b } => {
            let first = match_token(g, *a, input, pos, limit, param, want_value, err)?;
            let second = match_token(g, *b, input, first.end(), limit, param, false, err)?;
            Some(ParsedElement {
                start: pos,
                length: second.end() - pos,
                value: first.value,
            })
        }

        TokenPatternKind::Second { a, b } => {
            let first = match_token(g, *a, input, pos, limit, param, false, err)?;
            let second = match_token(g, *b, input, first.end(), limit, param, want_value, err)?;
            Some(ParsedElement {
                start: pos,
                length: second.end() - pos,
                value: second.value,
            })
        }

        TokenPatternKind::Map { child, map } => {
            let m = match_token(g, *child, input, pos, limit, param, want_value, err)?;
            let value = want_value.then(|| map(m.value.unwrap_or_default()));
            Some(ParsedElement {
                start: pos,
                length: m.length,
                value,
            })
        }

        TokenPatternKind::Return { child, value } => {
            let m = match_token(g, *child, input, pos, limit, param, false, err)?;
            Some(ParsedElement {
                start: pos,
                length: m.length,
                value: want_value.then(|| value.clone()),
            })
        }

        TokenPatternKind::FailIf {
            child,
            condition,
            message,
        } => {
            // The condition needs the value even when the caller does not.
            let m = match_token(g, *child, input, pos, limit, param, true, err)?;
            let value = m.value.unwrap_or_default();
            if condition(&value) {
                err.observe(
                    pos,
                    id,
                    ErrorKind::TokenMatch,
                    Some(message.clone()),
                    hidden,
                );
                return None;
            }
            Some(ParsedElement {
                start: pos,
                length: m.length,
                value: want_value.then_some(value),
            })
        }

        TokenPatternKind::Cond {
            condition,
            then_token,
            else_token,
        } => {
            if condition(param) {
                match_token(g, *then_token, input, pos, limit, param, want_value, err)
            } else {
                match else_token {
                    Some(token) => {
                        match_token(g, *token, input, pos, limit, param, want_value, err)
                    }
                    None => fail(err, pos, id, hidden),
                }
            }
        }

        TokenPatternKind::SkipWhitespaces { child } => {
            let ws = scan_while(input, pos, limit, char::is_whitespace);
            let m = match_token(g, *child, input, pos + ws, limit, param, want_value, err)?;
            Some(ParsedElement {
                start: pos,
                length: ws + m.length,
                value: m.value,
            })
        }

        TokenPatternKind::CaptureText {
            child,
            trim_start,
            trim_end,
        } => {
            let m = match_token(g, *child, input, pos, limit, param, false, err)?;
            let value = want_value
                .then(|| Value::Str(trim_chars(&input[pos..m.end()], *trim_start, *trim_end)));
            Some(ParsedElement {
                start: pos,
                length: m.length,
                value,
            })
        }

        TokenPatternKind::TextUntil {
            stop,
            allow_empty,
            consume_stop,
            fail_on_eof,
        } => {
            let mut cur = pos;
            let mut stop_len = 0usize;
            loop {
                // Stop probes must not disturb furthest-error tracking.
                let mut probe = FurthestError::at(cur);
                if let Some(m) =
                    match_token(g, *stop, input, cur, limit, param, false, &mut probe)
                {
                    if *consume_stop {
                        stop_len = m.length;
                    }
                    break;
                }
                if cur >= limit {
                    if *fail_on_eof {
                        return fail(err, cur, id, hidden);
                    }
                    break;
                }
                cur += input[cur..].chars().next().expect("position inside input").len_utf8();
            }
            if !allow_empty && cur == pos {
                return fail(err, pos, id, hidden);
            }
            Some(ParsedElement {
                start: pos,
                length: (cur - pos) + stop_len,
                value: want_value.then(|| Value::Str(input[pos..cur].to_owned())),
            })
        }

        TokenPatternKind::Custom { matcher, .. } => {
            match matcher(input, pos, limit, param, want_value) {
                Some(m) => {
                    debug_assert_eq!(m.start, pos, "custom token must match at pos");
                    debug_assert!(m.end() <= limit, "custom token crossed the barrier");
                    Some(m)
                }
                None => fail(err, pos, id, hidden),
            }
        }
    }
}

#[inline]
fn element(start: usize, length: usize, value: Option<Value>) -> ParsedElement {
    ParsedElement {
        start,
        length,
        value,
    }
}

#[inline]
fn fail(
    err: &mut FurthestError,
    position: usize,
    token: TokenId,
    hidden: bool,
) -> Option<ParsedElement> {
    err.observe(position, token, ErrorKind::TokenMatch, None, hidden);
    None
}

/// Bytes matched by `text` as a prefix of `input[pos..limit]` under the
/// comparison, or `None`. Case-insensitive matching pairs characters, so
/// the consumed length may differ from the literal's byte length.
fn match_literal(
    input: &str,
    pos: usize,
    limit: usize,
    text: &str,
    comparison: CharComparison,
) -> Option<usize> {
    if comparison == CharComparison::Sensitive {
        return input[pos..limit].starts_with(text).then(|| text.len());
    }
    let mut consumed = 0usize;
    let mut window = input[pos..limit].chars();
    for expected in text.chars() {
        let c = window.next()?;
        if !comparison.chars_eq(c, expected) {
            return None;
        }
        consumed += c.len_utf8();
    }
    Some(consumed)
}

fn scan_while(input: &str, pos: usize, limit: usize, pred: impl Fn(char) -> bool) -> usize {
    let mut len = 0usize;
    for c in input[pos..limit].chars() {
        if !pred(c) {
            break;
        }
        len += c.len_utf8();
    }
    len
}

/// Remove `trim_start` chars from the front and `trim_end` from the back.
fn trim_chars(text: &str, trim_start: usize, trim_end: usize) -> String {
    let start = text
        .char_indices()
        .nth(trim_start)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let tail = &text[start..];
    let keep = tail.chars().count().saturating_sub(trim_end);
    let end = tail
        .char_indices()
        .nth(keep)
        .map(|(i, _)| i)
        .unwrap_or(tail.len());
    tail[..end].to_owned()
}

#[allow(clippy::too_many_arguments)]
fn match_number(
    input: &str,
    pos: usize,
    limit: usize,
    kind: NumberKind,
    flags: NumberFlags,
    want_value: bool,
    id: TokenId,
    hidden: bool,
    err: &mut FurthestError,
) -> Option<ParsedElement> {
    let window = &input[pos..limit];
    let bytes = window.as_bytes();
    let mut i = 0usize;
    let mut negative = false;

    if flags.allow_sign && i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        negative = bytes[i] == b'-';
        i += 1;
    }

    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return fail(err, pos, id, hidden);
    }

    if kind == NumberKind::Float {
        if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
        if flags.allow_exponent && i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                j += 1;
            }
            let exp_start = j;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > exp_start {
                i = j;
            }
        }
    }

    let text = &window[..i];
    let value = match kind {
        NumberKind::Float => match text.parse::<f64>() {
            Ok(v) => Value::Float(v),
            Err(_) => return fail(err, pos, id, hidden),
        },
        NumberKind::Int => match text.parse::<i64>() {
            Ok(v) => Value::Int(v),
            Err(_) => {
                err.observe(
                    pos,
                    id,
                    ErrorKind::Overflow,
                    Some("number out of range".to_owned()),
                    hidden,
                );
                return None;
            }
        },
        NumberKind::UInt => {
            if negative {
                return fail(err, pos, id, hidden);
            }
            match text.trim_start_matches('+').parse::<u64>() {
                Ok(v) => Value::UInt(v),
                Err(_) => {
                    err.observe(
                        pos,
                        id,
                        ErrorKind::Overflow,
                        Some("number out of range".to_owned()),
                        hidden,
                    );
                    return None;
                }
            }
        }
    };

    Some(element(pos, i, want_value.then_some(value)))
}

#[allow(clippy::too_many_arguments)]
fn match_integer(
    input: &str,
    pos: usize,
    limit: usize,
    kind: NumberKind,
    allow_sign: bool,
    default_base: u32,
    base_prefixes: &[(char, u32)],
    group_separator: Option<char>,
    want_value: bool,
    id: TokenId,
    hidden: bool,
    err: &mut FurthestError,
) -> Option<ParsedElement> {
    let window = &input[pos..limit];
    let mut negative = false;
    let mut consumed = 0usize;

    if allow_sign {
        if window.starts_with('+') {
            consumed += 1;
        } else if window.starts_with('-') {
            negative = true;
            consumed += 1;
        }
    }

    let mut base = default_base;
    // Base prefix: a leading `0`, the prefix character, and at least one
    // digit of the mapped base.
    let rest = &window[consumed..];
    if rest.starts_with('0')
        && let Some(prefix) = rest.chars().nth(1)
        && let Some(&(_, mapped)) = base_prefixes
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(&prefix))
        && rest
            .chars()
            .nth(2)
            .is_some_and(|c| c.to_digit(mapped).is_some())
    {
        base = mapped;
        consumed += 1 + prefix.len_utf8();
    }

    let digits = &window[consumed..];
    let mut acc: u64 = 0;
    let mut i = 0usize;
    let mut any_digit = false;
    let mut prev_digit = false;
    while i < digits.len() {
        let c = digits[i..].chars().next().expect("position inside input");
        if let Some(d) = c.to_digit(base) {
            acc = match acc
                .checked_mul(base as u64)
                .and_then(|v| v.checked_add(d as u64))
            {
                Some(v) => v,
                None => {
                    err.observe(
                        pos,
                        id,
                        ErrorKind::Overflow,
                        Some("integer literal out of range".to_owned()),
                        hidden,
                    );
                    return None;
                }
            };
            any_digit = true;
            prev_digit = true;
            i += c.len_utf8();
        } else if group_separator == Some(c) && prev_digit {
            // A separator must sit between digits.
            let next = digits[i + c.len_utf8()..].chars().next();
            if !next.is_some_and(|n| n.to_digit(base).is_some()) {
                break;
            }
            prev_digit = false;
            i += c.len_utf8();
        } else {
            break;
        }
    }
    consumed += i;

    if !any_digit {
        return fail(err, pos, id, hidden);
    }

    let overflow = |err: &mut FurthestError| {
        err.observe(
            pos,
            id,
            ErrorKind::Overflow,
            Some("integer literal out of range".to_owned()),
            hidden,
        );
    };
    let value = match kind {
        NumberKind::UInt => {
            if negative {
                return fail(err, pos, id, hidden);
            }
            Value::UInt(acc)
        }
        NumberKind::Int => {
            if negative {
                if acc > i64::MAX as u64 + 1 {
                    overflow(err);
                    return None;
                }
                Value::Int((acc as i128).wrapping_neg() as i64)
            } else {
                if acc > i64::MAX as u64 {
                    overflow(err);
                    return None;
                }
                Value::Int(acc as i64)
            }
        }
        NumberKind::Float => {
            let v = acc as f64;
            Value::Float(if negative { -v } else { v })
        }
    };

    Some(element(pos, consumed, want_value.then_some(value)))
}
