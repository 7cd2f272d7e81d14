//! Matching-metadata analysis.
//!
//! First-character sets, determinism, and optionality are derived bottom-up
//! from the compiled token table. Cycles through named references are
//! handled by fixpoint iteration: everything starts unknown (a safe
//! over-approximation) and only tightens while the table keeps changing.
//!
//! Choice patterns with at least one deterministic alternative additionally
//! get a per-character candidate table; the filter is an optimization only,
//! since non-deterministic alternatives are always retained as fallback.

use scanless_core::{
    CharComparison, ChoiceLookahead, FirstChars, MatchMeta, TokenPattern, TokenPatternKind,
};

pub(crate) fn compute_metas(tokens: &mut [TokenPattern]) {
    // Each round only refines; the table size bounds the iteration depth.
    for _ in 0..tokens.len().max(1) {
        let mut changed = false;
        for i in 0..tokens.len() {
            let meta = derive_meta(tokens, i);
            if meta != tokens[i].meta {
                tokens[i].meta = meta;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

fn derive_meta(tokens: &[TokenPattern], index: usize) -> MatchMeta {
    let meta_of = |id: scanless_core::TokenId| &tokens[id.index()].meta;
    match &tokens[index].kind {
        TokenPatternKind::LiteralChar { ch, comparison } => MatchMeta {
            first: literal_first(*ch, *comparison),
            optional: false,
        },
        TokenPatternKind::Literal { text, comparison } => MatchMeta {
            first: text
                .chars()
                .next()
                .map(|c| literal_first(c, *comparison))
                .unwrap_or_default(),
            optional: false,
        },
        TokenPatternKind::LiteralChoice { trie, .. }
        | TokenPatternKind::KeywordChoice { trie, .. } => {
            let mut chars: Vec<char> = Vec::new();
            for c in trie.first_chars() {
                chars.push(c);
                if trie.comparison() == CharComparison::IgnoreCase {
                    chars.extend(c.to_uppercase());
                }
            }
            MatchMeta {
                first: FirstChars::exact(chars),
                optional: false,
            }
        }
        TokenPatternKind::Char { .. } => MatchMeta::default(),
        TokenPatternKind::RepeatChars { min, .. } => MatchMeta {
            first: FirstChars::unknown(),
            optional: *min == 0,
        },
        TokenPatternKind::Identifier { min_len, .. } => MatchMeta {
            first: FirstChars::unknown(),
            optional: *min_len == 0,
        },
        TokenPatternKind::Number { flags, .. } => MatchMeta {
            first: number_first(flags.allow_sign),
            optional: false,
        },
        TokenPatternKind::IntegerNumber { allow_sign, .. } => MatchMeta {
            first: number_first(*allow_sign),
            optional: false,
        },
        TokenPatternKind::Regex { .. } => MatchMeta::default(),
        TokenPatternKind::EscapedText { allow_empty, .. } => MatchMeta {
            first: FirstChars::unknown(),
            optional: *allow_empty,
        },
        TokenPatternKind::Whitespaces => MatchMeta::default(),
        TokenPatternKind::Spaces => MatchMeta {
            first: FirstChars::exact([' ', '\t']),
            optional: false,
        },
        TokenPatternKind::Newline => MatchMeta {
            first: FirstChars::exact(['\n', '\r']),
            optional: false,
        },
        TokenPatternKind::Eof | TokenPatternKind::AllText | TokenPatternKind::Barrier { .. } => {
            MatchMeta {
                first: FirstChars::unknown(),
                optional: true,
            }
        }
        TokenPatternKind::Sequence { children, .. } => {
            sequence_meta(children.iter().map(|c| meta_of(*c)))
        }
        TokenPatternKind::Choice { children, .. } => {
            let mut first = FirstChars::exact(None::<char>);
            let mut optional = false;
            for child in children {
                let meta = meta_of(*child);
                first = first.union(&meta.first);
                optional |= meta.optional;
            }
            MatchMeta { first, optional }
        }
        TokenPatternKind::Optional { child } => MatchMeta {
            first: meta_of(*child).first.relaxed(),
            optional: true,
        },
        TokenPatternKind::Repeat { child, min, .. } => {
            let child = meta_of(*child);
            MatchMeta {
                first: if *min == 0 {
                    child.first.relaxed()
                } else {
                    child.first.clone()
                },
                optional: *min == 0 || child.optional,
            }
        }
        TokenPatternKind::SeparatedRepeat { item, min, .. } => {
            let item = meta_of(*item);
            MatchMeta {
                first: if *min == 0 {
                    item.first.relaxed()
                } else {
                    item.first.clone()
                },
                optional: *min == 0 || item.optional,
            }
        }
        TokenPatternKind::Between { open, body, close } => {
            sequence_meta([meta_of(*open), meta_of(*body), meta_of(*close)])
        }
        TokenPatternKind::First { a, b } | TokenPatternKind::Second { a, b } => {
            sequence_meta([meta_of(*a), meta_of(*b)])
        }
        TokenPatternKind::Map { child, .. }
        | TokenPatternKind::Return { child, .. }
        | TokenPatternKind::FailIf { child, .. }
        | TokenPatternKind::CaptureText { child, .. } => meta_of(*child).clone(),
        TokenPatternKind::Cond {
            then_token,
            else_token,
            ..
        } => {
            let then_meta = meta_of(*then_token);
            match else_token {
                Some(else_token) => {
                    let else_meta = meta_of(*else_token);
                    MatchMeta {
                        first: then_meta.first.union(&else_meta.first),
                        optional: then_meta.optional || else_meta.optional,
                    }
                }
                None => MatchMeta {
                    first: then_meta.first.relaxed(),
                    optional: then_meta.optional,
                },
            }
        }
        TokenPatternKind::SkipWhitespaces { child } => MatchMeta {
            first: FirstChars::unknown(),
            optional: meta_of(*child).optional,
        },
        TokenPatternKind::TextUntil { allow_empty, .. } => MatchMeta {
            first: FirstChars::unknown(),
            optional: *allow_empty,
        },
        TokenPatternKind::Custom { .. } => MatchMeta {
            first: FirstChars::unknown(),
            optional: true,
        },
    }
}

/// Metadata of children matched in order: union first sets while children
/// may match empty, stop at the first required child.
fn sequence_meta<'a>(children: impl IntoIterator<Item = &'a MatchMeta>) -> MatchMeta {
    let mut first = FirstChars::exact(None::<char>);
    let mut all_optional = true;
    for child in children {
        first = first.union(&child.first);
        if !child.optional {
            all_optional = false;
            break;
        }
    }
    if all_optional {
        first = first.relaxed();
    }
    MatchMeta {
        first,
        optional: all_optional,
    }
}

fn literal_first(c: char, comparison: CharComparison) -> FirstChars {
    match comparison {
        CharComparison::Sensitive => FirstChars::exact([c]),
        CharComparison::IgnoreCase => {
            FirstChars::exact(c.to_lowercase().chain(c.to_uppercase()))
        }
    }
}

fn number_first(allow_sign: bool) -> FirstChars {
    let mut chars: Vec<char> = ('0'..='9').collect();
    if allow_sign {
        chars.push('+');
        chars.push('-');
    }
    FirstChars::exact(chars)
}

/// Build per-character candidate tables for choices with at least one
/// deterministic alternative.
pub(crate) fn build_lookaheads(tokens: &mut [TokenPattern]) {
    let mut updates: Vec<(usize, ChoiceLookahead)> = Vec::new();

    for (i, pattern) in tokens.iter().enumerate() {
        let TokenPatternKind::Choice { children, .. } = &pattern.kind else {
            continue;
        };
        let metas: Vec<&MatchMeta> = children.iter().map(|c| &tokens[c.index()].meta).collect();
        let deterministic: Vec<bool> = metas
            .iter()
            .map(|m| m.first.is_deterministic() && !m.optional && !m.first.chars().is_empty())
            .collect();
        if !deterministic.contains(&true) {
            continue;
        }

        let fallback: Vec<u32> = deterministic
            .iter()
            .enumerate()
            .filter(|(_, det)| !**det)
            .map(|(pos, _)| pos as u32)
            .collect();

        let mut chars: Vec<char> = metas
            .iter()
            .zip(&deterministic)
            .filter(|(_, det)| **det)
            .flat_map(|(m, _)| m.first.chars().iter().copied())
            .collect();
        chars.sort_unstable();
        chars.dedup();

        let by_char: Vec<(char, Vec<u32>)> = chars
            .into_iter()
            .map(|c| {
                let candidates: Vec<u32> = metas
                    .iter()
                    .zip(&deterministic)
                    .enumerate()
                    .filter(|(_, (m, det))| !**det || m.first.contains(c))
                    .map(|(pos, _)| pos as u32)
                    .collect();
                (c, candidates)
            })
            .collect();

        updates.push((i, ChoiceLookahead::new(by_char, fallback)));
    }

    for (i, lookahead) in updates {
        if let TokenPatternKind::Choice {
            lookahead: slot, ..
        } = &mut tokens[i].kind
        {
            *slot = Some(lookahead);
        }
    }
}
