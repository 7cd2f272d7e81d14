//! Skip strategy execution.
//!
//! Every rule invocation runs its resolved skip strategy around the body.
//! Skip rules parse under the configure-for-skip contract: no error
//! recording and no skipping of their own children, so a skip rule can
//! never recurse into itself.
//!
//! A failed body attempt may leave the position mid-sequence; every retry
//! first rewinds to the position the attempt started from.

use scanless_core::{ErrorHandling, ResolvedSettings, SkipKind, SkipStrategy};

use crate::engine::context::{Halt, NodeIndex, ParseMark, ParserContext};
use crate::engine::rules;
use crate::grammar::Grammar;

type BodyResult = Result<Option<NodeIndex>, Halt>;

/// Run `body` under the skip strategy in `mine`.
pub(crate) fn with_skip<'i, F>(
    g: &Grammar,
    ctx: &mut ParserContext<'i>,
    mine: ResolvedSettings,
    mut body: F,
) -> BodyResult
where
    F: FnMut(&mut ParserContext<'i>) -> BodyResult,
{
    match mine.skip.kind {
        SkipKind::None => body(ctx),

        SkipKind::Whitespaces => {
            skip_whitespace(ctx, mine);
            body(ctx)
        }

        SkipKind::SkipBeforeParsing => {
            skip_once(g, ctx, mine)?;
            body(ctx)
        }

        SkipKind::SkipBeforeParsingGreedy => {
            skip_greedy(g, ctx, mine)?;
            body(ctx)
        }

        // Body first; one skip-and-retry on failure.
        SkipKind::SkipBeforeParsingLazy | SkipKind::TryParseThenSkip => {
            let entry = ctx.mark();
            if let Some(node) = body(ctx)? {
                return Ok(Some(node));
            }
            ctx.restore(entry);
            if !skip_once(g, ctx, mine)? {
                return Ok(None);
            }
            body(ctx)
        }

        SkipKind::TryParseThenSkipGreedy => {
            let entry = ctx.mark();
            if let Some(node) = body(ctx)? {
                return Ok(Some(node));
            }
            ctx.restore(entry);
            if !skip_greedy(g, ctx, mine)? {
                return Ok(None);
            }
            body(ctx)
        }

        // Alternate body and single skips until the body succeeds or the
        // skip stops advancing.
        SkipKind::TryParseThenSkipLazy => {
            let mut resume = ctx.mark();
            loop {
                if let Some(node) = body(ctx)? {
                    return Ok(Some(node));
                }
                ctx.restore(resume);
                if !skip_once(g, ctx, mine)? {
                    return Ok(None);
                }
                resume = ctx.mark();
            }
        }

        SkipKind::TryParseNonEmptyThenSkip
        | SkipKind::TryParseNonEmptyThenSkipGreedy
        | SkipKind::TryParseNonEmptyThenSkipLazy => {
            non_empty_variant(g, ctx, mine, &mut body)
        }
    }
}

/// The non-empty try-variants: a zero-length body success counts as "not
/// yet"; the earliest empty result is kept only when skipping and retrying
/// yield nothing better.
fn non_empty_variant<'i, F>(
    g: &Grammar,
    ctx: &mut ParserContext<'i>,
    mine: ResolvedSettings,
    body: &mut F,
) -> BodyResult
where
    F: FnMut(&mut ParserContext<'i>) -> BodyResult,
{
    let entry = ctx.mark();
    // An empty success plus the context state to restore if it wins.
    let mut empty_success: Option<(NodeIndex, ParseMark)> = None;

    match body(ctx)? {
        Some(node) if ctx.position > entry.position => return Ok(Some(node)),
        Some(node) => {
            empty_success = Some((node, ctx.mark()));
            ctx.restore(entry);
        }
        None => ctx.restore(entry),
    }

    match mine.skip.kind {
        SkipKind::TryParseNonEmptyThenSkip => {
            if skip_once(g, ctx, mine)? {
                let resume = ctx.mark();
                match body(ctx)? {
                    Some(node) if ctx.position > resume.position => return Ok(Some(node)),
                    Some(node) => {
                        let state = ctx.mark();
                        empty_success = empty_success.or(Some((node, state)));
                    }
                    None => {}
                }
            }
        }
        SkipKind::TryParseNonEmptyThenSkipGreedy => {
            if skip_greedy(g, ctx, mine)? {
                let resume = ctx.mark();
                match body(ctx)? {
                    Some(node) if ctx.position > resume.position => return Ok(Some(node)),
                    Some(node) => {
                        let state = ctx.mark();
                        empty_success = empty_success.or(Some((node, state)));
                    }
                    None => {}
                }
            }
        }
        SkipKind::TryParseNonEmptyThenSkipLazy => loop {
            if !skip_once(g, ctx, mine)? {
                break;
            }
            let resume = ctx.mark();
            match body(ctx)? {
                Some(node) if ctx.position > resume.position => return Ok(Some(node)),
                Some(node) => {
                    let state = ctx.mark();
                    empty_success = empty_success.or(Some((node, state)));
                    ctx.restore(resume);
                }
                None => ctx.restore(resume),
            }
        },
        _ => unreachable!("non-empty dispatch"),
    }

    match empty_success {
        Some((node, state)) => {
            ctx.restore(state);
            Ok(Some(node))
        }
        None => Ok(None),
    }
}

/// Built-in whitespace skipping, bounded by the barrier limit.
pub(crate) fn skip_whitespace(ctx: &mut ParserContext<'_>, mine: ResolvedSettings) {
    let limit = ctx.barrier_limit(mine.ignore_barriers);
    while ctx.position < limit {
        let c = ctx.input[ctx.position..]
            .chars()
            .next()
            .expect("position inside input");
        if !c.is_whitespace() {
            break;
        }
        ctx.position += c.len_utf8();
    }
}

/// Parse the skip rule once. Returns whether the position advanced.
pub(crate) fn skip_once(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    mine: ResolvedSettings,
) -> Result<bool, Halt> {
    let Some(rule) = mine.skip.rule else {
        return Ok(false);
    };
    let before = ctx.position;
    let settings = ResolvedSettings {
        skip: SkipStrategy::none(),
        error_handling: ErrorHandling::NoRecord,
        ignore_barriers: mine.ignore_barriers,
    };
    ctx.suppress_record += 1;
    let outcome = rules::parse_rule(g, rule, ctx, settings);
    ctx.suppress_record -= 1;
    Ok(outcome?.is_some() && ctx.position > before)
}

/// Parse the skip rule until it stops advancing. Returns whether any pass
/// advanced.
pub(crate) fn skip_greedy(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    mine: ResolvedSettings,
) -> Result<bool, Halt> {
    let mut advanced = false;
    while skip_once(g, ctx, mine)? {
        advanced = true;
    }
    Ok(advanced)
}
