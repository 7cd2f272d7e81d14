//! Error recovery.
//!
//! When a rule with a recovery strategy fails inside a sequence or
//! repetition, the engine scans forward for a position where the rule
//! parses again. Error recording stays off for the whole scan; on success
//! the resume position is pushed onto the context's recovery indices, which
//! bound the relevance windows during error reporting.

use scanless_core::{Recovery, RecoveryKind, ResolvedSettings, RuleId};

use crate::engine::context::{Halt, NodeIndex, ParserContext};
use crate::engine::rules;
use crate::grammar::Grammar;

/// Attempt recovery for `failed` at the current position. Returns the
/// recovered node, or `None` when no resume point was found.
pub(crate) fn attempt(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    failed: RuleId,
    settings: ResolvedSettings,
    recovery: Recovery,
) -> Result<Option<NodeIndex>, Halt> {
    let origin = ctx.mark();
    ctx.suppress_record += 1;
    let outcome = scan(g, ctx, failed, settings, recovery, origin.position);
    ctx.suppress_record -= 1;

    match outcome? {
        Some((node, resume)) => {
            ctx.recovery_indices.push(resume);
            Ok(Some(node))
        }
        None => {
            ctx.restore(origin);
            Ok(None)
        }
    }
}

fn scan(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    failed: RuleId,
    settings: ResolvedSettings,
    recovery: Recovery,
    origin: usize,
) -> Result<Option<(NodeIndex, usize)>, Halt> {
    match recovery.kind {
        RecoveryKind::None => Ok(None),

        RecoveryKind::FindNext | RecoveryKind::FindNextUntil => {
            let mut pos = next_char(ctx.input, origin);
            while pos <= ctx.max_position {
                if let Some(stop) = recovery.stop
                    && probe(g, ctx, stop, settings, pos)?.is_some()
                {
                    return Ok(None);
                }
                if let Some(node) = try_parse_at(g, ctx, failed, settings, pos)? {
                    return Ok(Some((node, pos)));
                }
                pos = next_char(ctx.input, pos);
            }
            Ok(None)
        }

        RecoveryKind::SkipUntilAnchor | RecoveryKind::SkipAfterAnchor => {
            let Some(anchor) = recovery.anchor else {
                return Ok(None);
            };
            let mut pos = origin;
            while pos <= ctx.max_position {
                if let Some(stop) = recovery.stop
                    && probe(g, ctx, stop, settings, pos)?.is_some()
                {
                    return Ok(None);
                }
                if let Some(anchor_len) = probe(g, ctx, anchor, settings, pos)? {
                    let resume = if recovery.kind == RecoveryKind::SkipAfterAnchor {
                        pos + anchor_len
                    } else {
                        pos
                    };
                    if let Some(node) = try_parse_at(g, ctx, failed, settings, resume)? {
                        return Ok(Some((node, resume)));
                    }
                    if !recovery.repeat {
                        return Ok(None);
                    }
                    // Re-enter past this anchor, always making progress.
                    pos = (pos + anchor_len).max(next_char(ctx.input, pos));
                    continue;
                }
                pos = next_char(ctx.input, pos);
            }
            Ok(None)
        }
    }
}

/// Parse `rule` at `pos` and keep the result on success.
fn try_parse_at(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    rule: RuleId,
    settings: ResolvedSettings,
    pos: usize,
) -> Result<Option<NodeIndex>, Halt> {
    ctx.position = pos;
    // A forward jump may have crossed unconsumed virtual tokens;
    // resynchronize without ever rewinding the consumption count.
    ctx.passed_barriers = ctx.passed_barriers.max(ctx.barriers.passed_before(pos));
    rules::parse_rule(g, rule, ctx, settings)
}

/// Parse `rule` at `pos` without keeping anything; returns the match
/// length.
fn probe(
    g: &Grammar,
    ctx: &mut ParserContext<'_>,
    rule: RuleId,
    settings: ResolvedSettings,
    pos: usize,
) -> Result<Option<usize>, Halt> {
    let saved = ctx.mark();
    let barriers = ctx.passed_barriers;
    ctx.position = pos;
    ctx.passed_barriers = barriers.max(ctx.barriers.passed_before(pos));
    let outcome = rules::parse_rule(g, rule, ctx, settings)?;
    let length = outcome.map(|node| ctx.node(node).length as usize);
    ctx.restore(saved);
    Ok(length)
}

fn next_char(input: &str, pos: usize) -> usize {
    match input[pos.min(input.len())..].chars().next() {
        Some(c) => pos + c.len_utf8(),
        None => pos + 1,
    }
}
