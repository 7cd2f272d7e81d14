//! The rule parser.
//!
//! `parse_rule` drives one rule invocation: resolve settings against the
//! inherited ones, consult the memo cache, run the skip strategy, dispatch
//! on the rule kind, then record errors and try recovery as configured.
//! Failure restores the entry position; the node arena is append-only, so
//! abandoned nodes are simply never referenced again.

use std::sync::Arc;

use scanless_core::{
    ErrorHandling, Recovery, ResolvedSettings, RuleId, TokenId, TokenPatternKind,
};

use crate::engine::cache::MemoEntry;
use crate::engine::context::{
    ErrorElement, ErrorKind, ErrorRecord, FurthestError, Halt, NodeIndex, ParseMark,
    ParserContext,
};
use crate::engine::matcher;
use crate::engine::recovery;
use crate::engine::skip;
use crate::engine::trace::{StackFrame, WalkStep};
use crate::grammar::Grammar;
use crate::rule::{RuleDef, RuleKind};

type ParseResult = Result<Option<NodeIndex>, Halt>;

/// Parse one rule at the current position.
pub(crate) fn parse_rule(
    g: &Grammar,
    id: RuleId,
    ctx: &mut ParserContext<'_>,
    inherited: ResolvedSettings,
) -> ParseResult {
    let rule = g.rule(id);
    let (mine, for_children) = rule.settings.resolve(inherited);
    let entry = ctx.mark();

    if rule.flags.record_walk {
        ctx.walk_push(WalkStep::Enter, id, entry.position);
    }

    if rule.flags.memoize
        && let Some(hit) = ctx
            .cache
            .get(id, entry.position, entry.barriers, mine)
    {
        return Ok(apply_memo(ctx, rule, entry, hit));
    }

    let saved_stack = if rule.flags.record_stack {
        let saved = ctx.stack.clone();
        ctx.stack = Some(Arc::new(StackFrame {
            rule: id,
            position: entry.position,
            parent: saved.clone(),
        }));
        Some(saved)
    } else {
        None
    };

    let outcome = skip::with_skip(g, ctx, mine, |ctx| {
        parse_body(g, rule, ctx, mine, for_children)
    });

    if let Some(saved) = saved_stack {
        ctx.stack = saved;
    }

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(halt) => return Err(halt),
    };

    match outcome {
        Some(node) => {
            if rule.flags.memoize {
                ctx.cache.insert(
                    id,
                    entry.position,
                    entry.barriers,
                    mine,
                    MemoEntry::Success {
                        node,
                        end: ctx.position,
                        barriers_after: ctx.passed_barriers,
                    },
                );
            }
            if rule.flags.record_walk {
                ctx.walk_push(WalkStep::Success, id, ctx.position);
            }
            Ok(Some(node))
        }
        None => {
            ctx.restore(entry);
            if rule.flags.memoize {
                ctx.cache
                    .insert(id, entry.position, entry.barriers, mine, MemoEntry::Fail);
            }
            if rule.flags.record_walk {
                ctx.walk_push(WalkStep::Fail, id, entry.position);
            }
            if mine.error_handling == ErrorHandling::Throw {
                return Err(Halt {
                    record: rule_error(ctx, rule, entry.position),
                });
            }
            Ok(None)
        }
    }
}

fn apply_memo(
    ctx: &mut ParserContext<'_>,
    rule: &RuleDef,
    entry: ParseMark,
    hit: MemoEntry,
) -> Option<NodeIndex> {
    match hit {
        MemoEntry::Fail => {
            if rule.flags.record_walk {
                ctx.walk_push(WalkStep::Fail, rule.id, entry.position);
            }
            None
        }
        MemoEntry::Success {
            node,
            end,
            barriers_after,
        } => {
            ctx.position = end;
            ctx.passed_barriers = barriers_after;
            if rule.flags.record_walk {
                ctx.walk_push(WalkStep::Success, rule.id, end);
            }
            Some(node)
        }
    }
}

fn parse_body(
    g: &Grammar,
    rule: &RuleDef,
    ctx: &mut ParserContext<'_>,
    mine: ResolvedSettings,
    for_children: ResolvedSettings,
) -> ParseResult {
    match &rule.kind {
        RuleKind::Token { token } => parse_token_rule(g, rule, *token, ctx, mine),

        RuleKind::Sequence { children } => {
            let start = ctx.position;
            let mut kids = Vec::with_capacity(children.len());
            for &child in children {
                match parse_child(g, child, ctx, for_children)? {
                    Some(node) => kids.push(node),
                    None => return Ok(None),
                }
            }
            let barriers = ctx.passed_barriers;
            Ok(Some(ctx.push_node(
                rule.id,
                start,
                ctx.position - start,
                barriers,
                &kids,
                None,
            )))
        }

        RuleKind::Choice { children } => {
            let mark = ctx.mark();
            for &child in children {
                if let Some(node) = parse_rule(g, child, ctx, for_children)? {
                    let barriers = ctx.passed_barriers;
                    let start = ctx.node(node).start as usize;
                    return Ok(Some(ctx.push_node(
                        rule.id,
                        start,
                        ctx.position - start,
                        barriers,
                        &[node],
                        None,
                    )));
                }
                ctx.restore(mark);
            }
            Ok(None)
        }

        RuleKind::Optional { child } => {
            let mark = ctx.mark();
            match parse_rule(g, *child, ctx, for_children)? {
                Some(node) => {
                    let barriers = ctx.passed_barriers;
                    let start = ctx.node(node).start as usize;
                    Ok(Some(ctx.push_node(
                        rule.id,
                        start,
                        ctx.position - start,
                        barriers,
                        &[node],
                        None,
                    )))
                }
                None => {
                    ctx.restore(mark);
                    Ok(Some(ctx.push_node(
                        rule.id,
                        mark.position,
                        0,
                        mark.barriers,
                        &[],
                        None,
                    )))
                }
            }
        }

        RuleKind::Repeat { child, min, max } => {
            let start = ctx.position;
            let mut kids = Vec::new();
            loop {
                if max.is_some_and(|m| kids.len() == m) {
                    break;
                }
                let mark = ctx.mark();
                match parse_child(g, *child, ctx, for_children)? {
                    Some(node) => {
                        let progressed = ctx.position > mark.position;
                        kids.push(node);
                        if !progressed {
                            break;
                        }
                    }
                    None => {
                        ctx.restore(mark);
                        break;
                    }
                }
            }
            if kids.len() < *min {
                return Ok(None);
            }
            let barriers = ctx.passed_barriers;
            Ok(Some(ctx.push_node(
                rule.id,
                start,
                ctx.position - start,
                barriers,
                &kids,
                None,
            )))
        }

        RuleKind::SeparatedRepeat {
            item,
            separator,
            min,
            max,
            allow_trailing,
            include_separators,
        } => {
            let start = ctx.position;
            let mut kids = Vec::new();
            let mut items = 0usize;

            if let Some(node) = parse_child(g, *item, ctx, for_children)? {
                kids.push(node);
                items = 1;
                while !max.is_some_and(|m| items == m) {
                    let mark = ctx.mark();
                    let Some(sep) = parse_rule(g, *separator, ctx, for_children)? else {
                        break;
                    };
                    match parse_child(g, *item, ctx, for_children)? {
                        Some(node) => {
                            if *include_separators {
                                kids.push(sep);
                            }
                            kids.push(node);
                            items += 1;
                            if ctx.position == mark.position {
                                break;
                            }
                        }
                        None => {
                            if *allow_trailing {
                                // Keep the separator and stop.
                                if *include_separators {
                                    kids.push(sep);
                                }
                            } else {
                                ctx.restore(mark);
                            }
                            break;
                        }
                    }
                }
            }

            if items < *min {
                return Ok(None);
            }
            let barriers = ctx.passed_barriers;
            Ok(Some(ctx.push_node(
                rule.id,
                start,
                ctx.position - start,
                barriers,
                &kids,
                None,
            )))
        }

        RuleKind::Custom { children, parse } => {
            let mut driver = CustomParse {
                grammar: g,
                ctx: &mut *ctx,
                rule: rule.id,
                children,
                child_settings: for_children,
            };
            match parse(&mut driver)? {
                Some(node) => Ok(Some(node)),
                None => {
                    if mine.error_handling == ErrorHandling::Record {
                        let record = rule_error(ctx, rule, ctx.position);
                        ctx.record(record);
                    }
                    Ok(None)
                }
            }
        }
    }
}

/// Parse a sequence/repetition child, falling back to its recovery
/// strategy on failure.
fn parse_child(
    g: &Grammar,
    child: RuleId,
    ctx: &mut ParserContext<'_>,
    settings: ResolvedSettings,
) -> ParseResult {
    if let Some(node) = parse_rule(g, child, ctx, settings)? {
        return Ok(Some(node));
    }
    let rec: Recovery = g.rule(child).recovery;
    if rec.is_none() {
        return Ok(None);
    }
    recovery::attempt(g, ctx, child, settings, rec)
}

fn parse_token_rule(
    g: &Grammar,
    rule: &RuleDef,
    token: TokenId,
    ctx: &mut ParserContext<'_>,
    mine: ResolvedSettings,
) -> ParseResult {
    let pos = ctx.position;
    let pattern = g.token(token);
    let is_barrier_pattern = matches!(pattern.kind, TokenPatternKind::Barrier { .. });

    if !mine.ignore_barriers {
        if let Some(virtual_token) = ctx.barriers.at(pos, ctx.passed_barriers) {
            if virtual_token.token == token {
                let length = virtual_token.length as usize;
                let barriers = ctx.passed_barriers + 1;
                let node = ctx.push_node(rule.id, pos, length, barriers, &[], None);
                ctx.passed_barriers = barriers;
                ctx.position = pos + length;
                return Ok(Some(node));
            }
            if is_barrier_pattern {
                // A different virtual token holds this slot.
                return fail_token(
                    ctx,
                    rule,
                    mine,
                    ErrorRecord {
                        position: pos,
                        length: 0,
                        message: Some(format!(
                            "expected barrier token {}",
                            g.token_display(token)
                        )),
                        element: ErrorElement::Token(token),
                        kind: ErrorKind::BarrierMismatch,
                        hidden: rule.hidden,
                        stack: ctx.stack.clone(),
                    },
                );
            }
            // Real tokens fall through, constrained to zero length by the
            // barrier limit below.
        } else if is_barrier_pattern {
            return fail_token(
                ctx,
                rule,
                mine,
                ErrorRecord {
                    position: pos,
                    length: 0,
                    message: Some(format!(
                        "expected barrier token {}",
                        g.token_display(token)
                    )),
                    element: ErrorElement::Token(token),
                    kind: ErrorKind::BarrierMismatch,
                    hidden: rule.hidden,
                    stack: ctx.stack.clone(),
                },
            );
        }
    }
    // With barriers ignored, a barrier pattern falls through to the
    // matcher, whose Barrier arm fails with the mismatch kind.

    let limit = ctx.barrier_limit(mine.ignore_barriers);
    let mut furthest = FurthestError::at(pos);
    let parameter = ctx.parameter.clone();
    match matcher::match_token(
        g,
        token,
        ctx.input,
        pos,
        limit,
        parameter.as_ref(),
        true,
        &mut furthest,
    ) {
        Some(m) => {
            let barriers = ctx.passed_barriers;
            let end = m.end();
            let node = ctx.push_node(rule.id, pos, m.length, barriers, &[], m.value);
            ctx.position = end;
            Ok(Some(node))
        }
        None => {
            let record = ErrorRecord {
                position: furthest.position,
                length: 0,
                message: furthest.message.clone(),
                element: ErrorElement::Token(furthest.token.unwrap_or(token)),
                kind: furthest.kind,
                hidden: furthest.hidden || rule.hidden,
                stack: ctx.stack.clone(),
            };
            fail_token(ctx, rule, mine, record)
        }
    }
}

fn fail_token(
    ctx: &mut ParserContext<'_>,
    _rule: &RuleDef,
    mine: ResolvedSettings,
    record: ErrorRecord,
) -> ParseResult {
    match mine.error_handling {
        ErrorHandling::Record => {
            ctx.record(record);
            Ok(None)
        }
        ErrorHandling::NoRecord => Ok(None),
        ErrorHandling::Throw => Err(Halt { record }),
    }
}

fn rule_error(ctx: &ParserContext<'_>, rule: &RuleDef, position: usize) -> ErrorRecord {
    ErrorRecord {
        position,
        length: 0,
        message: None,
        element: ErrorElement::Rule(rule.id),
        kind: ErrorKind::RuleMatch,
        hidden: rule.hidden,
        stack: ctx.stack.clone(),
    }
}

/// Driver handed to custom rule bodies.
///
/// Lets the body parse its declared children (or any rule by ID), inspect
/// and rewind the position, and build the finished node. Used to implement
/// precedence climbing and other bespoke combinators.
pub struct CustomParse<'g, 'c, 'i> {
    grammar: &'g Grammar,
    ctx: &'c mut ParserContext<'i>,
    rule: RuleId,
    children: &'g [RuleId],
    child_settings: ResolvedSettings,
}

impl<'g, 'c, 'i> CustomParse<'g, 'c, 'i> {
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn input(&self) -> &'i str {
        self.ctx.input
    }

    pub fn position(&self) -> usize {
        self.ctx.position
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child_id(&self, index: usize) -> RuleId {
        self.children[index]
    }

    pub fn mark(&self) -> ParseMark {
        self.ctx.mark()
    }

    pub fn rewind(&mut self, mark: ParseMark) {
        self.ctx.restore(mark);
    }

    /// Parse the `index`-th declared child at the current position.
    pub fn parse_child(&mut self, index: usize) -> Result<Option<NodeIndex>, Halt> {
        let child = self.children[index];
        parse_rule(self.grammar, child, self.ctx, self.child_settings)
    }

    /// Parse any rule at the current position.
    pub fn parse_rule(&mut self, rule: RuleId) -> Result<Option<NodeIndex>, Halt> {
        parse_rule(self.grammar, rule, self.ctx, self.child_settings)
    }

    pub fn node(&self, index: NodeIndex) -> &crate::engine::context::NodeData {
        self.ctx.node(index)
    }

    /// Build the result node for this rule, spanning `start` to the current
    /// position.
    pub fn finish(&mut self, start: usize, children: Vec<NodeIndex>) -> NodeIndex {
        let barriers = self.ctx.passed_barriers;
        self.ctx.push_node(
            self.rule,
            start,
            self.ctx.position - start,
            barriers,
            &children,
            None,
        )
    }
}
