//! Parse orchestration: context construction, barrier pre-scan, root
//! dispatch, and the find-all-matches scans.

use std::sync::Arc;

use scanless_core::{Param, RuleId, TokenId, Value};

use crate::engine::ast::Ast;
use crate::engine::context::{FurthestError, ParserContext};
use crate::engine::matcher;
use crate::engine::report::{self, ParseFailure};
use crate::engine::rules;
use crate::grammar::Grammar;

/// Parse `input` with `rule` anchored at the start.
pub fn parse_text(
    grammar: &Arc<Grammar>,
    rule: RuleId,
    input: &str,
    parameter: Option<Param>,
) -> Result<Ast, ParseFailure> {
    let barriers = grammar.scan_barriers(input);
    let mut ctx = ParserContext::new(input, barriers, parameter, grammar.debug());
    let outcome = rules::parse_rule(grammar, rule, &mut ctx, grammar.default_settings());
    match outcome {
        Ok(Some(root)) => Ok(Ast::from_context(
            grammar.clone(),
            Arc::from(input),
            rule,
            ctx,
            root,
        )),
        Ok(None) => Err(report::failure_from_context(grammar, input, &ctx, None)),
        Err(halt) => Err(report::failure_from_context(
            grammar,
            input,
            &ctx,
            Some(halt.record),
        )),
    }
}

/// Run a token pattern at the start of `input`, returning its intermediate
/// value. No AST is built and the input need not be fully consumed.
pub fn match_token_text(
    grammar: &Grammar,
    token: TokenId,
    input: &str,
    parameter: Option<Param>,
) -> Result<Value, ParseFailure> {
    let mut furthest = FurthestError::at(0);
    match matcher::match_token(
        grammar,
        token,
        input,
        0,
        input.len(),
        parameter.as_ref(),
        true,
        &mut furthest,
    ) {
        Some(m) => Ok(m.value_or_null()),
        None => Err(report::failure_from_furthest(grammar, input, furthest)),
    }
}

/// Iterator over every position where a rule matches.
///
/// At each position one skip-and-parse attempt runs (the rule's own skip
/// strategy applies). On success the scan resumes at the match end, or one
/// character further for overlapping or zero-length matches; on failure it
/// advances one character.
pub struct FindAllMatches<'i> {
    grammar: Arc<Grammar>,
    input: &'i str,
    shared_input: Arc<str>,
    rule: RuleId,
    parameter: Option<Param>,
    overlap: bool,
    /// Scanned once; cloned into each attempt's context.
    barriers: scanless_core::BarrierMap,
    position: usize,
    done: bool,
}

impl<'i> FindAllMatches<'i> {
    pub fn new(
        grammar: Arc<Grammar>,
        rule: RuleId,
        input: &'i str,
        parameter: Option<Param>,
        overlap: bool,
    ) -> Self {
        let barriers = grammar.scan_barriers(input);
        Self {
            grammar,
            input,
            shared_input: Arc::from(input),
            rule,
            parameter,
            overlap,
            barriers,
            position: 0,
            done: false,
        }
    }
}

impl Iterator for FindAllMatches<'_> {
    type Item = Ast;

    fn next(&mut self) -> Option<Ast> {
        while !self.done {
            let start = self.position;
            if start > self.input.len() {
                self.done = true;
                break;
            }

            // A fresh context per attempt; barriers resynchronize to the
            // attempt position.
            let passed = self.barriers.passed_before(start);
            let mut ctx = ParserContext::new(
                self.input,
                self.barriers.clone(),
                self.parameter.clone(),
                self.grammar.debug(),
            );
            ctx.position = start;
            ctx.passed_barriers = passed;

            let outcome = rules::parse_rule(
                &self.grammar,
                self.rule,
                &mut ctx,
                self.grammar.default_settings(),
            );

            match outcome {
                Ok(Some(root)) => {
                    let end = ctx.position;
                    self.position = if self.overlap || end <= start {
                        next_char(self.input, start)
                    } else {
                        end
                    };
                    if start == self.input.len() {
                        self.done = true;
                    }
                    return Some(Ast::from_context(
                        self.grammar.clone(),
                        self.shared_input.clone(),
                        self.rule,
                        ctx,
                        root,
                    ));
                }
                Ok(None) | Err(_) => {
                    if start == self.input.len() {
                        self.done = true;
                        break;
                    }
                    self.position = next_char(self.input, start);
                }
            }
        }
        None
    }
}

/// Iterator over every position where a token pattern matches, yielding
/// `(start, value)` pairs.
pub struct FindAllTokenMatches<'i> {
    grammar: Arc<Grammar>,
    input: &'i str,
    token: TokenId,
    parameter: Option<Param>,
    overlap: bool,
    position: usize,
    done: bool,
}

impl<'i> FindAllTokenMatches<'i> {
    pub fn new(
        grammar: Arc<Grammar>,
        token: TokenId,
        input: &'i str,
        parameter: Option<Param>,
        overlap: bool,
    ) -> Self {
        Self {
            grammar,
            input,
            token,
            parameter,
            overlap,
            position: 0,
            done: false,
        }
    }
}

impl Iterator for FindAllTokenMatches<'_> {
    type Item = (usize, Value);

    fn next(&mut self) -> Option<(usize, Value)> {
        while !self.done {
            let start = self.position;
            let mut furthest = FurthestError::at(start);
            let matched = matcher::match_token(
                &self.grammar,
                self.token,
                self.input,
                start,
                self.input.len(),
                self.parameter.as_ref(),
                true,
                &mut furthest,
            );

            if start == self.input.len() {
                self.done = true;
            }
            match matched {
                Some(m) => {
                    self.position = if self.overlap || m.length == 0 {
                        next_char(self.input, start)
                    } else {
                        m.end()
                    };
                    return Some((start, m.value_or_null()));
                }
                None => {
                    self.position = next_char(self.input, start);
                }
            }
        }
        None
    }
}

fn next_char(input: &str, pos: usize) -> usize {
    match input[pos.min(input.len())..].chars().next() {
        Some(c) => pos + c.len_utf8(),
        None => pos + 1,
    }
}
