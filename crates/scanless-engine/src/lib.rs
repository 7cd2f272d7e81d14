#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Runtime engine for scanless parsers.
//!
//! The engine executes a compiled [`Grammar`] against an input string: the
//! scannerless token matcher, the rule parser with settings resolution and
//! skip strategies, barrier-token handling, error recovery, memoization,
//! tracing, and the lazy [`Ast`] with its value pipeline.
//!
//! A grammar is immutable and freely shared; every parse owns a fresh
//! [`ParserContext`]. Failures never unwind: matchers return `Option`, and
//! the hard `Throw` error-handling mode travels as `Result<_, Halt>`.

mod engine;
mod grammar;
mod rule;

pub use engine::ast::{Ast, AstNode};
pub use engine::context::{
    ErrorElement, ErrorKind, ErrorRecord, FurthestError, Halt, NodeData, NodeIndex, ParseMark,
    ParserContext,
};
pub use engine::report::{ErrorGroup, ParseFailure, group_errors, line_col};
pub use engine::rules::CustomParse;
pub use engine::run::{FindAllMatches, FindAllTokenMatches, match_token_text, parse_text};
pub use engine::trace::{StackFrame, WalkEntry, WalkStep, WalkTrace};
pub use grammar::{DebugSettings, ErrorDisplay, Grammar, GrammarParts};
pub use rule::{CustomRuleFn, InitFlags, RuleDef, RuleKind, ValueFactory};
