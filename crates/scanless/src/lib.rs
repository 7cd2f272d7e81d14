#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Scannerless, fluent grammar construction and parsing.
//!
//! A grammar is declared as a graph of named and anonymous rules and token
//! patterns, compiled once into an immutable [`Parser`], and run against
//! input strings. Matching is scannerless (token patterns work directly on
//! characters), with ordered choice, backtracking, pluggable whitespace
//! skipping, barrier tokens for indentation-sensitive grammars, and error
//! recovery at anchor points.
//!
//! # Example
//!
//! ```
//! use scanless::GrammarBuilder;
//! use scanless::build::{float_num, one_of};
//! use scanless::Value;
//!
//! let mut b = GrammarBuilder::new();
//! b.skip_whitespaces();
//! b.main_rule(
//!     "expr",
//!     float_num()
//!         .into_rule()
//!         .then(one_of(["+", "-"]))
//!         .then(float_num())
//!         .value(|node| {
//!             let lhs = node.child(0).value().as_float().unwrap_or(0.0);
//!             let rhs = node.child(2).value().as_float().unwrap_or(0.0);
//!             match node.child(1).value().as_str() {
//!                 Some("+") => Value::Float(lhs + rhs),
//!                 _ => Value::Float(lhs - rhs),
//!             }
//!         }),
//! );
//! let parser = b.build().expect("valid grammar");
//!
//! let ast = parser.parse("10 + 15").expect("valid input");
//! assert_eq!(ast.value(), Value::Float(25.0));
//! ```

mod builder;
mod compile;
mod parser;

#[cfg(test)]
mod tests;

pub use builder::{GrammarBuilder, Recover, RuleExpr, TokenExpr};
pub use parser::Parser;

/// Fluent constructors for token and rule expressions.
pub mod build {
    pub use crate::builder::rule_expr::{custom_rule, rule_ref, separated};
    pub use crate::builder::token_expr::{
        all_text, ascii_ident, barrier, char_class, char_run, cond, custom_token, eof,
        escaped_text, float_num, ident, int_num, int_number, keywords, keywords_ci, lit,
        lit_char, lit_char_ci, lit_ci, newline, number, one_of, one_of_ci, regex, spaces,
        text_until, token_ref, uint_num, unicode_ident, whitespaces,
    };
}

pub use scanless_core::{
    CharComparison, CharPredicate, ErrorHandling, EscapingStrategy, GrammarError, NumberFlags,
    NumberKind, Param, ParsedElement, Recovery, RecoveryKind, SettingUse, SkipKind, TableEscaping,
    Value,
};
pub use scanless_engine::{
    Ast, AstNode, CustomParse, DebugSettings, ErrorDisplay, ErrorElement, ErrorKind, ErrorRecord,
    Grammar, Halt, NodeIndex, ParseFailure,
};

/// Errors from building or running a parser.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The grammar failed to compile.
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The input failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, Error>;
