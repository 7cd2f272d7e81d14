#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data model for scanless grammars.
//!
//! A compiled grammar is two flat tables (token patterns and parser rules)
//! cross-referenced by integer IDs. This crate defines the token side of that
//! model plus everything both the compiler and the runtime need to agree on:
//!
//! - element IDs ([`TokenId`], [`RuleId`])
//! - character comparison and character classes ([`CharComparison`],
//!   [`CharPredicate`])
//! - the longest-match literal trie ([`LiteralTrie`])
//! - the dynamic [`Value`] type carried by matches
//! - token pattern variants with their matching metadata ([`TokenPattern`])
//! - per-rule local settings, skip strategies, and error recovery descriptors
//! - barrier (virtual) tokens and the built-in indentation tokenizer
//!
//! Everything here is immutable once built. Parse-time state lives in the
//! engine crate.

mod barrier;
mod chars;
mod error;
mod ids;
mod parsed;
mod pattern;
mod recovery;
mod settings;
mod trie;
mod value;

#[cfg(test)]
mod settings_tests;
#[cfg(test)]
mod value_tests;

pub use barrier::{BarrierMap, BarrierTokenizer, IndentTokenizer, VirtualToken};
pub use chars::{CharComparison, CharPredicate};
pub use error::GrammarError;
pub use ids::{RuleId, TokenId};
pub use parsed::ParsedElement;
pub use pattern::{
    ChoiceLookahead, CustomTokenFn, EscapingStrategy, FirstChars, MapValueFn, MatchMeta,
    NumberFlags, NumberKind, Param, ParamPredicate, PassageFn, TableEscaping, TokenPattern,
    TokenPatternKind, ValuePredicate,
};
pub use recovery::{Recovery, RecoveryKind};
pub use settings::{
    ErrorHandling, LocalSettings, ResolvedSettings, Setting, SettingUse, SkipKind, SkipStrategy,
};
pub use trie::LiteralTrie;
pub use value::Value;
