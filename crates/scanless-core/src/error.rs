//! Grammar construction errors.
//!
//! Everything here is raised while building a parser; none of these occur at
//! parse time.

/// Errors produced while compiling a grammar.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    /// A named rule reference did not resolve.
    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    /// A named token reference did not resolve.
    #[error("unknown token `{0}`")]
    UnknownToken(String),

    #[error("rule `{0}` is defined more than once")]
    DuplicateRule(String),

    #[error("token `{0}` is defined more than once")]
    DuplicateToken(String),

    /// A choice with no alternatives can never match.
    #[error("choice has no alternatives")]
    EmptyChoice,

    /// Literal and literal-choice tokens need at least one character.
    #[error("literal must not be empty")]
    EmptyLiteral,

    #[error("repeat bounds are invalid: min {min} exceeds max {max}")]
    InvalidRepeatBounds { min: usize, max: usize },

    #[error("invalid regex pattern `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    /// The recovery strategy needs an anchor rule.
    #[error("recovery strategy requires an anchor rule")]
    MissingAnchor,

    /// A rule-based skip strategy was configured without a skip rule.
    #[error("skip strategy requires a skip rule")]
    MissingSkipRule,

    /// `parse` was called but no main rule was designated.
    #[error("no main rule was designated")]
    NoMainRule,
}
