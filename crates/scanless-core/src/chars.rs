//! Character comparison and character classes.

use std::fmt;
use std::sync::Arc;

/// How literal characters are compared against the input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum CharComparison {
    /// Exact comparison.
    #[default]
    Sensitive,
    /// Unicode case-insensitive comparison (simple one-to-one folding).
    IgnoreCase,
}

impl CharComparison {
    /// Fold a character to its canonical form under this comparison.
    ///
    /// Multi-character lowercase expansions fold to their first character;
    /// trie keys and comparisons use the same folding so lookups agree.
    #[inline]
    pub fn fold(self, c: char) -> char {
        match self {
            CharComparison::Sensitive => c,
            CharComparison::IgnoreCase => c.to_lowercase().next().unwrap_or(c),
        }
    }

    /// Compare two characters under this comparison.
    #[inline]
    pub fn chars_eq(self, a: char, b: char) -> bool {
        match self {
            CharComparison::Sensitive => a == b,
            CharComparison::IgnoreCase => a == b || self.fold(a) == self.fold(b),
        }
    }
}

/// A named character class.
///
/// The name only feeds diagnostics ("expected identifier start"); matching
/// goes through the predicate. Predicates must be pure: the same character
/// always yields the same answer.
#[derive(Clone)]
pub struct CharPredicate {
    name: &'static str,
    test: Arc<dyn Fn(char) -> bool + Send + Sync>,
}

impl CharPredicate {
    pub fn new(name: &'static str, test: impl Fn(char) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            test: Arc::new(test),
        }
    }

    #[inline]
    pub fn test(&self, c: char) -> bool {
        (self.test)(c)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Identity of the underlying function. Predicates compare equal for
    /// structural deduplication only when they share the same function.
    pub fn fn_ptr(&self) -> usize {
        Arc::as_ptr(&self.test) as *const () as usize
    }

    /// ASCII letters and underscore.
    pub fn ascii_ident_start() -> Self {
        Self::new("ascii identifier start", |c| {
            c.is_ascii_alphabetic() || c == '_'
        })
    }

    /// ASCII letters, digits, and underscore.
    pub fn ascii_ident_continue() -> Self {
        Self::new("ascii identifier continue", |c| {
            c.is_ascii_alphanumeric() || c == '_'
        })
    }

    /// Unicode letters and underscore.
    pub fn unicode_ident_start() -> Self {
        Self::new("identifier start", |c| c.is_alphabetic() || c == '_')
    }

    /// Unicode letters, digits, and underscore.
    pub fn unicode_ident_continue() -> Self {
        Self::new("identifier continue", |c| c.is_alphanumeric() || c == '_')
    }

    pub fn ascii_digit() -> Self {
        Self::new("digit", |c| c.is_ascii_digit())
    }

    pub fn hex_digit() -> Self {
        Self::new("hex digit", |c| c.is_ascii_hexdigit())
    }

    pub fn whitespace() -> Self {
        Self::new("whitespace", char::is_whitespace)
    }
}

impl fmt::Debug for CharPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
