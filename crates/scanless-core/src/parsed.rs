//! Token match results.

use crate::Value;

/// A successful token match.
///
/// `start` is always the position the match was attempted at; failure is
/// represented as `None` at the API level, so no sentinel states exist.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedElement {
    /// Byte offset the match started at.
    pub start: usize,
    /// Matched byte length (may be 0 for optional-style patterns).
    pub length: usize,
    /// Intermediate value, present only when the caller asked for one.
    pub value: Option<Value>,
}

impl ParsedElement {
    pub fn new(start: usize, length: usize) -> Self {
        Self {
            start,
            length,
            value: None,
        }
    }

    pub fn with_value(start: usize, length: usize, value: Value) -> Self {
        Self {
            start,
            length,
            value: Some(value),
        }
    }

    /// Byte offset one past the matched text.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn value_or_null(self) -> Value {
        self.value.unwrap_or_default()
    }
}
