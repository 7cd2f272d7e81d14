//! Token patterns: the compiled leaf and combinator matchers.
//!
//! Every pattern is one variant of [`TokenPatternKind`]; the engine
//! dispatches on the tag with a hand-written matcher per variant. Child
//! references are [`TokenId`]s into the owning grammar's token table.
//!
//! Each pattern also carries uniform matching metadata ([`MatchMeta`]):
//! the first-character set with its determinism flag, and whether the
//! pattern can succeed with zero length. The compiler derives metadata
//! bottom-up; choices with deterministic alternatives additionally get a
//! per-character candidate table ([`ChoiceLookahead`]).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use regex_automata::meta::Regex;

use crate::{CharComparison, CharPredicate, LiteralTrie, ParsedElement, TokenId, Value};

/// The parser parameter handed to a parse call and visible to conditional
/// patterns and custom matchers.
pub type Param = Arc<dyn Any + Send + Sync>;

/// Combines a sequence's child values into one value.
pub type PassageFn = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

/// Transforms a child value.
pub type MapValueFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Decides whether a matched value should fail the match.
pub type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Branch condition over the parser parameter.
pub type ParamPredicate = Arc<dyn Fn(Option<&Param>) -> bool + Send + Sync>;

/// User-supplied token matcher: `(input, pos, limit, param, want_value)`.
///
/// Must return a match starting exactly at `pos` and not extending past
/// `limit`, or `None`.
pub type CustomTokenFn =
    Arc<dyn Fn(&str, usize, usize, Option<&Param>, bool) -> Option<ParsedElement> + Send + Sync>;

// ============================================================================
// Matching metadata
// ============================================================================

/// First-character set of a pattern.
///
/// An empty set with `deterministic = false` means "unknown": the pattern
/// must always be attempted. When `deterministic` is true, a successful
/// match guarantees the input character at the match position is in the set.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FirstChars {
    chars: Vec<char>,
    deterministic: bool,
}

impl FirstChars {
    /// Unknown set: the pattern gives no first-character guarantee.
    pub fn unknown() -> Self {
        Self {
            chars: Vec::new(),
            deterministic: false,
        }
    }

    /// An exact, deterministic set.
    pub fn exact(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.sort_unstable();
        chars.dedup();
        Self {
            chars,
            deterministic: true,
        }
    }

    /// The union of two sets; deterministic only when both sides are.
    pub fn union(&self, other: &FirstChars) -> FirstChars {
        let mut chars = self.chars.clone();
        chars.extend_from_slice(&other.chars);
        chars.sort_unstable();
        chars.dedup();
        FirstChars {
            chars,
            deterministic: self.deterministic && other.deterministic,
        }
    }

    /// The same set without the determinism guarantee.
    pub fn relaxed(&self) -> FirstChars {
        FirstChars {
            chars: self.chars.clone(),
            deterministic: false,
        }
    }

    #[inline]
    pub fn contains(&self, c: char) -> bool {
        self.chars.binary_search(&c).is_ok()
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }
}

impl Default for FirstChars {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Uniform matching metadata exposed by every token pattern.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct MatchMeta {
    pub first: FirstChars,
    /// True when the pattern may succeed with zero length.
    pub optional: bool,
}

/// Per-character candidate table for ordered choices.
///
/// For each character in the union of the deterministic alternatives'
/// first sets, the candidates that could start with it (declaration order
/// preserved, non-deterministic alternatives always included). Characters
/// outside the table fall back to the non-deterministic alternatives only.
#[derive(Clone, Debug, Default)]
pub struct ChoiceLookahead {
    /// Sorted by character for binary search; values are child positions.
    by_char: Vec<(char, Vec<u32>)>,
    /// Child positions of non-deterministic alternatives.
    fallback: Vec<u32>,
}

impl ChoiceLookahead {
    pub fn new(by_char: Vec<(char, Vec<u32>)>, fallback: Vec<u32>) -> Self {
        debug_assert!(by_char.is_sorted_by_key(|e| e.0));
        Self { by_char, fallback }
    }

    /// Candidate child positions for a lookahead character.
    pub fn candidates(&self, c: char) -> &[u32] {
        match self.by_char.binary_search_by_key(&c, |e| e.0) {
            Ok(i) => &self.by_char[i].1,
            Err(_) => &self.fallback,
        }
    }

    /// Candidates when no lookahead character exists (end of window).
    pub fn fallback(&self) -> &[u32] {
        &self.fallback
    }
}

// ============================================================================
// Numbers
// ============================================================================

/// Target numeric type of a number token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NumberKind {
    /// Signed 64-bit integer value.
    Int,
    /// Unsigned 64-bit integer value.
    UInt,
    /// 64-bit float value.
    Float,
}

/// Shape flags for the decimal number token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NumberFlags {
    /// Accept a leading `+`/`-`.
    pub allow_sign: bool,
    /// Accept a trailing `e`/`E` exponent (floats).
    pub allow_exponent: bool,
}

impl Default for NumberFlags {
    fn default() -> Self {
        Self {
            allow_sign: true,
            allow_exponent: false,
        }
    }
}

// ============================================================================
// Escaping
// ============================================================================

/// Escape handling for [`TokenPatternKind::EscapedText`].
///
/// `try_escape` recognizes an escape sequence at a position, appends its
/// replacement to `out`, and returns the consumed length. `try_stop`
/// recognizes the terminator. Both look only at `input[pos..limit]`.
pub trait EscapingStrategy: Send + Sync {
    fn try_escape(&self, input: &str, pos: usize, limit: usize, out: &mut String)
    -> Option<usize>;

    fn try_stop(&self, input: &str, pos: usize, limit: usize) -> Option<usize>;
}

/// Table-driven escaping: escape sequences and stop sequences each live in
/// a longest-match trie.
pub struct TableEscaping {
    escapes: Vec<(String, String)>,
    escape_trie: LiteralTrie,
    stops: Vec<String>,
    stop_trie: LiteralTrie,
}

impl TableEscaping {
    pub fn new<E, S>(escapes: E, stops: S, comparison: CharComparison) -> Self
    where
        E: IntoIterator<Item = (String, String)>,
        S: IntoIterator<Item = String>,
    {
        let escapes: Vec<(String, String)> = escapes.into_iter().collect();
        let stops: Vec<String> = stops.into_iter().collect();
        let escape_trie = LiteralTrie::from_literals(escapes.iter().map(|e| &e.0), comparison);
        let stop_trie = LiteralTrie::from_literals(stops.iter(), comparison);
        Self {
            escapes,
            escape_trie,
            stops,
            stop_trie,
        }
    }

    pub fn escapes(&self) -> &[(String, String)] {
        &self.escapes
    }

    pub fn stops(&self) -> &[String] {
        &self.stops
    }
}

impl EscapingStrategy for TableEscaping {
    fn try_escape(
        &self,
        input: &str,
        pos: usize,
        limit: usize,
        out: &mut String,
    ) -> Option<usize> {
        let (payload, len) = self.escape_trie.longest_match(input, pos, limit)?;
        if len == 0 {
            return None;
        }
        out.push_str(&self.escapes[payload as usize].1);
        Some(len)
    }

    fn try_stop(&self, input: &str, pos: usize, limit: usize) -> Option<usize> {
        let (_, len) = self.stop_trie.longest_match(input, pos, limit)?;
        if len == 0 { None } else { Some(len) }
    }
}

impl fmt::Debug for TableEscaping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEscaping")
            .field("escapes", &self.escapes.len())
            .field("stops", &self.stops)
            .finish()
    }
}

// ============================================================================
// Token patterns
// ============================================================================

/// One compiled token pattern.
pub struct TokenPattern {
    pub id: TokenId,
    pub kind: TokenPatternKind,
    pub meta: MatchMeta,
    /// Names this pattern was registered under (first name leads
    /// diagnostics).
    pub aliases: Vec<String>,
    /// Hidden elements keep their errors out of rendered diagnostics unless
    /// message display is enabled.
    pub hidden: bool,
}

impl TokenPattern {
    pub fn new(id: TokenId, kind: TokenPatternKind) -> Self {
        Self {
            id,
            kind,
            meta: MatchMeta::default(),
            aliases: Vec::new(),
            hidden: false,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.aliases.first().map(String::as_str)
    }
}

impl fmt::Debug for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPattern")
            .field("id", &self.id)
            .field("kind", &self.kind.kind_name())
            .field("aliases", &self.aliases)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Every token pattern variant.
///
/// Leaf variants match raw characters; combinator variants reference child
/// patterns by ID. The engine owns the matching semantics.
#[derive(Clone)]
pub enum TokenPatternKind {
    /// One specific character; value = the declared character.
    LiteralChar {
        ch: char,
        comparison: CharComparison,
    },
    /// A literal string prefix; value = the declared literal (not the
    /// captured text, which may differ in case).
    Literal {
        text: String,
        comparison: CharComparison,
    },
    /// Longest match among a set of literals; value = the canonical literal.
    LiteralChoice {
        literals: Vec<String>,
        trie: LiteralTrie,
    },
    /// Literal choice with a keyword-boundary check: the character after the
    /// match must not satisfy `prohibited`.
    KeywordChoice {
        literals: Vec<String>,
        trie: LiteralTrie,
        prohibited: CharPredicate,
    },
    /// One character satisfying a class; no value.
    Char { class: CharPredicate },
    /// A run of class characters; fails below `min` (counts in chars).
    RepeatChars {
        class: CharPredicate,
        min: usize,
        max: Option<usize>,
    },
    /// A start character then continue characters; value = captured slice.
    Identifier {
        start: CharPredicate,
        cont: CharPredicate,
        min_len: usize,
        max_len: Option<usize>,
    },
    /// Decimal number converted to the target type; out-of-range fails.
    Number { kind: NumberKind, flags: NumberFlags },
    /// Integer with base-prefix dispatch and optional digit grouping.
    IntegerNumber {
        kind: NumberKind,
        allow_sign: bool,
        default_base: u32,
        /// Prefix character after a leading `0` → base, e.g. `('x', 16)`.
        base_prefixes: Vec<(char, u32)>,
        group_separator: Option<char>,
    },
    /// Anchored regex match; value = the matched text.
    Regex { pattern: String, regex: Regex },
    /// Unescape text until a stop sequence; value = the unescaped string.
    /// `consume_stop` extends the length past the stop but never the value.
    EscapedText {
        strategy: Arc<dyn EscapingStrategy>,
        allow_empty: bool,
        consume_stop: bool,
    },
    /// One or more whitespace characters.
    Whitespaces,
    /// One or more spaces or tabs.
    Spaces,
    /// Exactly one newline sequence (`\r\n`, `\n`, or `\r`).
    Newline,
    /// Zero-length match at end of input.
    Eof,
    /// Everything up to the barrier limit; value = the slice.
    AllText,
    /// A barrier token: only matched through the virtual-token stream,
    /// never against raw characters.
    Barrier { name: String },

    /// All children in order; value = `passage` over the child values, or
    /// null when absent.
    Sequence {
        children: Vec<TokenId>,
        passage: Option<PassageFn>,
    },
    /// Ordered choice; first success wins.
    Choice {
        children: Vec<TokenId>,
        lookahead: Option<ChoiceLookahead>,
    },
    /// Child or a zero-length success; value = child value or null.
    Optional { child: TokenId },
    /// Greedy repetition; value = array of child values.
    Repeat {
        child: TokenId,
        min: usize,
        max: Option<usize>,
    },
    /// Items separated by a separator.
    SeparatedRepeat {
        item: TokenId,
        separator: TokenId,
        min: usize,
        max: Option<usize>,
        /// A separator with no item after it is kept rather than rewound.
        allow_trailing: bool,
        /// Separator values appear in the result array.
        include_separators: bool,
    },
    /// `open body close`; value from `body`, edges matched without values.
    Between {
        open: TokenId,
        body: TokenId,
        close: TokenId,
    },
    /// Two-element sequence keeping the first value.
    First { a: TokenId, b: TokenId },
    /// Two-element sequence keeping the second value.
    Second { a: TokenId, b: TokenId },
    /// Transform the child value.
    Map { child: TokenId, map: MapValueFn },
    /// Ignore the child value, return a fixed one.
    Return { child: TokenId, value: Value },
    /// Match the child, then fail when the condition holds.
    FailIf {
        child: TokenId,
        condition: ValuePredicate,
        message: String,
    },
    /// Branch on the parser parameter; a missing else-branch fails.
    Cond {
        condition: ParamPredicate,
        then_token: TokenId,
        else_token: Option<TokenId>,
    },
    /// Advance past whitespace, then the child; length covers both.
    SkipWhitespaces { child: TokenId },
    /// Value = the matched slice with `trim_start`/`trim_end` chars removed.
    CaptureText {
        child: TokenId,
        trim_start: usize,
        trim_end: usize,
    },
    /// Scan until the stop token matches; value = the scanned slice.
    TextUntil {
        stop: TokenId,
        allow_empty: bool,
        consume_stop: bool,
        fail_on_eof: bool,
    },
    /// User-supplied matcher over child token IDs.
    Custom {
        children: Vec<TokenId>,
        matcher: CustomTokenFn,
    },
}

impl TokenPatternKind {
    /// Short tag for diagnostics and debugging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TokenPatternKind::LiteralChar { .. } => "literal char",
            TokenPatternKind::Literal { .. } => "literal",
            TokenPatternKind::LiteralChoice { .. } => "literal choice",
            TokenPatternKind::KeywordChoice { .. } => "keyword choice",
            TokenPatternKind::Char { .. } => "char",
            TokenPatternKind::RepeatChars { .. } => "char run",
            TokenPatternKind::Identifier { .. } => "identifier",
            TokenPatternKind::Number { .. } => "number",
            TokenPatternKind::IntegerNumber { .. } => "integer",
            TokenPatternKind::Regex { .. } => "regex",
            TokenPatternKind::EscapedText { .. } => "escaped text",
            TokenPatternKind::Whitespaces => "whitespaces",
            TokenPatternKind::Spaces => "spaces",
            TokenPatternKind::Newline => "newline",
            TokenPatternKind::Eof => "end of input",
            TokenPatternKind::AllText => "all text",
            TokenPatternKind::Barrier { .. } => "barrier",
            TokenPatternKind::Sequence { .. } => "sequence",
            TokenPatternKind::Choice { .. } => "choice",
            TokenPatternKind::Optional { .. } => "optional",
            TokenPatternKind::Repeat { .. } => "repeat",
            TokenPatternKind::SeparatedRepeat { .. } => "separated repeat",
            TokenPatternKind::Between { .. } => "between",
            TokenPatternKind::First { .. } => "first",
            TokenPatternKind::Second { .. } => "second",
            TokenPatternKind::Map { .. } => "map",
            TokenPatternKind::Return { .. } => "return",
            TokenPatternKind::FailIf { .. } => "fail-if",
            TokenPatternKind::Cond { .. } => "conditional",
            TokenPatternKind::SkipWhitespaces { .. } => "skip whitespaces",
            TokenPatternKind::CaptureText { .. } => "capture text",
            TokenPatternKind::TextUntil { .. } => "text until",
            TokenPatternKind::Custom { .. } => "custom token",
        }
    }

    /// Child token IDs, in declaration order.
    pub fn children(&self) -> Vec<TokenId> {
        match self {
            TokenPatternKind::Sequence { children, .. }
            | TokenPatternKind::Choice { children, .. }
            | TokenPatternKind::Custom { children, .. } => children.clone(),
            TokenPatternKind::Optional { child }
            | TokenPatternKind::Repeat { child, .. }
            | TokenPatternKind::Map { child, .. }
            | TokenPatternKind::Return { child, .. }
            | TokenPatternKind::FailIf { child, .. }
            | TokenPatternKind::SkipWhitespaces { child }
            | TokenPatternKind::CaptureText { child, .. } => vec![*child],
            TokenPatternKind::SeparatedRepeat {
                item, separator, ..
            } => vec![*item, *separator],
            TokenPatternKind::Between { open, body, close } => vec![*open, *body, *close],
            TokenPatternKind::First { a, b } | TokenPatternKind::Second { a, b } => {
                vec![*a, *b]
            }
            TokenPatternKind::Cond {
                then_token,
                else_token,
                ..
            } => {
                let mut out = vec![*then_token];
                out.extend(*else_token);
                out
            }
            TokenPatternKind::TextUntil { stop, .. } => vec![*stop],
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for TokenPatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}
