//! Buildable token expressions and their fluent constructors.

use std::sync::Arc;

use scanless_core::{
    CharComparison, CharPredicate, CustomTokenFn, EscapingStrategy, MapValueFn, NumberFlags,
    NumberKind, Param, ParamPredicate, ParsedElement, PassageFn, Value, ValuePredicate,
};

use crate::builder::rule_expr::RuleExpr;

/// A token pattern under construction.
#[derive(Clone)]
pub struct TokenExpr {
    pub(crate) kind: TokenExprKind,
    pub(crate) hidden: bool,
}

#[derive(Clone)]
pub(crate) enum TokenExprKind {
    Ref(String),
    LiteralChar(char, CharComparison),
    Literal(String, CharComparison),
    LiteralChoice(Vec<String>, CharComparison),
    KeywordChoice {
        literals: Vec<String>,
        comparison: CharComparison,
        prohibited: CharPredicate,
    },
    Char(CharPredicate),
    RepeatChars {
        class: CharPredicate,
        min: usize,
        max: Option<usize>,
    },
    Identifier {
        start: CharPredicate,
        cont: CharPredicate,
        min_len: usize,
        max_len: Option<usize>,
    },
    Number {
        kind: NumberKind,
        flags: NumberFlags,
    },
    IntegerNumber {
        kind: NumberKind,
        allow_sign: bool,
        default_base: u32,
        base_prefixes: Vec<(char, u32)>,
        group_separator: Option<char>,
    },
    Regex(String),
    EscapedText {
        strategy: Arc<dyn EscapingStrategy>,
        allow_empty: bool,
        consume_stop: bool,
    },
    Whitespaces,
    Spaces,
    Newline,
    Eof,
    AllText,
    Barrier(String),
    Sequence(Vec<TokenExpr>, Option<PassageFn>),
    Choice(Vec<TokenExpr>),
    Optional(Box<TokenExpr>),
    Repeat {
        child: Box<TokenExpr>,
        min: usize,
        max: Option<usize>,
    },
    SeparatedRepeat {
        item: Box<TokenExpr>,
        separator: Box<TokenExpr>,
        min: usize,
        max: Option<usize>,
        allow_trailing: bool,
        include_separators: bool,
    },
    Between {
        open: Box<TokenExpr>,
        body: Box<TokenExpr>,
        close: Box<TokenExpr>,
    },
    First(Box<TokenExpr>, Box<TokenExpr>),
    Second(Box<TokenExpr>, Box<TokenExpr>),
    Map {
        child: Box<TokenExpr>,
        map: MapValueFn,
    },
    Return {
        child: Box<TokenExpr>,
        value: Value,
    },
    FailIf {
        child: Box<TokenExpr>,
        condition: ValuePredicate,
        message: String,
    },
    Cond {
        condition: ParamPredicate,
        then_token: Box<TokenExpr>,
        else_token: Option<Box<TokenExpr>>,
    },
    SkipWhitespaces(Box<TokenExpr>),
    CaptureText {
        child: Box<TokenExpr>,
        trim_start: usize,
        trim_end: usize,
    },
    TextUntil {
        stop: Box<TokenExpr>,
        allow_empty: bool,
        consume_stop: bool,
        fail_on_eof: bool,
    },
    Custom {
        children: Vec<TokenExpr>,
        matcher: CustomTokenFn,
    },
}

fn expr(kind: TokenExprKind) -> TokenExpr {
    TokenExpr {
        kind,
        hidden: false,
    }
}

// ============================================================================
// Leaf constructors
// ============================================================================

/// Reference a named token.
pub fn token_ref(name: &str) -> TokenExpr {
    expr(TokenExprKind::Ref(name.to_owned()))
}

/// A literal string, case-sensitive.
pub fn lit(text: &str) -> TokenExpr {
    expr(TokenExprKind::Literal(
        text.to_owned(),
        CharComparison::Sensitive,
    ))
}

/// A literal string, case-insensitive.
pub fn lit_ci(text: &str) -> TokenExpr {
    expr(TokenExprKind::Literal(
        text.to_owned(),
        CharComparison::IgnoreCase,
    ))
}

/// A single literal character.
pub fn lit_char(c: char) -> TokenExpr {
    expr(TokenExprKind::LiteralChar(c, CharComparison::Sensitive))
}

/// A single literal character, case-insensitive.
pub fn lit_char_ci(c: char) -> TokenExpr {
    expr(TokenExprKind::LiteralChar(c, CharComparison::IgnoreCase))
}

/// Longest match among literals; the value is the canonical literal.
pub fn one_of<I, S>(literals: I) -> TokenExpr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    expr(TokenExprKind::LiteralChoice(
        literals.into_iter().map(Into::into).collect(),
        CharComparison::Sensitive,
    ))
}

/// Case-insensitive [`one_of`].
pub fn one_of_ci<I, S>(literals: I) -> TokenExpr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    expr(TokenExprKind::LiteralChoice(
        literals.into_iter().map(Into::into).collect(),
        CharComparison::IgnoreCase,
    ))
}

/// Longest keyword match; the following character must not satisfy
/// `prohibited` (usually the identifier-continue class).
pub fn keywords<I, S>(literals: I, prohibited: CharPredicate) -> TokenExpr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    expr(TokenExprKind::KeywordChoice {
        literals: literals.into_iter().map(Into::into).collect(),
        comparison: CharComparison::Sensitive,
        prohibited,
    })
}

/// Case-insensitive [`keywords`].
pub fn keywords_ci<I, S>(literals: I, prohibited: CharPredicate) -> TokenExpr
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    expr(TokenExprKind::KeywordChoice {
        literals: literals.into_iter().map(Into::into).collect(),
        comparison: CharComparison::IgnoreCase,
        prohibited,
    })
}

/// One character of a class.
pub fn char_class(class: CharPredicate) -> TokenExpr {
    expr(TokenExprKind::Char(class))
}

/// A run of class characters (counts in chars).
pub fn char_run(class: CharPredicate, min: usize, max: Option<usize>) -> TokenExpr {
    expr(TokenExprKind::RepeatChars { class, min, max })
}

/// An identifier with explicit start/continue classes.
pub fn ident(start: CharPredicate, cont: CharPredicate) -> TokenExpr {
    expr(TokenExprKind::Identifier {
        start,
        cont,
        min_len: 1,
        max_len: None,
    })
}

/// `[A-Za-z_][A-Za-z0-9_]*`.
pub fn ascii_ident() -> TokenExpr {
    ident(
        CharPredicate::ascii_ident_start(),
        CharPredicate::ascii_ident_continue(),
    )
}

/// Unicode letters and digits with underscore.
pub fn unicode_ident() -> TokenExpr {
    ident(
        CharPredicate::unicode_ident_start(),
        CharPredicate::unicode_ident_continue(),
    )
}

/// A decimal number with explicit kind and flags.
pub fn number(kind: NumberKind, flags: NumberFlags) -> TokenExpr {
    expr(TokenExprKind::Number { kind, flags })
}

/// A signed decimal integer (`i64` value).
pub fn int_num() -> TokenExpr {
    number(NumberKind::Int, NumberFlags::default())
}

/// An unsigned decimal integer (`u64` value).
pub fn uint_num() -> TokenExpr {
    number(
        NumberKind::UInt,
        NumberFlags {
            allow_sign: false,
            allow_exponent: false,
        },
    )
}

/// A signed float with scientific notation (`f64` value).
pub fn float_num() -> TokenExpr {
    number(
        NumberKind::Float,
        NumberFlags {
            allow_sign: true,
            allow_exponent: true,
        },
    )
}

/// An integer with base-prefix dispatch (e.g. `0x`, `0b`) and optional
/// digit grouping.
pub fn int_number(
    kind: NumberKind,
    allow_sign: bool,
    default_base: u32,
    base_prefixes: Vec<(char, u32)>,
    group_separator: Option<char>,
) -> TokenExpr {
    expr(TokenExprKind::IntegerNumber {
        kind,
        allow_sign,
        default_base,
        base_prefixes,
        group_separator,
    })
}

/// An anchored regex match; the value is the matched text.
pub fn regex(pattern: &str) -> TokenExpr {
    expr(TokenExprKind::Regex(pattern.to_owned()))
}

/// Unescape text until the strategy's stop sequence.
pub fn escaped_text(
    strategy: impl EscapingStrategy + 'static,
    allow_empty: bool,
    consume_stop: bool,
) -> TokenExpr {
    expr(TokenExprKind::EscapedText {
        strategy: Arc::new(strategy),
        allow_empty,
        consume_stop,
    })
}

/// Scan raw text until `stop` matches (or end of input, unless
/// `fail_on_eof`); the value is the scanned slice.
pub fn text_until(
    stop: TokenExpr,
    allow_empty: bool,
    consume_stop: bool,
    fail_on_eof: bool,
) -> TokenExpr {
    expr(TokenExprKind::TextUntil {
        stop: Box::new(stop),
        allow_empty,
        consume_stop,
        fail_on_eof,
    })
}

/// One or more whitespace characters.
pub fn whitespaces() -> TokenExpr {
    expr(TokenExprKind::Whitespaces)
}

/// One or more spaces or tabs.
pub fn spaces() -> TokenExpr {
    expr(TokenExprKind::Spaces)
}

/// Exactly one newline sequence.
pub fn newline() -> TokenExpr {
    expr(TokenExprKind::Newline)
}

/// Zero-length match at end of input.
pub fn eof() -> TokenExpr {
    expr(TokenExprKind::Eof)
}

/// Everything up to the barrier limit.
pub fn all_text() -> TokenExpr {
    expr(TokenExprKind::AllText)
}

/// A barrier token, matched only through the virtual-token stream.
pub fn barrier(name: &str) -> TokenExpr {
    expr(TokenExprKind::Barrier(name.to_owned()))
}

/// Branch on the parser parameter; a missing else-branch fails when the
/// condition is false.
pub fn cond(
    condition: impl Fn(Option<&Param>) -> bool + Send + Sync + 'static,
    then_token: TokenExpr,
    else_token: Option<TokenExpr>,
) -> TokenExpr {
    expr(TokenExprKind::Cond {
        condition: Arc::new(condition),
        then_token: Box::new(then_token),
        else_token: else_token.map(Box::new),
    })
}

/// A user-supplied matcher: `(input, pos, limit, param, want_value)`.
pub fn custom_token(
    children: Vec<TokenExpr>,
    matcher: impl Fn(&str, usize, usize, Option<&Param>, bool) -> Option<ParsedElement>
    + Send
    + Sync
    + 'static,
) -> TokenExpr {
    expr(TokenExprKind::Custom {
        children,
        matcher: Arc::new(matcher),
    })
}

// ============================================================================
// Combinator methods
// ============================================================================

impl TokenExpr {
    /// Sequence: this, then `next`.
    pub fn then(mut self, next: TokenExpr) -> TokenExpr {
        match &mut self.kind {
            TokenExprKind::Sequence(children, None) if !self.hidden => {
                children.push(next);
                self
            }
            _ => expr(TokenExprKind::Sequence(vec![self, next], None)),
        }
    }

    /// Ordered choice: this, or `other`.
    pub fn or(mut self, other: TokenExpr) -> TokenExpr {
        match &mut self.kind {
            TokenExprKind::Choice(children) if !self.hidden => {
                children.push(other);
                self
            }
            _ => expr(TokenExprKind::Choice(vec![self, other])),
        }
    }

    pub fn optional(self) -> TokenExpr {
        expr(TokenExprKind::Optional(Box::new(self)))
    }

    pub fn repeat(self, min: usize, max: Option<usize>) -> TokenExpr {
        expr(TokenExprKind::Repeat {
            child: Box::new(self),
            min,
            max,
        })
    }

    pub fn zero_or_more(self) -> TokenExpr {
        self.repeat(0, None)
    }

    pub fn one_or_more(self) -> TokenExpr {
        self.repeat(1, None)
    }

    /// One or more items separated by `separator`.
    pub fn separated_by(self, separator: TokenExpr) -> TokenExpr {
        expr(TokenExprKind::SeparatedRepeat {
            item: Box::new(self),
            separator: Box::new(separator),
            min: 1,
            max: None,
            allow_trailing: false,
            include_separators: false,
        })
    }

    /// [`Self::separated_by`] tolerating a trailing separator.
    pub fn separated_by_trailing(self, separator: TokenExpr) -> TokenExpr {
        expr(TokenExprKind::SeparatedRepeat {
            item: Box::new(self),
            separator: Box::new(separator),
            min: 1,
            max: None,
            allow_trailing: true,
            include_separators: false,
        })
    }

    /// `open this close`, keeping this expression's value.
    pub fn between(self, open: TokenExpr, close: TokenExpr) -> TokenExpr {
        expr(TokenExprKind::Between {
            open: Box::new(open),
            body: Box::new(self),
            close: Box::new(close),
        })
    }

    /// Sequence keeping this expression's value.
    pub fn then_ignore(self, next: TokenExpr) -> TokenExpr {
        expr(TokenExprKind::First(Box::new(self), Box::new(next)))
    }

    /// Sequence keeping `next`'s value.
    pub fn ignore_then(self, next: TokenExpr) -> TokenExpr {
        expr(TokenExprKind::Second(Box::new(self), Box::new(next)))
    }

    /// Transform the intermediate value.
    pub fn map_value(self, map: impl Fn(Value) -> Value + Send + Sync + 'static) -> TokenExpr {
        expr(TokenExprKind::Map {
            child: Box::new(self),
            map: Arc::new(map),
        })
    }

    /// Ignore the matched value and return a fixed one.
    pub fn returns(self, value: Value) -> TokenExpr {
        expr(TokenExprKind::Return {
            child: Box::new(self),
            value,
        })
    }

    /// Fail the match when the condition holds for the matched value.
    pub fn fail_if(
        self,
        condition: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: &str,
    ) -> TokenExpr {
        expr(TokenExprKind::FailIf {
            child: Box::new(self),
            condition: Arc::new(condition),
            message: message.to_owned(),
        })
    }

    /// Combine a sequence's child values into one value.
    pub fn passage(mut self, f: impl Fn(Vec<Value>) -> Value + Send + Sync + 'static) -> TokenExpr {
        match &mut self.kind {
            TokenExprKind::Sequence(_, passage @ None) => {
                *passage = Some(Arc::new(f));
                self
            }
            _ => expr(TokenExprKind::Sequence(vec![self], Some(Arc::new(f)))),
        }
    }

    /// Advance past whitespace before matching.
    pub fn skip_ws(self) -> TokenExpr {
        expr(TokenExprKind::SkipWhitespaces(Box::new(self)))
    }

    /// Value = the matched slice.
    pub fn capture_text(self) -> TokenExpr {
        self.capture_text_trimmed(0, 0)
    }

    /// Value = the matched slice with chars trimmed from each side.
    pub fn capture_text_trimmed(self, trim_start: usize, trim_end: usize) -> TokenExpr {
        expr(TokenExprKind::CaptureText {
            child: Box::new(self),
            trim_start,
            trim_end,
        })
    }

    /// Keep this element's errors out of rendered diagnostics.
    pub fn hidden(mut self) -> TokenExpr {
        self.hidden = true;
        self
    }

    /// Wrap into a rule expression (for rule-level configuration like
    /// value factories and recovery).
    pub fn into_rule(self) -> RuleExpr {
        RuleExpr::from(self)
    }
}
