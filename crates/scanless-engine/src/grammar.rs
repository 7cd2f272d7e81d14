//! The compiled grammar: two flat element tables plus lookup state.

use std::sync::Arc;

use indexmap::IndexMap;

use scanless_core::{
    BarrierMap, BarrierTokenizer, GrammarError, ResolvedSettings, RuleId, TokenId, TokenPattern,
    TokenPatternKind,
};

use crate::rule::{RuleDef, RuleKind};

/// Grammar-wide debug switches, applied by the compiler as per-element init
/// flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct DebugSettings {
    /// Capture a stack-trace chain during parsing; error records keep the
    /// frame they were produced under.
    pub stack_traces: bool,
    /// Record a bounded walk trace of rule enter/success/fail steps.
    pub walk_trace: Option<usize>,
}

/// How parse failures are rendered.
#[derive(Clone, Copy, Debug)]
pub struct ErrorDisplay {
    /// Include the expected-production listing.
    pub show_rules: bool,
    /// Include hidden elements and error messages.
    pub show_messages: bool,
    /// Render up to 5 relevant error groups instead of 1.
    pub more_groups: bool,
}

impl Default for ErrorDisplay {
    fn default() -> Self {
        Self {
            show_rules: true,
            show_messages: false,
            more_groups: false,
        }
    }
}

/// Everything the compiler hands over to build a [`Grammar`].
pub struct GrammarParts {
    pub tokens: Vec<TokenPattern>,
    pub rules: Vec<RuleDef>,
    pub token_names: IndexMap<String, TokenId>,
    pub rule_names: IndexMap<String, RuleId>,
    pub main_rule: Option<RuleId>,
    pub default_settings: ResolvedSettings,
    pub barrier_tokenizers: Vec<Arc<dyn BarrierTokenizer>>,
    pub debug: DebugSettings,
    pub error_display: ErrorDisplay,
}

/// An immutable compiled grammar.
///
/// Owns every token pattern, rule, and strategy; all cross-references are
/// table indices. Shareable across threads; per-parse state lives in
/// [`crate::ParserContext`].
pub struct Grammar {
    tokens: Vec<TokenPattern>,
    rules: Vec<RuleDef>,
    token_names: IndexMap<String, TokenId>,
    rule_names: IndexMap<String, RuleId>,
    main_rule: Option<RuleId>,
    default_settings: ResolvedSettings,
    barrier_tokenizers: Vec<Arc<dyn BarrierTokenizer>>,
    debug: DebugSettings,
    error_display: ErrorDisplay,
}

impl Grammar {
    pub fn from_parts(parts: GrammarParts) -> Self {
        Self {
            tokens: parts.tokens,
            rules: parts.rules,
            token_names: parts.token_names,
            rule_names: parts.rule_names,
            main_rule: parts.main_rule,
            default_settings: parts.default_settings,
            barrier_tokenizers: parts.barrier_tokenizers,
            debug: parts.debug,
            error_display: parts.error_display,
        }
    }

    #[inline]
    pub fn token(&self, id: TokenId) -> &TokenPattern {
        &self.tokens[id.index()]
    }

    #[inline]
    pub fn rule(&self, id: RuleId) -> &RuleDef {
        &self.rules[id.index()]
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn token_id(&self, name: &str) -> Result<TokenId, GrammarError> {
        self.token_names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownToken(name.to_owned()))
    }

    pub fn rule_id(&self, name: &str) -> Result<RuleId, GrammarError> {
        self.rule_names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownRule(name.to_owned()))
    }

    pub fn main_rule_id(&self) -> Result<RuleId, GrammarError> {
        self.main_rule.ok_or(GrammarError::NoMainRule)
    }

    pub fn default_settings(&self) -> ResolvedSettings {
        self.default_settings
    }

    pub fn debug(&self) -> &DebugSettings {
        &self.debug
    }

    pub fn error_display(&self) -> &ErrorDisplay {
        &self.error_display
    }

    /// Run every barrier tokenizer over the input and merge the results
    /// into one sorted stream.
    pub fn scan_barriers(&self, input: &str) -> BarrierMap {
        if self.barrier_tokenizers.is_empty() {
            return BarrierMap::empty();
        }
        let mut tokens = Vec::new();
        for tokenizer in &self.barrier_tokenizers {
            tokens.extend(tokenizer.tokenize(input));
        }
        BarrierMap::from_tokens(tokens)
    }

    /// Human-readable form of a token for expected-production listings.
    pub fn token_display(&self, id: TokenId) -> String {
        self.token_display_depth(id, 0)
    }

    fn token_display_depth(&self, id: TokenId, depth: usize) -> String {
        let pattern = self.token(id);
        if let Some(name) = pattern.name() {
            return name.to_owned();
        }
        if depth >= 3 {
            return pattern.kind.kind_name().to_owned();
        }
        match &pattern.kind {
            TokenPatternKind::LiteralChar { ch, .. } => format!("'{ch}'"),
            TokenPatternKind::Literal { text, .. } => format!("'{text}'"),
            TokenPatternKind::LiteralChoice { literals, .. }
            | TokenPatternKind::KeywordChoice { literals, .. } => join_literals(literals),
            TokenPatternKind::Char { class } => class.name().to_owned(),
            TokenPatternKind::RepeatChars { class, .. } => format!("{} run", class.name()),
            TokenPatternKind::Identifier { .. } => "identifier".to_owned(),
            TokenPatternKind::Number { .. } => "number".to_owned(),
            TokenPatternKind::IntegerNumber { .. } => "integer".to_owned(),
            TokenPatternKind::Regex { pattern, .. } => format!("/{pattern}/"),
            TokenPatternKind::EscapedText { .. } => "text".to_owned(),
            TokenPatternKind::Whitespaces => "whitespace".to_owned(),
            TokenPatternKind::Spaces => "spaces".to_owned(),
            TokenPatternKind::Newline => "newline".to_owned(),
            TokenPatternKind::Eof => "end of input".to_owned(),
            TokenPatternKind::AllText => "text".to_owned(),
            TokenPatternKind::Barrier { name } => name.clone(),
            TokenPatternKind::Sequence { children, .. } => {
                join_displays(self, children, " ", depth)
            }
            TokenPatternKind::Choice { children, .. } => {
                join_displays(self, children, " | ", depth)
            }
            TokenPatternKind::Optional { child } => {
                format!("{}?", self.token_display_depth(*child, depth + 1))
            }
            TokenPatternKind::Repeat { child, min, .. } => {
                let suffix = if *min == 0 { "*" } else { "+" };
                format!("{}{suffix}", self.token_display_depth(*child, depth + 1))
            }
            TokenPatternKind::SeparatedRepeat { item, .. } => {
                format!("{} list", self.token_display_depth(*item, depth + 1))
            }
            TokenPatternKind::Between { body, .. } => self.token_display_depth(*body, depth + 1),
            TokenPatternKind::First { a, .. } => self.token_display_depth(*a, depth + 1),
            TokenPatternKind::Second { a, .. } => self.token_display_depth(*a, depth + 1),
            TokenPatternKind::Map { child, .. }
            | TokenPatternKind::Return { child, .. }
            | TokenPatternKind::FailIf { child, .. }
            | TokenPatternKind::SkipWhitespaces { child }
            | TokenPatternKind::CaptureText { child, .. } => {
                self.token_display_depth(*child, depth + 1)
            }
            TokenPatternKind::Cond { then_token, .. } => {
                self.token_display_depth(*then_token, depth + 1)
            }
            TokenPatternKind::TextUntil { .. } => "text".to_owned(),
            TokenPatternKind::Custom { .. } => "custom token".to_owned(),
        }
    }

    /// Human-readable form of a rule for expected-production listings.
    pub fn rule_display(&self, id: RuleId) -> String {
        self.rule_display_depth(id, 0)
    }

    fn rule_display_depth(&self, id: RuleId, depth: usize) -> String {
        let rule = self.rule(id);
        if let Some(name) = rule.name() {
            return name.to_owned();
        }
        if depth >= 3 {
            return rule.kind.kind_name().to_owned();
        }
        match &rule.kind {
            RuleKind::Token { token } => self.token_display_depth(*token, depth),
            RuleKind::Sequence { children } => children
                .iter()
                .map(|c| self.rule_display_depth(*c, depth + 1))
                .collect::<Vec<_>>()
                .join(" "),
            RuleKind::Choice { children } => children
                .iter()
                .map(|c| self.rule_display_depth(*c, depth + 1))
                .collect::<Vec<_>>()
                .join(" | "),
            RuleKind::Optional { child } => {
                format!("{}?", self.rule_display_depth(*child, depth + 1))
            }
            RuleKind::Repeat { child, min, .. } => {
                let suffix = if *min == 0 { "*" } else { "+" };
                format!("{}{suffix}", self.rule_display_depth(*child, depth + 1))
            }
            RuleKind::SeparatedRepeat { item, .. } => {
                format!("{} list", self.rule_display_depth(*item, depth + 1))
            }
            RuleKind::Custom { .. } => "custom rule".to_owned(),
        }
    }
}

fn join_literals(literals: &[String]) -> String {
    let mut shown: Vec<String> = literals.iter().take(4).map(|l| format!("'{l}'")).collect();
    if literals.len() > 4 {
        shown.push("…".to_owned());
    }
    shown.join(" | ")
}

fn join_displays(g: &Grammar, children: &[TokenId], sep: &str, depth: usize) -> String {
    children
        .iter()
        .map(|c| g.token_display_depth(*c, depth + 1))
        .collect::<Vec<_>>()
        .join(sep)
}
