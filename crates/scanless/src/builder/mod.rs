//! The buildable grammar representation.
//!
//! Builder expressions are mutable trees with optional fields, the exact
//! opposite of the compiled tables. [`crate::compile`] is the only
//! transformer between the two; everything downstream sees only the
//! compiled form.

pub(crate) mod rule_expr;
pub(crate) mod token_expr;


use std::sync::Arc;

use indexmap::IndexMap;

use scanless_core::{BarrierTokenizer, GrammarError, SkipKind};
use scanless_engine::{DebugSettings, ErrorDisplay};

pub use rule_expr::{Recover, RuleExpr};
pub use token_expr::TokenExpr;

use crate::parser::Parser;

/// How virtual tokens are produced for a grammar.
pub(crate) enum BarrierSpec {
    /// The built-in indentation tokenizer, with barrier tokens referenced
    /// by name and resolved at compile time.
    Indent {
        indent: String,
        dedent: String,
        newline: Option<String>,
        tab_width: u32,
    },
    /// A pre-built tokenizer (token IDs already resolved by the caller).
    Custom(Arc<dyn BarrierTokenizer>),
}

/// Collects named rules, tokens, and grammar-wide configuration, then
/// compiles everything into a [`Parser`].
pub struct GrammarBuilder {
    pub(crate) tokens: IndexMap<String, TokenExpr>,
    pub(crate) rules: IndexMap<String, RuleExpr>,
    pub(crate) main: Option<String>,
    pub(crate) global_skip: Option<(SkipKind, Option<RuleExpr>)>,
    pub(crate) barriers: Vec<BarrierSpec>,
    pub(crate) debug: DebugSettings,
    pub(crate) error_display: ErrorDisplay,
    pub(crate) pending_errors: Vec<GrammarError>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            tokens: IndexMap::new(),
            rules: IndexMap::new(),
            main: None,
            global_skip: None,
            barriers: Vec::new(),
            debug: DebugSettings::default(),
            error_display: ErrorDisplay::default(),
            pending_errors: Vec::new(),
        }
    }

    /// Register a named token pattern.
    pub fn token(&mut self, name: &str, expr: TokenExpr) -> &mut Self {
        if self.tokens.insert(name.to_owned(), expr).is_some() {
            self.pending_errors
                .push(GrammarError::DuplicateToken(name.to_owned()));
        }
        self
    }

    /// Register a named rule.
    pub fn rule(&mut self, name: &str, expr: impl Into<RuleExpr>) -> &mut Self {
        if self.rules.insert(name.to_owned(), expr.into()).is_some() {
            self.pending_errors
                .push(GrammarError::DuplicateRule(name.to_owned()));
        }
        self
    }

    /// Register a named rule and make it the main rule.
    pub fn main_rule(&mut self, name: &str, expr: impl Into<RuleExpr>) -> &mut Self {
        self.rule(name, expr);
        self.main = Some(name.to_owned());
        self
    }

    /// Designate an already-registered rule as the main rule.
    pub fn set_main(&mut self, name: &str) -> &mut Self {
        self.main = Some(name.to_owned());
        self
    }

    /// Default skip strategy: built-in whitespace skipping before every
    /// rule (overridable per rule).
    pub fn skip_whitespaces(&mut self) -> &mut Self {
        self.global_skip = Some((SkipKind::Whitespaces, None));
        self
    }

    /// Default skip strategy: parse `rule` per the given kind before every
    /// rule body.
    pub fn skip_rule(&mut self, kind: SkipKind, rule: impl Into<RuleExpr>) -> &mut Self {
        self.global_skip = Some((kind, Some(rule.into())));
        self
    }

    /// Add the built-in indentation tokenizer. Registers `indent` and
    /// `dedent` as barrier tokens; reference them with
    /// [`crate::build::token_ref`].
    pub fn indent_barriers(&mut self, indent: &str, dedent: &str) -> &mut Self {
        self.token(indent, token_expr::barrier(indent));
        self.token(dedent, token_expr::barrier(dedent));
        self.barriers.push(BarrierSpec::Indent {
            indent: indent.to_owned(),
            dedent: dedent.to_owned(),
            newline: None,
            tab_width: 4,
        });
        self
    }

    /// Like [`Self::indent_barriers`], also emitting a newline barrier
    /// token at every line break.
    pub fn indent_barriers_with_newline(
        &mut self,
        indent: &str,
        dedent: &str,
        newline: &str,
    ) -> &mut Self {
        self.token(indent, token_expr::barrier(indent));
        self.token(dedent, token_expr::barrier(dedent));
        self.token(newline, token_expr::barrier(newline));
        self.barriers.push(BarrierSpec::Indent {
            indent: indent.to_owned(),
            dedent: dedent.to_owned(),
            newline: Some(newline.to_owned()),
            tab_width: 4,
        });
        self
    }

    /// Set the tab width of the most recently registered indent tokenizer.
    pub fn tab_width(&mut self, width: u32) -> &mut Self {
        if let Some(BarrierSpec::Indent { tab_width, .. }) = self.barriers.last_mut() {
            *tab_width = width;
        }
        self
    }

    /// Add a pre-built barrier tokenizer.
    pub fn barrier_tokenizer(&mut self, tokenizer: impl BarrierTokenizer + 'static) -> &mut Self {
        self.barriers.push(BarrierSpec::Custom(Arc::new(tokenizer)));
        self
    }

    /// Capture rule stack traces into error records.
    pub fn stack_traces(&mut self) -> &mut Self {
        self.debug.stack_traces = true;
        self
    }

    /// Record a bounded walk trace of the parse, rendered into failures.
    pub fn walk_trace(&mut self, limit: usize) -> &mut Self {
        self.debug.walk_trace = Some(limit);
        self
    }

    /// Replace the error display flags.
    pub fn error_display(&mut self, display: ErrorDisplay) -> &mut Self {
        self.error_display = display;
        self
    }

    /// Include hidden elements and error messages in rendered failures.
    pub fn show_messages(&mut self) -> &mut Self {
        self.error_display.show_messages = true;
        self
    }

    /// Render up to 5 relevant error groups instead of 1.
    pub fn more_error_groups(&mut self) -> &mut Self {
        self.error_display.more_groups = true;
        self
    }

    /// Compile the grammar into an immutable parser.
    pub fn build(self) -> std::result::Result<Parser, GrammarError> {
        let grammar = crate::compile::compile(self)?;
        Ok(Parser::new(Arc::new(grammar)))
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}
