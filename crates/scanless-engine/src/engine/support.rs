//! Hand-built grammars for engine tests.
//!
//! The real compiler lives in the façade crate; engine tests assemble the
//! flat tables directly, which also keeps the table invariants visible.

use std::sync::Arc;

use indexmap::IndexMap;

use scanless_core::{
    BarrierTokenizer, CharComparison, LiteralTrie, LocalSettings, Recovery, ResolvedSettings,
    RuleId, SkipStrategy, TokenId, TokenPattern, TokenPatternKind,
};

use crate::grammar::{DebugSettings, ErrorDisplay, Grammar, GrammarParts};
use crate::rule::{RuleDef, RuleKind};

pub(crate) struct TestGrammar {
    tokens: Vec<TokenPattern>,
    rules: Vec<RuleDef>,
    token_names: IndexMap<String, TokenId>,
    rule_names: IndexMap<String, RuleId>,
    barrier_tokenizers: Vec<Arc<dyn BarrierTokenizer>>,
    default_settings: ResolvedSettings,
    debug: DebugSettings,
}

impl TestGrammar {
    pub(crate) fn new() -> Self {
        Self {
            tokens: Vec::new(),
            rules: Vec::new(),
            token_names: IndexMap::new(),
            rule_names: IndexMap::new(),
            barrier_tokenizers: Vec::new(),
            default_settings: ResolvedSettings::default(),
            debug: DebugSettings::default(),
        }
    }

    pub(crate) fn token(&mut self, kind: TokenPatternKind) -> TokenId {
        let id = TokenId::from_raw(self.tokens.len() as u32);
        self.tokens.push(TokenPattern::new(id, kind));
        id
    }

    pub(crate) fn named_token(&mut self, name: &str, kind: TokenPatternKind) -> TokenId {
        let id = self.token(kind);
        self.tokens[id.index()].aliases.push(name.to_owned());
        self.token_names.insert(name.to_owned(), id);
        id
    }

    pub(crate) fn rule(&mut self, kind: RuleKind) -> RuleId {
        let id = RuleId::from_raw(self.rules.len() as u32);
        self.rules.push(RuleDef::new(id, kind));
        id
    }

    pub(crate) fn named_rule(&mut self, name: &str, kind: RuleKind) -> RuleId {
        let id = self.rule(kind);
        self.rules[id.index()].aliases.push(name.to_owned());
        self.rule_names.insert(name.to_owned(), id);
        id
    }

    /// A rule wrapping a fresh token pattern.
    pub(crate) fn token_rule(&mut self, kind: TokenPatternKind) -> RuleId {
        let token = self.token(kind);
        self.rule(RuleKind::Token { token })
    }

    pub(crate) fn rule_mut(&mut self, id: RuleId) -> &mut RuleDef {
        &mut self.rules[id.index()]
    }

    pub(crate) fn set_settings(&mut self, id: RuleId, settings: LocalSettings) {
        self.rules[id.index()].settings = settings;
    }

    pub(crate) fn set_recovery(&mut self, id: RuleId, recovery: Recovery) {
        self.rules[id.index()].recovery = recovery;
    }

    pub(crate) fn default_skip(&mut self, skip: SkipStrategy) {
        self.default_settings.skip = skip;
    }

    pub(crate) fn debug_mut(&mut self) -> &mut DebugSettings {
        &mut self.debug
    }

    pub(crate) fn barriers(&mut self, tokenizer: impl BarrierTokenizer + 'static) {
        self.barrier_tokenizers.push(Arc::new(tokenizer));
    }

    pub(crate) fn finish(self, main: RuleId) -> Arc<Grammar> {
        Arc::new(Grammar::from_parts(GrammarParts {
            tokens: self.tokens,
            rules: self.rules,
            token_names: self.token_names,
            rule_names: self.rule_names,
            main_rule: Some(main),
            default_settings: self.default_settings,
            barrier_tokenizers: self.barrier_tokenizers,
            debug: self.debug,
            error_display: ErrorDisplay::default(),
        }))
    }
}

pub(crate) fn lit(text: &str) -> TokenPatternKind {
    TokenPatternKind::Literal {
        text: text.to_owned(),
        comparison: CharComparison::Sensitive,
    }
}

pub(crate) fn lit_choice(literals: &[&str]) -> TokenPatternKind {
    let literals: Vec<String> = literals.iter().map(|l| (*l).to_owned()).collect();
    let trie = LiteralTrie::from_literals(&literals, CharComparison::Sensitive);
    TokenPatternKind::LiteralChoice { literals, trie }
}

pub(crate) fn ident() -> TokenPatternKind {
    TokenPatternKind::Identifier {
        start: scanless_core::CharPredicate::ascii_ident_start(),
        cont: scanless_core::CharPredicate::ascii_ident_continue(),
        min_len: 1,
        max_len: None,
    }
}
