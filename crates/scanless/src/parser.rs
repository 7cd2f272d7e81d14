//! The compiled parser façade.

use std::sync::Arc;

use scanless_core::{Param, Value};
use scanless_engine::{Ast, FindAllMatches, FindAllTokenMatches, Grammar};

use crate::Result;

/// An immutable compiled parser.
///
/// Cheap to clone and freely shareable across threads; every parse owns its
/// own state.
#[derive(Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
}

impl Parser {
    pub(crate) fn new(grammar: Arc<Grammar>) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Parse from the main rule.
    pub fn parse(&self, input: &str) -> Result<Ast> {
        let rule = self.grammar.main_rule_id()?;
        Ok(scanless_engine::parse_text(&self.grammar, rule, input, None)?)
    }

    /// Parse from the main rule with a parser parameter.
    pub fn parse_with(&self, input: &str, parameter: Param) -> Result<Ast> {
        let rule = self.grammar.main_rule_id()?;
        Ok(scanless_engine::parse_text(
            &self.grammar,
            rule,
            input,
            Some(parameter),
        )?)
    }

    /// Parse an arbitrary named rule anchored at the start of the input.
    pub fn parse_rule(&self, name: &str, input: &str) -> Result<Ast> {
        let rule = self.grammar.rule_id(name)?;
        Ok(scanless_engine::parse_text(&self.grammar, rule, input, None)?)
    }

    pub fn parse_rule_with(&self, name: &str, input: &str, parameter: Param) -> Result<Ast> {
        let rule = self.grammar.rule_id(name)?;
        Ok(scanless_engine::parse_text(
            &self.grammar,
            rule,
            input,
            Some(parameter),
        )?)
    }

    /// Run a named token pattern at the start of the input, returning its
    /// intermediate value. No AST is built.
    pub fn match_token(&self, name: &str, input: &str) -> Result<Value> {
        let token = self.grammar.token_id(name)?;
        Ok(scanless_engine::match_token_text(
            &self.grammar,
            token,
            input,
            None,
        )?)
    }

    pub fn match_token_with(&self, name: &str, input: &str, parameter: Param) -> Result<Value> {
        let token = self.grammar.token_id(name)?;
        Ok(scanless_engine::match_token_text(
            &self.grammar,
            token,
            input,
            Some(parameter),
        )?)
    }

    /// Scan the whole input for matches of the main rule (or a named rule).
    ///
    /// With `overlap`, the scan resumes one character after each match
    /// start instead of at the match end.
    pub fn find_all_matches<'i>(
        &self,
        rule_name: Option<&str>,
        input: &'i str,
        overlap: bool,
    ) -> Result<FindAllMatches<'i>> {
        let rule = match rule_name {
            Some(name) => self.grammar.rule_id(name)?,
            None => self.grammar.main_rule_id()?,
        };
        Ok(FindAllMatches::new(
            self.grammar.clone(),
            rule,
            input,
            None,
            overlap,
        ))
    }

    /// Scan the whole input for matches of a named token pattern,
    /// yielding `(start, value)` pairs.
    pub fn find_all_token_matches<'i>(
        &self,
        name: &str,
        input: &'i str,
        overlap: bool,
    ) -> Result<FindAllTokenMatches<'i>> {
        let token = self.grammar.token_id(name)?;
        Ok(FindAllTokenMatches::new(
            self.grammar.clone(),
            token,
            input,
            None,
            overlap,
        ))
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("tokens", &self.grammar.token_count())
            .field("rules", &self.grammar.rule_count())
            .finish()
    }
}
