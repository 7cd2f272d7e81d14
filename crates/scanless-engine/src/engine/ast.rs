//! The lazy AST and its value pipeline.
//!
//! An [`Ast`] owns the node arena produced by one parse plus everything
//! needed to interpret it: the grammar, the input, and the parse parameter.
//! Node views are cheap `(ast, index)` pairs; parsed values are computed on
//! first access by the rule's value factory (or a kind-specific default)
//! and memoized per node. Parses are single-threaded, so a `RefCell` side
//! table is enough.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use scanless_core::{Param, RuleId, Value};

use crate::engine::context::{ErrorRecord, NodeData, NodeIndex, ParserContext};
use crate::engine::report::ParseFailure;
use crate::engine::run;
use crate::grammar::Grammar;
use crate::rule::RuleKind;

/// The result of a successful parse.
pub struct Ast {
    grammar: Arc<Grammar>,
    input: Arc<str>,
    rule: RuleId,
    parameter: Option<Param>,
    nodes: Vec<NodeData>,
    children: Vec<NodeIndex>,
    root: NodeIndex,
    errors: Vec<ErrorRecord>,
    recovery_indices: Vec<usize>,
    values: RefCell<HashMap<NodeIndex, Value>>,
}

impl Ast {
    pub(crate) fn from_context(
        grammar: Arc<Grammar>,
        input: Arc<str>,
        rule: RuleId,
        ctx: ParserContext<'_>,
        root: NodeIndex,
    ) -> Self {
        Self {
            grammar,
            input,
            rule,
            parameter: ctx.parameter,
            nodes: ctx.nodes,
            children: ctx.children,
            root,
            errors: ctx.errors,
            recovery_indices: ctx.recovery_indices,
            values: RefCell::new(HashMap::new()),
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn root(&self) -> AstNode<'_> {
        AstNode {
            ast: self,
            index: self.root,
        }
    }

    /// The root's parsed value.
    pub fn value(&self) -> Value {
        self.root().value()
    }

    /// Errors the parse recovered from: records inside windows closed by a
    /// recovery point. Speculative failures past the last recovery point
    /// are parse noise on a successful parse and are not included.
    pub fn recovered_errors(&self) -> Vec<&ErrorRecord> {
        match self.recovery_indices.last() {
            Some(&last) => self
                .errors
                .iter()
                .filter(|e| e.position < last)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Positions where recovery re-entered successful parsing.
    pub fn recovery_indices(&self) -> &[usize] {
        &self.recovery_indices
    }

    /// Re-parse new input with the same rule and parameter.
    ///
    /// This is the incremental hook; it currently always performs a full
    /// reparse.
    pub fn reparsed(&self, new_input: &str) -> Result<Ast, ParseFailure> {
        run::parse_text(&self.grammar, self.rule, new_input, self.parameter.clone())
    }

    fn node(&self, index: NodeIndex) -> &NodeData {
        &self.nodes[index as usize]
    }

    fn child_slice(&self, index: NodeIndex) -> &[NodeIndex] {
        let node = self.node(index);
        let start = node.child_offset as usize;
        &self.children[start..start + node.child_count as usize]
    }
}

impl std::fmt::Debug for Ast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ast")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}

/// A view of one AST node.
#[derive(Clone, Copy)]
pub struct AstNode<'a> {
    ast: &'a Ast,
    index: NodeIndex,
}

impl<'a> AstNode<'a> {
    pub fn rule_id(&self) -> RuleId {
        self.ast.node(self.index).rule
    }

    /// The rule's registered name, if it has one.
    pub fn rule_name(&self) -> Option<&'a str> {
        self.ast.grammar.rule(self.rule_id()).name()
    }

    pub fn start(&self) -> usize {
        self.ast.node(self.index).start as usize
    }

    pub fn length(&self) -> usize {
        self.ast.node(self.index).length as usize
    }

    pub fn end(&self) -> usize {
        self.ast.node(self.index).end() as usize
    }

    /// The matched slice of the input.
    pub fn text(&self) -> &'a str {
        &self.ast.input[self.start()..self.end()]
    }

    pub fn child_count(&self) -> usize {
        self.ast.node(self.index).child_count as usize
    }

    pub fn child(&self, index: usize) -> AstNode<'a> {
        AstNode {
            ast: self.ast,
            index: self.ast.child_slice(self.index)[index],
        }
    }

    pub fn children(&self) -> impl Iterator<Item = AstNode<'a>> + '_ {
        self.ast
            .child_slice(self.index)
            .iter()
            .map(|&index| AstNode {
                ast: self.ast,
                index,
            })
    }

    /// The token-level intermediate value, for leaf nodes that carry one.
    pub fn intermediate(&self) -> Option<Value> {
        self.ast.node(self.index).value.clone()
    }

    /// The parsed value: the rule's factory (or a kind-specific default),
    /// computed lazily and memoized per node.
    pub fn value(&self) -> Value {
        if let Some(value) = self.ast.values.borrow().get(&self.index) {
            return value.clone();
        }
        let value = self.compute_value();
        self.ast
            .values
            .borrow_mut()
            .insert(self.index, value.clone());
        value
    }

    fn compute_value(&self) -> Value {
        let rule = self.ast.grammar.rule(self.rule_id());
        if let Some(factory) = &rule.value_factory {
            return factory(self);
        }
        match &rule.kind {
            RuleKind::Token { .. } => self.intermediate().unwrap_or_default(),
            RuleKind::Repeat { .. } | RuleKind::SeparatedRepeat { .. } => {
                Value::Array(self.children().map(|c| c.value()).collect())
            }
            // Sequence, choice, optional, custom: the first child's value.
            _ => {
                if self.child_count() > 0 {
                    self.child(0).value()
                } else {
                    Value::Null
                }
            }
        }
    }

    /// All child values, in order.
    pub fn child_values(&self) -> Vec<Value> {
        self.children().map(|c| c.value()).collect()
    }

    /// A flattened view: descends through single-child wrapper nodes that
    /// add no value of their own.
    pub fn optimized(&self) -> AstNode<'a> {
        let mut current = *self;
        loop {
            let rule = self.ast.grammar.rule(current.rule_id());
            if current.child_count() != 1 || rule.value_factory.is_some() {
                return current;
            }
            if matches!(rule.kind, RuleKind::Token { .. }) {
                return current;
            }
            current = current.child(0);
        }
    }

    /// Depth-first search for the first descendant parsed by a named rule.
    pub fn find_first(&self, rule_name: &str) -> Option<AstNode<'a>> {
        if self.rule_name() == Some(rule_name) {
            return Some(*self);
        }
        for child in self.children() {
            if let Some(found) = child.find_first(rule_name) {
                return Some(found);
            }
        }
        None
    }
}

impl std::fmt::Debug for AstNode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AstNode")
            .field("rule", &self.rule_id())
            .field("name", &self.rule_name())
            .field("span", &(self.start()..self.end()))
            .field("children", &self.child_count())
            .finish()
    }
}
