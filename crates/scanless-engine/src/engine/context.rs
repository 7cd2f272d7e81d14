//! The per-parse state.

use std::sync::Arc;

use scanless_core::{BarrierMap, Param, RuleId, TokenId, Value};

use crate::engine::cache::MemoCache;
use crate::engine::trace::{StackFrame, WalkStep, WalkTrace};
use crate::grammar::DebugSettings;

/// Index of a node in the context's arena.
pub type NodeIndex = u32;

/// One AST node in the arena.
///
/// Children are stored as an `(offset, count)` span into the context's
/// shared child buffer, so nodes stay `Copy`-cheap and allocation-free.
#[derive(Clone, Debug)]
pub struct NodeData {
    pub rule: RuleId,
    pub start: u32,
    pub length: u32,
    /// Barrier count after this node matched.
    pub barriers_after: u32,
    pub child_offset: u32,
    pub child_count: u32,
    /// Intermediate value (token leaves carry their match value).
    pub value: Option<Value>,
}

impl NodeData {
    #[inline]
    pub fn end(&self) -> u32 {
        self.start + self.length
    }
}

/// A resumable position snapshot.
#[derive(Clone, Copy, Debug)]
pub struct ParseMark {
    pub position: usize,
    pub barriers: u32,
}

/// Which element an error refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorElement {
    Token(TokenId),
    Rule(RuleId),
}

/// Error taxonomy for parse-time records.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ErrorKind {
    #[default]
    TokenMatch,
    RuleMatch,
    /// A virtual token was expected but another (or none) was pending.
    BarrierMismatch,
    /// A number token matched but its value did not fit the target type.
    Overflow,
}

/// One recorded parse error.
#[derive(Clone, Debug)]
pub struct ErrorRecord {
    pub position: usize,
    pub length: usize,
    pub message: Option<String>,
    pub element: ErrorElement,
    pub kind: ErrorKind,
    /// Hidden records stay out of rendered diagnostics unless message
    /// display is enabled.
    pub hidden: bool,
    pub stack: Option<Arc<StackFrame>>,
}

/// Terminates the parse immediately (the `Throw` error-handling mode).
#[derive(Clone, Debug)]
pub struct Halt {
    pub record: ErrorRecord,
}

/// The furthest failure seen while matching one token, threaded by
/// reference through the token matcher for cheap tracking.
#[derive(Clone, Debug)]
pub struct FurthestError {
    pub position: usize,
    pub token: Option<TokenId>,
    pub message: Option<String>,
    pub kind: ErrorKind,
    pub hidden: bool,
}

impl FurthestError {
    pub fn at(position: usize) -> Self {
        Self {
            position,
            token: None,
            message: None,
            kind: ErrorKind::TokenMatch,
            hidden: false,
        }
    }

    /// Update with a failure at `position` unless a further one is already
    /// recorded.
    pub fn observe(
        &mut self,
        position: usize,
        token: TokenId,
        kind: ErrorKind,
        message: Option<String>,
        hidden: bool,
    ) {
        if position >= self.position {
            self.position = position;
            self.token = Some(token);
            self.kind = kind;
            self.message = message;
            self.hidden = hidden;
        }
    }
}

/// All state of one parse.
pub struct ParserContext<'i> {
    pub input: &'i str,
    pub position: usize,
    pub max_position: usize,
    pub passed_barriers: u32,
    pub parameter: Option<Param>,
    pub barriers: BarrierMap,
    pub errors: Vec<ErrorRecord>,
    /// Positions where error recovery re-entered successful parsing;
    /// bounds the relevance windows of error groups.
    pub recovery_indices: Vec<usize>,
    /// Error recording is disabled while > 0 (recovery scans, skip rules).
    pub(crate) suppress_record: u32,
    pub(crate) cache: MemoCache,
    pub(crate) stack: Option<Arc<StackFrame>>,
    pub(crate) walk: Option<WalkTrace>,
    pub(crate) nodes: Vec<NodeData>,
    pub(crate) children: Vec<NodeIndex>,
}

impl<'i> ParserContext<'i> {
    pub fn new(
        input: &'i str,
        barriers: BarrierMap,
        parameter: Option<Param>,
        debug: &DebugSettings,
    ) -> Self {
        Self {
            input,
            position: 0,
            max_position: input.len(),
            passed_barriers: 0,
            parameter,
            barriers,
            errors: Vec::new(),
            recovery_indices: Vec::new(),
            suppress_record: 0,
            cache: MemoCache::default(),
            stack: None,
            walk: debug.walk_trace.map(WalkTrace::new),
            nodes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn mark(&self) -> ParseMark {
        ParseMark {
            position: self.position,
            barriers: self.passed_barriers,
        }
    }

    /// Rewind position and barrier count. The node arena is append-only, so
    /// nothing else needs undoing: abandoned nodes simply stay unreferenced.
    #[inline]
    pub fn restore(&mut self, mark: ParseMark) {
        self.position = mark.position;
        self.passed_barriers = mark.barriers;
    }

    /// The position real tokens must not cross: the next pending virtual
    /// token, unless barriers are ignored.
    pub fn barrier_limit(&self, ignore_barriers: bool) -> usize {
        if ignore_barriers {
            return self.max_position;
        }
        match self
            .barriers
            .next_barrier_position(self.position, self.passed_barriers)
        {
            Some(pos) => pos.min(self.max_position),
            None => self.max_position,
        }
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &NodeData {
        &self.nodes[index as usize]
    }

    /// Append a node, flushing its children into the shared buffer.
    pub(crate) fn push_node(
        &mut self,
        rule: RuleId,
        start: usize,
        length: usize,
        barriers_after: u32,
        kids: &[NodeIndex],
        value: Option<Value>,
    ) -> NodeIndex {
        let child_offset = self.children.len() as u32;
        self.children.extend_from_slice(kids);
        let index = self.nodes.len() as NodeIndex;
        self.nodes.push(NodeData {
            rule,
            start: start as u32,
            length: length as u32,
            barriers_after,
            child_offset,
            child_count: kids.len() as u32,
            value,
        });
        index
    }

    pub(crate) fn record(&mut self, record: ErrorRecord) {
        if self.suppress_record == 0 {
            self.errors.push(record);
        }
    }

    pub(crate) fn walk_push(&mut self, step: WalkStep, rule: RuleId, position: usize) {
        if let Some(walk) = &mut self.walk {
            walk.push(step, rule, position);
        }
    }

    pub fn walk_trace(&self) -> Option<&WalkTrace> {
        self.walk.as_ref()
    }
}
