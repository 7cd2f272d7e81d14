//! Stack and walk traces.
//!
//! The stack trace is a persistent parent chain: pushing a frame shares the
//! tail, so error records can keep the chain they were produced under
//! without copying. The walk trace is a bounded ring of rule enter/exit
//! steps, cheap enough to leave on while debugging a grammar.

use std::collections::VecDeque;
use std::sync::Arc;

use scanless_core::RuleId;

/// One frame of the rule invocation chain.
#[derive(Debug)]
pub struct StackFrame {
    pub rule: RuleId,
    pub position: usize,
    pub parent: Option<Arc<StackFrame>>,
}

impl StackFrame {
    /// The chain from this frame to the root, leaf first.
    pub fn chain(leaf: &Arc<StackFrame>) -> Vec<(RuleId, usize)> {
        let mut out = Vec::new();
        let mut cur = Some(leaf);
        while let Some(frame) = cur {
            out.push((frame.rule, frame.position));
            cur = frame.parent.as_ref();
        }
        out
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum WalkStep {
    Enter,
    Success,
    Fail,
}

#[derive(Clone, Copy, Debug)]
pub struct WalkEntry {
    pub step: WalkStep,
    pub rule: RuleId,
    pub position: usize,
}

/// Bounded record of the parse walk; keeps the most recent steps.
#[derive(Debug)]
pub struct WalkTrace {
    entries: VecDeque<WalkEntry>,
    limit: usize,
    truncated: bool,
}

impl WalkTrace {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(256)),
            limit: limit.max(1),
            truncated: false,
        }
    }

    pub fn push(&mut self, step: WalkStep, rule: RuleId, position: usize) {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
            self.truncated = true;
        }
        self.entries.push_back(WalkEntry {
            step,
            rule,
            position,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &WalkEntry> {
        self.entries.iter()
    }

    /// True when older steps were dropped to stay within the limit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
