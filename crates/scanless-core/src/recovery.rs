//! Error-recovery descriptors.
//!
//! A rule with a non-`None` recovery strategy gets a second chance when it
//! fails inside a sequence or repetition: the engine scans forward for a
//! place to re-parse it. The descriptor here only names the strategy; the
//! scanning itself lives in the engine.

use crate::RuleId;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum RecoveryKind {
    /// No recovery.
    #[default]
    None,
    /// Scan forward position by position until the failed rule parses.
    FindNext,
    /// Like `FindNext`, aborting once the stop rule matches.
    FindNextUntil,
    /// Scan forward until the anchor rule matches, then re-parse the failed
    /// rule at the anchor's start.
    SkipUntilAnchor,
    /// Scan forward until the anchor rule matches, then re-parse the failed
    /// rule after the anchor's match.
    SkipAfterAnchor,
}

impl RecoveryKind {
    pub fn requires_anchor(self) -> bool {
        matches!(
            self,
            RecoveryKind::SkipUntilAnchor | RecoveryKind::SkipAfterAnchor
        )
    }
}

/// A rule's recovery strategy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Recovery {
    pub kind: RecoveryKind,
    pub anchor: Option<RuleId>,
    pub stop: Option<RuleId>,
    /// Re-enter recovery past the anchor when the re-parse still fails.
    pub repeat: bool,
}

impl Recovery {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn find_next() -> Self {
        Self {
            kind: RecoveryKind::FindNext,
            ..Self::default()
        }
    }

    pub fn find_next_until(stop: RuleId) -> Self {
        Self {
            kind: RecoveryKind::FindNextUntil,
            stop: Some(stop),
            ..Self::default()
        }
    }

    pub fn skip_until(anchor: RuleId) -> Self {
        Self {
            kind: RecoveryKind::SkipUntilAnchor,
            anchor: Some(anchor),
            ..Self::default()
        }
    }

    pub fn skip_after(anchor: RuleId) -> Self {
        Self {
            kind: RecoveryKind::SkipAfterAnchor,
            anchor: Some(anchor),
            ..Self::default()
        }
    }

    pub fn with_stop(mut self, stop: RuleId) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == RecoveryKind::None
    }
}
