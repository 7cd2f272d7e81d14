//! Memoization cache for rule parses.
//!
//! Keyed by `(rule, position, barriers, resolved settings)` so a hit is
//! exactly a replay of an earlier invocation. Cached node indices stay valid
//! because the node arena is append-only.

use std::collections::HashMap;

use scanless_core::{ResolvedSettings, RuleId};

use crate::engine::context::NodeIndex;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct MemoKey {
    rule: RuleId,
    position: usize,
    barriers: u32,
    settings: ResolvedSettings,
}

#[derive(Clone, Copy, Debug)]
pub(crate) enum MemoEntry {
    Fail,
    Success {
        node: NodeIndex,
        end: usize,
        barriers_after: u32,
    },
}

#[derive(Default)]
pub(crate) struct MemoCache {
    map: HashMap<MemoKey, MemoEntry>,
}

impl MemoCache {
    pub(crate) fn get(
        &self,
        rule: RuleId,
        position: usize,
        barriers: u32,
        settings: ResolvedSettings,
    ) -> Option<MemoEntry> {
        self.map
            .get(&MemoKey {
                rule,
                position,
                barriers,
                settings,
            })
            .copied()
    }

    pub(crate) fn insert(
        &mut self,
        rule: RuleId,
        position: usize,
        barriers: u32,
        settings: ResolvedSettings,
        entry: MemoEntry,
    ) {
        self.map.insert(
            MemoKey {
                rule,
                position,
                barriers,
                settings,
            },
            entry,
        );
    }
}
