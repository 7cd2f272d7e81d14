//! Per-rule local settings and their inheritance model.
//!
//! Every rule owns a [`LocalSettings`] with three fields: the skip strategy,
//! the error-handling mode, and the ignore-barriers switch. Each field is
//! wrapped in a [`Setting`] that says how it combines with the settings
//! inherited from the parent rule. Resolution yields two plain
//! [`ResolvedSettings`]: one governing the rule itself, one handed to its
//! children.

use crate::RuleId;

/// How a local setting combines with the inherited one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SettingUse {
    /// Use the inherited value for this rule and its children.
    #[default]
    Inherit,
    /// Use the local value for this rule only; children inherit.
    LocalForSelf,
    /// Use the local value for this rule and its children.
    LocalForSelfAndChildren,
    /// This rule inherits; children get the local value.
    LocalForChildren,
}

/// One settings field plus its use mode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Setting<T> {
    pub value: T,
    pub mode: SettingUse,
}

impl<T: Copy> Setting<T> {
    /// Local for this rule and its children.
    pub fn local(value: T) -> Self {
        Self {
            value,
            mode: SettingUse::LocalForSelfAndChildren,
        }
    }

    pub fn local_for_self(value: T) -> Self {
        Self {
            value,
            mode: SettingUse::LocalForSelf,
        }
    }

    pub fn local_for_children(value: T) -> Self {
        Self {
            value,
            mode: SettingUse::LocalForChildren,
        }
    }

    /// Resolve against the inherited value, returning
    /// `(for_self, for_children)`.
    fn resolve(&self, inherited: T) -> (T, T) {
        match self.mode {
            SettingUse::Inherit => (inherited, inherited),
            SettingUse::LocalForSelf => (self.value, inherited),
            SettingUse::LocalForSelfAndChildren => (self.value, self.value),
            SettingUse::LocalForChildren => (inherited, self.value),
        }
    }
}

/// What happens when a rule fails to match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum ErrorHandling {
    /// Record the failure in the context's error list.
    #[default]
    Record,
    /// Fail silently.
    NoRecord,
    /// Terminate the whole parse with the failure (hard grammar assertion).
    Throw,
}

/// The skip strategy kinds.
///
/// The `Lazy` variants are pinned to: attempt the body first; on failure
/// skip and retry. `SkipBeforeParsingLazy` and `TryParseThenSkip` skip at
/// most once; the `Lazy` try-variants alternate body and skip until the
/// body succeeds or the skip stops advancing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SkipKind {
    /// No skipping.
    #[default]
    None,
    /// Built-in: advance while `char::is_whitespace`.
    Whitespaces,
    /// Parse the skip rule once before the body.
    SkipBeforeParsing,
    /// Parse the skip rule repeatedly before the body until it stops
    /// advancing.
    SkipBeforeParsingGreedy,
    /// Try the body first; on failure skip once and retry the body once.
    SkipBeforeParsingLazy,
    /// Try the body; on failure skip once, then retry the body.
    TryParseThenSkip,
    /// Try the body; on failure skip greedily, then retry the body.
    TryParseThenSkipGreedy,
    /// Alternate body and single skips until the body succeeds or skipping
    /// stops advancing.
    TryParseThenSkipLazy,
    /// Like `TryParseThenSkip`, but a zero-length body success also triggers
    /// a skip-and-retry; the empty success is kept if the retry fails.
    TryParseNonEmptyThenSkip,
    /// Non-empty variant of `TryParseThenSkipGreedy`.
    TryParseNonEmptyThenSkipGreedy,
    /// Non-empty variant of `TryParseThenSkipLazy`.
    TryParseNonEmptyThenSkipLazy,
}

impl SkipKind {
    /// Whether this kind needs a skip rule to parse.
    pub fn requires_rule(self) -> bool {
        !matches!(self, SkipKind::None | SkipKind::Whitespaces)
    }
}

/// A skip strategy: a kind plus the rule it parses (for rule-based kinds).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SkipStrategy {
    pub kind: SkipKind,
    pub rule: Option<RuleId>,
}

impl SkipStrategy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn whitespaces() -> Self {
        Self {
            kind: SkipKind::Whitespaces,
            rule: None,
        }
    }

    pub fn with_rule(kind: SkipKind, rule: RuleId) -> Self {
        Self {
            kind,
            rule: Some(rule),
        }
    }
}

/// Fully-resolved settings in effect for one rule invocation.
///
/// Small and `Copy`; also part of the memoization key, so parse results
/// stay a pure function of `(rule, position, barriers, settings)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct ResolvedSettings {
    pub skip: SkipStrategy,
    pub error_handling: ErrorHandling,
    pub ignore_barriers: bool,
}

/// A rule's local settings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct LocalSettings {
    pub skip: Setting<SkipStrategy>,
    pub error_handling: Setting<ErrorHandling>,
    pub ignore_barriers: Setting<bool>,
}

impl LocalSettings {
    /// True when every field inherits.
    pub fn is_default(&self) -> bool {
        self.skip.mode == SettingUse::Inherit
            && self.error_handling.mode == SettingUse::Inherit
            && self.ignore_barriers.mode == SettingUse::Inherit
    }

    /// Resolve against inherited settings, returning the settings for this
    /// rule and the settings its children inherit.
    pub fn resolve(&self, inherited: ResolvedSettings) -> (ResolvedSettings, ResolvedSettings) {
        let (skip_self, skip_children) = self.skip.resolve(inherited.skip);
        let (err_self, err_children) = self.error_handling.resolve(inherited.error_handling);
        let (bar_self, bar_children) = self.ignore_barriers.resolve(inherited.ignore_barriers);
        (
            ResolvedSettings {
                skip: skip_self,
                error_handling: err_self,
                ignore_barriers: bar_self,
            },
            ResolvedSettings {
                skip: skip_children,
                error_handling: err_children,
                ignore_barriers: bar_children,
            },
        )
    }
}
