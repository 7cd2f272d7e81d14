//! Buildable rule expressions: settings, recovery, and value factories.

use std::sync::Arc;

use scanless_core::{ErrorHandling, RecoveryKind, SettingUse, SkipKind, Value};
use scanless_engine::{AstNode, CustomParse, CustomRuleFn, Halt, NodeIndex, ValueFactory};

use crate::builder::token_expr::TokenExpr;

/// A rule under construction.
#[derive(Clone)]
pub struct RuleExpr {
    pub(crate) kind: RuleExprKind,
    pub(crate) settings: SettingsExpr,
    pub(crate) recovery: Option<Recover>,
    pub(crate) factory: Option<ValueFactory>,
    pub(crate) memoize: bool,
    pub(crate) hidden: bool,
}

#[derive(Clone)]
pub(crate) enum RuleExprKind {
    Ref(String),
    Token(TokenExpr),
    Sequence(Vec<RuleExpr>),
    Choice(Vec<RuleExpr>),
    Optional(Box<RuleExpr>),
    Repeat {
        child: Box<RuleExpr>,
        min: usize,
        max: Option<usize>,
    },
    SeparatedRepeat {
        item: Box<RuleExpr>,
        separator: Box<RuleExpr>,
        min: usize,
        max: Option<usize>,
        allow_trailing: bool,
        include_separators: bool,
    },
    Custom {
        children: Vec<RuleExpr>,
        parse: CustomRuleFn,
    },
}

/// Unresolved local settings: each field is a value plus its use mode;
/// skip strategies may carry the skip rule as an expression.
#[derive(Clone, Default)]
pub(crate) struct SettingsExpr {
    pub(crate) skip: Option<(SkipKind, Option<Box<RuleExpr>>, SettingUse)>,
    pub(crate) error_handling: Option<(ErrorHandling, SettingUse)>,
    pub(crate) ignore_barriers: Option<(bool, SettingUse)>,
}

/// An error-recovery strategy under construction.
#[derive(Clone)]
pub struct Recover {
    pub(crate) kind: RecoveryKind,
    pub(crate) anchor: Option<Box<RuleExpr>>,
    pub(crate) stop: Option<Box<RuleExpr>>,
    pub(crate) repeat: bool,
}

impl Recover {
    /// Scan forward until the failed rule parses again.
    pub fn find_next() -> Self {
        Self {
            kind: RecoveryKind::FindNext,
            anchor: None,
            stop: None,
            repeat: false,
        }
    }

    /// Scan forward until the anchor matches; re-parse at the anchor.
    pub fn skip_until(anchor: impl Into<RuleExpr>) -> Self {
        Self {
            kind: RecoveryKind::SkipUntilAnchor,
            anchor: Some(Box::new(anchor.into())),
            stop: None,
            repeat: false,
        }
    }

    /// Scan forward until the anchor matches; re-parse after it.
    pub fn skip_after(anchor: impl Into<RuleExpr>) -> Self {
        Self {
            kind: RecoveryKind::SkipAfterAnchor,
            anchor: Some(Box::new(anchor.into())),
            stop: None,
            repeat: false,
        }
    }

    /// Abort the scan once this rule matches.
    pub fn until(mut self, stop: impl Into<RuleExpr>) -> Self {
        self.stop = Some(Box::new(stop.into()));
        if self.kind == RecoveryKind::FindNext {
            self.kind = RecoveryKind::FindNextUntil;
        }
        self
    }

    /// Re-enter recovery past the anchor when the re-parse still fails.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }
}

fn rule(kind: RuleExprKind) -> RuleExpr {
    RuleExpr {
        kind,
        settings: SettingsExpr::default(),
        recovery: None,
        factory: None,
        memoize: false,
        hidden: false,
    }
}

/// Reference a named rule.
pub fn rule_ref(name: &str) -> RuleExpr {
    rule(RuleExprKind::Ref(name.to_owned()))
}

/// Items separated by a separator, with every knob exposed.
pub fn separated(
    item: impl Into<RuleExpr>,
    separator: impl Into<RuleExpr>,
    min: usize,
    max: Option<usize>,
    allow_trailing: bool,
    include_separators: bool,
) -> RuleExpr {
    rule(RuleExprKind::SeparatedRepeat {
        item: Box::new(item.into()),
        separator: Box::new(separator.into()),
        min,
        max,
        allow_trailing,
        include_separators,
    })
}

/// A rule with a user-supplied parse body over child rules.
pub fn custom_rule(
    children: Vec<RuleExpr>,
    parse: impl Fn(&mut CustomParse<'_, '_, '_>) -> Result<Option<NodeIndex>, Halt>
    + Send
    + Sync
    + 'static,
) -> RuleExpr {
    rule(RuleExprKind::Custom {
        children,
        parse: Arc::new(parse),
    })
}

impl From<TokenExpr> for RuleExpr {
    fn from(token: TokenExpr) -> RuleExpr {
        rule(RuleExprKind::Token(token))
    }
}

impl RuleExpr {
    /// Sequence: this, then `next`.
    pub fn then(mut self, next: impl Into<RuleExpr>) -> RuleExpr {
        if self.is_plain()
            && let RuleExprKind::Sequence(children) = &mut self.kind
        {
            children.push(next.into());
            return self;
        }
        rule(RuleExprKind::Sequence(vec![self, next.into()]))
    }

    /// Ordered choice: this, or `other`.
    pub fn or(mut self, other: impl Into<RuleExpr>) -> RuleExpr {
        if self.is_plain()
            && let RuleExprKind::Choice(children) = &mut self.kind
        {
            children.push(other.into());
            return self;
        }
        rule(RuleExprKind::Choice(vec![self, other.into()]))
    }

    pub fn optional(self) -> RuleExpr {
        rule(RuleExprKind::Optional(Box::new(self)))
    }

    pub fn repeat(self, min: usize, max: Option<usize>) -> RuleExpr {
        rule(RuleExprKind::Repeat {
            child: Box::new(self),
            min,
            max,
        })
    }

    pub fn zero_or_more(self) -> RuleExpr {
        self.repeat(0, None)
    }

    pub fn one_or_more(self) -> RuleExpr {
        self.repeat(1, None)
    }

    /// One or more items separated by `separator`.
    pub fn separated_by(self, separator: impl Into<RuleExpr>) -> RuleExpr {
        separated(self, separator, 1, None, false, false)
    }

    /// [`Self::separated_by`] tolerating a trailing separator.
    pub fn separated_by_trailing(self, separator: impl Into<RuleExpr>) -> RuleExpr {
        separated(self, separator, 1, None, true, false)
    }

    /// Attach a parsed-value factory, run lazily on value access.
    pub fn value(
        mut self,
        factory: impl Fn(&AstNode<'_>) -> Value + Send + Sync + 'static,
    ) -> RuleExpr {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Memoize parse results for this rule.
    pub fn memoized(mut self) -> RuleExpr {
        self.memoize = true;
        self
    }

    /// Keep this rule's errors out of rendered diagnostics.
    pub fn hidden(mut self) -> RuleExpr {
        self.hidden = true;
        self
    }

    /// Attach an error-recovery strategy.
    pub fn recover(mut self, recover: Recover) -> RuleExpr {
        self.recovery = Some(recover);
        self
    }

    /// Skip whitespace before this rule and its children.
    pub fn skip_ws(mut self) -> RuleExpr {
        self.settings.skip = Some((
            SkipKind::Whitespaces,
            None,
            SettingUse::LocalForSelfAndChildren,
        ));
        self
    }

    /// Use a skip rule with the given strategy kind, for this rule and its
    /// children.
    pub fn with_skip(mut self, kind: SkipKind, skip: impl Into<RuleExpr>) -> RuleExpr {
        self.settings.skip = Some((
            kind,
            Some(Box::new(skip.into())),
            SettingUse::LocalForSelfAndChildren,
        ));
        self
    }

    /// Disable skipping for this rule and its children.
    pub fn no_skip(mut self) -> RuleExpr {
        self.settings.skip = Some((SkipKind::None, None, SettingUse::LocalForSelfAndChildren));
        self
    }

    /// Disable skipping for this rule only.
    pub fn no_skip_self(mut self) -> RuleExpr {
        self.settings.skip = Some((SkipKind::None, None, SettingUse::LocalForSelf));
        self
    }

    /// Set the error-handling mode with an explicit scope.
    pub fn error_handling(mut self, handling: ErrorHandling, scope: SettingUse) -> RuleExpr {
        self.settings.error_handling = Some((handling, scope));
        self
    }

    /// Fail silently: no error records from this rule or its children.
    pub fn silent(self) -> RuleExpr {
        self.error_handling(ErrorHandling::NoRecord, SettingUse::LocalForSelfAndChildren)
    }

    /// Hard assertion: a failure here terminates the whole parse.
    pub fn throw_on_fail(self) -> RuleExpr {
        self.error_handling(ErrorHandling::Throw, SettingUse::LocalForSelf)
    }

    /// Ignore barrier tokens for this rule and its children.
    pub fn ignore_barriers(mut self) -> RuleExpr {
        self.settings.ignore_barriers = Some((true, SettingUse::LocalForSelfAndChildren));
        self
    }

    fn is_plain(&self) -> bool {
        self.settings.skip.is_none()
            && self.settings.error_handling.is_none()
            && self.settings.ignore_barriers.is_none()
            && self.recovery.is_none()
            && self.factory.is_none()
            && !self.memoize
            && !self.hidden
    }
}
