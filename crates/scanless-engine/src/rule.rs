//! Parser rules: the compiled tree matchers.
//!
//! Rules build AST nodes; their leaf variant wraps a token pattern. As with
//! tokens, the variants form one tagged enum dispatched by a hand-written
//! parser per kind, and child references are table indices.

use std::fmt;
use std::sync::Arc;

use scanless_core::{LocalSettings, Recovery, RuleId, TokenId, Value};

use crate::engine::ast::AstNode;
use crate::engine::context::{Halt, NodeIndex};
use crate::engine::rules::CustomParse;

/// Computes a rule's parsed value from its AST node.
pub type ValueFactory = Arc<dyn Fn(&AstNode<'_>) -> Value + Send + Sync>;

/// User-supplied rule body. Receives a driver that can parse the rule's
/// children (or any rule by ID) and build the result node; returns the
/// finished node, `None` for failure, or `Err` to halt the parse.
pub type CustomRuleFn =
    Arc<dyn Fn(&mut CustomParse<'_, '_, '_>) -> Result<Option<NodeIndex>, Halt> + Send + Sync>;

/// Per-element initialization flags, assigned by the compiler.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitFlags {
    /// Memoize parse results keyed by `(rule, position, barriers,
    /// settings)`.
    pub memoize: bool,
    /// Maintain the stack-trace chain across this rule.
    pub record_stack: bool,
    /// Record this rule in the walk trace.
    pub record_walk: bool,
}

/// Every parser rule variant.
#[derive(Clone)]
pub enum RuleKind {
    /// Wraps a token pattern; builds a leaf node.
    Token { token: TokenId },
    /// All children in order.
    Sequence { children: Vec<RuleId> },
    /// Ordered choice; first success wins.
    Choice { children: Vec<RuleId> },
    /// Child or an empty node at the current position; never fails.
    Optional { child: RuleId },
    /// Greedy repetition; fails below `min` matches.
    Repeat {
        child: RuleId,
        min: usize,
        max: Option<usize>,
    },
    /// Items separated by a separator rule.
    SeparatedRepeat {
        item: RuleId,
        separator: RuleId,
        min: usize,
        max: Option<usize>,
        allow_trailing: bool,
        /// Separator nodes appear among the result children.
        include_separators: bool,
    },
    /// User-supplied parse body over child rule IDs.
    Custom {
        children: Vec<RuleId>,
        parse: CustomRuleFn,
    },
}

impl RuleKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            RuleKind::Token { .. } => "token",
            RuleKind::Sequence { .. } => "sequence",
            RuleKind::Choice { .. } => "choice",
            RuleKind::Optional { .. } => "optional",
            RuleKind::Repeat { .. } => "repeat",
            RuleKind::SeparatedRepeat { .. } => "separated repeat",
            RuleKind::Custom { .. } => "custom rule",
        }
    }
}

impl fmt::Debug for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind_name())
    }
}

/// One compiled parser rule.
pub struct RuleDef {
    pub id: RuleId,
    pub kind: RuleKind,
    pub settings: LocalSettings,
    pub recovery: Recovery,
    /// Lazily computes the parsed value; kind-specific default when absent.
    pub value_factory: Option<ValueFactory>,
    pub aliases: Vec<String>,
    /// Hidden rules keep their errors out of rendered diagnostics unless
    /// message display is enabled.
    pub hidden: bool,
    pub flags: InitFlags,
}

impl RuleDef {
    pub fn new(id: RuleId, kind: RuleKind) -> Self {
        Self {
            id,
            kind,
            settings: LocalSettings::default(),
            recovery: Recovery::none(),
            value_factory: None,
            aliases: Vec::new(),
            hidden: false,
            flags: InitFlags::default(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.aliases.first().map(String::as_str)
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDef")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("aliases", &self.aliases)
            .field("recovery", &self.recovery)
            .finish()
    }
}
