//! The grammar compiler.
//!
//! Turns the buildable expression trees into the two flat tables. Named
//! elements get their IDs pre-assigned so cyclic references resolve;
//! anonymous elements are compiled post-order and deduplicated by a
//! structural key. Closure identity is the `Arc` pointer, so shared
//! expressions still merge while distinct closures never do.

mod analysis;


use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use scanless_core::{
    BarrierTokenizer, GrammarError, IndentTokenizer, LiteralTrie, LocalSettings, Recovery,
    ResolvedSettings, RuleId, Setting, SkipStrategy, TokenId, TokenPattern, TokenPatternKind,
    Value,
};
use scanless_engine::{Grammar, GrammarParts, RuleDef, RuleKind, ValueFactory};

use crate::builder::rule_expr::{Recover, RuleExpr, RuleExprKind, SettingsExpr};
use crate::builder::token_expr::{TokenExpr, TokenExprKind};
use crate::builder::{BarrierSpec, GrammarBuilder};

pub(crate) fn compile(builder: GrammarBuilder) -> Result<Grammar, GrammarError> {
    if let Some(error) = builder.pending_errors.first() {
        return Err(error.clone());
    }

    let mut c = Compiler::default();

    // Pass 1: pre-assign IDs for every named element so references (and
    // cycles) resolve before bodies are compiled.
    for name in builder.tokens.keys() {
        let id = TokenId::from_raw(c.tokens.len() as u32);
        let mut placeholder = TokenPattern::new(id, TokenPatternKind::Eof);
        placeholder.aliases.push(name.clone());
        c.tokens.push(placeholder);
        c.token_names.insert(name.clone(), id);
    }
    for name in builder.rules.keys() {
        let id = RuleId::from_raw(c.rules.len() as u32);
        let mut placeholder = RuleDef::new(id, RuleKind::Sequence {
            children: Vec::new(),
        });
        placeholder.aliases.push(name.clone());
        c.rules.push(placeholder);
        c.rule_names.insert(name.clone(), id);
    }

    // Pass 2: compile bodies into the pre-assigned slots.
    for (name, expr) in builder.tokens {
        let id = c.token_names[name.as_str()];
        let hidden = expr.hidden;
        let kind = match expr.kind {
            TokenExprKind::Ref(target) => {
                let target = c.resolve_token(&target)?;
                c.tokens[target.index()].kind.clone()
            }
            kind => {
                let (kind, key) = c.lower_token_kind(kind)?;
                if let Some(key) = key {
                    c.token_keys.entry(keyed(hidden, &key)).or_insert(id);
                }
                kind
            }
        };
        c.tokens[id.index()].kind = kind;
        c.tokens[id.index()].hidden = hidden;
    }
    for (name, expr) in builder.rules {
        let id = c.rule_names[name.as_str()];
        let lowered = c.lower_rule(expr)?;
        if let Some(key) = &lowered.key {
            c.rule_keys.entry(key.clone()).or_insert(id);
        }
        let slot = &mut c.rules[id.index()];
        slot.kind = lowered.kind;
        slot.settings = lowered.settings;
        slot.recovery = lowered.recovery;
        slot.value_factory = lowered.factory;
        slot.hidden = lowered.hidden;
        slot.flags.memoize = lowered.memoize;
    }

    // The global skip rule compiles before the analysis passes so its
    // tokens get metadata too.
    let mut default_settings = ResolvedSettings::default();
    if let Some((kind, skip_rule)) = builder.global_skip {
        let rule = match skip_rule {
            Some(expr) => Some(c.compile_rule(expr)?),
            None => None,
        };
        if kind.requires_rule() && rule.is_none() {
            return Err(GrammarError::MissingSkipRule);
        }
        default_settings.skip = SkipStrategy { kind, rule };
    }

    // Matching metadata and choice lookahead tables.
    analysis::compute_metas(&mut c.tokens);
    analysis::build_lookaheads(&mut c.tokens);

    // Grammar-wide debug switches become per-element init flags.
    for rule in &mut c.rules {
        rule.flags.record_stack = builder.debug.stack_traces;
        rule.flags.record_walk = builder.debug.walk_trace.is_some();
    }

    // Re-bind barrier tokenizers to their compiled token IDs.
    let mut barrier_tokenizers: Vec<Arc<dyn BarrierTokenizer>> = Vec::new();
    for spec in builder.barriers {
        match spec {
            BarrierSpec::Indent {
                indent,
                dedent,
                newline,
                tab_width,
            } => {
                let mut tokenizer = IndentTokenizer::new(
                    c.resolve_token(&indent)?,
                    c.resolve_token(&dedent)?,
                )
                .tab_width(tab_width);
                if let Some(newline) = newline {
                    tokenizer = tokenizer.with_newline(c.resolve_token(&newline)?);
                }
                barrier_tokenizers.push(Arc::new(tokenizer));
            }
            BarrierSpec::Custom(tokenizer) => barrier_tokenizers.push(tokenizer),
        }
    }

    let main_rule = match &builder.main {
        Some(name) => Some(c.resolve_rule(name)?),
        None => None,
    };

    Ok(Grammar::from_parts(GrammarParts {
        tokens: c.tokens,
        rules: c.rules,
        token_names: c.token_names,
        rule_names: c.rule_names,
        main_rule,
        default_settings,
        barrier_tokenizers,
        debug: builder.debug,
        error_display: builder.error_display,
    }))
}

fn keyed(hidden: bool, key: &str) -> String {
    format!("{}:{key}", hidden as u8)
}

struct LoweredRule {
    kind: RuleKind,
    settings: LocalSettings,
    recovery: Recovery,
    factory: Option<ValueFactory>,
    memoize: bool,
    hidden: bool,
    key: Option<String>,
}

#[derive(Default)]
struct Compiler {
    tokens: Vec<TokenPattern>,
    rules: Vec<RuleDef>,
    token_names: IndexMap<String, TokenId>,
    rule_names: IndexMap<String, RuleId>,
    token_keys: HashMap<String, TokenId>,
    rule_keys: HashMap<String, RuleId>,
    opaque: u64,
}

impl Compiler {
    fn resolve_token(&self, name: &str) -> Result<TokenId, GrammarError> {
        self.token_names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownToken(name.to_owned()))
    }

    fn resolve_rule(&self, name: &str) -> Result<RuleId, GrammarError> {
        self.rule_names
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownRule(name.to_owned()))
    }

    fn next_opaque(&mut self) -> String {
        self.opaque += 1;
        format!("opaque:{}", self.opaque)
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    fn compile_token(&mut self, expr: TokenExpr) -> Result<TokenId, GrammarError> {
        if let TokenExprKind::Ref(name) = &expr.kind {
            return self.resolve_token(name);
        }
        let hidden = expr.hidden;
        let (kind, key) = self.lower_token_kind(expr.kind)?;
        let key = key.map(|k| keyed(hidden, &k));
        if let Some(key) = &key
            && let Some(&id) = self.token_keys.get(key)
        {
            return Ok(id);
        }
        let id = TokenId::from_raw(self.tokens.len() as u32);
        let mut pattern = TokenPattern::new(id, kind);
        pattern.hidden = hidden;
        self.tokens.push(pattern);
        if let Some(key) = key {
            self.token_keys.insert(key, id);
        }
        Ok(id)
    }

    fn compile_tokens(&mut self, exprs: Vec<TokenExpr>) -> Result<Vec<TokenId>, GrammarError> {
        exprs
            .into_iter()
            .map(|child| self.compile_token(child))
            .collect()
    }

    fn lower_token_kind(
        &mut self,
        kind: TokenExprKind,
    ) -> Result<(TokenPatternKind, Option<String>), GrammarError> {
        match kind {
            TokenExprKind::Ref(_) => unreachable!("refs resolve before lowering"),

            TokenExprKind::LiteralChar(ch, comparison) => Ok((
                TokenPatternKind::LiteralChar { ch, comparison },
                Some(format!("litchar:{comparison:?}:{ch}")),
            )),

            TokenExprKind::Literal(text, comparison) => {
                if text.is_empty() {
                    return Err(GrammarError::EmptyLiteral);
                }
                let key = format!("lit:{comparison:?}:{text}");
                Ok((TokenPatternKind::Literal { text, comparison }, Some(key)))
            }

            TokenExprKind::LiteralChoice(literals, comparison) => {
                validate_literals(&literals)?;
                let trie = LiteralTrie::from_literals(&literals, comparison);
                let key = format!("litset:{comparison:?}:{}", literals.join("\u{1}"));
                Ok((TokenPatternKind::LiteralChoice { literals, trie }, Some(key)))
            }

            TokenExprKind::KeywordChoice {
                literals,
                comparison,
                prohibited,
            } => {
                validate_literals(&literals)?;
                let trie = LiteralTrie::from_literals(&literals, comparison);
                let key = format!(
                    "kwset:{comparison:?}:{}:{}",
                    prohibited.fn_ptr(),
                    literals.join("\u{1}")
                );
                Ok((
                    TokenPatternKind::KeywordChoice {
                        literals,
                        trie,
                        prohibited,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Char(class) => {
                let key = format!("char:{}", class.fn_ptr());
                Ok((TokenPatternKind::Char { class }, Some(key)))
            }

            TokenExprKind::RepeatChars { class, min, max } => {
                check_bounds(min, max)?;
                let key = format!("chrun:{}:{min}:{max:?}", class.fn_ptr());
                Ok((TokenPatternKind::RepeatChars { class, min, max }, Some(key)))
            }

            TokenExprKind::Identifier {
                start,
                cont,
                min_len,
                max_len,
            } => {
                check_bounds(min_len, max_len)?;
                let key = format!(
                    "ident:{}:{}:{min_len}:{max_len:?}",
                    start.fn_ptr(),
                    cont.fn_ptr()
                );
                Ok((
                    TokenPatternKind::Identifier {
                        start,
                        cont,
                        min_len,
                        max_len,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Number { kind, flags } => Ok((
                TokenPatternKind::Number { kind, flags },
                Some(format!("num:{kind:?}:{flags:?}")),
            )),

            TokenExprKind::IntegerNumber {
                kind,
                allow_sign,
                default_base,
                base_prefixes,
                group_separator,
            } => {
                let key = format!(
                    "int:{kind:?}:{allow_sign}:{default_base}:{base_prefixes:?}:{group_separator:?}"
                );
                Ok((
                    TokenPatternKind::IntegerNumber {
                        kind,
                        allow_sign,
                        default_base,
                        base_prefixes,
                        group_separator,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Regex(pattern) => {
                let regex = regex_automata::meta::Regex::new(&pattern).map_err(|e| {
                    GrammarError::InvalidRegex {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    }
                })?;
                let key = format!("regex:{pattern}");
                Ok((TokenPatternKind::Regex { pattern, regex }, Some(key)))
            }

            TokenExprKind::EscapedText {
                strategy,
                allow_empty,
                consume_stop,
            } => {
                let key = format!(
                    "esc:{}:{allow_empty}:{consume_stop}",
                    Arc::as_ptr(&strategy) as *const () as usize
                );
                Ok((
                    TokenPatternKind::EscapedText {
                        strategy,
                        allow_empty,
                        consume_stop,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Whitespaces => Ok((TokenPatternKind::Whitespaces, Some("ws".into()))),
            TokenExprKind::Spaces => Ok((TokenPatternKind::Spaces, Some("sp".into()))),
            TokenExprKind::Newline => Ok((TokenPatternKind::Newline, Some("nl".into()))),
            TokenExprKind::Eof => Ok((TokenPatternKind::Eof, Some("eof".into()))),
            TokenExprKind::AllText => Ok((TokenPatternKind::AllText, Some("all".into()))),

            TokenExprKind::Barrier(name) => {
                let key = format!("barrier:{name}");
                Ok((TokenPatternKind::Barrier { name }, Some(key)))
            }

            TokenExprKind::Sequence(children, passage) => {
                let children = self.compile_tokens(children)?;
                let key = match &passage {
                    None => Some(format!("seq:{}", ids_key(&children))),
                    Some(passage) => Some(format!(
                        "seqp:{}:{}",
                        ids_key(&children),
                        Arc::as_ptr(passage) as *const () as usize
                    )),
                };
                Ok((TokenPatternKind::Sequence { children, passage }, key))
            }

            TokenExprKind::Choice(children) => {
                if children.is_empty() {
                    return Err(GrammarError::EmptyChoice);
                }
                let children = self.compile_tokens(children)?;
                let key = format!("alt:{}", ids_key(&children));
                Ok((
                    TokenPatternKind::Choice {
                        children,
                        lookahead: None,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Optional(child) => {
                let child = self.compile_token(*child)?;
                Ok((
                    TokenPatternKind::Optional { child },
                    Some(format!("opt:{}", child.as_u32())),
                ))
            }

            TokenExprKind::Repeat { child, min, max } => {
                check_bounds(min, max)?;
                let child = self.compile_token(*child)?;
                Ok((
                    TokenPatternKind::Repeat { child, min, max },
                    Some(format!("rep:{}:{min}:{max:?}", child.as_u32())),
                ))
            }

            TokenExprKind::SeparatedRepeat {
                item,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
            } => {
                check_bounds(min, max)?;
                let item = self.compile_token(*item)?;
                let separator = self.compile_token(*separator)?;
                let key = format!(
                    "seprep:{}:{}:{min}:{max:?}:{allow_trailing}:{include_separators}",
                    item.as_u32(),
                    separator.as_u32()
                );
                Ok((
                    TokenPatternKind::SeparatedRepeat {
                        item,
                        separator,
                        min,
                        max,
                        allow_trailing,
                        include_separators,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Between { open, body, close } => {
                let open = self.compile_token(*open)?;
                let body = self.compile_token(*body)?;
                let close = self.compile_token(*close)?;
                let key = format!(
                    "btw:{}:{}:{}",
                    open.as_u32(),
                    body.as_u32(),
                    close.as_u32()
                );
                Ok((TokenPatternKind::Between { open, body, close }, Some(key)))
            }

            TokenExprKind::First(a, b) => {
                let a = self.compile_token(*a)?;
                let b = self.compile_token(*b)?;
                Ok((
                    TokenPatternKind::First { a, b },
                    Some(format!("first:{}:{}", a.as_u32(), b.as_u32())),
                ))
            }

            TokenExprKind::Second(a, b) => {
                let a = self.compile_token(*a)?;
                let b = self.compile_token(*b)?;
                Ok((
                    TokenPatternKind::Second { a, b },
                    Some(format!("second:{}:{}", a.as_u32(), b.as_u32())),
                ))
            }

            TokenExprKind::Map { child, map } => {
                let child = self.compile_token(*child)?;
                let key = format!(
                    "map:{}:{}",
                    child.as_u32(),
                    Arc::as_ptr(&map) as *const () as usize
                );
                Ok((TokenPatternKind::Map { child, map }, Some(key)))
            }

            TokenExprKind::Return { child, value } => {
                let child = self.compile_token(*child)?;
                let key = value_key(&value)
                    .map(|v| format!("ret:{}:{v}", child.as_u32()))
                    .unwrap_or_else(|| self.next_opaque());
                Ok((TokenPatternKind::Return { child, value }, Some(key)))
            }

            TokenExprKind::FailIf {
                child,
                condition,
                message,
            } => {
                let child = self.compile_token(*child)?;
                let key = format!(
                    "failif:{}:{}:{message}",
                    child.as_u32(),
                    Arc::as_ptr(&condition) as *const () as usize
                );
                Ok((
                    TokenPatternKind::FailIf {
                        child,
                        condition,
                        message,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Cond {
                condition,
                then_token,
                else_token,
            } => {
                let then_token = self.compile_token(*then_token)?;
                let else_token = match else_token {
                    Some(expr) => Some(self.compile_token(*expr)?),
                    None => None,
                };
                let key = format!(
                    "cond:{}:{}:{:?}",
                    Arc::as_ptr(&condition) as *const () as usize,
                    then_token.as_u32(),
                    else_token.map(TokenId::as_u32)
                );
                Ok((
                    TokenPatternKind::Cond {
                        condition,
                        then_token,
                        else_token,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::SkipWhitespaces(child) => {
                let child = self.compile_token(*child)?;
                Ok((
                    TokenPatternKind::SkipWhitespaces { child },
                    Some(format!("skipws:{}", child.as_u32())),
                ))
            }

            TokenExprKind::CaptureText {
                child,
                trim_start,
                trim_end,
            } => {
                let child = self.compile_token(*child)?;
                let key = format!("capture:{}:{trim_start}:{trim_end}", child.as_u32());
                Ok((
                    TokenPatternKind::CaptureText {
                        child,
                        trim_start,
                        trim_end,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::TextUntil {
                stop,
                allow_empty,
                consume_stop,
                fail_on_eof,
            } => {
                let stop = self.compile_token(*stop)?;
                let key = format!(
                    "until:{}:{allow_empty}:{consume_stop}:{fail_on_eof}",
                    stop.as_u32()
                );
                Ok((
                    TokenPatternKind::TextUntil {
                        stop,
                        allow_empty,
                        consume_stop,
                        fail_on_eof,
                    },
                    Some(key),
                ))
            }

            TokenExprKind::Custom { children, matcher } => {
                let children = self.compile_tokens(children)?;
                let key = format!(
                    "custom:{}:{}",
                    ids_key(&children),
                    Arc::as_ptr(&matcher) as *const () as usize
                );
                Ok((TokenPatternKind::Custom { children, matcher }, Some(key)))
            }
        }
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    fn compile_rule(&mut self, expr: RuleExpr) -> Result<RuleId, GrammarError> {
        if let RuleExprKind::Ref(name) = &expr.kind {
            return self.resolve_rule(name);
        }
        let lowered = self.lower_rule(expr)?;
        if let Some(key) = &lowered.key
            && let Some(&id) = self.rule_keys.get(key)
        {
            return Ok(id);
        }
        let id = RuleId::from_raw(self.rules.len() as u32);
        let mut def = RuleDef::new(id, lowered.kind);
        def.settings = lowered.settings;
        def.recovery = lowered.recovery;
        def.value_factory = lowered.factory;
        def.hidden = lowered.hidden;
        def.flags.memoize = lowered.memoize;
        self.rules.push(def);
        if let Some(key) = lowered.key {
            self.rule_keys.insert(key, id);
        }
        Ok(id)
    }

    fn lower_rule(&mut self, expr: RuleExpr) -> Result<LoweredRule, GrammarError> {
        let RuleExpr {
            kind,
            settings,
            recovery,
            factory,
            memoize,
            hidden,
        } = expr;

        let (settings, settings_key) = self.lower_settings(settings)?;
        let recovery = self.lower_recovery(recovery)?;

        let (kind, kind_key) = match kind {
            RuleExprKind::Ref(name) => {
                let target = self.resolve_rule(&name)?;
                (self.rules[target.index()].kind.clone(), None)
            }
            RuleExprKind::Token(token) => {
                let token = self.compile_token(token)?;
                (
                    RuleKind::Token { token },
                    Some(format!("tok:{}", token.as_u32())),
                )
            }
            RuleExprKind::Sequence(children) => {
                let children = self.compile_rules(children)?;
                let key = format!("seq:{}", rule_ids_key(&children));
                (RuleKind::Sequence { children }, Some(key))
            }
            RuleExprKind::Choice(children) => {
                if children.is_empty() {
                    return Err(GrammarError::EmptyChoice);
                }
                let children = self.compile_rules(children)?;
                let key = format!("alt:{}", rule_ids_key(&children));
                (RuleKind::Choice { children }, Some(key))
            }
            RuleExprKind::Optional(child) => {
                let child = self.compile_rule(*child)?;
                (
                    RuleKind::Optional { child },
                    Some(format!("opt:{}", child.as_u32())),
                )
            }
            RuleExprKind::Repeat { child, min, max } => {
                check_bounds(min, max)?;
                let child = self.compile_rule(*child)?;
                (
                    RuleKind::Repeat { child, min, max },
                    Some(format!("rep:{}:{min}:{max:?}", child.as_u32())),
                )
            }
            RuleExprKind::SeparatedRepeat {
                item,
                separator,
                min,
                max,
                allow_trailing,
                include_separators,
            } => {
                check_bounds(min, max)?;
                let item = self.compile_rule(*item)?;
                let separator = self.compile_rule(*separator)?;
                let key = format!(
                    "seprep:{}:{}:{min}:{max:?}:{allow_trailing}:{include_separators}",
                    item.as_u32(),
                    separator.as_u32()
                );
                (
                    RuleKind::SeparatedRepeat {
                        item,
                        separator,
                        min,
                        max,
                        allow_trailing,
                        include_separators,
                    },
                    Some(key),
                )
            }
            RuleExprKind::Custom { children, parse } => {
                let children = self.compile_rules(children)?;
                let key = format!(
                    "custom:{}:{}",
                    rule_ids_key(&children),
                    Arc::as_ptr(&parse) as *const () as usize
                );
                (RuleKind::Custom { children, parse }, Some(key))
            }
        };

        // Factories are opaque: a rule carrying one never deduplicates
        // against another definition.
        let key = match (&kind_key, &factory) {
            (Some(kind_key), None) => Some(format!(
                "{kind_key}|{settings_key}|{recovery:?}|h{hidden}|m{memoize}"
            )),
            _ => None,
        };

        Ok(LoweredRule {
            kind,
            settings,
            recovery,
            factory,
            memoize,
            hidden,
            key,
        })
    }

    fn compile_rules(&mut self, exprs: Vec<RuleExpr>) -> Result<Vec<RuleId>, GrammarError> {
        exprs
            .into_iter()
            .map(|child| self.compile_rule(child))
            .collect()
    }

    fn lower_settings(
        &mut self,
        settings: SettingsExpr,
    ) -> Result<(LocalSettings, String), GrammarError> {
        let mut out = LocalSettings::default();
        if let Some((kind, skip_rule, mode)) = settings.skip {
            let rule = match skip_rule {
                Some(expr) => Some(self.compile_rule(*expr)?),
                None => None,
            };
            if kind.requires_rule() && rule.is_none() {
                return Err(GrammarError::MissingSkipRule);
            }
            out.skip = Setting {
                value: SkipStrategy { kind, rule },
                mode,
            };
        }
        if let Some((handling, mode)) = settings.error_handling {
            out.error_handling = Setting {
                value: handling,
                mode,
            };
        }
        if let Some((ignore, mode)) = settings.ignore_barriers {
            out.ignore_barriers = Setting {
                value: ignore,
                mode,
            };
        }
        let key = format!("{out:?}");
        Ok((out, key))
    }

    fn lower_recovery(&mut self, recovery: Option<Recover>) -> Result<Recovery, GrammarError> {
        let Some(recover) = recovery else {
            return Ok(Recovery::none());
        };
        let anchor = match recover.anchor {
            Some(expr) => Some(self.compile_rule(*expr)?),
            None => None,
        };
        let stop = match recover.stop {
            Some(expr) => Some(self.compile_rule(*expr)?),
            None => None,
        };
        if recover.kind.requires_anchor() && anchor.is_none() {
            return Err(GrammarError::MissingAnchor);
        }
        Ok(Recovery {
            kind: recover.kind,
            anchor,
            stop,
            repeat: recover.repeat,
        })
    }
}

fn validate_literals(literals: &[String]) -> Result<(), GrammarError> {
    if literals.is_empty() {
        return Err(GrammarError::EmptyChoice);
    }
    if literals.iter().any(String::is_empty) {
        return Err(GrammarError::EmptyLiteral);
    }
    Ok(())
}

fn check_bounds(min: usize, max: Option<usize>) -> Result<(), GrammarError> {
    match max {
        Some(max) if min > max => Err(GrammarError::InvalidRepeatBounds { min, max }),
        _ => Ok(()),
    }
}

fn ids_key(ids: &[TokenId]) -> String {
    ids.iter()
        .map(|id| id.as_u32().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn rule_ids_key(ids: &[RuleId]) -> String {
    ids.iter()
        .map(|id| id.as_u32().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Stable key for a fixed value, or `None` when it contains an opaque
/// payload.
fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::Any(_) => None,
        Value::Array(items) => {
            let keys: Option<Vec<String>> = items.iter().map(value_key).collect();
            keys.map(|k| format!("[{}]", k.join(",")))
        }
        Value::Object(fields) => {
            let keys: Option<Vec<String>> = fields
                .iter()
                .map(|(k, v)| value_key(v).map(|v| format!("{k}={v}")))
                .collect();
            keys.map(|k| format!("{{{}}}", k.join(",")))
        }
        other => Some(format!("{other:?}")),
    }
}
