//! Error grouping, relevance, and rendering.
//!
//! Records are grouped by position. Recovery indices split the input into
//! windows; within each window the furthest group is the relevant one:
//! the diagnostic a user actually wants is the furthest point the parser
//! reached before giving up (or recovering). Rendering goes through
//! annotate-snippets, one snippet per shown group.

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use crate::engine::context::{ErrorElement, ErrorRecord, FurthestError, ParserContext};
use crate::engine::trace::{StackFrame, WalkStep, WalkTrace};
use crate::grammar::Grammar;

/// Errors recorded at one position.
#[derive(Debug, Clone)]
pub struct ErrorGroup {
    pub position: usize,
    pub records: Vec<ErrorRecord>,
    /// Furthest group within its recovery window.
    pub relevant: bool,
}

/// Group records by position and mark relevance.
///
/// Windows are bounded by the sorted recovery indices; a group is relevant
/// iff no other group in its window lies further.
pub fn group_errors(records: &[ErrorRecord], recovery_indices: &[usize]) -> Vec<ErrorGroup> {
    let mut groups: Vec<ErrorGroup> = Vec::new();
    let mut sorted: Vec<&ErrorRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.position);
    for record in sorted {
        match groups.last_mut() {
            Some(group) if group.position == record.position => {
                group.records.push(record.clone());
            }
            _ => groups.push(ErrorGroup {
                position: record.position,
                records: vec![record.clone()],
                relevant: false,
            }),
        }
    }

    let mut bounds: Vec<usize> = recovery_indices.to_vec();
    bounds.sort_unstable();

    // Window of a position = number of recovery indices at or before it.
    let window_of = |pos: usize| bounds.iter().take_while(|b| **b <= pos).count();
    let mut furthest_per_window: Vec<(usize, usize)> = Vec::new();
    for group in &groups {
        let w = window_of(group.position);
        match furthest_per_window.iter_mut().find(|(win, _)| *win == w) {
            Some((_, max)) => *max = (*max).max(group.position),
            None => furthest_per_window.push((w, group.position)),
        }
    }
    for group in &mut groups {
        let w = window_of(group.position);
        group.relevant = furthest_per_window
            .iter()
            .any(|(win, max)| *win == w && *max == group.position);
    }
    groups
}

/// 1-based line and column of a byte offset.
pub fn line_col(input: &str, position: usize) -> (usize, usize) {
    let position = position.min(input.len());
    let mut line = 1usize;
    let mut line_start = 0usize;
    for (i, c) in input.char_indices() {
        if i >= position {
            break;
        }
        if c == '\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, input[line_start..position].chars().count() + 1)
}

/// The user-visible parse failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{rendered}")]
pub struct ParseFailure {
    /// Furthest relevant position.
    pub position: usize,
    pub line: usize,
    pub column: usize,
    /// Expected productions at that position.
    pub expected: Vec<String>,
    /// Full rendered diagnostic.
    pub rendered: String,
}

pub(crate) fn failure_from_context(
    g: &Grammar,
    input: &str,
    ctx: &ParserContext<'_>,
    halt: Option<ErrorRecord>,
) -> ParseFailure {
    let mut records = ctx.errors.clone();
    if let Some(record) = halt {
        records.push(record);
    }
    if records.is_empty() {
        // Nothing was recorded (all-NoRecord grammars): report the start.
        let (line, column) = line_col(input, 0);
        return ParseFailure {
            position: 0,
            line,
            column,
            expected: Vec::new(),
            rendered: format!("parsing failed at line {line}, column {column}"),
        };
    }

    let groups = group_errors(&records, &ctx.recovery_indices);
    let relevant: Vec<&ErrorGroup> = groups.iter().filter(|g| g.relevant).collect();
    let shown = if g.error_display().more_groups {
        relevant.len().min(5)
    } else {
        1
    };
    let chosen = &relevant[relevant.len() - shown..];
    let last = chosen.last().expect("at least one relevant group");

    let (line, column) = line_col(input, last.position);
    let mut rendered = String::new();
    for (i, group) in chosen.iter().enumerate() {
        if i > 0 {
            rendered.push('\n');
        }
        rendered.push_str(&render_group(g, input, group));
    }
    if let Some(walk) = ctx.walk_trace() {
        rendered.push('\n');
        rendered.push_str(&render_walk(g, walk));
    }

    ParseFailure {
        position: last.position,
        line,
        column,
        expected: expected_list(g, last),
        rendered,
    }
}

/// Failure for a bare token match (no context, no groups).
pub(crate) fn failure_from_furthest(
    g: &Grammar,
    input: &str,
    furthest: FurthestError,
) -> ParseFailure {
    let (line, column) = line_col(input, furthest.position);
    let expected: Vec<String> = furthest
        .token
        .map(|t| g.token_display(t))
        .into_iter()
        .collect();
    let label = match (&expected[..], &furthest.message) {
        (_, Some(message)) => message.clone(),
        ([only], None) => format!("expected {only}"),
        _ => "token match failed".to_owned(),
    };
    let title = format!("syntax error at line {line}, column {column}");
    let rendered = render_snippet(input, furthest.position, 0, &title, &label);
    ParseFailure {
        position: furthest.position,
        line,
        column,
        expected,
        rendered,
    }
}

fn expected_list(g: &Grammar, group: &ErrorGroup) -> Vec<String> {
    let show_hidden = g.error_display().show_messages;
    let mut out: Vec<String> = Vec::new();
    for record in &group.records {
        if record.hidden && !show_hidden {
            continue;
        }
        let display = match record.element {
            ErrorElement::Token(id) => g.token_display(id),
            ErrorElement::Rule(id) => g.rule_display(id),
        };
        if !out.contains(&display) {
            out.push(display);
        }
    }
    out
}

fn render_group(g: &Grammar, input: &str, group: &ErrorGroup) -> String {
    let (line, column) = line_col(input, group.position);
    let title = format!("syntax error at line {line}, column {column}");

    let expected = if g.error_display().show_rules {
        expected_list(g, group)
    } else {
        Vec::new()
    };
    let mut label = if expected.is_empty() {
        "unexpected input".to_owned()
    } else {
        format!("expected {}", expected.join(", "))
    };
    if g.error_display().show_messages {
        for record in &group.records {
            if let Some(message) = &record.message {
                label.push_str("; ");
                label.push_str(message);
            }
        }
    }

    let length = group.records.iter().map(|r| r.length).max().unwrap_or(0);
    let mut rendered = render_snippet(input, group.position, length, &title, &label);

    if let Some(stack) = group.records.iter().find_map(|r| r.stack.as_ref()) {
        rendered.push('\n');
        rendered.push_str(&render_stack(g, input, stack));
    }
    rendered
}

fn render_snippet(input: &str, position: usize, length: usize, title: &str, label: &str) -> String {
    let start = position.min(input.len());
    // Zero-width spans widen to one character for visibility.
    let end = (start + length.max(1)).min(input.len()).max(start);
    let (start, end) = if start == end && start > 0 {
        (start - 1, start)
    } else {
        (start, end)
    };

    let snippet = Snippet::source(input)
        .line_start(1)
        .annotation(AnnotationKind::Primary.span(start..end).label(label));
    let report: Vec<Group> = vec![Level::ERROR.primary_title(title).element(snippet)];
    Renderer::plain().render(&report).to_string()
}

fn render_stack(g: &Grammar, input: &str, leaf: &std::sync::Arc<StackFrame>) -> String {
    let mut out = String::from("rule stack (innermost first):");
    for (rule, position) in StackFrame::chain(leaf) {
        let (line, column) = line_col(input, position);
        out.push_str(&format!(
            "\n  in {} (line {line}, column {column})",
            g.rule_display(rule)
        ));
    }
    out
}

fn render_walk(g: &Grammar, walk: &WalkTrace) -> String {
    let mut out = String::from("parse walk");
    if walk.is_truncated() {
        out.push_str(" (truncated)");
    }
    out.push(':');
    for entry in walk.entries() {
        let step = match entry.step {
            WalkStep::Enter => "enter",
            WalkStep::Success => "ok",
            WalkStep::Fail => "fail",
        };
        out.push_str(&format!(
            "\n  {step:5} {} @ {}",
            g.rule_display(entry.rule),
            entry.position
        ));
    }
    out
}
