//! Barrier (virtual) tokens.
//!
//! A barrier tokenizer pre-scans the input once per parse and emits virtual
//! tokens at computed positions. Virtual tokens occupy a stream parallel to
//! the character stream: they consume no characters themselves (unless given
//! a length, like a newline marker), must be consumed strictly in order, and
//! constrain real tokens from crossing their positions.

use crate::TokenId;

/// A virtual token emitted by a barrier tokenizer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VirtualToken {
    pub token: TokenId,
    /// Byte offset in the input.
    pub start: u32,
    /// Bytes consumed when matched (0 for pure markers).
    pub length: u32,
    /// Consumption index: the n-th virtual token has ordinal n.
    pub ordinal: u32,
}

/// The sorted virtual-token stream for one parse.
///
/// Lookup is keyed by `(position, passed_count)`: the parse must consume
/// virtual tokens in ordinal order, so the only token ever eligible is the
/// `passed_count`-th one, and only when the position sits exactly on it.
#[derive(Clone, Debug, Default)]
pub struct BarrierMap {
    tokens: Vec<VirtualToken>,
}

impl BarrierMap {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from tokenizer output: stable-sorts by start position and
    /// reassigns ordinals to the final order.
    pub fn from_tokens(mut tokens: Vec<VirtualToken>) -> Self {
        tokens.sort_by_key(|t| t.start);
        for (i, t) in tokens.iter_mut().enumerate() {
            t.ordinal = i as u32;
        }
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[VirtualToken] {
        &self.tokens
    }

    /// The virtual token at exactly this slot, if any.
    pub fn at(&self, position: usize, passed: u32) -> Option<&VirtualToken> {
        self.tokens
            .get(passed as usize)
            .filter(|t| t.start as usize == position)
    }

    /// Position of the next pending virtual token at or after `position`.
    ///
    /// Real tokens must not cross this position. Returns `None` when no
    /// virtual token is pending, or when the pending one lies behind
    /// `position` (only reachable after parsing through an ignore-barriers
    /// region; matching then proceeds unconstrained).
    pub fn next_barrier_position(&self, position: usize, passed: u32) -> Option<usize> {
        self.tokens
            .get(passed as usize)
            .map(|t| t.start as usize)
            .filter(|start| *start >= position)
    }

    /// Number of virtual tokens strictly before `position`; used to
    /// resynchronize the protocol when a parse starts mid-input.
    pub fn passed_before(&self, position: usize) -> u32 {
        self.tokens
            .iter()
            .take_while(|t| (t.start as usize) < position)
            .count() as u32
    }
}

/// Pre-scans the input and emits virtual tokens.
pub trait BarrierTokenizer: Send + Sync {
    fn tokenize(&self, input: &str) -> Vec<VirtualToken>;
}

/// The built-in indentation tokenizer.
///
/// Computes the leading-whitespace depth of every non-blank line and emits
/// an `indent` token when the depth increases, one `dedent` per closed level
/// when it decreases, and optionally a `newline` token at each line break
/// (length = the newline sequence). Indent/dedent markers sit at the first
/// content byte of their line with length 0; at end of input every open
/// level is closed.
#[derive(Clone, Debug)]
pub struct IndentTokenizer {
    indent: TokenId,
    dedent: TokenId,
    newline: Option<TokenId>,
    tab_width: u32,
}

impl IndentTokenizer {
    pub fn new(indent: TokenId, dedent: TokenId) -> Self {
        Self {
            indent,
            dedent,
            newline: None,
            tab_width: 4,
        }
    }

    /// Emit a newline token at every line break.
    pub fn with_newline(mut self, newline: TokenId) -> Self {
        self.newline = Some(newline);
        self
    }

    /// How many columns a tab advances (default 4).
    pub fn tab_width(mut self, width: u32) -> Self {
        self.tab_width = width.max(1);
        self
    }

    fn marker(&self, token: TokenId, start: usize) -> VirtualToken {
        VirtualToken {
            token,
            start: start as u32,
            length: 0,
            ordinal: 0,
        }
    }
}

impl BarrierTokenizer for IndentTokenizer {
    fn tokenize(&self, input: &str) -> Vec<VirtualToken> {
        let mut out = Vec::new();
        let mut depths = vec![0u32];
        let mut pos = 0usize;

        while pos < input.len() {
            // Line span and trailing newline sequence.
            let (line_end, newline_len) = match input[pos..].find('\n') {
                Some(i) => {
                    let nl = pos + i;
                    if i > 0 && input.as_bytes()[nl - 1] == b'\r' {
                        (nl - 1, 2)
                    } else {
                        (nl, 1)
                    }
                }
                None => (input.len(), 0),
            };
            let line = &input[pos..line_end];

            let mut width = 0u32;
            let mut content = None;
            for (i, c) in line.char_indices() {
                match c {
                    ' ' => width += 1,
                    '\t' => width += self.tab_width,
                    _ => {
                        content = Some(pos + i);
                        break;
                    }
                }
            }

            // Blank lines do not change the depth stack.
            if let Some(content_start) = content {
                let top = *depths.last().expect("depth stack is never empty");
                if width > top {
                    depths.push(width);
                    out.push(self.marker(self.indent, content_start));
                } else {
                    while width < *depths.last().expect("depth stack is never empty") {
                        depths.pop();
                        out.push(self.marker(self.dedent, content_start));
                    }
                }
            }

            if newline_len > 0 {
                if let Some(newline) = self.newline {
                    out.push(VirtualToken {
                        token: newline,
                        start: line_end as u32,
                        length: newline_len as u32,
                        ordinal: 0,
                    });
                }
                pos = line_end + newline_len;
            } else {
                pos = input.len();
            }
        }

        // Close every open level at end of input.
        while depths.len() > 1 {
            depths.pop();
            out.push(self.marker(self.dedent, input.len()));
        }
        out
    }
}
