//! Canonical token codec.
//!
//! Token format (single spaces between tokens):
//!
//! ```text
//! DEF run m( <stmts> m)
//! WHILE c( <cond> c) w( <stmts> w)
//! IF c( <cond> c) i( <stmts> i)
//! IFELSE c( <cond> c) i( <stmts> i) ELSE e( <stmts> e)
//! REPEAT R=<0..19> r( <stmts> r)
//! not c( <cond> c)
//! <perception> [h( <param> [<param>] h)]
//! <action>
//! <HOLE>
//! ```
//!
//! A statement list `s1 s2 .. sn` decodes to the right-associated chain
//! `Concatenate(s1, Concatenate(s2, .. sn))`, which is exactly what
//! [`encode`] flattens, so `decode(encode(ast)) == ast` for every tree that
//! passes [`Ast::validate`].

use serde::{Deserialize, Serialize};

use super::ast::{Ast, AstBuilder, HoleKind, NodeId, NodeKind, MAX_REPEAT};
use super::vocabulary::{PerceptionSpec, Vocabulary};

const HOLE: &str = "<HOLE>";

const KEYWORDS: &[&str] = &[
    "DEF", "run", "WHILE", "IF", "IFELSE", "ELSE", "REPEAT", "not", HOLE,
];

const SCOPE_QUALIFIERS: &[char] = &['m', 'c', 'w', 'i', 'e', 'r', 'h'];

/// Deepest scope nesting the decoder follows before giving up.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// How the decoder treats `R=<n>` with `n > 19`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumeralPolicy {
    /// Clamp to 19.
    #[default]
    Clamp,
    /// Reject with [`MalformedProgram::NumeralOutOfRange`].
    Strict,
}

/// Decoding failure. Positions are token indices.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedProgram {
    #[error("unexpected end of program, expected {expected}")]
    UnexpectedEnd { expected: String },
    #[error("unknown token '{token}' at {position}")]
    UnknownToken { token: String, position: usize },
    #[error("expected {expected} at {position}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },
    #[error("scope '{qualifier}(' opened at {position} is never closed")]
    UnbalancedScope { qualifier: char, position: usize },
    #[error("scope '{qualifier}(' opened at {position} is empty")]
    EmptyScope { qualifier: char, position: usize },
    #[error("malformed numeral '{token}' at {position}")]
    InvalidNumeral { token: String, position: usize },
    #[error("numeral {value} at {position} is outside 0..={MAX_REPEAT}")]
    NumeralOutOfRange { value: u64, position: usize },
    #[error("perception '{perception}' at {position}: {detail}")]
    InvalidParameters {
        perception: String,
        detail: String,
        position: usize,
    },
    #[error("unexpected tokens after program end at {position}")]
    TrailingTokens { position: usize },
    #[error("scope opened at {position} nests deeper than {limit}")]
    NestingTooDeep { limit: usize, position: usize },
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Canonical token string of a whole program.
#[must_use]
pub fn encode(ast: &Ast) -> String {
    encode_subtree(ast, ast.root())
}

/// Canonical token string of the subtree rooted at `id`.
#[must_use]
pub fn encode_subtree(ast: &Ast, id: NodeId) -> String {
    let mut out = TokenWriter::default();
    write_node(ast, id, &mut out);
    out.0
}

#[derive(Default)]
struct TokenWriter(String);

impl TokenWriter {
    fn push(&mut self, token: &str) {
        if !self.0.is_empty() {
            self.0.push(' ');
        }
        self.0.push_str(token);
    }

    fn scope(&mut self, ast: &Ast, qualifier: char, id: NodeId) {
        self.push(&format!("{qualifier}("));
        write_node(ast, id, self);
        self.push(&format!("{qualifier})"));
    }
}

fn write_node(ast: &Ast, id: NodeId, out: &mut TokenWriter) {
    let children = ast.children(id);
    match ast.kind(id) {
        NodeKind::Program => {
            out.push("DEF");
            out.push("run");
            out.scope(ast, 'm', children[0]);
        }
        NodeKind::Concatenate => {
            write_node(ast, children[0], out);
            write_node(ast, children[1], out);
        }
        NodeKind::While => {
            out.push("WHILE");
            out.scope(ast, 'c', children[0]);
            out.scope(ast, 'w', children[1]);
        }
        NodeKind::If => {
            out.push("IF");
            out.scope(ast, 'c', children[0]);
            out.scope(ast, 'i', children[1]);
        }
        NodeKind::IfElse => {
            out.push("IFELSE");
            out.scope(ast, 'c', children[0]);
            out.scope(ast, 'i', children[1]);
            out.push("ELSE");
            out.scope(ast, 'e', children[2]);
        }
        NodeKind::Repeat => {
            out.push("REPEAT");
            write_node(ast, children[0], out);
            out.scope(ast, 'r', children[1]);
        }
        NodeKind::Int(n) => out.push(&format!("R={n}")),
        NodeKind::Action(name) => out.push(name),
        NodeKind::Perception { name, params } => {
            out.push(name);
            if !params.is_empty() {
                out.push("h(");
                for p in params {
                    out.push(p);
                }
                out.push("h)");
            }
        }
        NodeKind::Not => {
            out.push("not");
            out.scope(ast, 'c', children[0]);
        }
        NodeKind::Hole(_) => out.push(HOLE),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode with the default numeral policy ([`NumeralPolicy::Clamp`]).
///
/// # Errors
///
/// Returns [`MalformedProgram`] if `text` is not a well-formed program over `vocab`.
pub fn decode(text: &str, vocab: &Vocabulary) -> Result<Ast, MalformedProgram> {
    Decoder::new(vocab).decode(text)
}

/// Recursive-descent decoder bound to one vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'v> {
    vocab: &'v Vocabulary,
    numerals: NumeralPolicy,
    max_nesting: usize,
}

impl<'v> Decoder<'v> {
    #[must_use]
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self {
            vocab,
            numerals: NumeralPolicy::default(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    #[must_use]
    pub fn with_numeral_policy(mut self, numerals: NumeralPolicy) -> Self {
        self.numerals = numerals;
        self
    }

    /// Scope depth beyond which input is rejected with
    /// [`MalformedProgram::NestingTooDeep`]. Defaults to [`DEFAULT_MAX_NESTING`].
    #[must_use]
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    /// Decode a whitespace-separated token string into a program.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedProgram`] on unbalanced or empty scopes, unknown or
    /// misplaced tokens, malformed numerals, trailing input and scopes
    /// nested deeper than the configured limit.
    pub fn decode(&self, text: &str) -> Result<Ast, MalformedProgram> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        Parser {
            tokens: &tokens,
            vocab: self.vocab,
            numerals: self.numerals,
            max_nesting: self.max_nesting,
            depth: 0,
            builder: AstBuilder::new(),
        }
        .program()
    }
}

/// Index of the close token matching an already-consumed `{qualifier}(`,
/// searching from `start`. Nested scopes with the same qualifier are skipped.
#[must_use]
pub fn find_close_token(tokens: &[&str], qualifier: char, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(start) {
        if is_scope_token(token, qualifier, '(') {
            depth += 1;
        } else if is_scope_token(token, qualifier, ')') {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

fn is_scope_token(token: &str, qualifier: char, bracket: char) -> bool {
    let mut chars = token.chars();
    chars.next() == Some(qualifier) && chars.next() == Some(bracket) && chars.next().is_none()
}

struct Parser<'t, 'v> {
    tokens: &'t [&'t str],
    vocab: &'v Vocabulary,
    numerals: NumeralPolicy,
    max_nesting: usize,
    /// Scopes currently open on the descent.
    depth: usize,
    builder: AstBuilder,
}

impl<'t> Parser<'t, '_> {
    fn program(mut self) -> Result<Ast, MalformedProgram> {
        let len = self.tokens.len();
        self.expect(0, "DEF", len)?;
        self.expect(1, "run", len)?;
        let (body, next) = self.statement_scope('m', 2, len)?;
        if next != len {
            return Err(MalformedProgram::TrailingTokens { position: next });
        }
        Ok(self.builder.program(body))
    }

    fn token(&self, pos: usize, hi: usize) -> Option<&'t str> {
        if pos < hi {
            self.tokens.get(pos).copied()
        } else {
            None
        }
    }

    fn is_known(&self, token: &str) -> bool {
        KEYWORDS.contains(&token)
            || token.starts_with("R=")
            || SCOPE_QUALIFIERS
                .iter()
                .any(|&q| is_scope_token(token, q, '(') || is_scope_token(token, q, ')'))
            || self.vocab.has_action(token)
            || self.vocab.perception(token).is_some()
            || self.vocab.is_param_value(token)
    }

    fn unexpected(&self, pos: usize, expected: &str) -> MalformedProgram {
        match self.tokens.get(pos) {
            None => MalformedProgram::UnexpectedEnd {
                expected: expected.to_string(),
            },
            Some(token) if !self.is_known(token) => MalformedProgram::UnknownToken {
                token: (*token).to_string(),
                position: pos,
            },
            Some(token) => MalformedProgram::UnexpectedToken {
                expected: expected.to_string(),
                found: (*token).to_string(),
                position: pos,
            },
        }
    }

    fn expect(&self, pos: usize, want: &str, hi: usize) -> Result<(), MalformedProgram> {
        match self.token(pos, hi) {
            Some(token) if token == want => Ok(()),
            _ => Err(self.unexpected(pos, &format!("'{want}'"))),
        }
    }

    /// Parse `{q}( ... {q})` starting at `open`; returns the close index.
    fn scope(&self, qualifier: char, open: usize, hi: usize) -> Result<usize, MalformedProgram> {
        self.expect(open, &format!("{qualifier}("), hi)?;
        find_close_token(&self.tokens[..hi], qualifier, open + 1).ok_or(
            MalformedProgram::UnbalancedScope {
                qualifier,
                position: open,
            },
        )
    }

    fn enter(&mut self, open: usize) -> Result<(), MalformedProgram> {
        if self.depth >= self.max_nesting {
            return Err(MalformedProgram::NestingTooDeep {
                limit: self.max_nesting,
                position: open,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn statement_scope(
        &mut self,
        qualifier: char,
        open: usize,
        hi: usize,
    ) -> Result<(NodeId, usize), MalformedProgram> {
        self.enter(open)?;
        let close = self.scope(qualifier, open, hi)?;
        let body = self.statements(open + 1, close, qualifier, open)?;
        self.depth -= 1;
        Ok((body, close + 1))
    }

    fn condition_scope(&mut self, open: usize, hi: usize) -> Result<(NodeId, usize), MalformedProgram> {
        self.enter(open)?;
        let close = self.scope('c', open, hi)?;
        let condition = self.condition(open + 1, close, open)?;
        self.depth -= 1;
        Ok((condition, close + 1))
    }

    fn statements(
        &mut self,
        lo: usize,
        hi: usize,
        qualifier: char,
        open: usize,
    ) -> Result<NodeId, MalformedProgram> {
        let empty = MalformedProgram::EmptyScope {
            qualifier,
            position: open,
        };
        let mut items = Vec::new();
        let mut pos = lo;
        while pos < hi {
            let (id, next) = self.statement(pos, hi)?;
            items.push(id);
            pos = next;
        }
        self.builder.sequence(&items).ok_or(empty)
    }

    fn statement(&mut self, pos: usize, hi: usize) -> Result<(NodeId, usize), MalformedProgram> {
        let Some(token) = self.token(pos, hi) else {
            return Err(self.unexpected(pos, "statement"));
        };
        match token {
            "WHILE" => {
                let (condition, after) = self.condition_scope(pos + 1, hi)?;
                let (body, next) = self.statement_scope('w', after, hi)?;
                Ok((self.builder.while_loop(condition, body), next))
            }
            "IF" => {
                let (condition, after) = self.condition_scope(pos + 1, hi)?;
                let (then, next) = self.statement_scope('i', after, hi)?;
                Ok((self.builder.if_then(condition, then), next))
            }
            "IFELSE" => {
                let (condition, after) = self.condition_scope(pos + 1, hi)?;
                let (then, after_then) = self.statement_scope('i', after, hi)?;
                self.expect(after_then, "ELSE", hi)?;
                let (otherwise, next) = self.statement_scope('e', after_then + 1, hi)?;
                Ok((self.builder.if_else(condition, then, otherwise), next))
            }
            "REPEAT" => {
                let count = self.numeral(pos + 1, hi)?;
                let (body, next) = self.statement_scope('r', pos + 2, hi)?;
                Ok((self.builder.repeat(count, body), next))
            }
            HOLE => Ok((self.builder.hole(HoleKind::Statement), pos + 1)),
            name if self.vocab.has_action(name) => Ok((self.builder.action(name), pos + 1)),
            _ => Err(self.unexpected(pos, "statement")),
        }
    }

    /// Parse exactly one condition spanning `lo..hi`.
    fn condition(&mut self, lo: usize, hi: usize, open: usize) -> Result<NodeId, MalformedProgram> {
        let vocab = self.vocab;
        let Some(token) = self.token(lo, hi) else {
            return Err(MalformedProgram::EmptyScope {
                qualifier: 'c',
                position: open,
            });
        };
        let (id, next) = match token {
            "not" => {
                let (inner, next) = self.condition_scope(lo + 1, hi)?;
                (self.builder.not(inner), next)
            }
            HOLE => (self.builder.hole(HoleKind::Condition), lo + 1),
            name => match vocab.perception(name) {
                Some(spec) => self.perception(spec, lo, hi)?,
                None => return Err(self.unexpected(lo, "condition")),
            },
        };
        if next != hi {
            return Err(self.unexpected(next, "'c)'"));
        }
        Ok(id)
    }

    fn perception(
        &mut self,
        spec: &PerceptionSpec,
        lo: usize,
        hi: usize,
    ) -> Result<(NodeId, usize), MalformedProgram> {
        if spec.params.is_empty() {
            return Ok((self.builder.perception(&spec.name), lo + 1));
        }
        let close = self.scope('h', lo + 1, hi)?;
        let values: Vec<String> = self.tokens[lo + 2..close]
            .iter()
            .map(|t| (*t).to_string())
            .collect();
        spec.check_params(&values)
            .map_err(|detail| MalformedProgram::InvalidParameters {
                perception: spec.name.clone(),
                detail,
                position: lo,
            })?;
        let id = self.builder.push(
            NodeKind::Perception {
                name: spec.name.clone(),
                params: values,
            },
            Vec::new(),
        );
        Ok((id, close + 1))
    }

    fn numeral(&self, pos: usize, hi: usize) -> Result<u8, MalformedProgram> {
        let Some(token) = self.token(pos, hi) else {
            return Err(self.unexpected(pos, "numeral"));
        };
        let Some(digits) = token.strip_prefix("R=") else {
            return Err(self.unexpected(pos, "numeral"));
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MalformedProgram::InvalidNumeral {
                token: token.to_string(),
                position: pos,
            });
        }
        // A digit string too long for u64 is simply out of range.
        let value = digits.parse::<u64>().unwrap_or(u64::MAX);
        match u8::try_from(value) {
            Ok(n) if n <= MAX_REPEAT => Ok(n),
            _ => match self.numerals {
                NumeralPolicy::Clamp => Ok(MAX_REPEAT),
                NumeralPolicy::Strict => Err(MalformedProgram::NumeralOutOfRange {
                    value,
                    position: pos,
                }),
            },
        }
    }
}
