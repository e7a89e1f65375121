//! Grammar-guided program generation.
//!
//! Generation walks the grammar top-down. At every decision the generator
//! computes the admissible choices for the current [`Slot`] and [`Ctx`] as a
//! weight vector (disallowed choices have weight 0) and asks a
//! [`ChoiceSource`] to pick one. A random source gives random programs; a
//! gene reader gives the latent-space decoder. The decision order is the
//! pre-order of the produced tree, which is what the latent encoder inverts.

use rand::Rng;
use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::{Ast, AstBuilder, NodeId, NodeKind, Slot, Vocabulary, MAX_REPEAT};

use crate::error::SearchError;

/// Sampling priors over productions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductionWeights {
    pub while_loop: f64,
    pub repeat: f64,
    pub concatenate: f64,
    pub if_then: f64,
    pub if_else: f64,
    pub action: f64,
    pub perception: f64,
    pub not: f64,
}

impl Default for ProductionWeights {
    fn default() -> Self {
        Self {
            while_loop: 0.15,
            repeat: 0.03,
            concatenate: 0.5,
            if_then: 0.08,
            if_else: 0.04,
            action: 0.2,
            perception: 0.5,
            not: 0.5,
        }
    }
}

impl ProductionWeights {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for negative or non-finite
    /// weights, or when the terminal productions cannot be chosen.
    pub fn validate(&self) -> Result<(), SearchError> {
        let all = [
            self.while_loop,
            self.repeat,
            self.concatenate,
            self.if_then,
            self.if_else,
            self.action,
            self.perception,
            self.not,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SearchError::InvalidConfig {
                detail: "production weights must be finite and non-negative".into(),
            });
        }
        if self.action <= 0.0 || self.perception <= 0.0 {
            return Err(SearchError::InvalidConfig {
                detail: "action and perception weights must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Size bounds every generated or mutated program must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarLimits {
    /// Maximum control-flow nesting of any statement.
    pub max_depth: usize,
    /// Maximum statements in one `Concatenate` chain.
    pub max_sequence: usize,
    /// Maximum node count.
    pub max_size: usize,
}

impl Default for GrammarLimits {
    fn default() -> Self {
        Self {
            max_depth: 4,
            max_sequence: 6,
            max_size: 50,
        }
    }
}

impl GrammarLimits {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] if a limit admits no program.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_sequence == 0 || self.max_size < 2 {
            return Err(SearchError::InvalidConfig {
                detail: "max_sequence must be >= 1 and max_size >= 2".into(),
            });
        }
        Ok(())
    }

    /// Whether `ast` fits every limit.
    #[must_use]
    pub fn admits(&self, ast: &Ast) -> bool {
        ast.size() <= self.max_size
            && ast.nesting_depth() <= self.max_depth
            && longest_chain(ast) <= self.max_sequence
    }
}

/// Statements in the longest `Concatenate` chain of `ast`.
#[must_use]
pub fn longest_chain(ast: &Ast) -> usize {
    ast.all_nodes()
        .filter(|&id| ast.kind(id).category() == gridsynth_kernel::dsl::Category::Statement)
        .filter(|&id| !is_chain_tail(ast, id))
        .map(|id| {
            let mut len = 1;
            let mut node = id;
            while *ast.kind(node) == NodeKind::Concatenate {
                len += 1;
                node = ast.children(node)[1];
            }
            len
        })
        .max()
        .unwrap_or(0)
}

fn is_chain_tail(ast: &Ast, id: NodeId) -> bool {
    ast.parent(id).is_some_and(|p| {
        *ast.kind(p) == NodeKind::Concatenate && ast.children(p)[1] == id
    })
}

/// Position of a slot: control-flow nesting and preceding chain length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ctx {
    pub depth: usize,
    pub chain: usize,
}

impl Ctx {
    #[must_use]
    pub fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
            chain: 0,
        }
    }

    #[must_use]
    pub fn next_in_chain(self) -> Self {
        Self {
            depth: self.depth,
            chain: self.chain + 1,
        }
    }

    /// Context of the position `id` occupies in `ast`.
    #[must_use]
    pub fn of(ast: &Ast, id: NodeId) -> Self {
        let depth = ast
            .ancestors(id)
            .filter(|&a| {
                matches!(
                    ast.kind(a),
                    NodeKind::While | NodeKind::If | NodeKind::IfElse | NodeKind::Repeat
                )
            })
            .count();
        let mut chain = 0;
        let mut node = id;
        while is_chain_tail(ast, node) {
            chain += 1;
            match ast.parent(node) {
                Some(p) => node = p,
                None => break,
            }
        }
        Self { depth, chain }
    }
}

/// Statement productions, in decision order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StmtChoice {
    While,
    Repeat,
    If,
    IfElse,
    Concatenate,
    Action,
}

impl StmtChoice {
    pub const ALL: [StmtChoice; 6] = [
        Self::While,
        Self::Repeat,
        Self::If,
        Self::IfElse,
        Self::Concatenate,
        Self::Action,
    ];

    /// Production that produced `kind`, `None` for non-statements and holes.
    #[must_use]
    pub fn of(kind: &NodeKind) -> Option<Self> {
        Some(match kind {
            NodeKind::While => Self::While,
            NodeKind::Repeat => Self::Repeat,
            NodeKind::If => Self::If,
            NodeKind::IfElse => Self::IfElse,
            NodeKind::Concatenate => Self::Concatenate,
            NodeKind::Action(_) => Self::Action,
            _ => return None,
        })
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Supplier of decisions.
pub trait ChoiceSource {
    /// Pick an index with positive weight. `weights` has a positive sum.
    fn choose(&mut self, weights: &[f64]) -> usize;

    /// `true` once the source wants generation to close off with terminals.
    fn exhausted(&self) -> bool {
        false
    }
}

/// Index selected by `u` in `[0, 1)` under cumulative weights.
#[must_use]
pub fn pick_weighted(weights: &[f64], u: f64) -> usize {
    let total: f64 = weights.iter().sum();
    let target = u.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        cumulative += w;
        last_positive = i;
        if target < cumulative {
            return i;
        }
    }
    last_positive
}

/// Midpoint of choice `index`'s interval under cumulative weights, the
/// value [`pick_weighted`] maps back to `index`. `None` if the choice has
/// zero weight.
#[must_use]
pub fn interval_midpoint(weights: &[f64], index: usize) -> Option<f64> {
    let w = *weights.get(index)?;
    if w <= 0.0 {
        return None;
    }
    let total: f64 = weights.iter().sum();
    let before: f64 = weights[..index].iter().filter(|w| **w > 0.0).sum();
    Some((before + w / 2.0) / total)
}

/// [`ChoiceSource`] backed by a random generator.
pub struct RngChoices<'r, R: Rng> {
    rng: &'r mut R,
}

impl<'r, R: Rng> RngChoices<'r, R> {
    pub fn new(rng: &'r mut R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ChoiceSource for RngChoices<'_, R> {
    fn choose(&mut self, weights: &[f64]) -> usize {
        pick_weighted(weights, self.rng.gen::<f64>())
    }
}

/// Weighted grammar over one vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct ProgramGenerator<'g> {
    vocab: &'g Vocabulary,
    weights: &'g ProductionWeights,
    limits: GrammarLimits,
}

impl<'g> ProgramGenerator<'g> {
    #[must_use]
    pub fn new(vocab: &'g Vocabulary, weights: &'g ProductionWeights, limits: GrammarLimits) -> Self {
        Self {
            vocab,
            weights,
            limits,
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &'g Vocabulary {
        self.vocab
    }

    #[must_use]
    pub fn limits(&self) -> GrammarLimits {
        self.limits
    }

    /// Weights over [`StmtChoice::ALL`] admissible at `slot` / `ctx`.
    #[must_use]
    pub fn statement_weights(&self, slot: Slot, ctx: Ctx, terminal: bool) -> [f64; 6] {
        let w = self.weights;
        let control = !terminal && ctx.depth < self.limits.max_depth;
        let concat = !terminal
            && slot == Slot::Statement
            && ctx.chain + 2 <= self.limits.max_sequence;
        let gate = |allowed: bool, weight: f64| if allowed { weight } else { 0.0 };
        [
            gate(control, w.while_loop),
            gate(control, w.repeat),
            gate(control, w.if_then),
            gate(control, w.if_else),
            gate(concat, w.concatenate),
            w.action,
        ]
    }

    /// Weights over `[Perception, Not]` admissible at `slot`.
    #[must_use]
    pub fn condition_weights(&self, slot: Slot, terminal: bool) -> [f64; 2] {
        let not = if !terminal && slot == Slot::Condition {
            self.weights.not
        } else {
            0.0
        };
        [self.weights.perception, not]
    }

    #[must_use]
    pub fn action_weights(&self) -> Vec<f64> {
        self.vocab.actions().iter().map(|a| a.weight.max(0.0)).collect()
    }

    #[must_use]
    pub fn perception_weights(&self) -> Vec<f64> {
        self.vocab
            .perceptions()
            .iter()
            .map(|p| p.weight.max(0.0))
            .collect()
    }

    /// Uniform weights over `Repeat` counts `0..=MAX_REPEAT`.
    #[must_use]
    pub fn count_weights() -> Vec<f64> {
        vec![1.0; usize::from(MAX_REPEAT) + 1]
    }

    /// A complete random program.
    pub fn program(&self, src: &mut impl ChoiceSource) -> Ast {
        let mut builder = AstBuilder::new();
        let body = self.statement(&mut builder, Slot::Statement, Ctx::default(), src);
        builder.program(body)
    }

    /// Fill `slot` (statement, condition or integer) with a generated subtree.
    pub fn fill(
        &self,
        builder: &mut AstBuilder,
        slot: Slot,
        ctx: Ctx,
        src: &mut impl ChoiceSource,
    ) -> NodeId {
        match slot {
            Slot::Statement | Slot::StatementNoConcat => self.statement(builder, slot, ctx, src),
            Slot::Condition | Slot::ConditionNoNot => self.condition(builder, slot, src),
            Slot::Integer => {
                let count = self.count(src);
                builder.int(count)
            }
        }
    }

    pub fn statement(
        &self,
        builder: &mut AstBuilder,
        slot: Slot,
        ctx: Ctx,
        src: &mut impl ChoiceSource,
    ) -> NodeId {
        let weights = self.statement_weights(slot, ctx, src.exhausted());
        match StmtChoice::ALL[src.choose(&weights)] {
            StmtChoice::While => {
                let cond = self.condition(builder, Slot::Condition, src);
                let body = self.statement(builder, Slot::Statement, ctx.nested(), src);
                builder.while_loop(cond, body)
            }
            StmtChoice::Repeat => {
                let count = self.count(src);
                let body = self.statement(builder, Slot::Statement, ctx.nested(), src);
                builder.repeat(count, body)
            }
            StmtChoice::If => {
                let cond = self.condition(builder, Slot::Condition, src);
                let then = self.statement(builder, Slot::Statement, ctx.nested(), src);
                builder.if_then(cond, then)
            }
            StmtChoice::IfElse => {
                let cond = self.condition(builder, Slot::ConditionNoNot, src);
                let then = self.statement(builder, Slot::Statement, ctx.nested(), src);
                let otherwise = self.statement(builder, Slot::Statement, ctx.nested(), src);
                builder.if_else(cond, then, otherwise)
            }
            StmtChoice::Concatenate => {
                let first = self.statement(builder, Slot::StatementNoConcat, ctx, src);
                let rest = self.statement(builder, Slot::Statement, ctx.next_in_chain(), src);
                builder.concat(first, rest)
            }
            StmtChoice::Action => self.action(builder, src),
        }
    }

    pub fn condition(&self, builder: &mut AstBuilder, slot: Slot, src: &mut impl ChoiceSource) -> NodeId {
        let weights = self.condition_weights(slot, src.exhausted());
        if src.choose(&weights) == 1 {
            let inner = self.condition(builder, Slot::ConditionNoNot, src);
            builder.not(inner)
        } else {
            self.perception(builder, src)
        }
    }

    pub fn action(&self, builder: &mut AstBuilder, src: &mut impl ChoiceSource) -> NodeId {
        let actions = self.vocab.actions();
        let index = src.choose(&self.action_weights());
        builder.action(&actions[index].name)
    }

    pub fn perception(&self, builder: &mut AstBuilder, src: &mut impl ChoiceSource) -> NodeId {
        let spec = &self.vocab.perceptions()[src.choose(&self.perception_weights())];
        let params: Vec<&str> = spec
            .params
            .iter()
            .map(|domain| {
                let index = src.choose(&vec![1.0; domain.len()]);
                domain[index].as_str()
            })
            .collect();
        builder.perception_with(&spec.name, &params)
    }

    fn count(&self, src: &mut impl ChoiceSource) -> u8 {
        let index = src.choose(&Self::count_weights());
        u8::try_from(index).unwrap_or(MAX_REPEAT)
    }
}
