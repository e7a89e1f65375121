//! Latent search space: fixed-length gene vectors decoded through the grammar.
//!
//! Decoding runs the program generator with a [`ChoiceSource`] that reads one
//! gene per decision. Each gene in `[0, 1)` selects a choice by cumulative
//! weight. After one full pass over the vector the reader wraps around and
//! forces terminal productions, so every vector decodes to a complete,
//! finite program.
//!
//! Encoding replays the decisions that produce a given tree and stores each
//! choice interval's midpoint; the genes past the last decision are random.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::{Ast, NodeId, NodeKind, Slot, Vocabulary};

use super::{Candidate, SearchSpace};
use crate::error::{EncodeFailure, SearchError};
use crate::generator::{
    interval_midpoint, longest_chain, pick_weighted, ChoiceSource, Ctx, GrammarLimits,
    ProductionWeights, ProgramGenerator, StmtChoice,
};

/// Largest gene value; genes live in `[0, 1)`.
const GENE_MAX: f64 = 1.0 - f64::EPSILON;

/// A point in the latent space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentVector {
    genes: Vec<f64>,
}

impl LatentVector {
    /// Vector from raw genes, each clamped into `[0, 1)`.
    #[must_use]
    pub fn new(genes: Vec<f64>) -> Self {
        Self {
            genes: genes.into_iter().map(clamp_gene).collect(),
        }
    }

    #[must_use]
    pub fn genes(&self) -> &[f64] {
        &self.genes
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.genes.len()
    }
}

fn clamp_gene(g: f64) -> f64 {
    if g.is_nan() {
        0.0
    } else {
        g.clamp(0.0, GENE_MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatentSpaceConfig {
    /// Number of genes per vector.
    pub dimension: usize,
    /// Half-width of the uniform perturbation applied to each gene.
    pub sigma: f64,
    pub limits: GrammarLimits,
    pub weights: ProductionWeights,
}

impl Default for LatentSpaceConfig {
    fn default() -> Self {
        Self {
            dimension: 64,
            sigma: 0.1,
            limits: GrammarLimits::default(),
            weights: ProductionWeights::default(),
        }
    }
}

impl LatentSpaceConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] for an empty vector, a
    /// non-positive `sigma`, or invalid grammar settings.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.dimension == 0 {
            return Err(SearchError::InvalidConfig {
                detail: "latent dimension must be positive".into(),
            });
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(SearchError::InvalidConfig {
                detail: format!("sigma must be positive, got {}", self.sigma),
            });
        }
        self.limits.validate()?;
        self.weights.validate()
    }
}

/// Reads one gene per decision, cycling once the vector is spent.
struct GeneReader<'a> {
    genes: &'a [f64],
    position: usize,
}

impl<'a> GeneReader<'a> {
    fn new(genes: &'a [f64]) -> Self {
        Self { genes, position: 0 }
    }
}

impl ChoiceSource for GeneReader<'_> {
    fn choose(&mut self, weights: &[f64]) -> usize {
        let u = if self.genes.is_empty() {
            0.0
        } else {
            self.genes[self.position % self.genes.len()]
        };
        self.position += 1;
        pick_weighted(weights, u)
    }

    fn exhausted(&self) -> bool {
        self.position >= self.genes.len()
    }
}

/// Replays the generator's decisions for an existing tree.
struct DecisionRecorder<'g> {
    generator: ProgramGenerator<'g>,
    genes: Vec<f64>,
}

impl DecisionRecorder<'_> {
    fn record(&mut self, weights: &[f64], index: usize, what: &str) -> Result<(), EncodeFailure> {
        let gene = interval_midpoint(weights, index).ok_or_else(|| {
            EncodeFailure::Unrepresentable {
                detail: format!("{what} cannot be generated at its position"),
            }
        })?;
        self.genes.push(gene);
        Ok(())
    }

    fn statement(&mut self, ast: &Ast, id: NodeId, slot: Slot, ctx: Ctx) -> Result<(), EncodeFailure> {
        let kind = ast.kind(id);
        if matches!(kind, NodeKind::Hole(_)) {
            return Err(EncodeFailure::Incomplete { node: id });
        }
        let choice = StmtChoice::of(kind).ok_or_else(|| EncodeFailure::Unrepresentable {
            detail: format!("{} in a statement position", kind.label()),
        })?;
        let weights = self.generator.statement_weights(slot, ctx, false);
        self.record(&weights, choice.index(), &kind.label())?;
        let children = ast.children(id);
        match choice {
            StmtChoice::While | StmtChoice::If => {
                self.condition(ast, children[0], Slot::Condition)?;
                self.statement(ast, children[1], Slot::Statement, ctx.nested())
            }
            StmtChoice::Repeat => {
                self.count(ast, children[0])?;
                self.statement(ast, children[1], Slot::Statement, ctx.nested())
            }
            StmtChoice::IfElse => {
                self.condition(ast, children[0], Slot::ConditionNoNot)?;
                self.statement(ast, children[1], Slot::Statement, ctx.nested())?;
                self.statement(ast, children[2], Slot::Statement, ctx.nested())
            }
            StmtChoice::Concatenate => {
                self.statement(ast, children[0], Slot::StatementNoConcat, ctx)?;
                self.statement(ast, children[1], Slot::Statement, ctx.next_in_chain())
            }
            StmtChoice::Action => match kind {
                NodeKind::Action(name) => {
                    let index = self.action_index(name)?;
                    self.record(&self.generator.action_weights(), index, name)
                }
                _ => Ok(()),
            },
        }
    }

    fn condition(&mut self, ast: &Ast, id: NodeId, slot: Slot) -> Result<(), EncodeFailure> {
        let weights = self.generator.condition_weights(slot, false);
        match ast.kind(id) {
            NodeKind::Hole(_) => Err(EncodeFailure::Incomplete { node: id }),
            NodeKind::Not => {
                self.record(&weights, 1, "not")?;
                self.condition(ast, ast.children(id)[0], Slot::ConditionNoNot)
            }
            NodeKind::Perception { name, params } => {
                self.record(&weights, 0, name)?;
                let vocab = self.generator.vocabulary();
                let (index, spec) = vocab
                    .perceptions()
                    .iter()
                    .enumerate()
                    .find(|(_, p)| p.name == *name)
                    .ok_or_else(|| EncodeFailure::Unrepresentable {
                        detail: format!("unknown perception '{name}'"),
                    })?;
                self.record(&self.generator.perception_weights(), index, name)?;
                if params.len() != spec.params.len() {
                    return Err(EncodeFailure::Unrepresentable {
                        detail: format!("'{name}' takes {} parameter(s)", spec.params.len()),
                    });
                }
                for (value, domain) in params.iter().zip(&spec.params) {
                    let position = domain.iter().position(|d| d == value).ok_or_else(|| {
                        EncodeFailure::Unrepresentable {
                            detail: format!("'{value}' is not a value of '{name}'"),
                        }
                    })?;
                    self.record(&vec![1.0; domain.len()], position, value)?;
                }
                Ok(())
            }
            other => Err(EncodeFailure::Unrepresentable {
                detail: format!("{} in a condition position", other.label()),
            }),
        }
    }

    fn count(&mut self, ast: &Ast, id: NodeId) -> Result<(), EncodeFailure> {
        match ast.kind(id) {
            NodeKind::Int(n) => {
                self.record(&ProgramGenerator::count_weights(), usize::from(*n), "repeat count")
            }
            NodeKind::Hole(_) => Err(EncodeFailure::Incomplete { node: id }),
            other => Err(EncodeFailure::Unrepresentable {
                detail: format!("{} in an integer position", other.label()),
            }),
        }
    }

    fn action_index(&self, name: &str) -> Result<usize, EncodeFailure> {
        self.generator
            .vocabulary()
            .actions()
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| EncodeFailure::Unrepresentable {
                detail: format!("unknown action '{name}'"),
            })
    }
}

/// Search over gene vectors.
#[derive(Debug, Clone)]
pub struct LatentSpace {
    vocab: Vocabulary,
    config: LatentSpaceConfig,
    rng: StdRng,
}

impl LatentSpace {
    #[must_use]
    pub fn new(vocab: Vocabulary, config: LatentSpaceConfig, seed: u64) -> Self {
        Self {
            vocab,
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    #[must_use]
    pub fn config(&self) -> &LatentSpaceConfig {
        &self.config
    }

    fn generator(&self) -> ProgramGenerator<'_> {
        ProgramGenerator::new(&self.vocab, &self.config.weights, self.config.limits)
    }

    fn random_vector(&mut self) -> LatentVector {
        let genes = (0..self.config.dimension)
            .map(|_| self.rng.gen::<f64>())
            .collect();
        LatentVector::new(genes)
    }

    /// Genes that decode to `program`, without random padding.
    ///
    /// # Errors
    ///
    /// See [`SearchSpace::encode`].
    pub fn decisions(&self, program: &Ast) -> Result<Vec<f64>, EncodeFailure> {
        if let Some(node) = program.first_hole() {
            return Err(EncodeFailure::Incomplete { node });
        }
        let limits = self.config.limits;
        if program.nesting_depth() > limits.max_depth
            || longest_chain(program) > limits.max_sequence
        {
            return Err(EncodeFailure::ExceedsLimits {
                size: program.size(),
                depth: program.nesting_depth(),
                sequence: longest_chain(program),
            });
        }
        let body = program
            .program_body()
            .ok_or_else(|| EncodeFailure::Unrepresentable {
                detail: "root is not a Program".into(),
            })?;
        let mut recorder = DecisionRecorder {
            generator: self.generator(),
            genes: Vec::new(),
        };
        recorder.statement(program, body, Slot::Statement, Ctx::default())?;
        Ok(recorder.genes)
    }
}

impl SearchSpace for LatentSpace {
    type Repr = LatentVector;

    fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn initialize_individual(&mut self) -> Candidate<LatentVector> {
        let repr = self.random_vector();
        let program = self.decode(&repr);
        Candidate { repr, program }
    }

    fn neighbors(&mut self, repr: &LatentVector, k: usize) -> Vec<Candidate<LatentVector>> {
        let sigma = self.config.sigma;
        (0..k)
            .map(|_| {
                let genes = repr
                    .genes()
                    .iter()
                    .map(|g| g + self.rng.gen_range(-sigma..=sigma))
                    .collect();
                let repr = LatentVector::new(genes);
                let program = self.decode(&repr);
                Candidate { repr, program }
            })
            .collect()
    }

    fn encode(&mut self, program: &Ast) -> Result<LatentVector, EncodeFailure> {
        let mut genes = self.decisions(program)?;
        let dimension = self.config.dimension;
        if genes.len() > dimension {
            return Err(EncodeFailure::TooLarge {
                needed: genes.len(),
                dimension,
            });
        }
        while genes.len() < dimension {
            genes.push(self.rng.gen::<f64>());
        }
        Ok(LatentVector::new(genes))
    }

    fn decode(&self, repr: &LatentVector) -> Ast {
        self.generator().program(&mut GeneReader::new(repr.genes()))
    }
}
