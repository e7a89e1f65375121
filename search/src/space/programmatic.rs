//! Symbolic search space: neighbors are mutated trees.
//!
//! A mutation picks a random site in pre-order and applies one of three
//! edits, each confined to what the production rules allow at that site:
//!
//! - replace the subtree at the site with a freshly generated one,
//! - change a leaf's parameter (repeat count, action, perception),
//! - splice a new statement in front of a statement.
//!
//! Results that break the grammar limits or equal the input are discarded
//! and the mutation is retried, up to `max_mutation_attempts` times.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use gridsynth_kernel::dsl::{Ast, Category, NodeId, NodeKind, Slot, Vocabulary, MAX_REPEAT};

use super::{Candidate, SearchSpace};
use crate::error::{EncodeFailure, SearchError};
use crate::generator::{
    longest_chain, pick_weighted, Ctx, GrammarLimits, ProductionWeights, ProgramGenerator,
    RngChoices,
};

/// Relative frequency of each mutation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationWeights {
    pub replace_subtree: f64,
    pub change_parameter: f64,
    pub splice_statement: f64,
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            replace_subtree: 0.6,
            change_parameter: 0.25,
            splice_statement: 0.15,
        }
    }
}

/// Mutation kinds, in the order of [`MutationWeights`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ReplaceSubtree,
    ChangeParameter,
    SpliceStatement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgrammaticSpaceConfig {
    pub limits: GrammarLimits,
    pub weights: ProductionWeights,
    pub mutations: MutationWeights,
    pub max_mutation_attempts: usize,
}

impl Default for ProgrammaticSpaceConfig {
    fn default() -> Self {
        Self {
            limits: GrammarLimits::default(),
            weights: ProductionWeights::default(),
            mutations: MutationWeights::default(),
            max_mutation_attempts: 50,
        }
    }
}

impl ProgrammaticSpaceConfig {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidConfig`] on unusable weights or limits.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.limits.validate()?;
        self.weights.validate()?;
        let m = &self.mutations;
        let all = [m.replace_subtree, m.change_parameter, m.splice_statement];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || all.iter().sum::<f64>() <= 0.0 {
            return Err(SearchError::InvalidConfig {
                detail: "mutation weights must be non-negative with a positive sum".into(),
            });
        }
        if self.max_mutation_attempts == 0 {
            return Err(SearchError::InvalidConfig {
                detail: "max_mutation_attempts must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Search directly over program trees.
#[derive(Debug, Clone)]
pub struct ProgrammaticSpace {
    vocab: Vocabulary,
    config: ProgrammaticSpaceConfig,
    rng: StdRng,
}

impl ProgrammaticSpace {
    #[must_use]
    pub fn new(vocab: Vocabulary, config: ProgrammaticSpaceConfig, seed: u64) -> Self {
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
    pub fn config(&self) -> &ProgrammaticSpaceConfig {
        &self.config
    }

    /// A random program within the grammar limits.
    pub fn random_program(&mut self) -> Ast {
        let generator =
            ProgramGenerator::new(&self.vocab, &self.config.weights, self.config.limits);
        let mut smallest: Option<Ast> = None;
        for _ in 0..self.config.max_mutation_attempts {
            let ast = generator.program(&mut RngChoices::new(&mut self.rng));
            if self.config.limits.admits(&ast) {
                return ast;
            }
            if smallest.as_ref().map_or(true, |s| ast.size() < s.size()) {
                smallest = Some(ast);
            }
        }
        // Depth and chain limits hold by construction; only size can miss.
        smallest.unwrap_or_else(|| generator.program(&mut RngChoices::new(&mut self.rng)))
    }

    /// One valid mutation of `ast`, or `None` when every attempt failed.
    pub fn mutate(&mut self, ast: &Ast) -> Option<Ast> {
        for _ in 0..self.config.max_mutation_attempts {
            let kind = self.pick_mutation();
            let mutated = match kind {
                MutationKind::ReplaceSubtree => self.replace_subtree(ast),
                MutationKind::ChangeParameter => self.change_parameter(ast),
                MutationKind::SpliceStatement => self.splice_statement(ast),
            };
            if let Some(candidate) = mutated {
                if candidate != *ast && self.config.limits.admits(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn pick_mutation(&mut self) -> MutationKind {
        let m = &self.config.mutations;
        let weights = [m.replace_subtree, m.change_parameter, m.splice_statement];
        match pick_weighted(&weights, self.rng.gen::<f64>()) {
            0 => MutationKind::ReplaceSubtree,
            1 => MutationKind::ChangeParameter,
            _ => MutationKind::SpliceStatement,
        }
    }

    fn pick_site(&mut self, sites: &[NodeId]) -> Option<NodeId> {
        if sites.is_empty() {
            return None;
        }
        Some(sites[self.rng.gen_range(0..sites.len())])
    }

    fn replace_subtree(&mut self, ast: &Ast) -> Option<Ast> {
        let sites: Vec<NodeId> = ast.all_nodes().skip(1).collect();
        let site = self.pick_site(&sites)?;
        let slot = ast.slot_of(site)?;
        let ctx = Ctx::of(ast, site);
        let generator =
            ProgramGenerator::new(&self.vocab, &self.config.weights, self.config.limits);
        let rng = &mut self.rng;
        Some(ast.with_replacement(site, |b, _| {
            generator.fill(b, slot, ctx, &mut RngChoices::new(rng))
        }))
    }

    fn change_parameter(&mut self, ast: &Ast) -> Option<Ast> {
        let sites: Vec<NodeId> = ast
            .all_nodes()
            .filter(|&id| {
                matches!(
                    ast.kind(id),
                    NodeKind::Int(_) | NodeKind::Action(_) | NodeKind::Perception { .. }
                )
            })
            .collect();
        let site = self.pick_site(&sites)?;
        let generator =
            ProgramGenerator::new(&self.vocab, &self.config.weights, self.config.limits);
        let rng = &mut self.rng;
        match ast.kind(site).clone() {
            NodeKind::Int(old) => {
                let new = rng.gen_range(0..MAX_REPEAT);
                let count = if new >= old { new + 1 } else { new };
                Some(ast.with_replacement(site, |b, _| b.int(count)))
            }
            NodeKind::Action(old) => {
                let actions = self.vocab.actions();
                let weights: Vec<f64> = actions
                    .iter()
                    .map(|a| if a.name == old { 0.0 } else { a.weight.max(0.0) })
                    .collect();
                if weights.iter().all(|w| *w <= 0.0) {
                    return None;
                }
                let name = actions[pick_weighted(&weights, rng.gen::<f64>())].name.clone();
                Some(ast.with_replacement(site, |b, _| b.action(&name)))
            }
            NodeKind::Perception { .. } => Some(ast.with_replacement(site, |b, _| {
                generator.perception(b, &mut RngChoices::new(rng))
            })),
            _ => None,
        }
    }

    fn splice_statement(&mut self, ast: &Ast) -> Option<Ast> {
        let sites: Vec<NodeId> = ast
            .all_nodes()
            .filter(|&id| {
                ast.kind(id).category() == Category::Statement
                    && ast.slot_of(id) == Some(Slot::Statement)
            })
            .collect();
        let site = self.pick_site(&sites)?;
        let ctx = Ctx::of(ast, site);
        let generator =
            ProgramGenerator::new(&self.vocab, &self.config.weights, self.config.limits);
        let rng = &mut self.rng;
        Some(ast.with_replacement(site, |b, source| {
            let inserted =
                generator.statement(b, Slot::StatementNoConcat, ctx, &mut RngChoices::new(rng));
            let existing = b.import(source, site);
            b.concat(inserted, existing)
        }))
    }
}

impl SearchSpace for ProgrammaticSpace {
    type Repr = Ast;

    fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn initialize_individual(&mut self) -> Candidate<Ast> {
        let program = self.random_program();
        Candidate {
            repr: program.clone(),
            program,
        }
    }

    fn neighbors(&mut self, repr: &Ast, k: usize) -> Vec<Candidate<Ast>> {
        let mut out = Vec::with_capacity(k);
        for _ in 0..k {
            let Some(program) = self.mutate(repr) else {
                break;
            };
            out.push(Candidate {
                repr: program.clone(),
                program,
            });
        }
        out
    }

    fn encode(&mut self, program: &Ast) -> Result<Ast, EncodeFailure> {
        if let Some(node) = program.first_hole() {
            return Err(EncodeFailure::Incomplete { node });
        }
        program
            .validate(&self.vocab)
            .map_err(|e| EncodeFailure::Unrepresentable {
                detail: e.to_string(),
            })?;
        if !self.config.limits.admits(program) {
            return Err(EncodeFailure::ExceedsLimits {
                size: program.size(),
                depth: program.nesting_depth(),
                sequence: longest_chain(program),
            });
        }
        Ok(program.clone())
    }

    fn decode(&self, repr: &Ast) -> Ast {
        repr.clone()
    }
}
