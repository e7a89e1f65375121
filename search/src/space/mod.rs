//! Search spaces.
//!
//! A [`SearchSpace`] owns its random generator and proposes candidates:
//! pairs of an opaque representation and the program it decodes to.
//!
//! - [`programmatic::ProgrammaticSpace`]: the representation is the tree
//!   itself; neighbors are grammar-respecting mutations.
//! - [`latent::LatentSpace`]: the representation is a fixed-length gene
//!   vector; neighbors are bounded perturbations, decoded through the grammar.

pub mod latent;
pub mod programmatic;

use gridsynth_kernel::dsl::Ast;
use tracing::warn;

use crate::error::EncodeFailure;

pub use latent::{LatentSpace, LatentSpaceConfig, LatentVector};
pub use programmatic::{MutationKind, MutationWeights, ProgrammaticSpace, ProgrammaticSpaceConfig};

/// Upper bound on encode attempts for a seed program.
pub const DEFAULT_SEED_ENCODE_RETRIES: usize = 50;

/// A proposed program with its space representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<R> {
    pub repr: R,
    pub program: Ast,
}

/// Neighborhood structure searched by every method.
pub trait SearchSpace {
    type Repr: Clone + std::fmt::Debug;

    /// Reset the owned random generator.
    fn reseed(&mut self, seed: u64);

    /// A fresh random candidate.
    fn initialize_individual(&mut self) -> Candidate<Self::Repr>;

    /// Up to `k` neighbors of `repr`, fewer if the space is exhausted.
    fn neighbors(&mut self, repr: &Self::Repr, k: usize) -> Vec<Candidate<Self::Repr>>;

    /// Representation of `program`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeFailure`] if `program` lies outside the space.
    fn encode(&mut self, program: &Ast) -> Result<Self::Repr, EncodeFailure>;

    /// Program represented by `repr`.
    fn decode(&self, repr: &Self::Repr) -> Ast;
}

/// Starting candidate for a search: `seed` if it can be encoded within
/// `retries` attempts, otherwise a fresh random individual.
pub fn initial_candidate<S: SearchSpace + ?Sized>(
    space: &mut S,
    seed: Option<&Ast>,
    retries: usize,
) -> Candidate<S::Repr> {
    let Some(program) = seed else {
        return space.initialize_individual();
    };
    let mut last_failure = None;
    for _ in 0..retries {
        match space.encode(program) {
            Ok(repr) => {
                let program = space.decode(&repr);
                return Candidate { repr, program };
            }
            Err(failure) => last_failure = Some(failure),
        }
    }
    if let Some(failure) = last_failure {
        warn!(%failure, retries, "seed program not encodable, starting from a random individual");
    }
    space.initialize_individual()
}
