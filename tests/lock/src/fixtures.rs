//! Programs, worlds and policies used across the acceptance tests.
//!
//! # Panics
//!
//! Every helper panics on malformed fixture input. These are test-only
//! invariants.

use gridsynth_harness::policy::PolicyConfig;
use gridsynth_harness::worlds::karel::{KarelConfig, KarelWorld};
use gridsynth_kernel::dsl::{decode, Ast, AstBuilder, NodeId, Vocabulary};
use gridsynth_search::policy::{HillClimbingConfig, MethodConfig};
use gridsynth_search::space::{ProgrammaticSpace, ProgrammaticSpaceConfig};

/// Decode a Karel program.
#[must_use]
pub fn karel_program(text: &str) -> Ast {
    decode(text, &Vocabulary::karel()).unwrap_or_else(|e| panic!("fixture program {text:?}: {e}"))
}

/// A random complete program drawn from the default grammar.
#[must_use]
pub fn random_program(vocab: &Vocabulary, seed: u64) -> Ast {
    ProgrammaticSpace::new(vocab.clone(), ProgrammaticSpaceConfig::default(), seed).random_program()
}

/// Control flow nested `depth` levels deep, cycling `While`, `IfElse` and
/// `Repeat`, with `putMarker` at the bottom.
#[must_use]
pub fn deep_program(depth: usize) -> Ast {
    let mut b = AstBuilder::new();
    let mut body: NodeId = b.action("putMarker");
    for level in 0..depth {
        body = match level % 3 {
            0 => {
                let c = b.perception("frontIsClear");
                b.while_loop(c, body)
            }
            1 => {
                let c = b.perception("markersPresent");
                let otherwise = b.action("turnLeft");
                b.if_else(c, body, otherwise)
            }
            _ => {
                let step = b.action("move");
                let seq = b.concat(step, body);
                b.repeat(3, seq)
            }
        };
    }
    b.program(body)
}

/// Parse an ASCII map with the given flags.
#[must_use]
pub fn world(map: &str, crashable: bool, leaps_behaviour: bool) -> KarelWorld {
    let config = KarelConfig {
        crashable,
        leaps_behaviour,
        ..KarelConfig::default()
    };
    KarelWorld::parse(map, &config).unwrap_or_else(|e| panic!("fixture map: {e}"))
}

/// A run small enough for a unit-test budget.
#[must_use]
pub fn small_policy() -> PolicyConfig {
    PolicyConfig {
        num_envs: Some(4),
        budget: Some(300),
        method: MethodConfig::HillClimbing(HillClimbingConfig {
            k: 16,
            ..HillClimbingConfig::default()
        }),
        ..PolicyConfig::default()
    }
}
