//! DSL codec lock tests: round-trip, scope balance, numeral policy.

use gridsynth_kernel::dsl::{
    decode, encode, Ast, Decoder, MalformedProgram, NodeKind, NumeralPolicy, Vocabulary,
    DEFAULT_MAX_NESTING,
};
use lock_tests::fixtures::{deep_program, random_program};
use proptest::prelude::*;

fn repeat_count(ast: &Ast) -> Option<u8> {
    ast.all_nodes().find_map(|id| match ast.kind(id) {
        NodeKind::Int(n) => Some(*n),
        _ => None,
    })
}

/// Qualifier of every `x(` / `x)` scope token, checked as a stack.
fn scopes_balance(text: &str) -> bool {
    let mut open = Vec::new();
    for token in text.split_whitespace() {
        if let Some(q) = token.strip_suffix('(') {
            if q.len() == 1 {
                open.push(q.to_string());
                continue;
            }
        }
        if let Some(q) = token.strip_suffix(')') {
            if q.len() == 1 && open.pop().as_deref() != Some(q) {
                return false;
            }
        }
    }
    open.is_empty()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ACCEPTANCE: round-trip over generated Karel programs
    #[test]
    fn karel_programs_round_trip(seed in any::<u64>()) {
        let vocab = Vocabulary::karel();
        let ast = random_program(&vocab, seed);
        let text = encode(&ast);
        prop_assert!(scopes_balance(&text), "unbalanced: {}", text);
        let back = decode(&text, &vocab);
        prop_assert_eq!(back, Ok(ast));
    }

    #[test]
    fn minigrid_programs_round_trip(seed in any::<u64>()) {
        let vocab = Vocabulary::minigrid();
        let ast = random_program(&vocab, seed);
        let back = decode(&encode(&ast), &vocab);
        prop_assert_eq!(back, Ok(ast));
    }
}

// ACCEPTANCE: scope balance at depth >= 5
#[test]
fn deep_mixed_nesting_encodes_balanced_scopes() {
    for depth in 5..=9 {
        let ast = deep_program(depth);
        assert!(ast.nesting_depth() >= depth);
        assert!(ast.validate(&Vocabulary::karel()).is_ok());
        let text = encode(&ast);
        assert!(scopes_balance(&text), "depth {depth}: {text}");
        assert_eq!(decode(&text, &Vocabulary::karel()), Ok(ast));
    }
}

// ACCEPTANCE: repeat bound
#[test]
fn oversized_repeat_is_clamped_by_default() {
    let ast = decode("DEF run m( REPEAT R=25 r( move r) m)", &Vocabulary::karel())
        .expect("clamped");
    assert_eq!(repeat_count(&ast), Some(19));
}

#[test]
fn strict_numerals_reject_oversized_repeat() {
    let vocab = Vocabulary::karel();
    let result = Decoder::new(&vocab)
        .with_numeral_policy(NumeralPolicy::Strict)
        .decode("DEF run m( REPEAT R=25 r( move r) m)");
    assert!(matches!(
        result,
        Err(MalformedProgram::NumeralOutOfRange { value: 25, .. })
    ));
}

#[test]
fn negative_numeral_is_malformed() {
    let result = decode("DEF run m( REPEAT R=-1 r( move r) m)", &Vocabulary::karel());
    assert!(matches!(result, Err(MalformedProgram::InvalidNumeral { .. })));
}

#[test]
fn unbalanced_and_unknown_input_is_malformed() {
    let vocab = Vocabulary::karel();
    assert!(decode("DEF run m( move", &vocab).is_err());
    assert!(decode("DEF run m( fly m)", &vocab).is_err());
    assert!(decode("DEF run m( move m) move", &vocab).is_err());
}

// ACCEPTANCE: untrusted deep nesting is malformed, not a stack overflow
#[test]
fn ten_thousand_nested_negations_are_rejected() {
    let depth = 10_000;
    let text = format!(
        "DEF run m( IF c( {}frontIsClear{} c) i( move i) m)",
        "not c( ".repeat(depth),
        " c)".repeat(depth)
    );
    let result = decode(&text, &Vocabulary::karel());
    assert!(matches!(
        result,
        Err(MalformedProgram::NestingTooDeep { limit: DEFAULT_MAX_NESTING, .. })
    ));
}
