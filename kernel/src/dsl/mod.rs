//! The grid-world program language.
//!
//! - [`ast`]: arena-backed syntax trees with a parent table
//! - [`vocabulary`]: per-domain action and perception sets
//! - [`grammar`]: production slots shared by validation, generation and mutation
//! - [`codec`]: canonical token encoding and recursive-descent decoding
//! - [`render`]: one-way indented rendering for diagnostics

pub mod ast;
pub mod codec;
pub mod grammar;
pub mod render;
pub mod vocabulary;

pub use ast::{Ast, AstBuilder, AstError, Category, HoleKind, NodeId, NodeKind, MAX_REPEAT};
pub use codec::{
    decode, encode, encode_subtree, Decoder, MalformedProgram, NumeralPolicy, DEFAULT_MAX_NESTING,
};
pub use grammar::Slot;
pub use render::{render_indented, render_marked, RenderStyle};
pub use vocabulary::{ActionSpec, PerceptionSpec, Vocabulary};
