//! Validates and optimizes over stack-structured digit-input chains: finds
//! the lexicographically largest and smallest digit sequences that drive the
//! accumulator of a push/pop stage chain back to zero, by deriving the exact
//! affine relation each matched push/pop pair forces instead of searching.

pub mod chain;
pub mod constraint;
pub mod error;
pub mod matcher;
pub mod parse;
pub mod relation;
pub mod solve;
pub mod utils;
pub mod verify;

pub use chain::{ChainConfig, StageChain, StageParams, StageRole, MAX_STAGES};
pub use constraint::{Constraint, ConstraintSet};
pub use error::SolveError;
pub use matcher::{match_pairs, PushPopPair};
pub use parse::{parse_program, Program};
pub use relation::{derive, Relation};
pub use solve::{maximize, minimize, solve_extremes, Assignment, Extremes};
pub use verify::{check, replay};

/// A 14-stage chain in textual form, used by tests and benches.
pub fn sample_program() -> &'static [u8] {
    include_bytes!("sample.txt")
}
