use thiserror::Error;

/// Failure modes of chain validation, solving and input parsing.
///
/// Everything here is a value returned to the caller; no operation in this
/// crate panics on bad input, and nothing is ever retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// A stage's parameters break the push/pop structure the solver relies on
    /// (divisor neither 1 nor the base, offsets that let a push stage take the
    /// equality branch, an empty or over-long chain, a bad digit alphabet).
    #[error("malformed chain: {0}")]
    MalformedChain(String),

    /// Pushes and pops are not properly nested: a pop with no open push, or
    /// pushes still open after the last stage.
    #[error("unbalanced chain: {0}")]
    UnbalancedChain(String),

    /// No digit assignment satisfies the derived relations together with the
    /// caller's constraints.
    #[error("infeasible: {0}")]
    Infeasible(String),

    /// A solver-produced assignment failed replay. This signals a defect in
    /// relation derivation or matching, never an unsolvable input.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    /// Malformed program text or constraint text.
    #[error("parse error: {0}")]
    Parse(String),
}
