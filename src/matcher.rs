use arrayvec::ArrayVec;

use crate::chain::{StageChain, StageRole, MAX_STAGES};
use crate::error::SolveError;

/// A push stage and the pop stage that removes its digit, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushPopPair {
    pub push: usize,
    pub pop: usize,
}

/// Pairs each pop stage with its matching push by LIFO discipline.
///
/// A single pass with an explicit index stack; pairs come out in pop order.
/// Any imbalance is an [`SolveError::UnbalancedChain`] since the closed-form
/// derivation is only valid for properly nested chains.
pub fn match_pairs(
    chain: &StageChain,
) -> Result<ArrayVec<PushPopPair, MAX_STAGES>, SolveError> {
    let mut open = ArrayVec::<usize, MAX_STAGES>::new();
    let mut pairs = ArrayVec::new();
    for i in 0..chain.len() {
        match chain.role(i) {
            StageRole::Push => open.push(i),
            StageRole::Pop => {
                let push = open.pop().ok_or_else(|| {
                    SolveError::UnbalancedChain(format!(
                        "pop at stage {} has no open push",
                        i + 1
                    ))
                })?;
                pairs.push(PushPopPair { push, pop: i });
            }
        }
    }
    if !open.is_empty() {
        return Err(SolveError::UnbalancedChain(format!(
            "{} push stage(s) left open at the end of the chain",
            open.len()
        )));
    }
    Ok(pairs)
}

#[cfg(test)]
use crate::chain::{pop_params, push_params, ChainConfig};

#[cfg(test)]
fn chain_of(params: &[crate::chain::StageParams]) -> StageChain {
    StageChain::new(params, ChainConfig::default()).unwrap()
}

#[test]
fn test_nested_pairs() {
    // push push pop push pop pop
    let chain = chain_of(&[
        push_params(12, 3),
        push_params(11, 4),
        pop_params(-2),
        push_params(13, 5),
        pop_params(-6),
        pop_params(-1),
    ]);
    let pairs = match_pairs(&chain).unwrap();
    assert_eq!(
        pairs.as_slice(),
        [
            PushPopPair { push: 1, pop: 2 },
            PushPopPair { push: 3, pop: 4 },
            PushPopPair { push: 0, pop: 5 },
        ]
    );
}

#[test]
fn test_pop_before_push() {
    let chain = chain_of(&[pop_params(-2), push_params(12, 3)]);
    let err = match_pairs(&chain).unwrap_err();
    assert!(matches!(err, SolveError::UnbalancedChain(ref msg) if msg.contains("stage 1")));
}

#[test]
fn test_unclosed_push() {
    let chain = chain_of(&[push_params(12, 3), push_params(11, 4), pop_params(-2)]);
    let err = match_pairs(&chain).unwrap_err();
    assert!(matches!(err, SolveError::UnbalancedChain(ref msg) if msg.contains("1 push")));
}
