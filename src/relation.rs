use arrayvec::ArrayVec;

use crate::chain::{StageChain, StageRole, MAX_STAGES};
use crate::error::SolveError;
use crate::matcher::PushPopPair;

/*
Each stage applies, for accumulator z, digit w and parameters (d, a, b):

    y = z / d
    x = z % D + a
    z' = y            if x == w
         D*y + w + b  otherwise

With d restricted to {1, D} the accumulator is a stack of base-D digits:

- d == 1: y == z, and a push stage's compare offset keeps x outside the
  digit alphabet for every z, so the second branch always runs and appends
  (w + b) as a new low digit.
- d == D: y drops the low digit. If the second branch runs as well, it
  appends a fresh digit right back, and for a properly nested chain no
  later stage is left to remove it; the final accumulator can only return
  to zero if every pop takes the equality branch.

Strict nesting also means the low digit entering a pop is exactly the digit
its matching push appended, so the equality condition at pop q, matched to
push p, is an affine relation between the two free digits:

    w[q] = w[p] + b[p] + a[q]

That relation, plus the digit range it leaves usable for w[p], is all the
optimizer ever needs; no accumulator trace is materialized here.
*/

/// The forced relation `digit[pop] = digit[push] + delta` of one matched
/// pair, with the push-digit subrange keeping both digits in the alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub push: usize,
    pub pop: usize,
    pub delta: i64,
    pub push_lo: i64,
    pub push_hi: i64,
}

/// Derives the affine relation of every matched pair.
///
/// Also checks the two offset preconditions the branch argument above rests
/// on: a push stage's compare offset must miss the digit alphabet for every
/// accumulator, and its push offset must keep `w + b` a valid base-D digit.
pub fn derive(
    chain: &StageChain,
    pairs: &[PushPopPair],
) -> Result<ArrayVec<Relation, MAX_STAGES>, SolveError> {
    let cfg = chain.config();
    // offsets come straight off the parsed text, so all sums below are taken
    // in 128 bits to stay total at the integer edges
    let (min, max) = (cfg.min_digit as i128, cfg.max_digit as i128);
    for i in 0..chain.len() {
        if chain.role(i) != StageRole::Push {
            continue;
        }
        let p = chain.get(i);
        let a = p.compare_offset as i128;
        if a <= max && a + cfg.base as i128 - 1 >= min {
            return Err(SolveError::MalformedChain(format!(
                "push stage {}: compare offset {a} can reach the digit alphabet \
                 [{}, {}], so the push is not unconditional",
                i + 1,
                cfg.min_digit,
                cfg.max_digit
            )));
        }
        let b = p.push_offset as i128;
        if min + b < 0 || max + b >= cfg.base as i128 {
            return Err(SolveError::MalformedChain(format!(
                "push stage {}: push offset {b} does not keep w + {b} a base-{} digit",
                i + 1,
                cfg.base
            )));
        }
    }

    let mut relations = ArrayVec::new();
    for &PushPopPair { push, pop } in pairs {
        let delta = chain.get(push).push_offset as i128 + chain.get(pop).compare_offset as i128;
        let push_lo = min.max(min - delta);
        let push_hi = max.min(max - delta);
        if push_lo > push_hi {
            return Err(SolveError::Infeasible(format!(
                "stages {} and {} require w{} = w{} + {delta}, which no digit in \
                 [{}, {}] satisfies",
                push + 1,
                pop + 1,
                pop + 1,
                push + 1,
                cfg.min_digit,
                cfg.max_digit
            )));
        }
        // a feasible delta is bounded by the digit span, so these all narrow
        // back into i64
        relations.push(Relation {
            push,
            pop,
            delta: delta as i64,
            push_lo: push_lo as i64,
            push_hi: push_hi as i64,
        });
    }
    Ok(relations)
}

#[cfg(test)]
use crate::chain::{pop_params, push_params, ChainConfig};
#[cfg(test)]
use crate::matcher::match_pairs;

#[cfg(test)]
fn derive_all(params: &[crate::chain::StageParams]) -> Result<Vec<Relation>, SolveError> {
    let chain = StageChain::new(params, ChainConfig::default()).unwrap();
    let pairs = match_pairs(&chain)?;
    Ok(derive(&chain, &pairs)?.into_iter().collect())
}

#[test]
fn test_relation_and_range() {
    // w2 = w1 + 5 - 7 = w1 - 2; usable w1 range is [3, 9]
    let relations = derive_all(&[push_params(12, 5), pop_params(-7)]).unwrap();
    assert_eq!(
        relations,
        [Relation { push: 0, pop: 1, delta: -2, push_lo: 3, push_hi: 9 }]
    );
}

#[test]
fn test_unsatisfiable_pair() {
    // delta = 14 - 5 = 9 forces w2 = w1 + 9, out of range for every w1
    let err = derive_all(&[push_params(12, 14), pop_params(-5)]).unwrap_err();
    assert!(matches!(err, SolveError::Infeasible(_)));
}

#[test]
fn test_extreme_offsets_do_not_overflow() {
    // a compare offset at the integer edge is simply far out of reach
    let relations = derive_all(&[push_params(i64::MAX, 5), pop_params(-7)]).unwrap();
    assert_eq!(relations[0].delta, -2);
    // and a pop offset at the opposite edge is infeasible, not a panic
    let err = derive_all(&[push_params(12, 5), pop_params(i64::MIN)]).unwrap_err();
    assert!(matches!(err, SolveError::Infeasible(_)));
}

#[test]
fn test_push_compare_offset_in_reach() {
    let err = derive_all(&[push_params(5, 3), pop_params(-2)]).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("compare offset")));
}

#[test]
fn test_push_offset_overflows_base() {
    // 9 + 20 = 29 is not a base-26 digit
    let err = derive_all(&[push_params(12, 20), pop_params(-2)]).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("push offset")));
    // 1 - 2 < 0 is not one either
    let err = derive_all(&[push_params(12, -2), pop_params(-2)]).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("push offset")));
}
