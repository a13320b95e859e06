use crate::chain::StageChain;
use crate::error::SolveError;
use crate::solve::Assignment;

/// Replays the full transition rule, all branches, and returns the final
/// accumulator. `digits[i]` feeds stage `i`; extra digits are ignored.
///
/// The accumulator is tracked in 128 bits with checked growth, so a chain
/// whose replay outgrows even that comes back as an error rather than a
/// panic (reachable only through repeated non-equality pops, since chain
/// construction already caps the nesting depth).
pub fn replay(chain: &StageChain, digits: &[i64]) -> Result<i128, SolveError> {
    if digits.len() < chain.len() {
        return Err(SolveError::InternalInconsistency(format!(
            "{} digits supplied for a {}-stage chain",
            digits.len(),
            chain.len()
        )));
    }
    let base = chain.config().base as i128;
    let mut z: i128 = 0;
    for (i, p) in chain.iter().enumerate() {
        let w = digits[i] as i128;
        let y = z / p.divisor as i128;
        let x = z % base + p.compare_offset as i128;
        z = if x == w {
            y
        } else {
            base.checked_mul(y)
                .and_then(|t| t.checked_add(w + p.push_offset as i128))
                .ok_or_else(|| {
                    SolveError::MalformedChain(format!(
                        "stage {}: accumulator exceeds the supported width",
                        i + 1
                    ))
                })?
        };
    }
    Ok(z)
}

/// Checks a solver-produced assignment against the configured target.
///
/// The solver never materializes the accumulator trace, so this is the one
/// independent cross-check; a mismatch means the derivation is buggy, not
/// that the input is unsolvable.
pub fn check(chain: &StageChain, assignment: &Assignment) -> Result<(), SolveError> {
    let target = chain.config().target;
    if assignment.digits().len() != chain.len() {
        return Err(SolveError::InternalInconsistency(format!(
            "assignment has {} digits for a {}-stage chain",
            assignment.digits().len(),
            chain.len()
        )));
    }
    let z = replay(chain, assignment.digits())?;
    if z != target as i128 {
        return Err(SolveError::InternalInconsistency(format!(
            "assignment {assignment} replays to accumulator {z}, expected {target}"
        )));
    }
    Ok(())
}

#[cfg(test)]
use crate::chain::{pop_params, push_params, ChainConfig, StageParams};

#[test]
fn test_replay_branches() {
    let params = [
        push_params(12, 5),
        StageParams { divisor: 26, compare_offset: -6, push_offset: 8 },
    ];
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    // push 3: z = 3 + 5 = 8; pop wants w = 8 - 6 = 2
    assert_eq!(replay(&chain, &[3, 2]).unwrap(), 0);
    // wrong pop digit re-pushes: z = 26*0 + 4 + 8 = 12
    assert_eq!(replay(&chain, &[3, 4]).unwrap(), 12);
}

#[test]
fn test_replay_nested() {
    // push 7 then push 1 on top; pops unwind in reverse order
    let params =
        [push_params(12, 0), push_params(13, 2), pop_params(-1), pop_params(-3)];
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    let digits = [7, 1, 2, 4]; // w3 = w2 + 2 - 1, w4 = w1 + 0 - 3
    assert_eq!(replay(&chain, &digits).unwrap(), 0);
    assert_ne!(replay(&chain, &[7, 1, 2, 5]).unwrap(), 0);
}

#[test]
fn test_replay_too_few_digits() {
    let chain =
        StageChain::new(&[push_params(12, 5), pop_params(-7)], ChainConfig::default()).unwrap();
    let err = replay(&chain, &[3]).unwrap_err();
    assert!(matches!(err, SolveError::InternalInconsistency(_)));
}

#[test]
fn test_replay_overflow_is_an_error() {
    // shallow nesting, but every pop misses its digit and hands the pushed
    // value straight back, so the accumulator keeps one base-26 digit per
    // push and eventually outgrows 128 bits
    let mut params = Vec::new();
    for _ in 0..30 {
        params.push(push_params(12, 0));
        params.push(StageParams { divisor: 26, compare_offset: -100, push_offset: 0 });
    }
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    let digits = vec![1; params.len()];
    let err = replay(&chain, &digits).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("accumulator")));
}
