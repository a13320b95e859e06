use std::fmt;
use std::iter::once;

use ahash::AHashMap;
use arrayvec::ArrayVec;

use crate::chain::{StageChain, MAX_STAGES};
use crate::constraint::ConstraintSet;
use crate::error::SolveError;
use crate::matcher::match_pairs;
use crate::relation::derive;
use crate::verify;

/// A complete stage-index → digit mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    digits: ArrayVec<i64, MAX_STAGES>,
}

impl Assignment {
    #[inline]
    pub fn digits(&self) -> &[i64] {
        &self.digits
    }

    #[inline]
    pub fn digit(&self, stage: usize) -> i64 {
        self.digits[stage]
    }

    /// The digit sequence read as a base-10 numeral, most significant digit
    /// first. Only meaningful while every digit fits one decimal place and
    /// the chain is short enough for the numeral to fit a `u128`.
    pub fn numeral(&self) -> u128 {
        self.digits.iter().fold(0, |acc, &d| acc * 10 + d as u128)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wide = self.digits.iter().any(|&d| d > 9);
        for (i, &d) in self.digits.iter().enumerate() {
            if wide && i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Both extremal answers for one chain and constraint set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extremes {
    pub largest: Assignment,
    pub smallest: Assignment,
}

#[derive(Clone, Copy)]
enum Goal {
    Largest,
    Smallest,
}

/// Lexicographically largest satisfying assignment, or why there is none.
pub fn maximize(chain: &StageChain, constraints: &ConstraintSet) -> Result<Assignment, SolveError> {
    solve(chain, constraints, Goal::Largest)
}

/// Lexicographically smallest satisfying assignment, or why there is none.
pub fn minimize(chain: &StageChain, constraints: &ConstraintSet) -> Result<Assignment, SolveError> {
    solve(chain, constraints, Goal::Smallest)
}

pub fn solve_extremes(
    chain: &StageChain,
    constraints: &ConstraintSet,
) -> Result<Extremes, SolveError> {
    Ok(Extremes {
        largest: maximize(chain, constraints)?,
        smallest: minimize(chain, constraints)?,
    })
}

/*
Closed form, no search. Every digit is either free within a range or tied to
exactly one other digit by an affine relation, so the chain decomposes into
independent affine components:

1. Per-stage bounds: the alphabet range tightened by single-variable
   constraints and by each relation's usable push range.
2. A union-find with offsets conjoins the relation edges and any explicit
   two-variable constraints; an edge closing a cycle must agree with the
   difference already fixed, which is where an explicit constraint can
   contradict a derived relation.
3. Per component, every member's bounds are mapped back through its offset
   to the representative and intersected.
4. Each member grows monotonically with its representative, so the largest
   numeral takes every representative's upper bound, the smallest its lower
   bound; components are disjoint, which makes this lexicographically exact.

The result is replayed once through the verifier before being returned.
*/
fn solve(
    chain: &StageChain,
    constraints: &ConstraintSet,
    goal: Goal,
) -> Result<Assignment, SolveError> {
    let cfg = chain.config();
    if cfg.target != 0 {
        return Err(SolveError::MalformedChain(format!(
            "target accumulator {} is not supported: a balanced chain can only \
             reach 0",
            cfg.target
        )));
    }
    let n = chain.len();
    for c in constraints.iter() {
        let (a, b) = c.stages();
        for stage in once(a).chain(b) {
            if stage >= n {
                return Err(SolveError::Parse(format!(
                    "constraint '{c}' references stage {}, but the chain has {n} stages",
                    stage + 1
                )));
            }
        }
    }

    let pairs = match_pairs(chain)?;
    let relations = derive(chain, &pairs)?;

    let mut bounds: ArrayVec<(i64, i64), MAX_STAGES> =
        (0..n).map(|i| constraints.bounds(i, cfg.min_digit, cfg.max_digit)).collect();
    for rel in &relations {
        let (lo, hi) = bounds[rel.push];
        bounds[rel.push] = (lo.max(rel.push_lo), hi.min(rel.push_hi));
    }
    for (i, &(lo, hi)) in bounds.iter().enumerate() {
        if lo > hi {
            return Err(SolveError::Infeasible(format!(
                "no admissible digit for stage {}",
                i + 1
            )));
        }
    }

    let mut forest = AffineForest::new(n);
    let span = cfg.max_digit - cfg.min_digit;
    for (stage, anchor, offset) in constraints.offsets() {
        // two in-range digits can never differ by more than the span; ruling
        // this out up front also keeps every offset in the forest small
        if offset > span || offset < -span {
            return Err(SolveError::Infeasible(format!(
                "constraint w{} = w{} + {offset} cannot hold for digits in [{}, {}]",
                stage + 1,
                anchor + 1,
                cfg.min_digit,
                cfg.max_digit
            )));
        }
        if let Err(have) = forest.merge(stage, anchor, offset) {
            return Err(SolveError::Infeasible(format!(
                "constraint w{} = w{} + {offset} contradicts an earlier fact fixing \
                 the difference at {have}",
                stage + 1,
                anchor + 1
            )));
        }
    }
    for rel in &relations {
        if let Err(have) = forest.merge(rel.pop, rel.push, rel.delta) {
            return Err(SolveError::Infeasible(format!(
                "derived relation w{} = w{} + {} contradicts an explicit constraint \
                 fixing the difference at {have}",
                rel.pop + 1,
                rel.push + 1,
                rel.delta
            )));
        }
    }

    let mut windows: AHashMap<usize, (i64, i64)> = AHashMap::with_capacity(n);
    for i in 0..n {
        let (root, off) = forest.find(i);
        let (lo, hi) = bounds[i];
        let w = windows.entry(root).or_insert((i64::MIN, i64::MAX));
        w.0 = w.0.max(lo - off);
        w.1 = w.1.min(hi - off);
        if w.0 > w.1 {
            return Err(SolveError::Infeasible(format!(
                "no digit for stage {} satisfies all relations and constraints",
                i + 1
            )));
        }
    }

    let mut digits = ArrayVec::new();
    for i in 0..n {
        let (root, off) = forest.find(i);
        let (lo, hi) = windows[&root];
        let v = match goal {
            Goal::Largest => hi,
            Goal::Smallest => lo,
        };
        digits.push(v + off);
    }
    let assignment = Assignment { digits };
    verify::check(chain, &assignment)?;
    Ok(assignment)
}

/// Union-find over digit variables where every edge fixes an exact
/// difference: `value(i) = value(parent(i)) + shift(i)`.
struct AffineForest {
    parent: Vec<usize>,
    shift: Vec<i64>,
}

impl AffineForest {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), shift: vec![0; n] }
    }

    /// `(root, offset)` such that `value(i) = value(root) + offset`, with
    /// path compression.
    fn find(&mut self, i: usize) -> (usize, i64) {
        let (mut root, mut total) = (i, 0);
        while self.parent[root] != root {
            total += self.shift[root];
            root = self.parent[root];
        }
        let (mut node, mut rest) = (i, total);
        while self.parent[node] != node {
            let next = self.parent[node];
            let step = self.shift[node];
            self.parent[node] = root;
            self.shift[node] = rest;
            rest -= step;
            node = next;
        }
        (root, total)
    }

    /// Records `value(a) = value(b) + k`. If `a` and `b` are already
    /// connected with a different difference, returns that difference.
    fn merge(&mut self, a: usize, b: usize, k: i64) -> Result<(), i64> {
        let (ra, oa) = self.find(a);
        let (rb, ob) = self.find(b);
        if ra == rb {
            return if oa - ob == k { Ok(()) } else { Err(oa - ob) };
        }
        self.parent[ra] = rb;
        self.shift[ra] = ob + k - oa;
        Ok(())
    }
}

#[cfg(test)]
use crate::chain::{ChainConfig, StageParams};
#[cfg(test)]
use crate::constraint::Constraint;

#[cfg(test)]
fn sample_chain() -> StageChain {
    let program = crate::parse::parse_program(crate::sample_program()).unwrap();
    let config = ChainConfig { base: program.base, ..ChainConfig::default() };
    StageChain::new(&program.params, config).unwrap()
}

#[cfg(test)]
fn constraints_of(texts: &[&str]) -> ConstraintSet {
    texts.iter().map(|s| Constraint::parse(s).unwrap()).collect()
}

#[test]
fn test_sample_extremes() {
    let chain = sample_chain();
    let out = solve_extremes(&chain, &ConstraintSet::new()).unwrap();
    assert_eq!(out.largest.numeral(), 79197919993985);
    assert_eq!(out.smallest.numeral(), 13191913571211);
    assert_eq!(out.largest.to_string(), "79197919993985");
    verify::check(&chain, &out.largest).unwrap();
    verify::check(&chain, &out.smallest).unwrap();
}

#[test]
fn test_sample_with_constraints() {
    let chain = sample_chain();
    let constraints = constraints_of(&["w10 > 6", "w11 = w10 - 6", "w12 < 3"]);
    let out = solve_extremes(&chain, &constraints).unwrap();
    for a in [&out.largest, &out.smallest] {
        assert_eq!(a.digit(11), 2); // w12
        assert_eq!(a.digit(12), 1); // w13
        assert_eq!(a.digit(5), 9); // w6
        assert_eq!(a.digit(6), 1); // w7
        assert_eq!(a.digit(2), 1); // w3
        assert_eq!(a.digit(3), 9); // w4
        assert!(a.digit(9) > 6); // w10
        verify::check(&chain, a).unwrap();
    }
    assert_eq!(out.largest.numeral(), 79197919993215);
    assert_eq!(out.smallest.numeral(), 13191913571211);
}

#[test]
fn test_contradiction_flips_to_infeasible() {
    let chain = sample_chain();
    // w3 is pinned at 1 by the derived relation w4 = w3 + 8
    let constraints = constraints_of(&["w3 > 1"]);
    assert!(matches!(maximize(&chain, &constraints), Err(SolveError::Infeasible(_))));
    // an offset disagreeing with the derived delta is caught at merge time
    let constraints = constraints_of(&["w4 = w3 + 7"]);
    assert!(matches!(maximize(&chain, &constraints), Err(SolveError::Infeasible(_))));
    // dropping the contradiction restores the unconstrained answer
    let constraints = constraints_of(&["w4 = w3 + 8"]);
    assert_eq!(maximize(&chain, &constraints).unwrap().numeral(), 79197919993985);
}

#[test]
fn test_pinning_a_free_digit() {
    let chain = sample_chain();
    let constraints = constraints_of(&["w2 = 5"]);
    let out = solve_extremes(&chain, &constraints).unwrap();
    assert_eq!(out.largest.digit(1), 5);
    assert_eq!(out.largest.digit(4), 3); // w5 = w2 - 2
    assert_eq!(out.smallest.digit(1), 5);
    verify::check(&chain, &out.largest).unwrap();
}

#[test]
fn test_constraint_on_missing_stage() {
    let chain = sample_chain();
    let constraints = constraints_of(&["w15 = 3"]);
    assert!(matches!(maximize(&chain, &constraints), Err(SolveError::Parse(_))));
}

#[test]
fn test_nonzero_target_rejected() {
    let program = crate::parse::parse_program(crate::sample_program()).unwrap();
    let config = ChainConfig { target: 5, ..ChainConfig::default() };
    let chain = StageChain::new(&program.params, config).unwrap();
    let err = maximize(&chain, &ConstraintSet::new()).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(_)));
}

#[test]
fn test_deep_chain_solves() {
    // 15 digits open at once; the verifier's accumulator has to carry all of
    // them without wrapping
    let mut params = vec![StageParams { divisor: 1, compare_offset: 12, push_offset: 0 }; 15];
    params.extend(vec![StageParams { divisor: 26, compare_offset: 0, push_offset: 0 }; 15]);
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    let out = solve_extremes(&chain, &ConstraintSet::new()).unwrap();
    assert!(out.largest.digits().iter().all(|&d| d == 9));
    assert!(out.smallest.digits().iter().all(|&d| d == 1));
}

#[test]
fn test_huge_offset_constraint_is_infeasible() {
    let chain = sample_chain();
    let constraints = constraints_of(&["w2 = w1 + 9223372036854775807"]);
    assert!(matches!(maximize(&chain, &constraints), Err(SolveError::Infeasible(_))));
}

#[test]
fn test_unbalanced_chain_never_answers() {
    let params = [StageParams { divisor: 1, compare_offset: 12, push_offset: 5 }];
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    let constraints = ConstraintSet::new();
    for result in [maximize(&chain, &constraints), minimize(&chain, &constraints)] {
        assert!(matches!(result, Err(SolveError::UnbalancedChain(_))));
    }
}

#[test]
fn test_extremality_brute_force() {
    let params = [
        StageParams { divisor: 1, compare_offset: 12, push_offset: 5 },
        StageParams { divisor: 1, compare_offset: 10, push_offset: 3 },
        StageParams { divisor: 26, compare_offset: -6, push_offset: 8 },
        StageParams { divisor: 26, compare_offset: -1, push_offset: 2 },
    ];
    let chain = StageChain::new(&params, ChainConfig::default()).unwrap();
    let out = solve_extremes(&chain, &ConstraintSet::new()).unwrap();

    let (mut best, mut worst) = (None, None);
    for w1 in 1..=9 {
        for w2 in 1..=9 {
            for w3 in 1..=9 {
                for w4 in 1..=9 {
                    let digits: [i64; 4] = [w1, w2, w3, w4];
                    if verify::replay(&chain, &digits).unwrap() != 0 {
                        continue;
                    }
                    let v = digits.iter().fold(0u128, |acc, &d| acc * 10 + d as u128);
                    best = Some(best.map_or(v, |b: u128| b.max(v)));
                    worst = Some(worst.map_or(v, |w: u128| w.min(v)));
                }
            }
        }
    }
    assert_eq!(Some(out.largest.numeral()), best);
    assert_eq!(Some(out.smallest.numeral()), worst);
}
