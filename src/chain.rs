use arrayvec::ArrayVec;

use crate::error::SolveError;

/// Upper bound on chain length; real chains are a few tens of stages.
pub const MAX_STAGES: usize = 64;

/// Digit alphabet and target shared by a whole chain.
///
/// `base` is the radix the accumulator is interpreted in; digits are drawn
/// from `[min_digit, max_digit]`. The defaults match the common instance:
/// base 26, digits 1 through 9, final accumulator 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainConfig {
    pub base: i64,
    pub min_digit: i64,
    pub max_digit: i64,
    pub target: i64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { base: 26, min_digit: 1, max_digit: 9, target: 0 }
    }
}

/// Per-stage parameter triple `(d, a, b)` of the transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageParams {
    pub divisor: i64,
    pub compare_offset: i64,
    pub push_offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRole {
    Push,
    Pop,
}

/// Validated, immutable table of stage parameters plus its [`ChainConfig`].
///
/// Construction is the only place a divisor outside `{1, base}` can be
/// caught, so everything downstream may classify stages by divisor alone.
#[derive(Debug, Clone)]
pub struct StageChain {
    params: ArrayVec<StageParams, MAX_STAGES>,
    config: ChainConfig,
}

impl StageChain {
    pub fn new(params: &[StageParams], config: ChainConfig) -> Result<Self, SolveError> {
        if config.base < 2
            || config.min_digit < 0
            || config.min_digit > config.max_digit
            || config.max_digit >= config.base
        {
            return Err(SolveError::MalformedChain(format!(
                "invalid digit alphabet: base {}, digits [{}, {}]",
                config.base, config.min_digit, config.max_digit
            )));
        }
        if params.is_empty() {
            return Err(SolveError::MalformedChain("empty stage chain".into()));
        }
        if params.len() > MAX_STAGES {
            return Err(SolveError::MalformedChain(format!(
                "chain has {} stages, limit is {MAX_STAGES}",
                params.len()
            )));
        }
        for (i, p) in params.iter().enumerate() {
            if p.divisor != 1 && p.divisor != config.base {
                return Err(SolveError::MalformedChain(format!(
                    "stage {}: divisor {} is neither 1 nor {}",
                    i + 1,
                    p.divisor,
                    config.base
                )));
            }
        }
        // the verifier holds the accumulator in 128 bits, which caps how many
        // base-D digits can be open at once
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for p in params {
            if p.divisor == 1 {
                depth += 1;
                max_depth = max_depth.max(depth);
            } else {
                depth = depth.saturating_sub(1);
            }
        }
        let mut acc = config.base as i128;
        let mut limit = 1usize;
        while let Some(next) = acc.checked_mul(config.base as i128) {
            acc = next;
            limit += 1;
        }
        if max_depth > limit {
            return Err(SolveError::MalformedChain(format!(
                "nesting depth {max_depth} exceeds the {limit} base-{} digits the \
                 accumulator can hold",
                config.base
            )));
        }
        Ok(Self { params: params.iter().copied().collect(), config })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// A validated chain is never empty; kept for clippy's sake.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn config(&self) -> ChainConfig {
        self.config
    }

    #[inline]
    pub fn get(&self, stage: usize) -> StageParams {
        self.params[stage]
    }

    pub fn iter(&self) -> impl Iterator<Item = StageParams> + '_ {
        self.params.iter().copied()
    }

    #[inline]
    pub fn role(&self, stage: usize) -> StageRole {
        if self.params[stage].divisor == 1 {
            StageRole::Push
        } else {
            StageRole::Pop
        }
    }
}

#[cfg(test)]
pub(crate) fn push_params(compare_offset: i64, push_offset: i64) -> StageParams {
    StageParams { divisor: 1, compare_offset, push_offset }
}

#[cfg(test)]
pub(crate) fn pop_params(compare_offset: i64) -> StageParams {
    StageParams { divisor: 26, compare_offset, push_offset: 0 }
}

#[test]
fn test_roles() {
    let chain =
        StageChain::new(&[push_params(12, 5), pop_params(-3)], ChainConfig::default()).unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.role(0), StageRole::Push);
    assert_eq!(chain.role(1), StageRole::Pop);
    assert_eq!(chain.get(1).compare_offset, -3);
}

#[test]
fn test_rejects_bad_divisor() {
    let params = [push_params(12, 5), StageParams { divisor: 7, compare_offset: 0, push_offset: 0 }];
    let err = StageChain::new(&params, ChainConfig::default()).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("stage 2")));
}

#[test]
fn test_rejects_empty_chain() {
    let err = StageChain::new(&[], ChainConfig::default()).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(_)));
}

#[test]
fn test_rejects_excessive_depth() {
    // 28 open base-26 digits need more than 128 accumulator bits
    let mut params = vec![push_params(12, 0); 28];
    params.extend(vec![pop_params(-2); 28]);
    let err = StageChain::new(&params, ChainConfig::default()).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("nesting depth")));
}

#[test]
fn test_base_override_must_match_divisors() {
    // an overridden base turns the program's pop divisors into garbage
    let program = crate::parse::parse_program(crate::sample_program()).unwrap();
    let config = ChainConfig { base: 10, ..ChainConfig::default() };
    let err = StageChain::new(&program.params, config).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(ref msg) if msg.contains("divisor")));
}

#[test]
fn test_rejects_bad_alphabet() {
    let config = ChainConfig { base: 8, max_digit: 9, ..ChainConfig::default() };
    let err = StageChain::new(&[push_params(12, 5)], config).unwrap_err();
    assert!(matches!(err, SolveError::MalformedChain(_)));
}
