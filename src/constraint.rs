use std::fmt;

use ahash::AHashMap;

use crate::error::SolveError;
use crate::utils::{eat, parse_i64, parse_u64, skip_ws};

/// One caller-supplied affine fact about the digit variables, 0-based.
///
/// These conjoin with the derived pair relations; they never override them.
/// A contradiction between the two surfaces as `Infeasible` at solve time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// `w[stage] == value`
    Exactly { stage: usize, value: i64 },
    /// `w[stage] >= value`
    AtLeast { stage: usize, value: i64 },
    /// `w[stage] <= value`
    AtMost { stage: usize, value: i64 },
    /// `w[stage] == w[anchor] + offset`
    Offset { stage: usize, anchor: usize, offset: i64 },
}

impl Constraint {
    /// The stage indices this constraint touches.
    pub fn stages(&self) -> (usize, Option<usize>) {
        match *self {
            Self::Exactly { stage, .. } | Self::AtLeast { stage, .. } | Self::AtMost { stage, .. } => {
                (stage, None)
            }
            Self::Offset { stage, anchor, .. } => (stage, Some(anchor)),
        }
    }

    /// Parses the textual form used by the CLI, with 1-based variables:
    /// `w4 = 9`, `w10 > 6`, `w12 <= 2`, `w11 = w10 - 6`.
    ///
    /// Strict comparisons are folded into inclusive bounds right here, since
    /// the variables are integers. Two-variable facts admit `=` only.
    pub fn parse(text: &str) -> Result<Self, SolveError> {
        let fail = || SolveError::Parse(format!("bad constraint {text:?}"));
        let mut s = text.as_bytes();
        skip_ws(&mut s);
        let stage = parse_var(&mut s).ok_or_else(fail)?;
        skip_ws(&mut s);

        enum Op {
            Eq,
            Gt,
            Ge,
            Lt,
            Le,
        }
        let op = if eat(&mut s, b">=") {
            Op::Ge
        } else if eat(&mut s, b"<=") {
            Op::Le
        } else if eat(&mut s, b">") {
            Op::Gt
        } else if eat(&mut s, b"<") {
            Op::Lt
        } else if eat(&mut s, b"==") || eat(&mut s, b"=") {
            Op::Eq
        } else {
            return Err(fail());
        };
        skip_ws(&mut s);

        let parsed = if s.first() == Some(&b'w') {
            if !matches!(op, Op::Eq) {
                return Err(fail());
            }
            let anchor = parse_var(&mut s).ok_or_else(fail)?;
            skip_ws(&mut s);
            let offset = if s.is_empty() {
                0
            } else {
                let neg = eat(&mut s, b"-");
                if !neg && !eat(&mut s, b"+") {
                    return Err(fail());
                }
                skip_ws(&mut s);
                let v = parse_u64(&mut s).and_then(|v| i64::try_from(v).ok()).ok_or_else(fail)?;
                if neg {
                    -v
                } else {
                    v
                }
            };
            Self::Offset { stage, anchor, offset }
        } else {
            let value = parse_i64(&mut s).ok_or_else(fail)?;
            match op {
                Op::Eq => Self::Exactly { stage, value },
                Op::Ge => Self::AtLeast { stage, value },
                Op::Gt => Self::AtLeast { stage, value: value.saturating_add(1) },
                Op::Le => Self::AtMost { stage, value },
                Op::Lt => Self::AtMost { stage, value: value.saturating_sub(1) },
            }
        };
        skip_ws(&mut s);
        if !s.is_empty() {
            return Err(fail());
        }
        Ok(parsed)
    }
}

fn parse_var(s: &mut &[u8]) -> Option<usize> {
    if !eat(s, b"w") {
        return None;
    }
    match parse_u64(s)? {
        0 => None,
        n => Some(n as usize - 1),
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Exactly { stage, value } => write!(f, "w{} = {}", stage + 1, value),
            Self::AtLeast { stage, value } => write!(f, "w{} >= {}", stage + 1, value),
            Self::AtMost { stage, value } => write!(f, "w{} <= {}", stage + 1, value),
            Self::Offset { stage, anchor, offset } if offset < 0 => {
                write!(f, "w{} = w{} - {}", stage + 1, anchor + 1, -offset)
            }
            Self::Offset { stage, anchor, offset } => {
                write!(f, "w{} = w{} + {}", stage + 1, anchor + 1, offset)
            }
        }
    }
}

/// Auxiliary constraints, indexed by the stages they touch.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    items: Vec<Constraint>,
    by_stage: AHashMap<usize, Vec<usize>>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, constraint: Constraint) {
        let idx = self.items.len();
        let (a, b) = constraint.stages();
        self.by_stage.entry(a).or_default().push(idx);
        if let Some(b) = b {
            if b != a {
                self.by_stage.entry(b).or_default().push(idx);
            }
        }
        self.items.push(constraint);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.items.iter()
    }

    /// All constraints mentioning `stage`.
    pub fn touching(&self, stage: usize) -> impl Iterator<Item = &Constraint> + '_ {
        self.by_stage.get(&stage).into_iter().flatten().map(move |&i| &self.items[i])
    }

    /// Tightens `[lo, hi]` by every single-variable constraint on `stage`.
    /// The returned range may be empty; the solver reports that, not us.
    pub fn bounds(&self, stage: usize, mut lo: i64, mut hi: i64) -> (i64, i64) {
        for c in self.touching(stage) {
            match *c {
                Constraint::Exactly { stage: s, value } if s == stage => {
                    lo = lo.max(value);
                    hi = hi.min(value);
                }
                Constraint::AtLeast { stage: s, value } if s == stage => lo = lo.max(value),
                Constraint::AtMost { stage: s, value } if s == stage => hi = hi.min(value),
                _ => {}
            }
        }
        (lo, hi)
    }

    /// All two-variable facts, as `(stage, anchor, offset)` edges.
    pub fn offsets(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        self.items.iter().filter_map(|c| match *c {
            Constraint::Offset { stage, anchor, offset } => Some((stage, anchor, offset)),
            _ => None,
        })
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        let mut set = Self::new();
        for c in iter {
            set.push(c);
        }
        set
    }
}

#[test]
fn test_parse_single_variable() {
    assert_eq!(Constraint::parse("w4 = 9").unwrap(), Constraint::Exactly { stage: 3, value: 9 });
    assert_eq!(Constraint::parse("w10 > 6").unwrap(), Constraint::AtLeast { stage: 9, value: 7 });
    assert_eq!(Constraint::parse("w10 >= 7").unwrap(), Constraint::AtLeast { stage: 9, value: 7 });
    assert_eq!(Constraint::parse("w12 < 3").unwrap(), Constraint::AtMost { stage: 11, value: 2 });
    assert_eq!(Constraint::parse(" w1 <= -2 ").unwrap(), Constraint::AtMost { stage: 0, value: -2 });
}

#[test]
fn test_parse_extreme_bound_saturates() {
    assert_eq!(
        Constraint::parse("w1 > 9223372036854775807").unwrap(),
        Constraint::AtLeast { stage: 0, value: i64::MAX }
    );
    assert_eq!(
        Constraint::parse("w1 < -9223372036854775807").unwrap(),
        Constraint::AtMost { stage: 0, value: i64::MIN }
    );
}

#[test]
fn test_parse_two_variable() {
    assert_eq!(
        Constraint::parse("w11 = w10 - 6").unwrap(),
        Constraint::Offset { stage: 10, anchor: 9, offset: -6 }
    );
    assert_eq!(
        Constraint::parse("w13 == w12 + 1").unwrap(),
        Constraint::Offset { stage: 12, anchor: 11, offset: 1 }
    );
    assert_eq!(
        Constraint::parse("w2 = w5").unwrap(),
        Constraint::Offset { stage: 1, anchor: 4, offset: 0 }
    );
}

#[test]
fn test_parse_rejects_garbage() {
    for bad in ["", "x1 > 2", "w0 = 1", "w1 >", "w1 = w2 * 3", "w1 < w2", "w1 = 2 junk"] {
        assert!(matches!(Constraint::parse(bad), Err(SolveError::Parse(_))), "{bad:?}");
    }
}

#[test]
fn test_bounds_and_touching() {
    let set: ConstraintSet = [
        Constraint::parse("w10 > 6").unwrap(),
        Constraint::parse("w10 < 9").unwrap(),
        Constraint::parse("w11 = w10 - 6").unwrap(),
        Constraint::parse("w3 = 4").unwrap(),
    ]
    .into_iter()
    .collect();
    assert_eq!(set.bounds(9, 1, 9), (7, 8));
    assert_eq!(set.bounds(2, 1, 9), (4, 4));
    assert_eq!(set.bounds(0, 1, 9), (1, 9));
    assert_eq!(set.touching(9).count(), 3);
    assert_eq!(set.touching(10).count(), 1);
    assert_eq!(set.offsets().collect::<Vec<_>>(), [(10, 9, -6)]);
}

#[test]
fn test_display_round_trips() {
    for text in ["w4 = 9", "w10 >= 7", "w12 <= 2", "w11 = w10 - 6", "w13 = w12 + 1"] {
        let c = Constraint::parse(text).unwrap();
        assert_eq!(c.to_string(), text);
        assert_eq!(Constraint::parse(&c.to_string()).unwrap(), c);
    }
}
