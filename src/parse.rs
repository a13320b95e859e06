use crate::chain::StageParams;
use crate::error::SolveError;
use crate::utils::{eat, lines, parse_i64};

/// Instruction lines per stage block.
pub const BLOCK_LINES: usize = 18;

/// A parsed stage program: the base its blocks divide and mod by, and one
/// parameter triple per block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub base: i64,
    pub params: Vec<StageParams>,
}

/// Parses the textual register-machine form a chain ships in: a repeated
/// 18-instruction block reading one digit into `w` and folding it into the
/// running accumulator `z`,
///
/// ```text
/// inp w        mul y 0
/// mul x 0      add y 25     <- base - 1
/// add x z      mul y x
/// mod x 26     <- base      add y 1
/// div z D      <- divisor   mul z y
/// add x A      <- compare   mul y 0
/// eql x w      add y w
/// eql x 0      add y B      <- push offset
///              mul y x
///              add z y
/// ```
///
/// Anything deviating from that shape is a [`SolveError::Parse`]; the three
/// extracted numbers per block are validated later by [`crate::StageChain`]
/// and the relation deriver.
pub fn parse_program(s: &[u8]) -> Result<Program, SolveError> {
    let mut all: Vec<&[u8]> = lines(s).collect();
    while all.last().is_some_and(|line| line.is_empty()) {
        all.pop();
    }
    if all.is_empty() || all.len() % BLOCK_LINES != 0 {
        return Err(SolveError::Parse(format!(
            "expected a non-zero multiple of {BLOCK_LINES} instruction lines, got {}",
            all.len()
        )));
    }

    let mut base = 0;
    let mut params = Vec::with_capacity(all.len() / BLOCK_LINES);
    for (b, block) in all.chunks(BLOCK_LINES).enumerate() {
        let stage = b + 1;
        expect(block[0], b"inp w", stage)?;
        expect(block[1], b"mul x 0", stage)?;
        expect(block[2], b"add x z", stage)?;
        let block_base = field(block[3], b"mod x ", stage)?;
        let divisor = field(block[4], b"div z ", stage)?;
        let compare_offset = field(block[5], b"add x ", stage)?;
        expect(block[6], b"eql x w", stage)?;
        expect(block[7], b"eql x 0", stage)?;
        expect(block[8], b"mul y 0", stage)?;
        let scale = field(block[9], b"add y ", stage)?;
        expect(block[10], b"mul y x", stage)?;
        expect(block[11], b"add y 1", stage)?;
        expect(block[12], b"mul z y", stage)?;
        expect(block[13], b"mul y 0", stage)?;
        expect(block[14], b"add y w", stage)?;
        let push_offset = field(block[15], b"add y ", stage)?;
        expect(block[16], b"mul y x", stage)?;
        expect(block[17], b"add z y", stage)?;

        if scale != block_base - 1 {
            return Err(SolveError::Parse(format!(
                "stage {stage}: digit scale {scale} does not match base {block_base}"
            )));
        }
        if b == 0 {
            base = block_base;
        } else if block_base != base {
            return Err(SolveError::Parse(format!(
                "stage {stage}: base {block_base} differs from base {base} of stage 1"
            )));
        }
        params.push(StageParams { divisor, compare_offset, push_offset });
    }
    Ok(Program { base, params })
}

fn expect(line: &[u8], want: &[u8], stage: usize) -> Result<(), SolveError> {
    if line == want {
        Ok(())
    } else {
        Err(SolveError::Parse(format!(
            "stage {stage}: expected '{}', found '{}'",
            String::from_utf8_lossy(want),
            String::from_utf8_lossy(line)
        )))
    }
}

fn field(line: &[u8], prefix: &[u8], stage: usize) -> Result<i64, SolveError> {
    let mut s = line;
    let bad = || {
        SolveError::Parse(format!(
            "stage {stage}: expected '{}<number>', found '{}'",
            String::from_utf8_lossy(prefix),
            String::from_utf8_lossy(line)
        ))
    };
    if !eat(&mut s, prefix) {
        return Err(bad());
    }
    let v = parse_i64(&mut s).ok_or_else(bad)?;
    if !s.is_empty() {
        return Err(bad());
    }
    Ok(v)
}

#[test]
fn test_parse_sample() {
    let program = parse_program(crate::sample_program()).unwrap();
    assert_eq!(program.base, 26);
    assert_eq!(program.params.len(), 14);
    assert_eq!(
        program.params[0],
        StageParams { divisor: 1, compare_offset: 12, push_offset: 7 }
    );
    assert_eq!(
        program.params[3],
        StageParams { divisor: 26, compare_offset: -2, push_offset: 4 }
    );
    assert_eq!(
        program.params[13],
        StageParams { divisor: 26, compare_offset: -5, push_offset: 11 }
    );
}

#[test]
fn test_parse_rejects_corruption() {
    let mut text = crate::sample_program().to_vec();
    // break the first `add x z`
    let pos = text.windows(7).position(|w| w == b"add x z").unwrap();
    text[pos] = b'x';
    assert!(matches!(parse_program(&text), Err(SolveError::Parse(_))));
}

#[test]
fn test_parse_rejects_truncation() {
    let text = crate::sample_program();
    // drop the final instruction line
    let cut = text[..text.len() - 1].iter().rposition(|&c| c == b'\n').unwrap();
    assert!(matches!(parse_program(&text[..cut]), Err(SolveError::Parse(_))));
    assert!(matches!(parse_program(b""), Err(SolveError::Parse(_))));
}
