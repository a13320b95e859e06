use criterion::{black_box, criterion_group, criterion_main, Criterion};

use digit_chain::{parse_program, sample_program, solve_extremes, ChainConfig, ConstraintSet, StageChain};

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_program();
    c.bench_function("parse_program", |b| {
        b.iter(|| black_box(parse_program(black_box(text)).unwrap()))
    });

    let program = parse_program(text).unwrap();
    let config = ChainConfig { base: program.base, ..ChainConfig::default() };
    let chain = StageChain::new(&program.params, config).unwrap();
    let constraints = ConstraintSet::new();
    c.bench_function("solve_extremes", |b| {
        b.iter(|| black_box(solve_extremes(black_box(&chain), &constraints).unwrap()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
