use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sync_trigger::pwm::{decode, encode};

fn encode_benchmark(c: &mut Criterion) {
    c.bench_function("pwm encode", |b| {
        b.iter(|| encode(black_box(6), black_box(1_234.567_891)).unwrap())
    });
}

fn decode_benchmark(c: &mut Criterion) {
    let samples = encode(6, 1_234.567_891).unwrap();

    c.bench_function("pwm decode", |b| b.iter(|| decode(black_box(&samples))));
}

criterion_group!(benches, encode_benchmark, decode_benchmark);
criterion_main!(benches);
