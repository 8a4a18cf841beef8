use criterion::{Criterion, criterion_group, criterion_main};
use rand::{SeedableRng, rngs::StdRng};
use std::{hint::black_box, io};
use trade_tape::config::{Destination, GenConfig};
use trade_tape::generate::TapeGenerator;
use trade_tape::pool::SymbolPool;
use trade_tape::sink::CsvSink;

fn bench_config(num_trades: u64) -> GenConfig {
    GenConfig {
        num_trades,
        output: Destination::Stdout,
        progress_every: 0,
        ..Default::default()
    }
}

fn bench_pool_build(c: &mut Criterion) {
    c.bench_function("build 70k symbol pool", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| SymbolPool::build(black_box(0.3), black_box(70_000), &mut rng).unwrap())
    });
}

fn bench_generate(c: &mut Criterion) {
    let cfg = bench_config(100_000);
    c.bench_function("generate 100k trades to io::sink", |b| {
        let mut rng = StdRng::seed_from_u64(2);
        b.iter_batched(
            || TapeGenerator::new(&cfg, &mut StdRng::seed_from_u64(3)).unwrap(),
            |tape_gen| {
                let mut sink = CsvSink::new(io::sink(), cfg.batch_bytes);
                tape_gen.generate(&mut sink, &mut rng).unwrap()
            },
            criterion::BatchSize::LargeInput,
        )
    });

    c.bench_function("tick without output", |b| {
        let mut rng = StdRng::seed_from_u64(4);
        let mut tape_gen = TapeGenerator::new(&cfg, &mut rng).unwrap();
        let mut seq = 0u64;
        b.iter(|| {
            seq += 1;
            black_box(tape_gen.tick(seq, &mut rng))
        })
    });
}

criterion_group!(benches, bench_pool_build, bench_generate);
criterion_main!(benches);
