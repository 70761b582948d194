//! DSP Benchmarks
//!
//! Per-block cost of every effect at 48 kHz stereo, 512-sample blocks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hyperprism::{AudioBuffer, EffectKind, ProcessSpec};

const BLOCK: usize = 512;

fn benchmark_effects(c: &mut Criterion) {
    let input = AudioBuffer::sine(2, BLOCK, 48000.0, 440.0, 0.5);
    let mut group = c.benchmark_group("process_block_512_stereo");

    for kind in EffectKind::all() {
        let mut processor = kind.instantiate();
        processor.prepare(ProcessSpec::new(48000.0, BLOCK, 2));
        let mut buffer = input.clone();

        group.bench_with_input(BenchmarkId::from_parameter(kind.id()), &kind, |b, _| {
            b.iter(|| {
                buffer.channels_mut()[0].copy_from_slice(input.channel(0));
                buffer.channels_mut()[1].copy_from_slice(input.channel(1));
                processor.process_block(black_box(&mut buffer));
            })
        });
    }
    group.finish();
}

fn benchmark_state_round_trip(c: &mut Criterion) {
    let processor = EffectKind::from_id("compressor").map(EffectKind::instantiate);
    let Ok(mut processor) = processor else {
        return;
    };

    c.bench_function("compressor_state_round_trip", |b| {
        b.iter(|| {
            let data = processor.get_state().unwrap();
            processor.set_state(black_box(&data)).unwrap();
        })
    });
}

criterion_group!(benches, benchmark_effects, benchmark_state_round_trip);
criterion_main!(benches);
