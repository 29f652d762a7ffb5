//! Render Performance Benchmarks
//!
//! A block has to be rendered before the next one arrives:
//!
//! ```text
//! time_budget = block_size / sample_rate
//! ```
//!
//! | Sample Rate | Block 64   | Block 128  | Block 256  | Block 512  |
//! |-------------|------------|------------|------------|------------|
//! | 44.1 kHz    | 1.45 ms    | 2.90 ms    | 5.80 ms    | 11.61 ms   |
//! | 48 kHz      | 1.33 ms    | 2.67 ms    | 5.33 ms    | 10.67 ms   |
//! | 96 kHz      | 0.67 ms    | 1.33 ms    | 2.67 ms    | 5.33 ms    |
//! | 192 kHz     | 0.33 ms    | 0.67 ms    | 1.33 ms    | 2.67 ms    |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mareas::gate::extract_block;
use mareas::prelude::*;

const SAMPLE_RATES: [f64; 4] = [44100.0, 48000.0, 96000.0, 192000.0];
const BLOCK_SIZES: [usize; 4] = [64, 128, 256, 512];

const OUTPUT_MODES: [(&str, OutputMode); 4] = [
    ("gates", OutputMode::Gates),
    ("amplitude", OutputMode::Amplitude),
    ("slope_phase", OutputMode::SlopePhase),
    ("frequency", OutputMode::Frequency),
];

/// Square clock with the given period, as levels
fn clock_levels(len: usize, period: usize) -> Vec<f64> {
    (0..len)
        .map(|n| if n % period < period / 2 { 1.0 } else { 0.0 })
        .collect()
}

fn bench_generator_modes(c: &mut Criterion) {
    let mut group = c.benchmark_group("generator_modes");
    let block_size = 64;
    let flags = vec![GateFlag::Low; block_size];

    for (name, mode) in OUTPUT_MODES {
        for smoothness in [0.2f32, 0.5, 0.8] {
            group.throughput(Throughput::Elements(block_size as u64));
            group.bench_with_input(
                BenchmarkId::new(name, format!("smoothness_{}", smoothness)),
                &(mode, smoothness),
                |b, &(mode, smoothness)| {
                    let mut generator = PolySlopeGenerator::new();
                    let mut out = vec![OutputSample::default(); block_size];
                    b.iter(|| {
                        generator.render(
                            RampMode::Looping,
                            mode,
                            Range::High,
                            black_box(0.002),
                            0.3,
                            0.7,
                            smoothness,
                            0.6,
                            &flags,
                            None,
                            &mut out,
                        );
                        black_box(&out);
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_ramp_extractor(c: &mut Criterion) {
    let mut group = c.benchmark_group("ramp_extractor");
    let block_size = 256;
    let levels = clock_levels(block_size * 64, 480);
    let mut flags = vec![GateFlag::Low; levels.len()];
    extract_block(GateFlag::Low, &levels, TRIGGER_THRESHOLD, &mut flags);

    for (name, audio_rate) in [("control", false), ("audio", true)] {
        group.throughput(Throughput::Elements(flags.len() as u64));
        group.bench_function(name, |b| {
            let mut extractor = RampExtractor::new(48000.0, 1.0 / 40.0);
            let mut ramp = vec![0.0f32; block_size];
            b.iter(|| {
                for chunk in flags.chunks(block_size) {
                    black_box(extractor.process(audio_rate, false, RATIOS[13], chunk, &mut ramp));
                }
            });
        });
    }

    group.finish();
}

fn bench_engine_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_blocks");

    for sample_rate in SAMPLE_RATES {
        for block_size in BLOCK_SIZES {
            let sr_name = format!("{}kHz", sample_rate as u32 / 1000);
            let name = format!("{}/{}samples", sr_name, block_size);
            let time_budget_us = (block_size as f64 / sample_rate) * 1_000_000.0;

            for (path, clocked) in [("free", false), ("clocked", true)] {
                group.throughput(Throughput::Elements(block_size as u64));
                group.bench_with_input(
                    BenchmarkId::new(path, &name),
                    &(sample_rate, block_size),
                    |b, &(sr, size)| {
                        let mut engine = Mareas::new(sr, size).unwrap();
                        engine.parameters().mode.set(2.0);
                        let clock = clock_levels(size, (sr / 100.0) as usize);
                        let mut outputs: [Vec<f64>; NUM_CHANNELS] =
                            std::array::from_fn(|_| vec![0.0; size]);
                        b.iter(|| {
                            let [ch0, ch1, ch2, ch3] = &mut outputs;
                            engine
                                .process(
                                    None,
                                    clocked.then_some(&clock[..]),
                                    [&mut ch0[..], &mut ch1[..], &mut ch2[..], &mut ch3[..]],
                                )
                                .unwrap();
                            black_box(&outputs);
                        });
                    },
                );
            }

            eprintln!(
                "  {} @ {} samples: budget = {:.2}µs",
                sr_name, block_size, time_budget_us
            );
        }
    }

    group.finish();
}

criterion_group!(core_benches, bench_generator_modes, bench_ramp_extractor);
criterion_group!(engine_benches, bench_engine_blocks);
criterion_main!(core_benches, engine_benches);
