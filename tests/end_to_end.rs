use mareas::prelude::*;
use mareas::shaper::{shape, slope};

const SR: f64 = 48000.0;
const BLOCK: usize = 64;

/// Render `blocks` blocks and return the four channels concatenated
fn run(engine: &mut Mareas, blocks: usize, clock: Option<&dyn Fn(usize) -> f64>) -> Vec<[f64; 4]> {
    let mut frames = Vec::with_capacity(blocks * BLOCK);
    let mut outputs = [[0.0f64; BLOCK]; NUM_CHANNELS];
    let mut clock_buffer = [0.0f64; BLOCK];
    for block in 0..blocks {
        if let Some(clock) = clock {
            for (i, level) in clock_buffer.iter_mut().enumerate() {
                *level = clock(block * BLOCK + i);
            }
        }
        let [a, b, c, d] = &mut outputs;
        engine
            .process(
                None,
                clock.map(|_| &clock_buffer[..]),
                [&mut a[..], &mut b[..], &mut c[..], &mut d[..]],
            )
            .unwrap();
        for i in 0..BLOCK {
            frames.push([outputs[0][i], outputs[1][i], outputs[2][i], outputs[3][i]]);
        }
    }
    frames
}

/// Semitones above the 2 Hz root for a frequency in Hz
fn note_for(hz: f64) -> f64 {
    12.0 * (hz / 2.0).log2()
}

#[test]
fn amplitude_envelope_is_continuous_at_100_hz() {
    let mut envelope = Mareas::new(SR, BLOCK).unwrap();
    let mut phase = Mareas::new(SR, BLOCK).unwrap();
    for (engine, mode) in [(&envelope, 2.0), (&phase, 3.0)] {
        let params = engine.parameters();
        params.mode.set(mode);
        params.ramp.set(1.0);
        params.frequency.set(note_for(100.0));
        params.slope.set(0.5);
        params.shape.set(0.0);
        params.smoothness.set(0.5);
        params.shift.set(0.5);
    }

    let shaped = run(&mut envelope, 20, None);
    let phases = run(&mut phase, 20, None);

    // Every sample, block boundaries included, continues the same phase
    for (frame, phase) in shaped.iter().zip(phases.iter()) {
        let expected = 2.0 * shape(slope(phase[0] as f32, 0.5), 0.0) - 1.0;
        assert!((frame[0] - expected as f64).abs() < 1e-6);
        assert!((-1.0..=1.0).contains(&frame[0]));
    }

    // One complete cycle every 480 samples
    let channel: Vec<f64> = shaped.iter().map(|f| f[0]).collect();
    let peaks: Vec<usize> = (1..channel.len() - 1)
        .filter(|&i| channel[i] > 0.9 && channel[i] > channel[i - 1] && channel[i] >= channel[i + 1])
        .collect();
    assert!(peaks.len() >= 2);
    for pair in peaks.windows(2) {
        let spacing = pair[1] - pair[0];
        assert!((479..=481).contains(&spacing), "cycle of {} samples", spacing);
    }

    let max_step = channel
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0, f64::max);
    assert!(max_step < 0.05);
}

#[test]
fn clocked_ramp_wraps_on_clock_edges() {
    let mut engine = Mareas::new(SR, BLOCK).unwrap();
    engine.parameters().mode.set(3.0);

    let period = 480;
    let clock = |n: usize| if n % period < period / 2 { 1.0 } else { 0.0 };
    let frames = run(&mut engine, 60, Some(&clock));

    // Skip the first edges while the period is being measured
    let wraps: Vec<usize> = (1..frames.len())
        .filter(|&i| frames[i][0] < frames[i - 1][0] - 0.5)
        .filter(|&i| i > 2 * period)
        .collect();
    assert!(wraps.len() >= 4);
    for &i in wraps.iter() {
        let distance = (i % period).min(period - i % period);
        assert!(distance <= 2, "wrap at {} is {} samples off the clock", i, distance);
    }
}

#[test]
fn disconnecting_the_clock_returns_to_free_running() {
    let mut engine = Mareas::new(SR, BLOCK).unwrap();
    let params = engine.parameters();
    params.mode.set(4.0); // frequency
    params.frequency.set(0.0); // unity ratio while clocked

    let clock = |n: usize| if n % 96 < 48 { 1.0 } else { 0.0 };
    let clocked = run(&mut engine, 40, Some(&clock));
    assert!((clocked.last().unwrap()[3] - 1.0 / 96.0).abs() < 1e-4);

    params.frequency.set(note_for(10.0));
    let free = run(&mut engine, 4, None);
    assert!((free.last().unwrap()[3] - 10.0 / SR).abs() < 1e-5);
}
