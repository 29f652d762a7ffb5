//! Envelope Demo
//!
//! Fires an attack-decay envelope from the trigger parameter, then locks a
//! looping LFO to an external clock and prints what comes out.
//!
//! Run with: cargo run --example envelope

use mareas::prelude::*;

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK: usize = 64;

/// Render one block and return the four channels
fn render(engine: &mut Mareas, clock: Option<&[f64]>) -> [[f64; BLOCK]; NUM_CHANNELS] {
    let mut outputs = [[0.0; BLOCK]; NUM_CHANNELS];
    let [a, b, c, d] = &mut outputs;
    engine
        .process(None, clock, [&mut a[..], &mut b[..], &mut c[..], &mut d[..]])
        .unwrap();
    outputs
}

fn bar(value: f64, width: usize) -> String {
    let filled = (value.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{:<width$}", "#".repeat(filled), width = width)
}

fn main() {
    let mut engine = Mareas::new(SAMPLE_RATE, BLOCK).unwrap();
    let params = engine.parameters();

    // One-shot envelope, 8 Hz cycle, slow attack and exponential decay
    params.mode.set(1.0); // gates
    params.ramp.set(0.0); // AD
    params.frequency.set(24.0);
    params.slope.set(0.2);
    params.shape.set(0.1);

    println!("AD envelope (ch0 envelope, ch3 end of cycle)");
    params.trigger.set(5.0);
    for block in 0..100 {
        let out = render(&mut engine, None);
        if block == 1 {
            params.trigger.set(0.0);
        }
        if block % 5 == 0 {
            let eoc = out[3].iter().any(|&x| x > 0.5);
            println!(
                "{:4} ms |{}| {}",
                block * BLOCK * 1000 / SAMPLE_RATE as usize,
                bar(out[0][0], 40),
                if eoc { "EOC" } else { "" }
            );
        }
    }
    println!();

    // Looping LFO locked to a 120 BPM clock, two cycles per beat
    params.mode.set(4.0); // frequency
    params.ramp.set(1.0); // looping
    params.frequency.set(22.5); // selects the x2 clock ratio
    let period = (SAMPLE_RATE / 2.0) as usize;
    let mut clock = [0.0; BLOCK];
    let mut reported = 0.0;
    for block in 0..4000 {
        for (i, level) in clock.iter_mut().enumerate() {
            let n = block * BLOCK + i;
            *level = if n % period < period / 8 { 5.0 } else { 0.0 };
        }
        let out = render(&mut engine, Some(&clock));
        reported = out[3][BLOCK - 1];
    }
    println!(
        "Clocked at 2 Hz: generator runs at {:.3} Hz",
        reported * SAMPLE_RATE
    );

    match engine.save_state_json() {
        Ok(json) => println!("Saved state: {} bytes of JSON", json.len()),
        Err(e) => eprintln!("Could not save state: {}", e),
    }
}
