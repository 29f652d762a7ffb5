//! # Mareas: Polyphonic Slope Generator
//!
//! `mareas` renders up to four correlated control or audio signals from a
//! single continuously shaped ramp. The ramp either free-runs at a programmed
//! frequency (LFO or oscillator) or locks to an external clock at a musically
//! quantized ratio (clock-synced envelope/LFO).
//!
//! ## Architecture
//!
//! The crate is organized leaves first:
//!
//! - **Gate edges** ([`gate`]) - per-sample low/high/rising/falling flags
//! - **Ratios** ([`ratio`]) - the clock ratio table and a hysteresis quantizer
//! - **Ramp extraction** ([`ramp_extractor`]) - clock period tracking and phase reconstruction
//! - **Slope rendering** ([`ramp`], [`shaper`], [`generator`]) - the per-sample renderer
//! - **Host glue** ([`params`], [`engine`]) - shared parameters, lifecycle hooks, block I/O
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mareas::prelude::*;
//!
//! let mut engine = Mareas::new(48000.0, 64).unwrap();
//! let params = engine.parameters();
//! params.mode.set(2.0); // amplitude
//! params.frequency.set(12.0); // one octave above the 2 Hz root
//!
//! let mut out = [[0.0f64; 64]; 4];
//! let [a, b, c, d] = &mut out;
//! engine
//!     .process(None, None, [&mut a[..], &mut b[..], &mut c[..], &mut d[..]])
//!     .unwrap();
//! ```
//!
//! ## Real-time Contract
//!
//! Rendering never allocates, never blocks and never fails: degenerate inputs
//! (zero frequency, NaN parameters, missing clock edges) are clamped to safe
//! values. All buffers are allocated when the engine is created or its block
//! size changes.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod engine;
pub mod gate;
pub mod generator;
pub mod params;
pub mod ramp;
pub mod ramp_extractor;
pub mod ratio;
pub mod shaper;
pub mod units;

/// Number of correlated output channels rendered by one generator
pub const NUM_CHANNELS: usize = 4;

/// Default processing block size
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Prelude module for convenient imports
pub mod prelude {
    // Edge detection and clock ratios
    pub use crate::gate::{GateFlag, TRIGGER_THRESHOLD};
    pub use crate::ratio::{HysteresisQuantizer, Ratio, RATIOS};

    // Rendering core
    pub use crate::generator::{OutputMode, OutputSample, PolySlopeGenerator, Range};
    pub use crate::ramp::{RampGenerator, RampMode};
    pub use crate::ramp_extractor::RampExtractor;

    // Host boundary
    pub use crate::engine::{EngineError, EngineState, Mareas};
    pub use crate::params::{AtomicF64, ParameterId, ParameterSnapshot, Parameters};

    pub use crate::{DEFAULT_BLOCK_SIZE, NUM_CHANNELS};
}

// Re-export key types at crate root for convenience
pub use prelude::*;
