//! Host Engine
//!
//! [`Mareas`] is the block-level wrapper a host drives: it owns the rendering
//! core and its preallocated buffers, reads the shared [`Parameters`] once per
//! block, chooses between the free-running and clock-locked frequency paths,
//! and copies the four rendered channels to the host's output buffers.
//!
//! # Threading
//!
//! `Mareas` is `Send` and is owned by the audio thread. The lifecycle hooks
//! ([`Mareas::initialize`], [`Mareas::set_sample_rate`],
//! [`Mareas::set_block_size`]) must run on that same thread between
//! [`Mareas::process`] calls, which is what every realistic host does. No
//! lock protects them. Only the [`Parameters`] handle is shared with other
//! threads.

use crate::gate::{extract_block, fill_constant, GateFlag, TRIGGER_THRESHOLD};
use crate::generator::{OutputMode, OutputSample, PolySlopeGenerator, Range};
use crate::params::{ParameterSnapshot, Parameters};
use crate::ramp::RampMode;
use crate::ramp_extractor::{RampExtractor, DEFAULT_RECOVERY_TIME};
use crate::ratio::{ratio_selector, HysteresisQuantizer, RATIOS};
use crate::units::semitones_to_ratio;
use crate::NUM_CHANNELS;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Largest block the engine accepts
pub const MAX_BLOCK_SIZE: usize = 16384;

/// Root frequency of the free-running path at zero transposition, in Hz
const ROOT_HZ: f64 = 2.0;

/// Error types for engine configuration and block processing
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    InvalidSampleRate(f64),
    InvalidBlockSize(usize),
    BufferSizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidSampleRate(rate) => write!(f, "Invalid sample rate: {}", rate),
            EngineError::InvalidBlockSize(size) => {
                write!(f, "Invalid block size: {} (expected 1..={})", size, MAX_BLOCK_SIZE)
            }
            EngineError::BufferSizeMismatch { expected, actual } => write!(
                f,
                "Buffer size mismatch: expected {} samples, got {}",
                expected, actual
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EngineError {}

fn validate_sample_rate(sample_rate: f64) -> Result<f64, EngineError> {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        Ok(sample_rate)
    } else {
        log::warn!("rejected sample rate {}", sample_rate);
        Err(EngineError::InvalidSampleRate(sample_rate))
    }
}

fn validate_block_size(block_size: usize) -> Result<usize, EngineError> {
    if (1..=MAX_BLOCK_SIZE).contains(&block_size) {
        Ok(block_size)
    } else {
        log::warn!("rejected block size {}", block_size);
        Err(EngineError::InvalidBlockSize(block_size))
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), EngineError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EngineError::BufferSizeMismatch { expected, actual })
    }
}

/// Everything needed to resume an engine where it left off
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub parameters: ParameterSnapshot,
    pub output_mode: OutputMode,
    pub ramp_mode: RampMode,
    pub previous_trig_flag: GateFlag,
    pub previous_clock_flag: GateFlag,
    pub must_reset_ramp_extractor: bool,
    pub generator: PolySlopeGenerator,
    pub ramp_extractor: RampExtractor,
    pub ratio_quantizer: HysteresisQuantizer,
}

#[cfg(feature = "alloc")]
impl EngineState {
    pub fn to_json(&self) -> Result<alloc::string::String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Polyphonic slope generator driven block by block
pub struct Mareas {
    sample_rate: f64,
    block_size: usize,
    parameters: Arc<Parameters>,

    generator: PolySlopeGenerator,
    ramp_extractor: RampExtractor,
    ratio_quantizer: HysteresisQuantizer,

    output_mode: OutputMode,
    ramp_mode: RampMode,
    previous_trig_flag: GateFlag,
    previous_clock_flag: GateFlag,
    must_reset_ramp_extractor: bool,

    out: Vec<OutputSample>,
    trig_flags: Vec<GateFlag>,
    clock_flags: Vec<GateFlag>,
    ramp: Vec<f32>,
}

impl Mareas {
    pub fn new(sample_rate: f64, block_size: usize) -> Result<Self, EngineError> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        let block_size = validate_block_size(block_size)?;

        let mut engine = Self {
            sample_rate,
            block_size,
            parameters: Arc::new(Parameters::new()),
            generator: PolySlopeGenerator::new(),
            ramp_extractor: RampExtractor::default(),
            ratio_quantizer: HysteresisQuantizer::new(),
            output_mode: OutputMode::Gates,
            ramp_mode: RampMode::Looping,
            previous_trig_flag: GateFlag::Low,
            previous_clock_flag: GateFlag::Low,
            must_reset_ramp_extractor: true,
            out: Vec::new(),
            trig_flags: Vec::new(),
            clock_flags: Vec::new(),
            ramp: Vec::new(),
        };
        engine.allocate_buffers();
        engine.change_rate();
        log::info!(
            "engine created at {} Hz, {} samples per block",
            sample_rate,
            block_size
        );
        Ok(engine)
    }

    /// Handle for writing parameters from any thread
    pub fn parameters(&self) -> Arc<Parameters> {
        Arc::clone(&self.parameters)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Restart at a (possibly new) sample rate with all state cleared.
    pub fn initialize(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        self.sample_rate = validate_sample_rate(sample_rate)?;
        self.reset();
        self.change_rate();
        log::info!("engine initialized at {} Hz", self.sample_rate);
        Ok(())
    }

    /// Sample-rate change from the host. The generator keeps its phase.
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), EngineError> {
        let sample_rate = validate_sample_rate(sample_rate)?;
        if sample_rate != self.sample_rate {
            log::debug!("sample rate {} -> {}", self.sample_rate, sample_rate);
            self.sample_rate = sample_rate;
        }
        self.change_rate();
        Ok(())
    }

    /// Block-size change from the host. Reallocates the internal buffers.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), EngineError> {
        let block_size = validate_block_size(block_size)?;
        if block_size != self.block_size {
            log::debug!("block size {} -> {}", self.block_size, block_size);
            self.block_size = block_size;
            self.allocate_buffers();
        }
        self.change_rate();
        Ok(())
    }

    /// Clear all signal state; parameters are untouched.
    pub fn reset(&mut self) {
        self.generator.reset();
        self.ramp_extractor.reset();
        self.ratio_quantizer.reset();
        self.previous_trig_flag = GateFlag::Low;
        self.previous_clock_flag = GateFlag::Low;
        self.must_reset_ramp_extractor = true;
    }

    fn allocate_buffers(&mut self) {
        self.out = vec![OutputSample::default(); self.block_size];
        self.trig_flags = vec![GateFlag::Low; self.block_size];
        self.clock_flags = vec![GateFlag::Low; self.block_size];
        self.ramp = vec![0.0; self.block_size];
    }

    fn change_rate(&mut self) {
        self.ramp_extractor
            .init(self.sample_rate as f32, DEFAULT_RECOVERY_TIME);
        self.must_reset_ramp_extractor = true;
    }

    /// Render one block.
    ///
    /// `trigger` and `clock` are optional per-sample level buffers; a level
    /// at or above [`TRIGGER_THRESHOLD`] reads as high. Without a trigger
    /// buffer the `trigger` parameter is used for the whole block. With a
    /// clock buffer the generator locks to the clock at a ratio selected by
    /// the transposition.
    ///
    /// Every buffer must hold exactly [`Mareas::block_size`] samples.
    pub fn process(
        &mut self,
        trigger: Option<&[f64]>,
        clock: Option<&[f64]>,
        outputs: [&mut [f64]; NUM_CHANNELS],
    ) -> Result<(), EngineError> {
        let size = self.block_size;
        for output in outputs.iter() {
            check_len(size, output.len())?;
        }
        if let Some(trigger) = trigger {
            check_len(size, trigger.len())?;
        }
        if let Some(clock) = clock {
            check_len(size, clock.len())?;
        }

        let params = self.parameters.snapshot();
        let range = Range::from_selector(ParameterSnapshot::selector(params.range));
        self.output_mode = OutputMode::from_selector(ParameterSnapshot::selector(params.mode));
        self.ramp_mode = RampMode::from_selector(ParameterSnapshot::selector(params.ramp));
        let note = (params.frequency + params.cv_input) as f32;

        let frequency = match clock {
            Some(clock) => {
                if self.must_reset_ramp_extractor {
                    self.ramp_extractor.reset();
                    self.previous_clock_flag = GateFlag::Low;
                }
                let ratio = *self
                    .ratio_quantizer
                    .lookup(&RATIOS, ratio_selector(note));
                self.previous_clock_flag = extract_block(
                    self.previous_clock_flag,
                    clock,
                    TRIGGER_THRESHOLD,
                    &mut self.clock_flags,
                );
                self.must_reset_ramp_extractor = false;
                self.ramp_extractor.process(
                    range.is_audio(),
                    matches!(self.ramp_mode, RampMode::Ad | RampMode::Ar),
                    ratio,
                    &self.clock_flags,
                    &mut self.ramp,
                )
            }
            None => {
                self.must_reset_ramp_extractor = true;
                (ROOT_HZ / self.sample_rate) as f32 * semitones_to_ratio(note)
            }
        };

        self.previous_trig_flag = match trigger {
            Some(levels) => extract_block(
                self.previous_trig_flag,
                levels,
                TRIGGER_THRESHOLD,
                &mut self.trig_flags,
            ),
            None => fill_constant(
                self.previous_trig_flag,
                params.trigger >= TRIGGER_THRESHOLD,
                &mut self.trig_flags,
            ),
        };

        self.generator.render(
            self.ramp_mode,
            self.output_mode,
            range,
            frequency,
            params.slope as f32,
            params.shape as f32,
            params.smoothness as f32,
            params.shift as f32,
            &self.trig_flags,
            clock.map(|_| &self.ramp[..]),
            &mut self.out,
        );

        for (channel, output) in outputs.into_iter().enumerate() {
            for (dst, sample) in output.iter_mut().zip(self.out.iter()) {
                *dst = sample.channel[channel] as f64;
            }
        }
        Ok(())
    }

    /// Capture the full signal state and the current parameters.
    pub fn state(&self) -> EngineState {
        EngineState {
            parameters: self.parameters.snapshot(),
            output_mode: self.output_mode,
            ramp_mode: self.ramp_mode,
            previous_trig_flag: self.previous_trig_flag,
            previous_clock_flag: self.previous_clock_flag,
            must_reset_ramp_extractor: self.must_reset_ramp_extractor,
            generator: self.generator.clone(),
            ramp_extractor: self.ramp_extractor.clone(),
            ratio_quantizer: self.ratio_quantizer.clone(),
        }
    }

    /// Resume from a captured state.
    ///
    /// A state captured at another sample rate keeps its generator phase, but
    /// the clock tracking starts over.
    pub fn restore_state(&mut self, state: EngineState) {
        self.parameters.apply(&state.parameters);
        self.output_mode = state.output_mode;
        self.ramp_mode = state.ramp_mode;
        self.previous_trig_flag = state.previous_trig_flag;
        self.previous_clock_flag = state.previous_clock_flag;
        self.must_reset_ramp_extractor = state.must_reset_ramp_extractor;
        self.generator = state.generator;
        self.ratio_quantizer = state.ratio_quantizer;
        self.ramp_extractor = state.ramp_extractor;
        if self.ramp_extractor.sample_rate() != self.sample_rate as f32 {
            log::debug!(
                "restored state was captured at {} Hz, retracking the clock",
                self.ramp_extractor.sample_rate()
            );
            self.change_rate();
        }
    }

    #[cfg(feature = "alloc")]
    pub fn save_state_json(&self) -> Result<alloc::string::String, serde_json::Error> {
        self.state().to_json()
    }

    #[cfg(feature = "alloc")]
    pub fn load_state_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let state = EngineState::from_json(json)?;
        self.restore_state(state);
        Ok(())
    }
}
