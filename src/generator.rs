//! Poly Slope Generator
//!
//! The per-sample renderer at the heart of the engine. One master ramp (or a
//! small bank of related ramps in frequency mode) is turned into four
//! correlated output channels. What each channel carries depends on the
//! [`OutputMode`]:
//!
//! | mode        | ch0          | ch1          | ch2             | ch3                |
//! |-------------|--------------|--------------|-----------------|--------------------|
//! | Gates       | shaped       | rise gate    | threshold gate  | end-of-cycle pulse |
//! | Amplitude   | shaped × g0  | shaped × g1  | shaped × g2     | shaped × g3        |
//! | SlopePhase  | raw phase    | raw slope    | shaped          | shaped, shifted    |
//! | Frequency   | shaped × r0  | shaped × r1  | shaped × r2     | master frequency   |
//!
//! Shaped outputs are bipolar in the looping ramp modes and unipolar in the
//! one-shot modes. Gates are 0.0 or 1.0.

use crate::gate::GateFlag;
use crate::ramp::{RampGenerator, RampMode};
use crate::ratio::HysteresisQuantizer;
use crate::shaper::{self, slope_point, Smoother};
use crate::units::{sanitize_frequency, sanitize_unit, wrap, ParameterInterpolator};
use crate::NUM_CHANNELS;
use serde::{Deserialize, Serialize};

/// Longest end-of-cycle pulse, in samples
pub const EOC_PULSE_SAMPLES: u32 = 32;

/// Channel frequency ratios offered in frequency mode, picked by `shift`
const FREQUENCY_RATIOS: [[f32; 3]; 9] = [
    [1.0, 0.25, 0.125],
    [1.0, 0.5, 0.25],
    [1.0, 0.5, 0.333_333],
    [1.0, 0.666_667, 0.5],
    [1.0, 1.0, 1.0],
    [1.0, 1.5, 2.0],
    [1.0, 2.0, 3.0],
    [1.0, 2.0, 4.0],
    [1.0, 4.0, 8.0],
];

const UNISON: [f32; NUM_CHANNELS] = [1.0; NUM_CHANNELS];

/// What the four output channels carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputMode {
    #[default]
    Gates,
    Amplitude,
    SlopePhase,
    Frequency,
}

impl OutputMode {
    /// Map a host selector (1..4) to a mode.
    ///
    /// The host's fifth "last" entry and anything out of range fall back to
    /// `Gates`.
    pub fn from_selector(selector: i32) -> Self {
        match selector {
            1 => OutputMode::Gates,
            2 => OutputMode::Amplitude,
            3 => OutputMode::SlopePhase,
            4 => OutputMode::Frequency,
            _ => OutputMode::Gates,
        }
    }
}

/// Coarse frequency register of the free-running generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Range {
    Low,
    #[default]
    Medium,
    /// Audio register
    High,
}

impl Range {
    /// Map a host selector (0..2) to a register; anything else is `Medium`.
    pub fn from_selector(selector: i32) -> Self {
        match selector {
            0 => Range::Low,
            1 => Range::Medium,
            2 => Range::High,
            _ => Range::Medium,
        }
    }

    /// Root frequency of the register, in Hz
    pub fn root_hz(self) -> f32 {
        match self {
            Range::Low => 0.125,
            Range::Medium => 2.0,
            Range::High => 130.81,
        }
    }

    /// Scale applied to a frequency expressed against the 2 Hz medium root
    pub fn multiplier(self) -> f32 {
        self.root_hz() / Range::Medium.root_hz()
    }

    pub fn is_audio(self) -> bool {
        self == Range::High
    }
}

/// One output frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSample {
    pub channel: [f32; NUM_CHANNELS],
}

/// Per-sample values shared by every output strategy
struct Frame {
    phases: [f32; NUM_CHANNELS],
    frequency: f32,
    ratios: [f32; NUM_CHANNELS],
    pw: f32,
    shape: f32,
    smoothness: f32,
    shift: f32,
    bipolar: bool,
    end_of_cycle: bool,
}

impl Frame {
    /// Triangle, curve and smoothing for one phase, in the output polarity.
    #[inline]
    fn shaped(&self, smoother: &mut Smoother, phase: f32, ratio: f32) -> f32 {
        let unipolar = shaper::shape(shaper::slope(phase, self.pw), self.shape);
        let smoothed = smoother.process(2.0 * unipolar - 1.0, self.frequency * ratio, self.smoothness);
        if self.bipolar {
            smoothed
        } else {
            0.5 * (smoothed + 1.0)
        }
    }

    #[inline]
    fn gate(high: bool) -> f32 {
        if high {
            1.0
        } else {
            0.0
        }
    }
}

fn render_gates(frame: &Frame, smoothers: &mut [Smoother; NUM_CHANNELS], out: &mut OutputSample) {
    let phase = frame.phases[0];
    let shaped = frame.shaped(&mut smoothers[0], phase, 1.0);
    let unipolar = if frame.bipolar {
        0.5 * (shaped + 1.0)
    } else {
        shaped
    };
    out.channel = [
        shaped,
        Frame::gate(phase < frame.pw),
        Frame::gate(unipolar > frame.shift),
        Frame::gate(frame.end_of_cycle),
    ];
}

fn render_amplitude(
    frame: &Frame,
    smoothers: &mut [Smoother; NUM_CHANNELS],
    out: &mut OutputSample,
) {
    // Positive spread fades towards the last channel, negative towards the first
    let spread = 2.0 * frame.shift - 1.0;
    for (i, (value, smoother)) in out.channel.iter_mut().zip(smoothers.iter_mut()).enumerate() {
        let position = i as f32 / (NUM_CHANNELS - 1) as f32;
        let gain = if spread >= 0.0 {
            1.0 - spread * position
        } else {
            1.0 + spread * (1.0 - position)
        };
        *value = frame.shaped(smoother, frame.phases[i], 1.0) * gain;
    }
}

fn render_slope_phase(
    frame: &Frame,
    smoothers: &mut [Smoother; NUM_CHANNELS],
    out: &mut OutputSample,
) {
    let phase = frame.phases[0];
    let shifted = if frame.bipolar {
        wrap(phase + frame.shift)
    } else {
        (phase + frame.shift).min(1.0)
    };
    out.channel = [
        phase,
        shaper::slope(phase, frame.pw),
        frame.shaped(&mut smoothers[2], phase, 1.0),
        frame.shaped(&mut smoothers[3], shifted, 1.0),
    ];
}

fn render_frequency(
    frame: &Frame,
    smoothers: &mut [Smoother; NUM_CHANNELS],
    out: &mut OutputSample,
) {
    for i in 0..NUM_CHANNELS - 1 {
        out.channel[i] = frame.shaped(&mut smoothers[i], frame.phases[i], frame.ratios[i]);
    }
    out.channel[NUM_CHANNELS - 1] = frame.frequency;
}

/// Renders blocks of four-channel output from a ramp and shaping controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolySlopeGenerator {
    // Interpolated control values, in engine units
    frequency: f32,
    slope: f32,
    shape: f32,
    smoothness: f32,
    shift: f32,
    /// False until the first block after a reset; the first block jumps
    /// straight to its parameter values instead of ramping to them
    primed: bool,

    ramp: RampGenerator,
    ramp_mode: RampMode,
    smoothers: [Smoother; NUM_CHANNELS],
    ratio_quantizer: HysteresisQuantizer,
    previous_output_mode: Option<OutputMode>,

    previous_phase: f32,
    eoc_remaining: u32,
}

impl Default for PolySlopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PolySlopeGenerator {
    pub fn new() -> Self {
        let mut generator = Self {
            frequency: 0.0,
            slope: 0.5,
            shape: 0.25,
            smoothness: 0.5,
            shift: 0.5,
            primed: false,
            ramp: RampGenerator::new(),
            ramp_mode: RampMode::default(),
            smoothers: [Smoother::new(); NUM_CHANNELS],
            ratio_quantizer: HysteresisQuantizer::new(),
            previous_output_mode: None,
            previous_phase: 0.0,
            eoc_remaining: 0,
        };
        generator.reset();
        generator
    }

    /// Return every channel to its rest position and clear filter state.
    pub fn reset(&mut self) {
        self.ramp.reset(self.ramp_mode);
        for smoother in self.smoothers.iter_mut() {
            smoother.reset();
        }
        self.ratio_quantizer.reset();
        self.previous_phase = self.ramp_mode.rest_phase();
        self.eoc_remaining = 0;
        self.primed = false;
    }

    /// Current phase of every channel
    pub fn phases(&self) -> &[f32; NUM_CHANNELS] {
        self.ramp.phases()
    }

    /// Output mode used by the last render call
    pub fn output_mode(&self) -> Option<OutputMode> {
        self.previous_output_mode
    }

    /// Render one block.
    ///
    /// `frequency` is in cycles per sample. Without `clock_ramp` it is scaled
    /// by the range register; with one, it is the clock-derived frequency and
    /// the ramp values drive the phase directly. `trig_flags` and
    /// `clock_ramp` must be as long as `out`.
    ///
    /// A change of `output_mode` since the previous call resets the generator
    /// before rendering. A change of `ramp_mode` alone only moves the ramp to
    /// the rest position of the new mode.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        ramp_mode: RampMode,
        output_mode: OutputMode,
        range: Range,
        frequency: f32,
        slope: f32,
        shape: f32,
        smoothness: f32,
        shift: f32,
        trig_flags: &[GateFlag],
        clock_ramp: Option<&[f32]>,
        out: &mut [OutputSample],
    ) {
        debug_assert_eq!(trig_flags.len(), out.len());
        debug_assert!(clock_ramp.map_or(true, |ramp| ramp.len() == out.len()));

        let ramp_mode_changed = self.ramp_mode != ramp_mode;
        self.ramp_mode = ramp_mode;
        if self.previous_output_mode != Some(output_mode) {
            if let Some(previous) = self.previous_output_mode {
                log::trace!("output mode {:?} -> {:?}, resetting", previous, output_mode);
            }
            self.reset();
            self.previous_output_mode = Some(output_mode);
        } else if ramp_mode_changed {
            // A one-shot mode must not finish a cycle nobody triggered
            log::trace!("ramp mode -> {:?}, parking the ramp", ramp_mode);
            self.ramp.reset(ramp_mode);
            self.previous_phase = ramp_mode.rest_phase();
            self.eoc_remaining = 0;
        }

        let frequency = match clock_ramp {
            Some(_) => sanitize_frequency(frequency),
            None => sanitize_frequency(frequency * range.multiplier()),
        };
        let slope = sanitize_unit(slope, 0.5);
        let shape = sanitize_unit(shape, 0.25);
        let smoothness = sanitize_unit(smoothness, 0.5);
        let shift = sanitize_unit(shift, 0.5);

        if !self.primed {
            self.frequency = frequency;
            self.slope = slope;
            self.shape = shape;
            self.smoothness = smoothness;
            self.shift = shift;
            self.primed = true;
        }

        let ratios = match output_mode {
            OutputMode::Frequency => {
                let set = self.ratio_quantizer.lookup(&FREQUENCY_RATIOS, shift);
                [set[0], set[1], set[2], 1.0]
            }
            _ => UNISON,
        };

        let size = out.len();
        let mut frequency_modulation = ParameterInterpolator::new(&mut self.frequency, frequency, size);
        let mut slope_modulation = ParameterInterpolator::new(&mut self.slope, slope, size);
        let mut shape_modulation = ParameterInterpolator::new(&mut self.shape, shape, size);
        let mut smoothness_modulation =
            ParameterInterpolator::new(&mut self.smoothness, smoothness, size);
        let mut shift_modulation = ParameterInterpolator::new(&mut self.shift, shift, size);

        for (i, sample) in out.iter_mut().enumerate() {
            let gate = trig_flags.get(i).copied().unwrap_or_default();
            let external = clock_ramp.and_then(|ramp| ramp.get(i).copied());
            let frequency = frequency_modulation.next();
            let pw = slope_point(slope_modulation.next());

            let phases = self.ramp.step(ramp_mode, frequency, &ratios, pw, gate, external);

            let phase = phases[0];
            let wrapped = if ramp_mode.is_looping() {
                phase < self.previous_phase
            } else {
                self.previous_phase < 1.0 && phase >= 1.0
            };
            self.previous_phase = phase;
            if wrapped {
                let half_period = (0.5 / frequency) as u32;
                self.eoc_remaining = EOC_PULSE_SAMPLES.min(half_period.max(1));
            }
            let end_of_cycle = self.eoc_remaining > 0;
            self.eoc_remaining = self.eoc_remaining.saturating_sub(1);

            let frame = Frame {
                phases,
                frequency,
                ratios,
                pw,
                shape: shape_modulation.next(),
                smoothness: smoothness_modulation.next(),
                shift: shift_modulation.next(),
                bipolar: ramp_mode.is_looping(),
                end_of_cycle,
            };

            match output_mode {
                OutputMode::Gates => render_gates(&frame, &mut self.smoothers, sample),
                OutputMode::Amplitude => render_amplitude(&frame, &mut self.smoothers, sample),
                OutputMode::SlopePhase => render_slope_phase(&frame, &mut self.smoothers, sample),
                OutputMode::Frequency => render_frequency(&frame, &mut self.smoothers, sample),
            }
        }
    }
}
