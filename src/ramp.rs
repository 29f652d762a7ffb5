//! Multi-channel Ramp Generator
//!
//! Advances one phase per output channel. Channels normally share the master
//! frequency, but each one can run at its own ratio of it (frequency mode).
//! The ramp mode decides what happens at the end of a cycle and how the
//! trigger input interacts with the phase.

use crate::gate::GateFlag;
use crate::shaper::slope_point;
use crate::units::wrap;
use crate::NUM_CHANNELS;
use serde::{Deserialize, Serialize};

/// How the phase ramp responds to its end point and to triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RampMode {
    /// One-shot attack-decay: a rising edge runs one full cycle, then rests
    Ad,
    /// Free-running; the trigger is ignored
    #[default]
    Looping,
    /// Attack-release: attack on the rising edge, hold at the peak while the
    /// gate is high, release on the falling edge
    Ar,
    /// Free-running; a rising edge restarts every phase
    LoopSync,
}

impl RampMode {
    /// Map a host selector (0..3) to a mode; anything else is `Looping`.
    pub fn from_selector(selector: i32) -> Self {
        match selector {
            0 => RampMode::Ad,
            1 => RampMode::Looping,
            2 => RampMode::Ar,
            3 => RampMode::LoopSync,
            _ => RampMode::Looping,
        }
    }

    /// True when the phase wraps around instead of stopping at 1
    pub fn is_looping(self) -> bool {
        matches!(self, RampMode::Looping | RampMode::LoopSync)
    }

    /// Phase at which a channel sits when nothing is happening
    pub fn rest_phase(self) -> f32 {
        if self.is_looping() {
            0.0
        } else {
            1.0
        }
    }
}

/// Phase accumulators for every output channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampGenerator {
    phase: [f32; NUM_CHANNELS],
    /// Phase each channel had reached at the start of the current external
    /// master cycle, so channels slower than the master span several cycles
    cycle_offset: [f32; NUM_CHANNELS],
    previous_master: f32,
    previous_ratios: [f32; NUM_CHANNELS],
}

impl Default for RampGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RampGenerator {
    pub fn new() -> Self {
        Self {
            phase: [0.0; NUM_CHANNELS],
            cycle_offset: [0.0; NUM_CHANNELS],
            previous_master: 0.0,
            previous_ratios: [1.0; NUM_CHANNELS],
        }
    }

    /// Put every channel at the rest position of `mode`.
    pub fn reset(&mut self, mode: RampMode) {
        self.phase = [mode.rest_phase(); NUM_CHANNELS];
        self.cycle_offset = [0.0; NUM_CHANNELS];
        self.previous_master = 0.0;
    }

    pub fn phases(&self) -> &[f32; NUM_CHANNELS] {
        &self.phase
    }

    /// Advance every channel by one sample and return the new phases.
    ///
    /// `frequency` is the master frequency in cycles per sample, `ratios`
    /// scales it per channel and `pw` is the slope point where an AR
    /// envelope holds. When `external` carries a clock-derived master ramp,
    /// phases follow it instead of integrating `frequency`.
    #[inline]
    pub fn step(
        &mut self,
        mode: RampMode,
        frequency: f32,
        ratios: &[f32; NUM_CHANNELS],
        pw: f32,
        gate: GateFlag,
        external: Option<f32>,
    ) -> [f32; NUM_CHANNELS] {
        if let Some(master) = external {
            if *ratios != self.previous_ratios {
                self.cycle_offset = [0.0; NUM_CHANNELS];
                self.previous_ratios = *ratios;
            }
            let master_wrapped = master < self.previous_master - 0.5;
            self.previous_master = master;

            for ((phase, offset), &ratio) in self
                .phase
                .iter_mut()
                .zip(self.cycle_offset.iter_mut())
                .zip(ratios)
            {
                if !mode.is_looping() {
                    *phase = (master * ratio).clamp(0.0, 1.0);
                    continue;
                }
                if master_wrapped {
                    *offset = wrap(*offset + ratio);
                }
                *phase = wrap(*offset + master * ratio);
            }
            return self.phase;
        }

        let pw = slope_point(pw);
        let restart = gate.is_rising() && mode != RampMode::Looping;

        for (phase, &ratio) in self.phase.iter_mut().zip(ratios) {
            if restart {
                *phase = 0.0;
            }
            let increment = frequency * ratio;

            match mode {
                RampMode::Looping | RampMode::LoopSync => {
                    *phase = wrap(*phase + increment);
                }
                RampMode::Ad => {
                    *phase = (*phase + increment).min(1.0);
                }
                RampMode::Ar => {
                    if gate.is_falling() && *phase < pw {
                        // Release from the level reached so far
                        let level = *phase / pw;
                        *phase = pw + (1.0 - level) * (1.0 - pw);
                    }
                    let next = (*phase + increment).min(1.0);
                    *phase = if gate.is_high() && *phase <= pw && next >= pw {
                        pw
                    } else {
                        next
                    };
                }
            }
        }
        self.phase
    }
}
