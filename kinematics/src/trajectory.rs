//! Open-loop oscillatory trajectory for the arm and gripper.
//!
//! Every channel follows `base + amplitude * sin(2π f t + phase)`. The two
//! wrist channels share a frequency and sit a quarter turn apart, so the
//! wrist traces an ellipse. `sh1` and `el1` are held at fixed angles.

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EL1_HOLD, GripperCommand, Joint, JointCommand, JointLimits, SH1_HOLD};

#[derive(Debug, Error, PartialEq)]
pub enum ParamsError {
    #[error("{channel}: oscillator parameters must be finite")]
    NonFinite { channel: &'static str },
    #[error("{channel}: amplitude must be non-negative, got {amplitude}")]
    NegativeAmplitude { channel: &'static str, amplitude: f64 },
    #[error("{channel}: frequency must be non-negative, got {frequency_hz} Hz")]
    NegativeFrequency {
        channel: &'static str,
        frequency_hz: f64,
    },
    #[error("{channel}: swing [{min:.3}, {max:.3}] leaves the command range [{limit_min:.3}, {limit_max:.3}]")]
    OutOfRange {
        channel: &'static str,
        min: f64,
        max: f64,
        limit_min: f64,
        limit_max: f64,
    },
    #[error("wrist channels must share a frequency and sit a quarter turn apart, got wr0 {wr0_hz} Hz / wr1 {wr1_hz} Hz, phase gap {phase_gap:.4} rad")]
    WristMismatch {
        wr0_hz: f64,
        wr1_hz: f64,
        phase_gap: f64,
    },
}

const PHASE_TOLERANCE: f64 = 1e-6;

/// One sinusoidal channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OscillatorParams {
    pub base: f64,
    pub amplitude: f64,
    pub frequency_hz: f64,
    /// Radians.
    #[serde(default)]
    pub phase_offset: f64,
}

impl OscillatorParams {
    pub const fn new(base: f64, amplitude: f64, frequency_hz: f64, phase_offset: f64) -> Self {
        Self {
            base,
            amplitude,
            frequency_hz,
            phase_offset,
        }
    }

    pub fn value_at(&self, t: f64) -> f64 {
        self.base + self.amplitude * (TAU * self.frequency_hz * t + self.phase_offset).sin()
    }

    /// Lowest and highest value the channel can reach.
    pub fn swing(&self) -> (f64, f64) {
        (self.base - self.amplitude, self.base + self.amplitude)
    }

    fn validate(&self, channel: &'static str, limits: JointLimits) -> Result<(), ParamsError> {
        let fields = [self.base, self.amplitude, self.frequency_hz, self.phase_offset];
        if fields.iter().any(|v| !v.is_finite()) {
            return Err(ParamsError::NonFinite { channel });
        }
        if self.amplitude < 0.0 {
            return Err(ParamsError::NegativeAmplitude {
                channel,
                amplitude: self.amplitude,
            });
        }
        if self.frequency_hz < 0.0 {
            return Err(ParamsError::NegativeFrequency {
                channel,
                frequency_hz: self.frequency_hz,
            });
        }
        let (min, max) = self.swing();
        if !limits.contains(min) || !limits.contains(max) {
            return Err(ParamsError::OutOfRange {
                channel,
                min,
                max,
                limit_min: limits.min,
                limit_max: limits.max,
            });
        }
        Ok(())
    }
}

/// Parameters for every oscillating channel. Missing channels in a config
/// file fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrajectoryParams {
    pub sh0: OscillatorParams,
    pub el0: OscillatorParams,
    pub wr0: OscillatorParams,
    pub wr1: OscillatorParams,
    pub gripper: OscillatorParams,
}

impl Default for TrajectoryParams {
    fn default() -> Self {
        Self {
            sh0: OscillatorParams::new(0.0, 0.3, 0.1, 0.0),
            el0: OscillatorParams::new(1.8, 0.15, 0.08, 0.0),
            wr0: OscillatorParams::new(-0.5, 0.15, 0.12, 0.0),
            wr1: OscillatorParams::new(0.0, 0.1, 0.12, FRAC_PI_2),
            gripper: OscillatorParams::new(0.4, 0.25, 0.5, 0.0),
        }
    }
}

impl TrajectoryParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.sh0.validate("sh0", Joint::Sh0.limits())?;
        self.el0.validate("el0", Joint::El0.limits())?;
        self.wr0.validate("wr0", Joint::Wr0.limits())?;
        self.wr1.validate("wr1", Joint::Wr1.limits())?;
        self.validate_wrist()?;
        self.gripper.validate("gripper", JointLimits::new(0.0, 1.0))
    }

    /// `wr1` runs a quarter turn ahead of `wr0` at the same frequency.
    fn validate_wrist(&self) -> Result<(), ParamsError> {
        let phase_gap = (self.wr1.phase_offset - self.wr0.phase_offset).rem_euclid(TAU);
        let same_freq = (self.wr1.frequency_hz - self.wr0.frequency_hz).abs() <= PHASE_TOLERANCE;
        if !same_freq || (phase_gap - FRAC_PI_2).abs() > PHASE_TOLERANCE {
            return Err(ParamsError::WristMismatch {
                wr0_hz: self.wr0.frequency_hz,
                wr1_hz: self.wr1.frequency_hz,
                phase_gap,
            });
        }
        Ok(())
    }
}

/// Maps elapsed time to arm and gripper targets. Holds no state besides its
/// parameters, so equal `t` always gives equal output.
#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    params: TrajectoryParams,
}

impl TrajectoryGenerator {
    pub fn new(params: TrajectoryParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Skips range validation. The gripper output is still clamped.
    pub fn new_unchecked(params: TrajectoryParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrajectoryParams {
        &self.params
    }

    pub fn sample(&self, t: f64) -> (JointCommand, GripperCommand) {
        let p = &self.params;
        let joints = JointCommand::new([
            p.sh0.value_at(t),
            SH1_HOLD,
            p.el0.value_at(t),
            EL1_HOLD,
            p.wr0.value_at(t),
            p.wr1.value_at(t),
        ]);
        (joints, GripperCommand::new(p.gripper.value_at(t)))
    }
}
