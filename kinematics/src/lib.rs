use nalgebra::Vector6;

pub mod trajectory;

pub use trajectory::{OscillatorParams, ParamsError, TrajectoryGenerator, TrajectoryParams};

/// Shoulder pitch held while cycling.
pub const SH1_HOLD: f64 = -1.0;
/// Elbow roll held while cycling.
pub const EL1_HOLD: f64 = 0.0;

/// Arm degrees of freedom, in the order a [`JointCommand`] carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Sh0,
    Sh1,
    El0,
    El1,
    Wr0,
    Wr1,
}

impl Joint {
    pub const ALL: [Joint; 6] = [
        Joint::Sh0,
        Joint::Sh1,
        Joint::El0,
        Joint::El1,
        Joint::Wr0,
        Joint::Wr1,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Joint::Sh0 => "arm0.sh0",
            Joint::Sh1 => "arm0.sh1",
            Joint::El0 => "arm0.el0",
            Joint::El1 => "arm0.el1",
            Joint::Wr0 => "arm0.wr0",
            Joint::Wr1 => "arm0.wr1",
        }
    }

    /// Command range accepted by the arm, in radians.
    pub fn limits(self) -> JointLimits {
        match self {
            Joint::Sh0 => JointLimits::new(-2.618, 3.142),
            Joint::Sh1 => JointLimits::new(-3.142, 0.524),
            Joint::El0 => JointLimits::new(0.0, 3.142),
            Joint::El1 => JointLimits::new(-2.793, 2.793),
            Joint::Wr0 => JointLimits::new(-1.833, 1.833),
            Joint::Wr1 => JointLimits::new(-2.880, 2.880),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimits {
    pub min: f64,
    pub max: f64,
}

impl JointLimits {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Target angles for all six arm joints, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCommand(Vector6<f64>);

impl JointCommand {
    pub fn new(angles: [f64; 6]) -> Self {
        Self(Vector6::from_column_slice(&angles))
    }

    pub fn angle(&self, joint: Joint) -> f64 {
        self.0[joint.index()]
    }

    pub fn as_slice(&self) -> &[f64] {
        self.0.as_slice()
    }

    pub fn angles(&self) -> [f64; 6] {
        let mut out = [0.0; 6];
        out.copy_from_slice(self.0.as_slice());
        out
    }
}

/// Gripper aperture as a fraction of fully open. Always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperCommand(f64);

impl GripperCommand {
    pub const CLOSED: GripperCommand = GripperCommand(0.0);
    pub const FULLY_OPEN: GripperCommand = GripperCommand(1.0);

    /// Clamps `fraction` into `[0, 1]`; NaN closes the gripper.
    pub fn new(fraction: f64) -> Self {
        if fraction.is_nan() {
            return Self::CLOSED;
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    pub fn open_fraction(self) -> f64 {
        self.0
    }
}
