//! Machine description from TOML.

use serde::Deserialize;

use crate::motion::{Axis, NUM_AXES};

/// Kinematic arrangement of the X/Y motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Kinematics {
    /// One motor per axis.
    #[default]
    Cartesian,
    /// Two motors (A, B) drive X and Y as `X = (A+B)/2`, `Y = (A-B)/2`.
    /// Block direction bits refer to the A and B motors.
    #[serde(rename = "corexy")]
    CoreXy,
}

/// Complete machine configuration from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineConfig {
    /// Generator-wide settings.
    #[serde(default)]
    pub machine: MachineSection,

    /// Per-axis mechanical scaling.
    #[serde(default)]
    pub axes: AxesConfig,

    /// Per-motor pin polarities.
    #[serde(default)]
    pub motors: MotorsConfig,

    /// Endstop wiring.
    #[serde(default)]
    pub endstops: EndstopsConfig,

    /// Optional feature toggles.
    #[serde(default)]
    pub features: FeatureConfig,

    /// Dual X carriage setup (cartesian only).
    #[serde(default)]
    pub dual_x_carriage: Option<DualCarriageConfig>,
}

/// Generator-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSection {
    /// Hard ceiling on the commanded step rate, steps/s.
    #[serde(default = "default_max_step_frequency")]
    pub max_step_frequency: u32,

    /// Kinematic arrangement.
    #[serde(default)]
    pub kinematics: Kinematics,
}

fn default_max_step_frequency() -> u32 {
    40_000
}

impl Default for MachineSection {
    fn default() -> Self {
        Self {
            max_step_frequency: default_max_step_frequency(),
            kinematics: Kinematics::default(),
        }
    }
}

/// Mechanical scaling for one axis.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AxisConfig {
    /// Steps per millimetre of travel. Used only for endstop reports,
    /// never on the step-pulse path.
    pub steps_per_mm: f32,
}

/// Per-axis mechanical scaling.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AxesConfig {
    /// X axis.
    pub x: AxisConfig,
    /// Y axis.
    pub y: AxisConfig,
    /// Z axis.
    pub z: AxisConfig,
    /// Extruder axis.
    pub e: AxisConfig,
}

impl AxesConfig {
    /// Steps-per-mm for every axis, indexed by [`Axis::index`].
    pub fn steps_per_mm(&self) -> [f32; NUM_AXES] {
        [
            self.x.steps_per_mm,
            self.y.steps_per_mm,
            self.z.steps_per_mm,
            self.e.steps_per_mm,
        ]
    }

    /// Steps-per-mm for one axis.
    pub fn for_axis(&self, axis: Axis) -> f32 {
        self.steps_per_mm()[axis.index()]
    }
}

impl Default for AxesConfig {
    fn default() -> Self {
        // Common belt-XY / leadscrew-Z geometry.
        Self {
            x: AxisConfig { steps_per_mm: 80.0 },
            y: AxisConfig { steps_per_mm: 80.0 },
            z: AxisConfig { steps_per_mm: 400.0 },
            e: AxisConfig { steps_per_mm: 500.0 },
        }
    }
}

/// Polarity of one motor's STEP/DIR/ENABLE lines.
///
/// Consumed by [`MotorOutputs`](crate::pins::MotorOutputs) at board
/// construction; the generator core never sees inversion.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MotorPinConfig {
    /// STEP asserts low instead of high.
    pub invert_step: bool,
    /// DIR drives low for positive travel.
    pub invert_dir: bool,
    /// ENABLE is active low (the common case for Pololu-style drivers).
    pub enable_active_low: bool,
}

/// Per-motor pin polarities.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct MotorsConfig {
    /// X carriage 0.
    pub x: MotorPinConfig,
    /// X carriage 1.
    pub x2: MotorPinConfig,
    /// Y motor.
    pub y: MotorPinConfig,
    /// Z motor.
    pub z: MotorPinConfig,
    /// Second Z motor.
    pub z2: MotorPinConfig,
    /// Extruder 0.
    pub e0: MotorPinConfig,
    /// Extruder 1.
    pub e1: MotorPinConfig,
    /// Extruder 2.
    pub e2: MotorPinConfig,
}

/// Wiring of one endstop switch.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct EndstopPinConfig {
    /// The switch reads low when pressed.
    pub inverting: bool,
    /// Enable the input pull-up at board bring-up.
    pub pullup: bool,
}

/// Endstop wiring per axis end.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct EndstopsConfig {
    /// X minimum.
    pub x_min: EndstopPinConfig,
    /// X maximum.
    pub x_max: EndstopPinConfig,
    /// Y minimum.
    pub y_min: EndstopPinConfig,
    /// Y maximum.
    pub y_max: EndstopPinConfig,
    /// Z minimum.
    pub z_min: EndstopPinConfig,
    /// Z maximum.
    pub z_max: EndstopPinConfig,
}

/// Optional generator features.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Pressure-advance compensator: extruder pulses are drained from a
    /// pending-step backlog by a second ~10 kHz timer instead of being
    /// emitted inline.
    pub advance: bool,

    /// Enable the Z driver on demand and stall 1 ms before the first Z step
    /// of a block.
    pub z_late_enable: bool,

    /// The second Z driver mirrors Z STEP/DIR/ENABLE.
    pub z_dual_stepper_drivers: bool,

    /// An endstop hit reported by `check_hit_endstops` aborts the motion
    /// queue.
    pub abort_on_endstop_hit: bool,
}

/// Dual X carriage routing.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DualCarriageConfig {
    /// Homing direction of carriage 0 (-1 or +1).
    pub x_home_dir: i8,
    /// Homing direction of carriage 1 (-1 or +1).
    pub x2_home_dir: i8,
}

impl Default for DualCarriageConfig {
    fn default() -> Self {
        Self {
            x_home_dir: -1,
            x2_home_dir: 1,
        }
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            machine: MachineSection::default(),
            axes: AxesConfig::default(),
            motors: MotorsConfig::default(),
            endstops: EndstopsConfig::default(),
            features: FeatureConfig::default(),
            dual_x_carriage: None,
        }
    }
}
