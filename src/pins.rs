//! Pin sink layer.
//!
//! Thin abstractions over embedded-hal 1.0 pins for the STEP/DIR/ENABLE
//! lines of each motor and the endstop inputs. Polarity is encoded here, at
//! the edge: the generator core only ever speaks in terms of "assert step",
//! "travel positive" and "switch pressed".

use embedded_hal::digital::{InputPin, OutputPin};

use crate::config::{EndstopPinConfig, MotorPinConfig};
use crate::error::{MotorError, Result};
use crate::motion::Direction;

/// One of the stepper driver channels addressed by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperChannel {
    /// X carriage 0.
    X,
    /// X carriage 1 (dual X carriage machines).
    X2,
    /// Y motor.
    Y,
    /// Z motor.
    Z,
    /// Second Z motor (dual Z machines).
    Z2,
    /// Extruder 0.
    E0,
    /// Extruder 1.
    E1,
    /// Extruder 2.
    E2,
}

impl StepperChannel {
    /// Every channel, in initialisation order.
    pub const ALL: [StepperChannel; 8] = [
        StepperChannel::X,
        StepperChannel::X2,
        StepperChannel::Y,
        StepperChannel::Z,
        StepperChannel::Z2,
        StepperChannel::E0,
        StepperChannel::E1,
        StepperChannel::E2,
    ];

    /// The extruder channel for a given extruder index.
    #[inline]
    pub const fn extruder(index: u8) -> StepperChannel {
        match index {
            0 => StepperChannel::E0,
            1 => StepperChannel::E1,
            _ => StepperChannel::E2,
        }
    }
}

/// One of the limit switches sampled by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndstopSwitch {
    /// X minimum.
    XMin,
    /// X maximum.
    XMax,
    /// Y minimum.
    YMin,
    /// Y maximum.
    YMax,
    /// Z minimum.
    ZMin,
    /// Z maximum.
    ZMax,
}

impl EndstopSwitch {
    /// Array index of this switch.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            EndstopSwitch::XMin => 0,
            EndstopSwitch::XMax => 1,
            EndstopSwitch::YMin => 2,
            EndstopSwitch::YMax => 3,
            EndstopSwitch::ZMin => 4,
            EndstopSwitch::ZMax => 5,
        }
    }
}

/// Board abstraction driven by the generator.
///
/// Implementations route each channel to its pins, typically through
/// [`MotorOutputs`] and [`EndstopInput`]. Channels a machine does not have
/// (second carriage, extra extruders) are implemented as no-ops.
///
/// All methods are infallible: pin errors cannot be surfaced from interrupt
/// context, so fallible implementations discard them at this boundary.
pub trait PinSinks {
    /// Drive a STEP line to its asserted level.
    fn assert_step(&mut self, channel: StepperChannel);

    /// Return a STEP line to its idle level.
    fn release_step(&mut self, channel: StepperChannel);

    /// Set the travel direction of a channel.
    fn set_direction(&mut self, channel: StepperChannel, direction: Direction);

    /// Enable or disable a driver.
    fn set_enabled(&mut self, channel: StepperChannel, enabled: bool);

    /// Sample an endstop. `true` means the switch is pressed.
    fn read_endstop(&mut self, switch: EndstopSwitch) -> bool;
}

/// STEP/DIR/ENABLE triple for one motor with polarity applied.
pub struct MotorOutputs<STEP, DIR, EN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    step: STEP,
    dir: DIR,
    enable: EN,
    invert_step: bool,
    invert_dir: bool,
    enable_active_low: bool,
}

impl<STEP, DIR, EN> MotorOutputs<STEP, DIR, EN>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Wrap a pin triple with the polarities from configuration.
    pub fn new(step: STEP, dir: DIR, enable: EN, config: &MotorPinConfig) -> Self {
        Self {
            step,
            dir,
            enable,
            invert_step: config.invert_step,
            invert_dir: config.invert_dir,
            enable_active_low: config.enable_active_low,
        }
    }

    /// Drive STEP to its asserted level.
    pub fn assert_step(&mut self) -> Result<()> {
        self.write(true)
    }

    /// Return STEP to its idle level.
    pub fn release_step(&mut self) -> Result<()> {
        self.write(false)
    }

    /// Set the travel direction.
    pub fn set_direction(&mut self, direction: Direction) -> Result<()> {
        let high = match direction {
            Direction::Positive => !self.invert_dir,
            Direction::Negative => self.invert_dir,
        };
        set_level(&mut self.dir, high)
    }

    /// Enable or disable the driver.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        set_level(&mut self.enable, enabled != self.enable_active_low)
    }

    fn write(&mut self, asserted: bool) -> Result<()> {
        set_level(&mut self.step, asserted != self.invert_step)
    }
}

fn set_level<P: OutputPin>(pin: &mut P, high: bool) -> Result<()> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| MotorError::PinError.into())
}

/// Endstop input with polarity applied.
pub struct EndstopInput<IN: InputPin> {
    pin: IN,
    inverting: bool,
}

impl<IN: InputPin> EndstopInput<IN> {
    /// Wrap an input pin with the polarity from configuration.
    ///
    /// The `pullup` flag in [`EndstopPinConfig`] belongs to board bring-up;
    /// the pin handed in here is expected to be configured already.
    pub fn new(pin: IN, config: &EndstopPinConfig) -> Self {
        Self {
            pin,
            inverting: config.inverting,
        }
    }

    /// Sample the switch. `true` means pressed.
    pub fn read(&mut self) -> bool {
        self.pin.is_high().unwrap_or(false) != self.inverting
    }
}
