//! Error types for the step-pulse library.
//!
//! Provides unified error handling across configuration, pin sinks, and the
//! planner interface. The generator's own runtime anomalies (step-rate
//! overrun, endstop trigger, queue starvation) are deliberately not errors:
//! overrun is clamped with a diagnostic, an endstop trigger truncates the
//! block, and starvation parks the timer at a 1 ms self-rearm.

use core::fmt;

use crate::motion::Axis;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all step-pulse operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Pin sink operation error
    Motor(MotorError),
    /// Block construction or queue error
    Planner(PlannerError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Step frequency ceiling out of range (must be 1..=40000)
    InvalidStepFrequency(u32),
    /// Steps-per-mm must be positive
    InvalidStepsPerMm {
        /// Axis the value belongs to
        axis: Axis,
        /// Offending value
        value: f32,
    },
    /// Carriage home direction must be -1 or +1
    InvalidHomeDirection(i8),
    /// Dual X carriages are only meaningful with cartesian kinematics
    DualCarriageRequiresCartesian,
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Pin sink operation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum MotorError {
    /// Pin operation failed
    PinError,
}

/// Block construction and queue errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerError {
    /// Block moves no axis
    EmptyBlock,
    /// Entry or exit rate exceeds the nominal rate
    RateOutOfOrder {
        /// Entry or exit rate that exceeds the nominal
        rate: u16,
        /// Nominal (cruise) rate of the block
        nominal: u16,
    },
    /// Phase boundaries are not ordered within the block
    PhaseOutOfOrder {
        /// End of the acceleration phase in step events
        accelerate_until: u32,
        /// Start of the deceleration phase in step events
        decelerate_after: u32,
        /// Total step events in the block
        step_event_count: u32,
    },
    /// Block is too long for the signed Bresenham accumulators
    BlockTooLong(u32),
    /// Extruder index out of range
    InvalidExtruder(u8),
    /// The block queue is full
    QueueFull,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Planner(e) => write!(f, "Planner error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepFrequency(v) => {
                write!(f, "Invalid max step frequency: {}. Must be 1-40000", v)
            }
            ConfigError::InvalidStepsPerMm { axis, value } => {
                write!(f, "Invalid steps/mm for {}: {}. Must be > 0", axis.letter(), value)
            }
            ConfigError::InvalidHomeDirection(v) => {
                write!(f, "Invalid home direction: {}. Must be -1 or 1", v)
            }
            ConfigError::DualCarriageRequiresCartesian => {
                write!(f, "Dual X carriage requires cartesian kinematics")
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::EmptyBlock => write!(f, "Block moves no axis"),
            PlannerError::RateOutOfOrder { rate, nominal } => {
                write!(f, "Entry/exit rate {} exceeds nominal rate {}", rate, nominal)
            }
            PlannerError::PhaseOutOfOrder {
                accelerate_until,
                decelerate_after,
                step_event_count,
            } => write!(
                f,
                "Phase boundaries {}..{} out of order for {} step events",
                accelerate_until, decelerate_after, step_event_count
            ),
            PlannerError::BlockTooLong(count) => {
                write!(f, "Block of {} step events overflows the step counters", count)
            }
            PlannerError::InvalidExtruder(index) => {
                write!(f, "Extruder index {} out of range", index)
            }
            PlannerError::QueueFull => write!(f, "Block queue is full"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<PlannerError> for Error {
    fn from(e: PlannerError) -> Self {
        Error::Planner(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}
