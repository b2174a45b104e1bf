//! Configuration module for step-pulse.
//!
//! Provides types for loading and validating the machine description from
//! TOML files (with `std` feature) or pre-parsed data. Everything the
//! original firmware encoded as compile-time options — kinematics, pin
//! polarities, endstop wiring, feature toggles — lives here as data.

mod machine;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use machine::{
    AxesConfig, AxisConfig, DualCarriageConfig, EndstopPinConfig, EndstopsConfig, FeatureConfig,
    Kinematics, MachineConfig, MachineSection, MotorPinConfig, MotorsConfig,
};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};
