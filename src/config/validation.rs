//! Configuration validation.

use crate::error::{ConfigError, Error, Result};
use crate::motion::Axis;

use super::{Kinematics, MachineConfig};

/// Validate a machine configuration.
///
/// Checks:
/// - Step frequency ceiling is in range
/// - Steps-per-mm values are positive
/// - Dual X carriage home directions are ±1 and kinematics is cartesian
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    let freq = config.machine.max_step_frequency;
    if freq == 0 || freq > 40_000 {
        return Err(Error::Config(ConfigError::InvalidStepFrequency(freq)));
    }

    let steps_per_mm = config.axes.steps_per_mm();
    for axis in Axis::ALL {
        let value = steps_per_mm[axis.index()];
        if !(value > 0.0) {
            return Err(Error::Config(ConfigError::InvalidStepsPerMm { axis, value }));
        }
    }

    if let Some(dual) = &config.dual_x_carriage {
        if config.machine.kinematics != Kinematics::Cartesian {
            return Err(Error::Config(ConfigError::DualCarriageRequiresCartesian));
        }
        for dir in [dual.x_home_dir, dual.x2_home_dir] {
            if dir != -1 && dir != 1 {
                return Err(Error::Config(ConfigError::InvalidHomeDirection(dir)));
            }
        }
    }

    Ok(())
}
