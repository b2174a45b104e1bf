//! # step-pulse
//!
//! Interrupt-driven step pulse generation for 3D printer / CNC motion
//! controllers with embedded-hal 1.0 support.
//!
//! The crate consumes a queue of pre-planned motion blocks and emits
//! precisely timed step pulses to up to six stepper drivers (two X carriages,
//! Y, two Z drivers, up to three extruders) while monitoring end-of-travel
//! limit switches. From each timer callback it performs integer-only
//! Bresenham line tracing across four logical axes, follows a trapezoidal
//! velocity profile reconstructed from block parameters, and re-arms its own
//! timer with the next step period.
//!
//! ## Features
//!
//! - **Configuration-driven**: Describe the machine (kinematics, polarities,
//!   endstops, feature toggles) in a TOML file
//! - **embedded-hal 1.0**: `OutputPin` for STEP/DIR/ENABLE, `InputPin` for
//!   endstops, polarity encoded in the pin sinks
//! - **no_std compatible**: The generator itself works without the standard
//!   library
//! - **Integer-only hot path**: Step periods come from a compile-time
//!   two-segment lookup table; no division or floating point in the tick
//! - **Position tracking**: Absolute step position per axis at all times
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use step_pulse::{BlockBuilder, Stepper};
//!
//! // Load machine description from TOML
//! let config = step_pulse::load_config("machine.toml")?;
//!
//! // `board` implements PinSinks, `timer` implements StepTimer
//! let mut stepper: Stepper<_, _> = Stepper::new(board, timer, config);
//! stepper.init();
//!
//! // The planner queues blocks; the platform timer callback drives tick()
//! stepper.enqueue(
//!     BlockBuilder::new()
//!         .steps([1600, 0, 0, 0])
//!         .rates(400, 4000, 400)
//!         .acceleration(2_000_000)
//!         .build()?,
//! )?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt formatting for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod motion;
pub mod pins;
pub mod planner;
pub mod speed;
pub mod stepper;
pub mod timer;
pub mod trapezoid;

// Re-exports for ergonomic API
pub use config::{validate_config, Kinematics, MachineConfig};
pub use error::{Error, Result};
pub use motion::{Axis, Direction, DirectionBits};
pub use pins::{EndstopSwitch, PinSinks, StepperChannel};
pub use planner::{Block, BlockBuilder, BlockQueue};
pub use speed::{timer_for_rate, StepTiming};
pub use stepper::Stepper;
pub use timer::StepTimer;

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::load_config;
