//! The step pulse generator.
//!
//! [`Stepper`] owns the Bresenham tracer, the trapezoid state, the endstop
//! latches and the position counters. Its [`tick`](Stepper::tick) method is
//! the body of the stepper timer interrupt; everything else is the small
//! synchronous API used by the host.

mod advance;
mod core;
mod endstops;

pub use self::core::Stepper;
