//! Trapezoidal velocity profile reconstruction.
//!
//! Per active block, tracks the current step rate along the
//! accelerate/cruise/decelerate phases and produces the next timer period.
//! The planner pre-scales the block's acceleration so the rate at any point
//! of the ramp is recovered with one multiply and shift:
//! `rate_delta = (acceleration_rate * elapsed_us) >> 24`.

use crate::planner::Block;
use crate::speed::timer_for_rate;

/// Phase of the velocity profile at a given step event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Ramping up from the entry rate.
    Accelerating,
    /// Holding the nominal rate.
    Cruising,
    /// Ramping down toward the exit rate.
    Decelerating,
}

/// Trapezoid generator state, reset at every block acquisition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trapezoid {
    /// Rate reached so far on the acceleration ramp; frozen at the start of
    /// deceleration so the down-ramp decays from the rate actually reached.
    acc_step_rate: u16,
    /// Elapsed time in the acceleration phase, µs.
    acceleration_time: u32,
    /// Elapsed time in the deceleration phase, µs.
    deceleration_time: u32,
    /// Cached timer period at the nominal rate.
    period_nominal: u16,
    /// Step loops that go with the nominal period.
    loops_nominal: u8,
    /// Step events per interrupt for the period last produced.
    step_loops: u8,
}

impl Trapezoid {
    /// Create an idle trapezoid state.
    pub fn new() -> Self {
        Self {
            step_loops: 1,
            loops_nominal: 1,
            ..Self::default()
        }
    }

    /// Initialise for a freshly acquired block and return the first timer
    /// period.
    pub fn reset(&mut self, block: &Block, ceiling: u32) -> u16 {
        self.deceleration_time = 0;

        let nominal = timer_for_rate(u32::from(block.nominal_rate), ceiling);
        self.period_nominal = nominal.period_us;
        self.loops_nominal = nominal.step_loops;

        self.acc_step_rate = block.initial_rate;
        let first = timer_for_rate(u32::from(self.acc_step_rate), ceiling);
        self.step_loops = first.step_loops;
        self.acceleration_time = u32::from(first.period_us);
        first.period_us
    }

    /// Step events emitted per interrupt at the current rate.
    #[inline]
    pub fn step_loops(&self) -> u8 {
        self.step_loops
    }

    /// Select the phase for the step events completed so far and compute the
    /// next timer period.
    pub fn next_timing(&mut self, block: &Block, completed: u32, ceiling: u32) -> (u16, Phase) {
        if completed <= block.accelerate_until {
            let delta = rate_delta(block.acceleration_rate, self.acceleration_time);
            let mut rate = u32::from(block.initial_rate).saturating_add(delta);
            // upper limit
            if rate > u32::from(block.nominal_rate) {
                rate = u32::from(block.nominal_rate);
            }
            self.acc_step_rate = rate as u16;

            let timing = timer_for_rate(rate, ceiling);
            self.step_loops = timing.step_loops;
            self.acceleration_time += u32::from(timing.period_us);
            (timing.period_us, Phase::Accelerating)
        } else if completed > block.decelerate_after {
            let delta = rate_delta(block.acceleration_rate, self.deceleration_time);
            let rate = if delta > u32::from(self.acc_step_rate) {
                // Down-ramp ran past zero
                u32::from(block.final_rate)
            } else {
                let rate = u32::from(self.acc_step_rate) - delta;
                // lower limit
                if rate < u32::from(block.final_rate) {
                    u32::from(block.final_rate)
                } else {
                    rate
                }
            };

            let timing = timer_for_rate(rate, ceiling);
            self.step_loops = timing.step_loops;
            self.deceleration_time += u32::from(timing.period_us);
            (timing.period_us, Phase::Decelerating)
        } else {
            // Coming off the acceleration ramp the loop count may still be
            // stale; the nominal pair was cached at reset.
            self.step_loops = self.loops_nominal;
            (self.period_nominal, Phase::Cruising)
        }
    }

    /// Timer period cached for the nominal rate.
    #[inline]
    pub fn period_nominal(&self) -> u16 {
        self.period_nominal
    }

    /// Current rate on the acceleration ramp, steps/s.
    #[inline]
    pub fn current_rate(&self) -> u16 {
        self.acc_step_rate
    }
}

#[inline]
fn rate_delta(acceleration_rate: u32, elapsed_us: u32) -> u32 {
    ((u64::from(acceleration_rate) * u64::from(elapsed_us)) >> 24) as u32
}
