//! Pressure-advance bookkeeping.
//!
//! During acceleration the advance value grows and pushes extra extruder
//! steps into a signed backlog; during deceleration it decays toward the
//! block's floor and retracts them. A second ~10 kHz timer drains the backlog
//! one pulse at a time (see [`Stepper::advance_tick`]), decoupling the
//! extruder pulse rate from the Bresenham interrupt.
//!
//! [`Stepper::advance_tick`]: crate::stepper::Stepper::advance_tick

use crate::motion::{Direction, EXTRUDERS};
use crate::planner::Block;

/// Advance accumulator and per-extruder pending-step backlog.
///
/// `advance` and `final_advance` are Q24.8; `old_advance` holds the integer
/// part last pushed into the backlog.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Advance {
    advance: i32,
    old_advance: i32,
    final_advance: i32,
    pending: [i32; EXTRUDERS],
}

impl Advance {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed from a freshly acquired block.
    ///
    /// Residual backlog from the previous block is left in place; the drain
    /// timer works it off across the boundary.
    pub(crate) fn load_block(&mut self, block: &Block) {
        self.advance = block.initial_advance;
        self.final_advance = block.final_advance;
        self.push_delta(block.active_extruder);
    }

    /// Accumulate during the acceleration phase. No upper clamp.
    pub(crate) fn accelerating(&mut self, block: &Block, step_loops: u8) {
        self.advance += block.advance_rate * i32::from(step_loops);
        self.push_delta(block.active_extruder);
    }

    /// Decay during the deceleration phase, floored at the block's
    /// `final_advance`.
    pub(crate) fn decelerating(&mut self, block: &Block, step_loops: u8) {
        self.advance -= block.advance_rate * i32::from(step_loops);
        if self.advance < self.final_advance {
            self.advance = self.final_advance;
        }
        self.push_delta(block.active_extruder);
    }

    /// Queue one Bresenham-sourced extruder step.
    pub(crate) fn queue_step(&mut self, extruder: u8, direction: Direction) {
        self.pending[usize::from(extruder) % EXTRUDERS] += direction.sign();
    }

    /// Take one pending pulse for an extruder, moving the backlog toward
    /// zero. Returns the pulse direction, or `None` when the backlog is
    /// empty.
    pub(crate) fn drain_one(&mut self, extruder: usize) -> Option<Direction> {
        let pending = &mut self.pending[extruder];
        if *pending > 0 {
            *pending -= 1;
            Some(Direction::Positive)
        } else if *pending < 0 {
            *pending += 1;
            Some(Direction::Negative)
        } else {
            None
        }
    }

    /// Pending pulses for an extruder (signed).
    pub(crate) fn pending(&self, extruder: usize) -> i32 {
        self.pending[extruder]
    }

    /// Zero the backlog (init only).
    pub(crate) fn clear_pending(&mut self) {
        self.pending = [0; EXTRUDERS];
    }

    fn push_delta(&mut self, extruder: u8) {
        let whole = self.advance >> 8;
        self.pending[usize::from(extruder) % EXTRUDERS] += whole - self.old_advance;
        self.old_advance = whole;
    }
}
