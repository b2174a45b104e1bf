//! Planner-side interface: motion blocks and the FIFO block queue.
//!
//! A [`Block`] is one planned motion segment. The look-ahead planner fills
//! the queue; the generator consumes it strictly FIFO, peeking the head while
//! tracing it and discarding it on completion. The generator mutates only the
//! `busy` flag on the head.

use heapless::Deque;

use crate::error::{PlannerError, Result};
use crate::motion::{Axis, Direction, DirectionBits, EXTRUDERS, NUM_AXES};

/// Default queue depth, matching the usual planner buffer.
pub const BLOCK_BUFFER_SIZE: usize = 16;

/// One planned motion segment, immutable while being traced.
///
/// Rates are in steps/s. `acceleration_rate` is pre-scaled by the planner so
/// that `(acceleration_rate * elapsed_us) >> 24` yields a step-rate
/// increment. The advance fields are Q24.8 fixed point.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    /// Step counts per axis (absolute values).
    pub steps: [u32; NUM_AXES],
    /// `max(steps)`, the Bresenham denominator.
    pub step_event_count: u32,
    /// Per-axis direction flags (set = negative).
    pub direction_bits: DirectionBits,
    /// Which extruder this block drives (0..=2).
    pub active_extruder: u8,
    /// Cruise rate, steps/s.
    pub nominal_rate: u16,
    /// Entry rate, steps/s.
    pub initial_rate: u16,
    /// Exit rate, steps/s.
    pub final_rate: u16,
    /// Scaled acceleration factor (see type-level docs).
    pub acceleration_rate: u32,
    /// Step-event index where the acceleration phase ends.
    pub accelerate_until: u32,
    /// Step-event index after which the deceleration phase starts.
    pub decelerate_after: u32,
    /// Advance value at block entry, Q24.8.
    pub initial_advance: i32,
    /// Advance floor during deceleration, Q24.8.
    pub final_advance: i32,
    /// Advance change per step event, Q24.8.
    pub advance_rate: i32,
    /// Set by the generator when it starts tracing the block.
    pub busy: bool,
}

impl Block {
    /// Direction of one axis.
    #[inline]
    pub fn direction(&self, axis: Axis) -> Direction {
        self.direction_bits.direction(axis)
    }

    /// Step count of one axis.
    #[inline]
    pub fn steps_for(&self, axis: Axis) -> u32 {
        self.steps[axis.index()]
    }
}

/// Builder for [`Block`].
///
/// Computes the step event count and direction bits from signed per-axis
/// step counts and validates the phase boundaries.
///
/// # Example
///
/// ```rust
/// use step_pulse::BlockBuilder;
///
/// let block = BlockBuilder::new()
///     .steps([100, -40, 0, 0])
///     .rates(200, 2000, 200)
///     .acceleration(400_000)
///     .phases(30, 70)
///     .build()
///     .unwrap();
///
/// assert_eq!(block.step_event_count, 100);
/// ```
#[derive(Debug, Clone)]
pub struct BlockBuilder {
    steps: [i32; NUM_AXES],
    active_extruder: u8,
    nominal_rate: u16,
    initial_rate: u16,
    final_rate: u16,
    acceleration_rate: u32,
    phases: Option<(u32, u32)>,
    initial_advance: i32,
    final_advance: i32,
    advance_rate: i32,
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBuilder {
    /// Start a new block description.
    pub fn new() -> Self {
        Self {
            steps: [0; NUM_AXES],
            active_extruder: 0,
            nominal_rate: 1000,
            initial_rate: 1000,
            final_rate: 1000,
            acceleration_rate: 0,
            phases: None,
            initial_advance: 0,
            final_advance: 0,
            advance_rate: 0,
        }
    }

    /// Signed step counts for X, Y, Z, E (negative = negative direction).
    pub fn steps(mut self, steps: [i32; NUM_AXES]) -> Self {
        self.steps = steps;
        self
    }

    /// Entry, cruise and exit rates in steps/s.
    pub fn rates(mut self, initial: u16, nominal: u16, final_rate: u16) -> Self {
        self.initial_rate = initial;
        self.nominal_rate = nominal;
        self.final_rate = final_rate;
        self
    }

    /// Scaled acceleration factor.
    pub fn acceleration(mut self, rate: u32) -> Self {
        self.acceleration_rate = rate;
        self
    }

    /// Step-event indices delimiting the accelerate and decelerate phases.
    ///
    /// Without this call the block cruises for its whole length.
    pub fn phases(mut self, accelerate_until: u32, decelerate_after: u32) -> Self {
        self.phases = Some((accelerate_until, decelerate_after));
        self
    }

    /// Extruder driven by this block.
    pub fn extruder(mut self, index: u8) -> Self {
        self.active_extruder = index;
        self
    }

    /// Pressure-advance parameters (Q24.8): entry value, deceleration floor,
    /// change per step event.
    pub fn advance(mut self, initial: i32, final_advance: i32, rate: i32) -> Self {
        self.initial_advance = initial;
        self.final_advance = final_advance;
        self.advance_rate = rate;
        self
    }

    /// Build the block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block moves no axis, the entry/exit rates
    /// exceed the nominal rate, the phase boundaries are out of order, or
    /// the extruder index is out of range.
    pub fn build(self) -> Result<Block> {
        let mut steps = [0u32; NUM_AXES];
        let mut direction_bits = DirectionBits::NONE;
        for axis in Axis::ALL {
            let signed = self.steps[axis.index()];
            steps[axis.index()] = signed.unsigned_abs();
            direction_bits.set(axis, Direction::from_steps(signed));
        }

        let step_event_count = match steps.iter().copied().max() {
            Some(count) if count > 0 => count,
            _ => return Err(PlannerError::EmptyBlock.into()),
        };
        if step_event_count > i32::MAX as u32 {
            return Err(PlannerError::BlockTooLong(step_event_count).into());
        }

        for rate in [self.initial_rate, self.final_rate] {
            if rate > self.nominal_rate {
                return Err(PlannerError::RateOutOfOrder {
                    rate,
                    nominal: self.nominal_rate,
                }
                .into());
            }
        }

        let (accelerate_until, decelerate_after) =
            self.phases.unwrap_or((0, step_event_count));
        if accelerate_until > decelerate_after || decelerate_after > step_event_count {
            return Err(PlannerError::PhaseOutOfOrder {
                accelerate_until,
                decelerate_after,
                step_event_count,
            }
            .into());
        }

        if usize::from(self.active_extruder) >= EXTRUDERS {
            return Err(PlannerError::InvalidExtruder(self.active_extruder).into());
        }

        Ok(Block {
            steps,
            step_event_count,
            direction_bits,
            active_extruder: self.active_extruder,
            nominal_rate: self.nominal_rate,
            initial_rate: self.initial_rate,
            final_rate: self.final_rate,
            acceleration_rate: self.acceleration_rate,
            accelerate_until,
            decelerate_after,
            initial_advance: self.initial_advance,
            final_advance: self.final_advance,
            advance_rate: self.advance_rate,
            busy: false,
        })
    }
}

/// Bounded FIFO of planned blocks.
///
/// The head stays in the queue while the generator traces it, so
/// [`is_empty`](BlockQueue::is_empty) only turns true once every queued step
/// has been emitted or abandoned.
#[derive(Debug, Default)]
pub struct BlockQueue<const N: usize = BLOCK_BUFFER_SIZE> {
    blocks: Deque<Block, N>,
}

impl<const N: usize> BlockQueue<N> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            blocks: Deque::new(),
        }
    }

    /// Append a block.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::QueueFull`] when the buffer is full.
    pub fn push(&mut self, block: Block) -> Result<()> {
        self.blocks
            .push_back(block)
            .map_err(|_| PlannerError::QueueFull.into())
    }

    /// Peek the head without removing it.
    pub fn current(&mut self) -> Option<&mut Block> {
        self.blocks.front_mut()
    }

    /// Pop the head.
    pub fn discard_current(&mut self) {
        self.blocks.pop_front();
    }

    /// Whether any block is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of queued blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Drop every queued block.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
