//! Bresenham stepper core and public API.

use core::fmt;

use log::{debug, trace};

use crate::config::{Kinematics, MachineConfig};
use crate::error::Result;
use crate::motion::{Axis, Direction, EXTRUDERS, NUM_AXES};
use crate::pins::{EndstopSwitch, PinSinks, StepperChannel};
use crate::planner::{Block, BlockQueue, BLOCK_BUFFER_SIZE};
use crate::timer::StepTimer;
use crate::trapezoid::{Phase, Trapezoid};

use super::advance::Advance;
use super::endstops::Endstops;

/// Initial timer period armed by [`Stepper::init`], µs.
const STARTUP_DELAY_US: u32 = 2_000;

/// Self-rearm period while the queue is empty or the gate is off, µs.
const IDLE_DELAY_US: u32 = 1_000;

/// Stall between enabling a late Z driver and its first step, µs.
const Z_ENABLE_STALL_US: u32 = 1_000;

/// Backlog sweeps per advance-drain tick, matching the original's inner loop.
const ADVANCE_DRAIN_SWEEPS: usize = 4;

/// The step pulse generator.
///
/// Created once at startup and alive for the life of the process. All
/// mutable state is owned here: the platform calls [`tick`](Stepper::tick)
/// from the stepper timer callback and (when the advance feature is
/// configured) [`advance_tick`](Stepper::advance_tick) from a second ~10 kHz
/// timer. Foreground code calls the synchronous API between interrupts —
/// exclusive `&mut` access is the critical section, so the embedding wraps
/// the generator in its platform's interrupt-safe cell.
pub struct Stepper<B, T, const QUEUE: usize = BLOCK_BUFFER_SIZE>
where
    B: PinSinks,
    T: StepTimer,
{
    board: B,
    timer: T,
    config: MachineConfig,
    queue: BlockQueue<QUEUE>,

    /// Copy of the queue head being traced; `None` between blocks.
    current: Option<Block>,
    trapezoid: Trapezoid,
    endstops: Endstops,
    advance: Option<Advance>,

    /// Signed Bresenham accumulators, seeded to `-(step_event_count / 2)`.
    counters: [i32; NUM_AXES],
    step_events_completed: u32,

    /// Absolute position in steps per axis.
    count_position: [i32; NUM_AXES],
    /// Last commanded direction per axis, ±1.
    count_direction: [i8; NUM_AXES],

    /// Interrupt gate: when off, ticks touch no pin.
    running: bool,
    check_endstops: bool,
    duplication_enabled: bool,
    z_enabled: bool,
}

impl<B, T, const QUEUE: usize> Stepper<B, T, QUEUE>
where
    B: PinSinks,
    T: StepTimer,
{
    /// Create the generator. Call [`init`](Stepper::init) before use.
    pub fn new(board: B, timer: T, config: MachineConfig) -> Self {
        let advance = config.features.advance.then(Advance::new);
        Self {
            board,
            timer,
            config,
            queue: BlockQueue::new(),
            current: None,
            trapezoid: Trapezoid::new(),
            endstops: Endstops::new(),
            advance,
            counters: [0; NUM_AXES],
            step_events_completed: 0,
            count_position: [0; NUM_AXES],
            count_direction: [1; NUM_AXES],
            running: false,
            check_endstops: true,
            duplication_enabled: false,
            z_enabled: false,
        }
    }

    /// Bring the generator to its idle state: STEP lines released, drivers
    /// disabled, endstop checking on, timer armed and the interrupt gate
    /// open.
    pub fn init(&mut self) {
        for channel in StepperChannel::ALL {
            self.board.release_step(channel);
            self.board.set_enabled(channel, false);
        }
        self.z_enabled = false;
        self.endstops.reset_samples();
        if let Some(advance) = self.advance.as_mut() {
            advance.clear_pending();
        }
        self.enable_endstops(true);
        self.timer.arm(STARTUP_DELAY_US);
        self.running = true;
    }

    // ------------------------------------------------------------------
    // Interrupt bodies
    // ------------------------------------------------------------------

    /// Body of the stepper timer callback.
    ///
    /// Always leaves the timer armed: with the next step period while a
    /// block is being traced, or with a 1 ms self-rearm while idle, gated
    /// off, or stalling for a late Z enable.
    pub fn tick(&mut self) {
        if !self.running {
            self.timer.arm(IDLE_DELAY_US);
            return;
        }

        // If there is no current block, attempt to pop one from the queue.
        if self.current.is_none() && !self.acquire_block() {
            return;
        }
        let Some(block) = self.current else { return };

        self.direction_and_endstop_pass(&block);

        // Take multiple steps per interrupt for high speed moves.
        let loops = self.trapezoid.step_loops();
        for _ in 0..loops {
            if self.step_events_completed >= block.step_event_count {
                break;
            }
            self.trace_step_event(&block);
            self.step_events_completed += 1;
        }

        let (period, phase) =
            self.trapezoid
                .next_timing(&block, self.step_events_completed, self.ceiling());
        if let Some(advance) = self.advance.as_mut() {
            match phase {
                Phase::Accelerating => advance.accelerating(&block, self.trapezoid.step_loops()),
                Phase::Decelerating => advance.decelerating(&block, self.trapezoid.step_loops()),
                Phase::Cruising => {}
            }
        }
        self.timer.arm(u32::from(period));

        // If the current block is finished, hand it back to the planner.
        if self.step_events_completed >= block.step_event_count {
            self.current = None;
            self.queue.discard_current();
            trace!("block retired");
        }
    }

    /// Body of the advance-drain timer callback (~10 kHz).
    ///
    /// Works each extruder's pending-step backlog toward zero, one pulse per
    /// sweep, with the pulse direction taken from the backlog's sign.
    pub fn advance_tick(&mut self) {
        if self.advance.is_none() {
            return;
        }
        for _ in 0..ADVANCE_DRAIN_SWEEPS {
            for extruder in 0..EXTRUDERS {
                let Some(advance) = self.advance.as_mut() else {
                    return;
                };
                let Some(direction) = advance.drain_one(extruder) else {
                    continue;
                };
                let channel = StepperChannel::extruder(extruder as u8);
                self.board.release_step(channel);
                self.board.set_direction(channel, direction);
                self.count_position[Axis::E.index()] += direction.sign();
                self.board.assert_step(channel);
            }
        }
    }

    // ------------------------------------------------------------------
    // Public API
    // ------------------------------------------------------------------

    /// Open the interrupt gate.
    pub fn wake_up(&mut self) {
        self.running = true;
    }

    /// Queue a block for execution.
    pub fn enqueue(&mut self, block: Block) -> Result<()> {
        self.queue.push(block)
    }

    /// Whether any block is queued or being traced.
    pub fn blocks_queued(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Block the caller until the queue is drained.
    ///
    /// `idle` runs once per spin so the embedding can service heaters,
    /// inactivity timeouts, or (on a host) pump the timer.
    pub fn synchronize<F: FnMut(&mut Self)>(&mut self, mut idle: F) {
        while self.blocks_queued() {
            idle(self);
        }
    }

    /// Absolute position of an axis, steps.
    pub fn position(&self, axis: Axis) -> i32 {
        self.count_position[axis.index()]
    }

    /// Overwrite the position counters.
    ///
    /// Exclusive `&mut` access doubles as the interrupt mask here: the tick
    /// cannot observe a half-written position.
    pub fn set_position(&mut self, x: i32, y: i32, z: i32, e: i32) {
        self.count_position = [x, y, z, e];
    }

    /// Overwrite only the extruder position counter.
    pub fn set_e_position(&mut self, e: i32) {
        self.count_position[Axis::E.index()] = e;
    }

    /// Drain the queue, then disable every driver.
    pub fn finish_and_disable<F: FnMut(&mut Self)>(&mut self, idle: F) {
        self.synchronize(idle);
        for channel in StepperChannel::ALL {
            self.board.set_enabled(channel, false);
        }
        self.z_enabled = false;
    }

    /// Abandon the in-flight block and every queued one, without
    /// decelerating. Position is lost from the planner's point of view.
    pub fn quick_stop(&mut self) {
        self.running = false;
        while !self.queue.is_empty() {
            self.queue.discard_current();
        }
        self.current = None;
        self.running = true;
        debug!("quick stop: queue abandoned");
    }

    /// Toggle endstop checking (homing disables it between moves).
    pub fn enable_endstops(&mut self, check: bool) {
        self.check_endstops = check;
    }

    /// Whether endstop checking is on.
    pub fn endstops_enabled(&self) -> bool {
        self.check_endstops
    }

    /// Clear the hit latches without reporting (the hit was expected).
    pub fn endstops_hit_on_purpose(&mut self) {
        self.endstops.clear_latches();
    }

    /// Whether an axis has a latched endstop hit.
    pub fn endstop_hit(&self, axis: Axis) -> bool {
        self.endstops.hit(axis)
    }

    /// Axis position recorded when its endstop latched, steps.
    pub fn endstop_trigger_position(&self, axis: Axis) -> i32 {
        self.endstops.trigger_position(axis)
    }

    /// Report latched endstop hits on `console` and clear the latches.
    ///
    /// Positions are printed in millimetres using the configured
    /// steps-per-mm. Returns `true` when the abort-on-hit feature fired, in
    /// which case the queue has been abandoned and the caller is expected to
    /// zero its hotend targets.
    pub fn check_hit_endstops<W: fmt::Write>(&mut self, console: &mut W) -> bool {
        if !self.endstops.any_hit() {
            return false;
        }
        let _ = console.write_str("echo:endstops hit:");
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            if self.endstops.hit(axis) {
                let mm = self.endstops.trigger_position(axis) as f32
                    / self.config.axes.for_axis(axis);
                let _ = write!(console, " {}:{:.2}", axis.letter(), mm);
            }
        }
        let _ = console.write_str("\n");
        self.endstops.clear_latches();

        if self.config.features.abort_on_endstop_hit {
            self.quick_stop();
            return true;
        }
        false
    }

    /// Drive both X carriages in lockstep (dual X carriage machines).
    pub fn set_duplication(&mut self, enabled: bool) {
        self.duplication_enabled = enabled;
    }

    /// Whether a block is currently being traced.
    pub fn has_active_block(&self) -> bool {
        self.current.is_some()
    }

    /// The machine configuration the generator was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The pin sinks the generator drives.
    pub fn board(&self) -> &B {
        &self.board
    }

    /// Mutable access to the pin sinks (e.g. to service other peripherals
    /// that share the board object).
    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// The step timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    // ------------------------------------------------------------------
    // Tick internals
    // ------------------------------------------------------------------

    #[inline]
    fn ceiling(&self) -> u32 {
        self.config.machine.max_step_frequency
    }

    /// Claim the queue head. Returns `true` when the tick should go on to
    /// trace step events; on `false` the timer has already been re-armed.
    fn acquire_block(&mut self) -> bool {
        let block = match self.queue.current() {
            Some(head) => {
                head.busy = true;
                *head
            }
            None => {
                self.timer.arm(IDLE_DELAY_US);
                return false;
            }
        };

        let first_period = self.trapezoid.reset(&block, self.config.machine.max_step_frequency);
        self.timer.arm(u32::from(first_period));
        if let Some(advance) = self.advance.as_mut() {
            advance.load_block(&block);
        }

        let half = (block.step_event_count >> 1) as i32;
        self.counters = [-half; NUM_AXES];
        self.step_events_completed = 0;
        trace!(
            "block acquired: {} step events at {}..{} steps/s",
            block.step_event_count,
            block.initial_rate,
            block.nominal_rate
        );
        self.current = Some(block);

        if self.config.features.z_late_enable && block.steps_for(Axis::Z) > 0 && !self.z_enabled {
            self.board.set_enabled(StepperChannel::Z, true);
            if self.config.features.z_dual_stepper_drivers {
                self.board.set_enabled(StepperChannel::Z2, true);
            }
            self.z_enabled = true;
            self.timer.arm(Z_ENABLE_STALL_US);
            return false;
        }
        true
    }

    /// Decode the block's direction bits onto the DIR pins and sample the
    /// endstops the block is moving toward. Runs every tick while a block is
    /// current.
    fn direction_and_endstop_pass(&mut self, block: &Block) {
        let bits = block.direction_bits;

        let x_dir = bits.direction(Axis::X);
        self.set_x_direction(block, x_dir);
        self.count_direction[Axis::X.index()] = x_dir.sign() as i8;

        let y_dir = bits.direction(Axis::Y);
        self.board.set_direction(StepperChannel::Y, y_dir);
        self.count_direction[Axis::Y.index()] = y_dir.sign() as i8;

        // Endstop gating keys off cartesian travel; under CoreXY that is a
        // combination of the A and B motor bits, not the literal axis bits.
        let (x_neg, y_neg) = match self.config.machine.kinematics {
            Kinematics::Cartesian => (bits.is_negative(Axis::X), bits.is_negative(Axis::Y)),
            Kinematics::CoreXy => (
                bits.is_negative(Axis::X) && bits.is_negative(Axis::Y),
                bits.is_negative(Axis::X) && !bits.is_negative(Axis::Y),
            ),
        };

        if self.check_endstops {
            if x_neg {
                if self.x_endstop_applies(block, -1) {
                    self.gate_endstop(block, EndstopSwitch::XMin, Axis::X);
                }
            } else if self.x_endstop_applies(block, 1) {
                self.gate_endstop(block, EndstopSwitch::XMax, Axis::X);
            }

            if y_neg {
                self.gate_endstop(block, EndstopSwitch::YMin, Axis::Y);
            } else {
                self.gate_endstop(block, EndstopSwitch::YMax, Axis::Y);
            }
        }

        let z_dir = bits.direction(Axis::Z);
        self.board.set_direction(StepperChannel::Z, z_dir);
        if self.config.features.z_dual_stepper_drivers {
            self.board.set_direction(StepperChannel::Z2, z_dir);
        }
        self.count_direction[Axis::Z.index()] = z_dir.sign() as i8;

        if self.check_endstops {
            match z_dir {
                Direction::Negative => self.gate_endstop(block, EndstopSwitch::ZMin, Axis::Z),
                Direction::Positive => self.gate_endstop(block, EndstopSwitch::ZMax, Axis::Z),
            }
        }

        // With the advance feature the drain timer owns the E direction pin.
        if self.advance.is_none() {
            let e_dir = bits.direction(Axis::E);
            self.board
                .set_direction(StepperChannel::extruder(block.active_extruder), e_dir);
            self.count_direction[Axis::E.index()] = e_dir.sign() as i8;
        }
    }

    /// With two X carriages, endstops are only consulted in the homing
    /// direction of the carriage the block drives.
    fn x_endstop_applies(&self, block: &Block, travel_dir: i8) -> bool {
        match &self.config.dual_x_carriage {
            Some(dual) => {
                if block.active_extruder == 0 {
                    dual.x_home_dir == travel_dir
                } else {
                    dual.x2_home_dir == travel_dir
                }
            }
            None => true,
        }
    }

    /// Sample one switch through the debounce filter; on a confirmed hit,
    /// latch it and force the block to completion.
    fn gate_endstop(&mut self, block: &Block, switch: EndstopSwitch, axis: Axis) {
        let pressed = self.board.read_endstop(switch);
        if self.endstops.debounce(switch, pressed) && block.steps_for(axis) > 0 {
            self.endstops
                .latch(axis, self.count_position[axis.index()]);
            self.step_events_completed = block.step_event_count;
            debug!("endstop hit on {:?}, block truncated", switch);
        }
    }

    /// One Bresenham step event: every axis whose accumulator rolls over
    /// emits a pulse, in X → Y → Z → E order.
    fn trace_step_event(&mut self, block: &Block) {
        let event_count = block.step_event_count as i32;

        // With advance, extruder pulses go to the backlog instead of a pin.
        if let Some(advance) = self.advance.as_mut() {
            let e = Axis::E.index();
            self.counters[e] += block.steps[e] as i32;
            if self.counters[e] > 0 {
                self.counters[e] -= event_count;
                advance.queue_step(block.active_extruder, block.direction(Axis::E));
            }
        }

        let x = Axis::X.index();
        self.counters[x] += block.steps[x] as i32;
        if self.counters[x] > 0 {
            self.assert_x_step(block);
            self.counters[x] -= event_count;
            self.count_position[x] += i32::from(self.count_direction[x]);
            self.release_x_step(block);
        }

        let y = Axis::Y.index();
        self.counters[y] += block.steps[y] as i32;
        if self.counters[y] > 0 {
            self.board.assert_step(StepperChannel::Y);
            self.counters[y] -= event_count;
            self.count_position[y] += i32::from(self.count_direction[y]);
            self.board.release_step(StepperChannel::Y);
        }

        let z = Axis::Z.index();
        self.counters[z] += block.steps[z] as i32;
        if self.counters[z] > 0 {
            self.board.assert_step(StepperChannel::Z);
            if self.config.features.z_dual_stepper_drivers {
                self.board.assert_step(StepperChannel::Z2);
            }
            self.counters[z] -= event_count;
            self.count_position[z] += i32::from(self.count_direction[z]);
            self.board.release_step(StepperChannel::Z);
            if self.config.features.z_dual_stepper_drivers {
                self.board.release_step(StepperChannel::Z2);
            }
        }

        if self.advance.is_none() {
            let e = Axis::E.index();
            let channel = StepperChannel::extruder(block.active_extruder);
            self.counters[e] += block.steps[e] as i32;
            if self.counters[e] > 0 {
                self.board.assert_step(channel);
                self.counters[e] -= event_count;
                self.count_position[e] += i32::from(self.count_direction[e]);
                self.board.release_step(channel);
            }
        }
    }

    fn assert_x_step(&mut self, block: &Block) {
        match (&self.config.dual_x_carriage, self.duplication_enabled) {
            (Some(_), true) => {
                self.board.assert_step(StepperChannel::X);
                self.board.assert_step(StepperChannel::X2);
            }
            (Some(_), false) if block.active_extruder != 0 => {
                self.board.assert_step(StepperChannel::X2);
            }
            _ => self.board.assert_step(StepperChannel::X),
        }
    }

    fn release_x_step(&mut self, block: &Block) {
        match (&self.config.dual_x_carriage, self.duplication_enabled) {
            (Some(_), true) => {
                self.board.release_step(StepperChannel::X);
                self.board.release_step(StepperChannel::X2);
            }
            (Some(_), false) if block.active_extruder != 0 => {
                self.board.release_step(StepperChannel::X2);
            }
            _ => self.board.release_step(StepperChannel::X),
        }
    }

    fn set_x_direction(&mut self, block: &Block, direction: Direction) {
        match (&self.config.dual_x_carriage, self.duplication_enabled) {
            (Some(_), true) => {
                self.board.set_direction(StepperChannel::X, direction);
                self.board.set_direction(StepperChannel::X2, direction);
            }
            (Some(_), false) if block.active_extruder != 0 => {
                self.board.set_direction(StepperChannel::X2, direction);
            }
            _ => self.board.set_direction(StepperChannel::X, direction),
        }
    }
}
